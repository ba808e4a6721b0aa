//! # Face unfolding and impact-location maps
//!
//! Each posterior draw carries the face it hit and its body coordinates `(rx, ry, rz)`. The
//! [`FaceUnfolder`] turns the draws of one face into a 2D density map in a canonical,
//! face-local frame, and maps the bin edges back onto the spacecraft, either on the 3D body
//! ([`FacePatch`]) or on the flattened layout where the sides are folded out around the
//! bottom deck ([`FlatFace`]).
//!
//! ## Side faces (0–7)
//!
//! ```text
//!   body XY plane                         face-local frame
//!
//!        v[f+1]                            height (rz)
//!         /                                  ^
//!        /  b = v[f+1] − v[f]                |______________
//!       /                     ──────▶        |              |
//!     v[f]                                   o──────────────┴──▶ along (0 … |b|)
//! ```
//!
//! 1. **translate**: subtract `v[f]` from `(rx, ry)`;
//! 2. **rotate**: by `θ = acos(b̂·x̂)`, replaced with `2π − θ` for the faces whose base
//!    vector points into the upper half-plane ([`FLIPPED_FACES`]), so that `b` always lands
//!    on `+x`;
//! 3. **bin** `(along, rz)` over `[0, |b|] × [0, H]`.
//!
//! The inverse applies a rotation by `−θ` and a translation by `+v[f]`, which is the exact
//! algebraic inverse of the forward step.
//!
//! ## Decks (8, 9)
//!
//! Binned directly in body `(rx, ry)` over the deck bounding box. In the flattened layout the
//! top deck is shifted by `H + depth` along `+y` and its rows are flipped.
//!
//! ## Normalization
//!
//! Counts are divided by `total / N`, with `total` the size of the whole sample set and `N` the
//! number of bins across the deck. A face with a single draw is dropped (all-zero map).

pub mod histogram;

use nalgebra::{DMatrix, Point2, Point3, Rotation2, Vector2};
use serde::Serialize;
use tracing::debug;

use crate::constants::{Radian, DPI};
use crate::impact_errors::ImpactError;
use crate::samples::{ImpactSample, SampleSet};
use crate::spacecraft::{Face, SpacecraftGeometry};

pub use self::histogram::Histogram2d;

/// Side faces rotated by `2π − θ` instead of `θ`.
pub const FLIPPED_FACES: [usize; 3] = [0, 1, 7];

/// One histogram cell placed on the 3D body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceCell {
    pub corners: [Point3<f64>; 4],
    pub density: f64,
    /// Deck cell lying outside the octagon.
    pub clipped: bool,
}

/// Density map of one face placed on the 3D body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacePatch {
    pub face: Face,
    pub histogram: Histogram2d,
    /// Cells in row-major order (height or y bins first).
    pub cells: Vec<SurfaceCell>,
}

/// Density map of one face on the flattened layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFace {
    pub face: Face,
    pub histogram: Histogram2d,
    /// Cell corners: `mesh[(row, col)]` is the image of `(x_edges[col], y_edges[row])`.
    pub mesh: DMatrix<Point2<f64>>,
    /// Outline of the face on the layout.
    pub outline: Vec<Point2<f64>>,
}

/// Maps face-local impact coordinates to and from the spacecraft body.
#[derive(Debug, Clone)]
pub struct FaceUnfolder {
    geometry: SpacecraftGeometry,
    bins_across_deck: usize,
}

impl FaceUnfolder {
    /// Arguments
    /// -----------------
    /// * `geometry`: spacecraft body.
    /// * `bins_across_deck`: number of bins spanning the deck width; fixes the common bin
    ///   density of every face.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidParameter`] if `bins_across_deck` is zero.
    pub fn new(geometry: SpacecraftGeometry, bins_across_deck: usize) -> Result<Self, ImpactError> {
        if bins_across_deck == 0 {
            return Err(ImpactError::InvalidParameter(
                "bins_across_deck must be >= 1".into(),
            ));
        }
        Ok(FaceUnfolder {
            geometry,
            bins_across_deck,
        })
    }

    pub fn geometry(&self) -> &SpacecraftGeometry {
        &self.geometry
    }

    pub fn bins_across_deck(&self) -> usize {
        self.bins_across_deck
    }

    /// Bins per meter shared by all faces.
    pub fn bin_density(&self) -> f64 {
        self.bins_across_deck as f64 / self.geometry.deck_bounds().width()
    }

    pub fn translate_to_origin(&self, face: Face, p: &Point2<f64>) -> Result<Vector2<f64>, ImpactError> {
        Ok(*p - self.geometry.vertex(face)?)
    }

    pub fn translate_from_origin(&self, face: Face, v: &Vector2<f64>) -> Result<Point2<f64>, ImpactError> {
        Ok(self.geometry.vertex(face)? + *v)
    }

    /// Angle rotating the base vector of side `face` onto `+x`.
    ///
    /// `θ = acos(b̂·x̂)`, replaced with `2π − θ` for [`FLIPPED_FACES`].
    pub fn rotation_angle(&self, face: Face) -> Result<Radian, ImpactError> {
        let base = self.geometry.base_vector(face)?.normalize();
        let theta = base.x.clamp(-1.0, 1.0).acos();
        Ok(if FLIPPED_FACES.contains(&face.index()) {
            DPI - theta
        } else {
            theta
        })
    }

    pub fn rotate_at_origin(&self, face: Face, v: &Vector2<f64>) -> Result<Vector2<f64>, ImpactError> {
        Ok(Rotation2::new(self.rotation_angle(face)?) * *v)
    }

    /// Inverse of [`Self::rotate_at_origin`].
    pub fn rotate_back(&self, face: Face, v: &Vector2<f64>) -> Result<Vector2<f64>, ImpactError> {
        Ok(Rotation2::new(-self.rotation_angle(face)?) * *v)
    }

    /// Face-local coordinates of a draw: `(along, height)` for sides, body `(x, y)` for decks.
    pub fn to_face_local(&self, sample: &ImpactSample) -> Result<Point2<f64>, ImpactError> {
        let face = sample.face;
        if face.is_deck() {
            return Ok(Point2::new(sample.local.x, sample.local.y));
        }
        let at_origin = self.translate_to_origin(face, &Point2::new(sample.local.x, sample.local.y))?;
        let rotated = self.rotate_at_origin(face, &at_origin)?;
        Ok(Point2::new(rotated.x, sample.local.z))
    }

    /// Empty histogram with the binning of `face`.
    ///
    /// Sides span `[0, |b|] × [0, H]` with `int(|b|·ρ) × int(H·ρ)` bins; decks span the
    /// bounding box with `N × int(depth·ρ)` bins, where `ρ` is [`Self::bin_density`].
    pub fn empty_histogram(&self, face: Face) -> Result<Histogram2d, ImpactError> {
        let rho = self.bin_density();
        let height = self.geometry.height();
        if face.is_side() {
            let length = self.geometry.side_length(face)?;
            Ok(Histogram2d::new(
                (0.0, length),
                (length * rho) as usize,
                (0.0, height),
                (height * rho) as usize,
            ))
        } else {
            let bounds = self.geometry.deck_bounds();
            Ok(Histogram2d::new(
                (bounds.x_min, bounds.x_max),
                self.bins_across_deck,
                (bounds.y_min, bounds.y_max),
                (bounds.depth() * rho) as usize,
            ))
        }
    }

    /// Normalized density map of the draws of `set` on `face`, in face-local coordinates.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::EmptyInput`] if `set` holds no draws.
    pub fn face_histogram(&self, set: &SampleSet, face: Face) -> Result<Histogram2d, ImpactError> {
        if set.is_empty() {
            return Err(ImpactError::EmptyInput(
                "no samples to build a face histogram".into(),
            ));
        }
        let mut histogram = self.empty_histogram(face)?;

        let on_face: Vec<&ImpactSample> = set.samples_on(face).collect();
        if on_face.len() == 1 {
            debug!(face = face.index(), "single sample on face, dropped");
            return Ok(histogram);
        }

        let points = on_face
            .iter()
            .map(|s| self.to_face_local(s).map(|p| (p.x, p.y)))
            .collect::<Result<Vec<_>, _>>()?;
        histogram.fill_all(points);
        histogram.scale(self.bins_across_deck as f64 / set.len() as f64);
        Ok(histogram)
    }

    /// Density map of `face` placed on the 3D body.
    pub fn surface_patch(&self, set: &SampleSet, face: Face) -> Result<FacePatch, ImpactError> {
        let histogram = self.face_histogram(set, face)?;
        let (rows, cols) = histogram.shape();
        let (xe, ye) = (histogram.x_edges(), histogram.y_edges());
        let counts = histogram.counts();
        let mut cells = Vec::with_capacity(rows * cols);

        if face.is_side() {
            // along-face edges back onto the base segment of the side
            let base_points = xe
                .iter()
                .map(|x| {
                    let back = self.rotate_back(face, &Vector2::new(*x, 0.0))?;
                    self.translate_from_origin(face, &back)
                })
                .collect::<Result<Vec<_>, _>>()?;

            for t in 0..rows {
                for i in 0..cols {
                    let (p1, p2) = (base_points[i], base_points[i + 1]);
                    cells.push(SurfaceCell {
                        corners: [
                            Point3::new(p1.x, p1.y, ye[t]),
                            Point3::new(p2.x, p2.y, ye[t]),
                            Point3::new(p2.x, p2.y, ye[t + 1]),
                            Point3::new(p1.x, p1.y, ye[t + 1]),
                        ],
                        density: counts[(t, i)],
                        clipped: false,
                    });
                }
            }
        } else {
            let z = if face == Face::TOP {
                self.geometry.height()
            } else {
                0.0
            };
            for t in 0..rows {
                for i in 0..cols {
                    cells.push(SurfaceCell {
                        corners: [
                            Point3::new(xe[i], ye[t], z),
                            Point3::new(xe[i + 1], ye[t], z),
                            Point3::new(xe[i + 1], ye[t + 1], z),
                            Point3::new(xe[i], ye[t + 1], z),
                        ],
                        density: counts[(t, i)],
                        clipped: !self
                            .geometry
                            .deck_cell_inside(xe[i], xe[i + 1], ye[t], ye[t + 1]),
                    });
                }
            }
        }

        Ok(FacePatch {
            face,
            histogram,
            cells,
        })
    }

    /// Density map of `face` on the flattened layout.
    ///
    /// For sides, the `(along, height)` edge mesh is rotated back so that the height axis
    /// follows the outward side of the patch. The top deck is shifted by `H + depth` and its
    /// rows flipped.
    pub fn flat_face(&self, set: &SampleSet, face: Face) -> Result<FlatFace, ImpactError> {
        let mut histogram = self.face_histogram(set, face)?;

        let mesh = if face.is_side() {
            let rotation = Rotation2::new(-self.rotation_angle(face)?);
            let vertex = self.geometry.vertex(face)?;
            let (xe, ye) = (histogram.x_edges(), histogram.y_edges());
            DMatrix::from_fn(ye.len(), xe.len(), |r, c| {
                vertex + rotation * Vector2::new(xe[c], ye[r])
            })
        } else {
            if face == Face::TOP {
                histogram.shift_y(self.geometry.top_deck_offset(face));
                histogram.flip_rows();
            }
            let (xe, ye) = (histogram.x_edges(), histogram.y_edges());
            DMatrix::from_fn(ye.len(), xe.len(), |r, c| Point2::new(xe[c], ye[r]))
        };

        Ok(FlatFace {
            face,
            histogram,
            mesh,
            outline: self.geometry.flat_outline(face),
        })
    }

    /// Density maps of the ten faces on the 3D body.
    pub fn surface_patches(&self, set: &SampleSet) -> Result<Vec<FacePatch>, ImpactError> {
        Face::all().map(|f| self.surface_patch(set, f)).collect()
    }

    /// Density maps of the ten faces on the flattened layout.
    pub fn flat_layout(&self, set: &SampleSet) -> Result<Vec<FlatFace>, ImpactError> {
        Face::all().map(|f| self.flat_face(set, f)).collect()
    }
}
