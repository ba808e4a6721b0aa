//! # Spacecraft body geometry
//!
//! The spacecraft is modelled as a right **octagonal prism**: eight bottom-deck vertices in
//! the body XY plane, extruded along +z by the body height. Its surface is split into ten
//! planar [`Face`]s:
//!
//! ```text
//!            v2 ______ v3
//!             /        \            faces 0..=7: vertical sides, face f spans v[f] → v[f+1]
//!        v1  /          \  v4       (face 7 wraps back to v0)
//!           |            |
//!        v0 |            | v5       face 8: bottom deck (z = 0)
//!            \          /           face 9: top deck    (z = H)
//!             \________/
//!            v7        v6
//! ```
//!
//! The geometry is immutable once built and shared by every analysis. The default instance
//! ([`SpacecraftGeometry::lisa_pathfinder`]) carries the LISA Pathfinder deck corners in meters.
//!
//! ## See also
//! ------------
//! * [`FaceUnfolder`](crate::unfold::FaceUnfolder) – Uses the base vectors to map samples into face-local frames.

use std::fmt;

use nalgebra::{Point2, Vector2};
use serde::Serialize;

use crate::constants::Meter;
use crate::impact_errors::ImpactError;

/// Number of vertical side faces (and of deck vertices).
pub const SIDE_COUNT: usize = 8;

/// Total number of faces: eight sides plus the bottom and top decks.
pub const FACE_COUNT: usize = 10;

/// Conventional labels of the ten faces, in face-index order.
const FACE_LABELS: [&str; FACE_COUNT] = [
    "+x+x", "+x+y", "+y+y", "+y-x", "-x-x", "-x-y", "-y-y", "-y+x", "+z+z", "-z-z",
];

/// One of the ten planar surface elements of the spacecraft body.
///
/// Indices `0..=7` are the trapezoidal vertical sides in cyclic order, `8` is the bottom
/// deck and `9` the top deck. A `Face` can only be built from a valid index, so every
/// downstream lookup is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Face(u8);

impl Face {
    pub const BOTTOM: Face = Face(8);
    pub const TOP: Face = Face(9);

    /// Build a face from its index.
    ///
    /// Return
    /// ----------
    /// * The face, or [`ImpactError::InvalidFace`] when `index` is outside `0..=9`.
    pub fn new(index: i64) -> Result<Face, ImpactError> {
        if (0..FACE_COUNT as i64).contains(&index) {
            Ok(Face(index as u8))
        } else {
            Err(ImpactError::InvalidFace(index))
        }
    }

    /// Build a face from a floating-point chain value (faces are stored as floats in the chains).
    ///
    /// Return
    /// ----------
    /// * The face, or [`ImpactError::InvalidFaceValue`] carrying the raw value unless it is an
    ///   integer in `0..=9`.
    pub fn from_chain_value(value: f64) -> Result<Face, ImpactError> {
        if value.fract() == 0.0 && (0.0..FACE_COUNT as f64).contains(&value) {
            Ok(Face(value as u8))
        } else {
            Err(ImpactError::InvalidFaceValue(value))
        }
    }

    /// Iterate over the ten faces in index order.
    pub fn all() -> impl Iterator<Item = Face> {
        (0..FACE_COUNT as u8).map(Face)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` for the eight vertical sides.
    pub fn is_side(self) -> bool {
        (self.0 as usize) < SIDE_COUNT
    }

    /// `true` for the bottom and top decks.
    pub fn is_deck(self) -> bool {
        !self.is_side()
    }

    pub fn label(self) -> &'static str {
        FACE_LABELS[self.index()]
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

impl TryFrom<i64> for Face {
    type Error = ImpactError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Face::new(value)
    }
}

/// Slope/intercept form `y = m·x + b` of a line through two deck vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineEquation {
    pub slope: f64,
    pub intercept: f64,
}

impl LineEquation {
    /// Fit the line through `p1` and `p2`.
    ///
    /// Return
    /// ----------
    /// * `None` when the two points share the same abscissa (vertical line).
    pub fn through(p1: &Point2<f64>, p2: &Point2<f64>) -> Option<LineEquation> {
        let dx = p2.x - p1.x;
        if dx == 0.0 {
            return None;
        }
        let slope = (p2.y - p1.y) / dx;
        Some(LineEquation {
            slope,
            intercept: p1.y - slope * p1.x,
        })
    }

    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Axis-aligned bounding box of the deck in the body XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeckBounds {
    pub x_min: Meter,
    pub x_max: Meter,
    pub y_min: Meter,
    pub y_max: Meter,
}

impl DeckBounds {
    pub fn width(&self) -> Meter {
        self.x_max - self.x_min
    }

    pub fn depth(&self) -> Meter {
        self.y_max - self.y_min
    }
}

/// Immutable description of the octagonal-prism spacecraft body.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftGeometry {
    vertices: [Point2<f64>; SIDE_COUNT],
    height: Meter,
}

impl SpacecraftGeometry {
    /// Build a geometry from the eight bottom-deck vertices (in cyclic order) and the body height.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::DegenerateGeometry`] if the height is not strictly positive or two
    ///   consecutive vertices coincide (zero-length side).
    pub fn new(vertices: [Point2<f64>; SIDE_COUNT], height: Meter) -> Result<Self, ImpactError> {
        if !(height > 0.0) {
            return Err(ImpactError::DegenerateGeometry(format!(
                "body height must be positive, got {height}"
            )));
        }
        for f in 0..SIDE_COUNT {
            let next = vertices[(f + 1) % SIDE_COUNT];
            if (next - vertices[f]).norm() == 0.0 {
                return Err(ImpactError::DegenerateGeometry(format!(
                    "side {f} has zero length"
                )));
            }
        }
        Ok(SpacecraftGeometry { vertices, height })
    }

    /// LISA Pathfinder body: bottom-deck corners `SC_BOT_CORNER_{1..8}` and a height of 0.8315 m.
    pub fn lisa_pathfinder() -> Self {
        SpacecraftGeometry {
            vertices: [
                Point2::new(-0.926, -0.2168),
                Point2::new(-0.926, 0.2048),
                Point2::new(-0.5263, 0.897),
                Point2::new(0.5163, 0.897),
                Point2::new(0.916, 0.2048),
                Point2::new(0.916, -0.2168),
                Point2::new(0.5163, -0.909),
                Point2::new(-0.5263, -0.909),
            ],
            height: 0.8315,
        }
    }

    pub fn height(&self) -> Meter {
        self.height
    }

    pub fn vertices(&self) -> &[Point2<f64>; SIDE_COUNT] {
        &self.vertices
    }

    /// Deck vertex at which side `face` starts.
    ///
    /// Errors
    /// ----------
    /// * [`ImpactError::InvalidFace`] for the decks, which have no anchoring vertex.
    pub fn vertex(&self, face: Face) -> Result<Point2<f64>, ImpactError> {
        if !face.is_side() {
            return Err(ImpactError::InvalidFace(face.index() as i64));
        }
        Ok(self.vertices[face.index()])
    }

    /// Vector from the vertex of side `face` to the next vertex (face 7 wraps to vertex 0).
    pub fn base_vector(&self, face: Face) -> Result<Vector2<f64>, ImpactError> {
        let start = self.vertex(face)?;
        let end = self.vertices[(face.index() + 1) % SIDE_COUNT];
        Ok(end - start)
    }

    /// Length of side `face` along the deck.
    pub fn side_length(&self, face: Face) -> Result<Meter, ImpactError> {
        Ok(self.base_vector(face)?.norm())
    }

    /// Bounding box of the deck: x from vertex 0 to vertex 5, y from vertex 7 to vertex 2.
    pub fn deck_bounds(&self) -> DeckBounds {
        DeckBounds {
            x_min: self.vertices[0].x,
            x_max: self.vertices[5].x,
            y_min: self.vertices[7].y,
            y_max: self.vertices[2].y,
        }
    }

    /// Outline of a face in the flattened layout.
    ///
    /// Sides unfold outward around the deck: the rectangle spans the base vector and a
    /// vector of length `H` along the left normal of the base. The bottom deck is the
    /// octagon itself; the top deck is the octagon shifted by `H + deck depth` along +y.
    pub fn flat_outline(&self, face: Face) -> Vec<Point2<f64>> {
        if face.is_side() {
            let v1 = self.vertices[face.index()];
            let base = self.vertices[(face.index() + 1) % SIDE_COUNT] - v1;
            let unit = base.normalize();
            let side = Vector2::new(-unit.y, unit.x) * self.height;
            let v2 = v1 + base;
            let v3 = v2 + side;
            let v4 = v3 - base;
            vec![v1, v2, v3, v4]
        } else {
            let y_push = self.top_deck_offset(face);
            self.vertices
                .iter()
                .map(|v| Point2::new(v.x, v.y + y_push))
                .collect()
        }
    }

    /// Vertical shift of a deck in the flattened layout (`H + deck depth` for the top deck).
    pub fn top_deck_offset(&self, face: Face) -> Meter {
        if face == Face::TOP {
            self.deck_bounds().depth() + self.height
        } else {
            0.0
        }
    }

    /// Whether a deck histogram cell `[x0, x1] × [y0, y1]` overlaps the octagon.
    ///
    /// Cells in the corner regions of the bounding box (right of vertex 3 or left of vertex 2)
    /// are tested against the four slanted sides; cells entirely outside are clipped.
    pub fn deck_cell_inside(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> bool {
        let v = &self.vertices;
        let slanted = (
            LineEquation::through(&v[3], &v[4]),
            LineEquation::through(&v[6], &v[5]),
            LineEquation::through(&v[0], &v[7]),
            LineEquation::through(&v[1], &v[2]),
        );
        let (Some(top_right), Some(bottom_right), Some(bottom_left), Some(top_left)) = slanted
        else {
            return true;
        };

        if x1 > v[3].x {
            if top_right.y_at(x0) < y0 || bottom_right.y_at(x0) > y1 {
                return false;
            }
        } else if x1 < v[2].x && (bottom_left.y_at(x1) > y1 || top_left.y_at(x1) < y0) {
            return false;
        }
        true
    }
}

impl Default for SpacecraftGeometry {
    fn default() -> Self {
        Self::lisa_pathfinder()
    }
}
