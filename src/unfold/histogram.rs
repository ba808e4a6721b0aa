use nalgebra::DMatrix;
use serde::Serialize;

/// Uniform-bin two-dimensional histogram.
///
/// Counts are stored with **rows indexing y bins and columns indexing x bins**, the layout
/// expected when drawing the histogram as an image or mesh (`counts[(row, col)]` covers
/// `[y_edges[row], y_edges[row+1]] × [x_edges[col], x_edges[col+1]]`).
///
/// Binning rules
/// -----------------
/// * Bins are half-open `[lo, hi)` except the last one of each axis, which also includes its
///   upper edge.
/// * Points outside the range (or NaN) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram2d {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    counts: DMatrix<f64>,
}

/// `bins + 1` evenly spaced edges from `lo` to `hi`, the last edge exactly `hi`.
fn linspace(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let step = (hi - lo) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { hi } else { lo + i as f64 * step })
        .collect()
}

/// Bin of `v` over `edges`, `None` when outside the range.
fn bin_index(edges: &[f64], v: f64) -> Option<usize> {
    let bins = edges.len() - 1;
    let idx = edges.partition_point(|e| *e <= v);
    match idx {
        0 => None,
        i if i <= bins => Some(i - 1),
        _ if v == edges[bins] => Some(bins - 1),
        _ => None,
    }
}

impl Histogram2d {
    /// Empty histogram with `x_bins × y_bins` uniform bins (at least one per axis).
    pub fn new(x_range: (f64, f64), x_bins: usize, y_range: (f64, f64), y_bins: usize) -> Self {
        let (x_bins, y_bins) = (x_bins.max(1), y_bins.max(1));
        Histogram2d {
            x_edges: linspace(x_range.0, x_range.1, x_bins),
            y_edges: linspace(y_range.0, y_range.1, y_bins),
            counts: DMatrix::zeros(y_bins, x_bins),
        }
    }

    /// Add one point; returns whether it fell inside the range.
    pub fn fill(&mut self, x: f64, y: f64) -> bool {
        match (bin_index(&self.x_edges, x), bin_index(&self.y_edges, y)) {
            (Some(col), Some(row)) => {
                self.counts[(row, col)] += 1.0;
                true
            }
            _ => false,
        }
    }

    /// Add every point of an iterator.
    pub fn fill_all(&mut self, points: impl IntoIterator<Item = (f64, f64)>) {
        for (x, y) in points {
            self.fill(x, y);
        }
    }

    pub fn scale(&mut self, factor: f64) {
        self.counts *= factor;
    }

    /// Reverse the row (y) order of the counts, leaving the edges untouched.
    pub fn flip_rows(&mut self) {
        let rows = self.counts.nrows();
        for r in 0..rows / 2 {
            self.counts.swap_rows(r, rows - 1 - r);
        }
    }

    /// Shift every y edge by `dy`.
    pub fn shift_y(&mut self, dy: f64) {
        self.y_edges.iter_mut().for_each(|e| *e += dy);
    }

    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    pub fn counts(&self) -> &DMatrix<f64> {
        &self.counts
    }

    /// `(y bins, x bins)`.
    pub fn shape(&self) -> (usize, usize) {
        self.counts.shape()
    }

    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|c| *c == 0.0)
    }
}

#[cfg(test)]
mod histogram_test {
    use super::*;

    #[test]
    fn test_edges() {
        let h = Histogram2d::new((0.0, 1.0), 4, (-1.0, 1.0), 2);
        assert_eq!(h.x_edges(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(h.y_edges(), &[-1.0, 0.0, 1.0]);
        assert_eq!(h.shape(), (2, 4));
    }

    #[test]
    fn test_fill_edges_and_outliers() {
        let mut h = Histogram2d::new((0.0, 1.0), 4, (0.0, 1.0), 2);
        assert!(h.fill(0.0, 0.0));
        assert!(h.fill(0.25, 0.5));
        // the upper edge belongs to the last bin
        assert!(h.fill(1.0, 1.0));
        assert!(!h.fill(1.0001, 0.5));
        assert!(!h.fill(-0.1, 0.5));
        assert!(!h.fill(f64::NAN, 0.5));

        assert_eq!(h.counts()[(0, 0)], 1.0);
        assert_eq!(h.counts()[(1, 1)], 1.0);
        assert_eq!(h.counts()[(1, 3)], 1.0);
        assert_eq!(h.total(), 3.0);
    }

    #[test]
    fn test_flip_scale_shift() {
        let mut h = Histogram2d::new((0.0, 1.0), 1, (0.0, 3.0), 3);
        h.fill_all([(0.5, 0.5), (0.5, 0.6), (0.5, 2.5)]);
        h.flip_rows();
        assert_eq!(h.counts().column(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 2.0]);

        h.scale(0.5);
        assert_eq!(h.total(), 1.5);

        h.shift_y(10.0);
        assert_eq!(h.y_edges(), &[10.0, 11.0, 12.0, 13.0]);
        assert!(!h.is_zero());
    }
}
