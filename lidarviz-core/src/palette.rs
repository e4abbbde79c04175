//! Color palettes for key-based point coloring
//!
//! A palette is an ordered `N x 3` table of RGB triples. Two built-in tables,
//! [`SPEZIA`] and [`CALREF`], are generated once on first use and are
//! read-only afterwards.

use std::sync::LazyLock;

use ndarray::{ArrayView, Dimension, Ix2};

use crate::array::{row_major_slice, ArraySpec, Layout};
use crate::error::{Error, Result};

/// Number of entries in [`SPEZIA`]
pub const SPEZIA_N: usize = 256;

/// Number of entries in [`CALREF`]
pub const CALREF_N: usize = 256;

/// General purpose palette used by default for cloud keys
pub static SPEZIA: LazyLock<Palette> = LazyLock::new(|| {
    Palette::interpolated(
        SPEZIA_N,
        &[
            (0.0, [0.04, 0.05, 0.35]),
            (0.2, [0.06, 0.45, 0.90]),
            (0.4, [0.15, 0.80, 0.60]),
            (0.6, [0.65, 0.90, 0.20]),
            (0.8, [0.98, 0.60, 0.10]),
            (1.0, [0.95, 0.15, 0.25]),
        ],
    )
});

/// Palette for calibrated reflectivity keys
pub static CALREF: LazyLock<Palette> = LazyLock::new(|| {
    Palette::interpolated(
        CALREF_N,
        &[
            (0.0, [0.12, 0.05, 0.25]),
            (0.25, [0.25, 0.20, 0.70]),
            (0.5, [0.10, 0.65, 0.75]),
            (0.75, [0.55, 0.90, 0.35]),
            (1.0, [1.00, 0.95, 0.75]),
        ],
    )
});

/// An ordered, non-empty table of RGB colors
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<[f32; 3]>,
}

impl Palette {
    /// Create a palette from RGB triples
    pub fn new(colors: Vec<[f32; 3]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::ShapeMismatch("Expected a N x 3 array with N > 0".into()));
        }
        Ok(Self { colors })
    }

    /// Create a palette from a row-major `N x 3` array
    pub fn from_array<D: Dimension>(array: ArrayView<'_, f32, D>) -> Result<Self> {
        ArraySpec::any().ndim(2).layout(Layout::RowMajor).check(&array)?;
        let array = array
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        if array.ncols() != 3 {
            return Err(Error::ShapeMismatch(format!(
                "Expected a N x 3 array, got {} x {}",
                array.nrows(),
                array.ncols()
            )));
        }
        let flat = row_major_slice(&array)?;
        Self::new(bytemuck::cast_slice::<f32, [f32; 3]>(flat).to_vec())
    }

    /// Linearly interpolate `n` entries between `(position, color)` stops
    fn interpolated(n: usize, stops: &[(f32, [f32; 3])]) -> Self {
        let colors = (0..n)
            .map(|i| {
                let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
                let upper = stops
                    .iter()
                    .position(|(p, _)| *p >= t)
                    .unwrap_or(stops.len() - 1)
                    .max(1);
                let (p0, c0) = stops[upper - 1];
                let (p1, c1) = stops[upper];
                let s = if p1 > p0 { ((t - p0) / (p1 - p0)).clamp(0.0, 1.0) } else { 0.0 };
                [
                    c0[0] + (c1[0] - c0[0]) * s,
                    c0[1] + (c1[1] - c0[1]) * s,
                    c0[2] + (c1[2] - c0[2]) * s,
                ]
            })
            .collect();
        Self { colors }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false: palettes are never empty
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The RGB triples
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Flat `3 * N` view of the table
    pub fn as_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Look up the color for a key, nominally in `[0, 1]`
    ///
    /// Keys outside the range are clamped; NaN maps to the first entry.
    pub fn color(&self, key: f32) -> [f32; 3] {
        let last = self.colors.len() - 1;
        let idx = if key.is_nan() {
            0
        } else {
            (key.clamp(0.0, 1.0) * last as f32).round() as usize
        };
        self.colors[idx.min(last)]
    }
}

impl Default for Palette {
    fn default() -> Self {
        SPEZIA.clone()
    }
}
