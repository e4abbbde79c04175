//! Validation of buffers handed to scene-object setters
//!
//! Setters accept `ndarray` views so that element count, dimensionality and
//! memory layout can all be checked before any object state is touched.

use std::fmt;

use ndarray::{ArrayView, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Required memory layout of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// C order: the last axis varies fastest
    RowMajor,
    /// Fortran order: the first axis varies fastest
    ColumnMajor,
    /// Read through logical indexing, any strides accepted
    Any,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::RowMajor => write!(f, "C_CONTIGUOUS"),
            Layout::ColumnMajor => write!(f, "F_CONTIGUOUS"),
            Layout::Any => write!(f, "strided"),
        }
    }
}

/// Expected properties of a buffer; `None` leaves a property unchecked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub size: Option<usize>,
    pub ndim: Option<usize>,
    pub layout: Layout,
}

impl ArraySpec {
    /// Accept anything
    pub const fn any() -> Self {
        Self {
            size: None,
            ndim: None,
            layout: Layout::Any,
        }
    }

    /// Require an exact element count
    pub const fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Require an exact number of dimensions
    pub const fn ndim(mut self, ndim: usize) -> Self {
        self.ndim = Some(ndim);
        self
    }

    /// Require a memory layout
    pub const fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Check a view against these requirements
    pub fn check<A, D: Dimension>(&self, view: &ArrayView<'_, A, D>) -> Result<()> {
        if let Some(expected) = self.size {
            if view.len() != expected {
                return Err(Error::SizeMismatch {
                    expected,
                    actual: view.len(),
                });
            }
        }

        if let Some(expected) = self.ndim {
            if view.ndim() != expected {
                return Err(Error::DimensionMismatch {
                    expected: expected.to_string(),
                    actual: view.ndim(),
                });
            }
        }

        let layout_ok = match self.layout {
            Layout::RowMajor => view.is_standard_layout(),
            Layout::ColumnMajor => view.t().is_standard_layout(),
            Layout::Any => true,
        };
        if !layout_ok {
            return Err(Error::LayoutMismatch {
                expected: self.layout,
            });
        }

        Ok(())
    }
}

/// Borrow the elements of a row-major view as a flat slice, in logical order
pub fn row_major_slice<'a, A, D: Dimension>(view: &ArrayView<'a, A, D>) -> Result<&'a [A]> {
    // `to_slice` keeps the view's lifetime, unlike `as_slice`
    view.to_slice().ok_or(Error::LayoutMismatch {
        expected: Layout::RowMajor,
    })
}

/// Require one of several dimensionalities
pub fn check_ndim_in<A, D: Dimension>(view: &ArrayView<'_, A, D>, allowed: &[usize]) -> Result<()> {
    if allowed.contains(&view.ndim()) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(Error::DimensionMismatch {
        expected,
        actual: view.ndim(),
    })
}
