//! Homogeneous pose transforms

use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use ndarray::{ArrayView, Dimension, Ix2};
use serde::{Deserialize, Serialize};

use crate::array::ArraySpec;
use crate::error::{Error, Result};

/// A 4x4 homogeneous transform, stored column-major
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub matrix: Matrix4<f64>,
}

impl Pose {
    /// Create an identity pose
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vector3::new(x, y, z)),
        }
    }

    /// Create a rotation about the z axis
    pub fn rotation_z(radians: f64) -> Self {
        Self {
            matrix: Rotation3::from_axis_angle(&Vector3::z_axis(), radians).to_homogeneous(),
        }
    }

    /// Create a non-uniform scaling
    pub fn scaling(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z)),
        }
    }

    /// Build a pose from 16 values in column-major order
    pub fn from_column_slice(values: &[f64]) -> Result<Self> {
        if values.len() != 16 {
            return Err(Error::SizeMismatch {
                expected: 16,
                actual: values.len(),
            });
        }
        Ok(Self {
            matrix: Matrix4::from_column_slice(values),
        })
    }

    /// Build a pose from a 4x4 array
    ///
    /// The array is read by logical index, so both C and Fortran ordered
    /// inputs describe the same matrix.
    pub fn from_array<D: Dimension>(array: ArrayView<'_, f64, D>) -> Result<Self> {
        ArraySpec::any().size(16).ndim(2).check(&array)?;
        let array = array
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        if array.dim() != (4, 4) {
            return Err(Error::ShapeMismatch(format!(
                "Expected a 4 x 4 array, got {} x {}",
                array.nrows(),
                array.ncols()
            )));
        }
        Ok(Self {
            matrix: Matrix4::from_fn(|r, c| array[[r, c]]),
        })
    }

    /// Apply the pose to a point
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Compose this pose with another, `self` applied last
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse pose
    pub fn inverse(self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// Translation component
    pub fn translation_part(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Copy out the 16 values in column-major order
    pub fn to_column_array(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.matrix.as_slice());
        out
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Pose {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f64>> for Pose {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

impl From<Pose> for Matrix4<f64> {
    fn from(pose: Pose) -> Self {
        pose.matrix
    }
}
