//! Spinning lidar geometry and the precomputed per-pixel lookup table
//!
//! A lidar frame is `w` columns (one per encoder position) by `h` rows (one
//! per beam). Every pixel's Cartesian position is `direction * range + offset`,
//! where direction and offset depend only on the sensor calibration. [`XyzLut`]
//! computes them once so that a frame update only has to marshal ranges.

use std::f64::consts::PI;

use nalgebra::{Matrix4, Vector3};
use ndarray::{ArrayView, Dimension, Ix2};
use serde::{Deserialize, Serialize};

use crate::array::ArraySpec;
use crate::error::{Error, Result};

/// Ranges are reported in millimetres, positions are produced in metres
pub const RANGE_UNIT: f64 = 0.001;

/// Dimensions of a lidar frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFormat {
    pub columns_per_frame: usize,
    pub pixels_per_column: usize,
}

/// Calibration needed to turn ranges into points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub format: DataFormat,
    /// Elevation of each beam, degrees
    pub beam_altitude_angles: Vec<f64>,
    /// Azimuth offset of each beam relative to the encoder, degrees
    pub beam_azimuth_angles: Vec<f64>,
    /// Distance between the lidar origin and the beam origin, millimetres
    pub lidar_origin_to_beam_origin_mm: f64,
    /// Lidar frame to sensor frame, translation in millimetres
    #[serde(default = "identity")]
    pub lidar_to_sensor_transform: Matrix4<f64>,
    /// Sensor frame to vehicle/world frame, translation in metres
    #[serde(default = "identity")]
    pub extrinsic: Matrix4<f64>,
}

fn identity() -> Matrix4<f64> {
    Matrix4::identity()
}

impl SensorInfo {
    /// Parse sensor metadata from JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let info: SensorInfo = serde_json::from_str(text)?;
        info.validate()?;
        Ok(info)
    }

    /// Evenly spaced beams spanning +/- `fov_deg / 2`, no azimuth staggering
    pub fn synthetic(columns_per_frame: usize, pixels_per_column: usize, fov_deg: f64) -> Self {
        let beam_altitude_angles = (0..pixels_per_column)
            .map(|i| {
                if pixels_per_column > 1 {
                    fov_deg / 2.0 - fov_deg * i as f64 / (pixels_per_column - 1) as f64
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            format: DataFormat {
                columns_per_frame,
                pixels_per_column,
            },
            beam_altitude_angles,
            beam_azimuth_angles: vec![0.0; pixels_per_column],
            lidar_origin_to_beam_origin_mm: 0.0,
            lidar_to_sensor_transform: Matrix4::identity(),
            extrinsic: Matrix4::identity(),
        }
    }

    /// Total number of pixels in a frame
    pub fn pixel_count(&self) -> usize {
        self.format.columns_per_frame * self.format.pixels_per_column
    }

    /// Check that the beam tables match the frame format
    pub fn validate(&self) -> Result<()> {
        let DataFormat {
            columns_per_frame: w,
            pixels_per_column: h,
        } = self.format;
        if w == 0 || h == 0 {
            return Err(Error::ShapeMismatch(format!("Invalid frame format {} x {}", w, h)));
        }
        for angles in [&self.beam_altitude_angles, &self.beam_azimuth_angles] {
            if angles.len() != h {
                return Err(Error::SizeMismatch {
                    expected: h,
                    actual: angles.len(),
                });
            }
        }
        Ok(())
    }
}

/// Precomputed per-pixel direction and offset vectors
///
/// Entries are indexed `row * w + col`. A table may also hold a single row of
/// `w` entries, which is then reused for every row (`i mod len`).
#[derive(Debug, Clone, PartialEq)]
pub struct XyzLut {
    direction: Vec<[f32; 3]>,
    offset: Vec<[f32; 3]>,
}

impl XyzLut {
    /// Compute the table for a sensor
    pub fn new(info: &SensorInfo) -> Result<Self> {
        info.validate()?;
        let w = info.format.columns_per_frame;
        let h = info.format.pixels_per_column;
        let beam_to_lidar = info.lidar_origin_to_beam_origin_mm;

        let rotation = info.lidar_to_sensor_transform.fixed_view::<3, 3>(0, 0).into_owned();
        let translation: Vector3<f64> = info.lidar_to_sensor_transform.fixed_view::<3, 1>(0, 3).into_owned();

        let mut direction = Vec::with_capacity(w * h);
        let mut offset = Vec::with_capacity(w * h);

        for row in 0..h {
            let azimuth = -info.beam_azimuth_angles[row] * PI / 180.0;
            let altitude = info.beam_altitude_angles[row] * PI / 180.0;
            for col in 0..w {
                let encoder = 2.0 * PI * (1.0 - col as f64 / w as f64);

                let dir = Vector3::new(
                    (encoder + azimuth).cos() * altitude.cos(),
                    (encoder + azimuth).sin() * altitude.cos(),
                    altitude.sin(),
                );
                let beam_origin = Vector3::new(encoder.cos() * beam_to_lidar, encoder.sin() * beam_to_lidar, 0.0);
                let off = beam_origin - dir * beam_to_lidar;

                let dir = rotation * dir * RANGE_UNIT;
                let off = (rotation * off + translation) * RANGE_UNIT;

                direction.push([dir.x as f32, dir.y as f32, dir.z as f32]);
                offset.push([off.x as f32, off.y as f32, off.z as f32]);
            }
        }

        Ok(Self { direction, offset })
    }

    /// Build a table from `M x 3` direction and offset arrays
    pub fn from_arrays<D: Dimension>(
        direction: ArrayView<'_, f32, D>,
        offset: ArrayView<'_, f32, D>,
    ) -> Result<Self> {
        let direction = rows_of_three(direction)?;
        let offset = rows_of_three(offset)?;
        if direction.len() != offset.len() {
            return Err(Error::SizeMismatch {
                expected: direction.len() * 3,
                actual: offset.len() * 3,
            });
        }
        Ok(Self { direction, offset })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.direction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direction.is_empty()
    }

    pub fn directions(&self) -> &[[f32; 3]] {
        &self.direction
    }

    pub fn offsets(&self) -> &[[f32; 3]] {
        &self.offset
    }

    /// Sensor-frame position of point `i` at a range given in millimetres
    #[inline]
    pub fn point(&self, i: usize, range: u32) -> [f32; 3] {
        let k = i % self.direction.len();
        let d = self.direction[k];
        let o = self.offset[k];
        let r = range as f32;
        [d[0] * r + o[0], d[1] * r + o[1], d[2] * r + o[2]]
    }
}

fn rows_of_three<D: Dimension>(array: ArrayView<'_, f32, D>) -> Result<Vec<[f32; 3]>> {
    ArraySpec::any().ndim(2).check(&array)?;
    let array = array
        .into_dimensionality::<Ix2>()
        .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
    if array.ncols() != 3 || array.nrows() == 0 {
        return Err(Error::ShapeMismatch(format!(
            "Expected a N x 3 array, got {} x {}",
            array.nrows(),
            array.ncols()
        )));
    }
    Ok(array.rows().into_iter().map(|r| [r[0], r[1], r[2]]).collect())
}
