//! Point cloud scene object
//!
//! A cloud holds `n` points grouped into `w` column poses: point `i` is moved
//! by column pose `i % w`, then by the cloud-level pose. For a 2048 x 64 lidar
//! frame there are `w = 2048` poses and `n = 131072` points, so a moving
//! sensor can be drawn with one pose per firing column while the whole cloud
//! is moved with a single matrix.
//!
//! Structured clouds precompute per-pixel direction and offset vectors from
//! the sensor geometry at construction, after which a frame update only needs
//! ranges. Unstructured clouds take raw xyz positions.

use std::fmt;
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use lidarviz_core::{
    check_ndim_in, row_major_slice, ArraySpec, Error, Layout, Palette, Pose, Result, SensorInfo, XyzLut,
};
use nalgebra::{Matrix4, Point3, Vector4};
use ndarray::{ArrayView, Dimension, Ix2};
use rayon::prelude::*;

use crate::lock;

const DEFAULT_POINT_SIZE: f32 = 2.0;

/// Per-point data handed to a renderer backend
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

/// How point positions are produced, fixed at construction
#[derive(Debug, Clone)]
pub enum CloudKind {
    /// Positions are supplied directly with [`Cloud::set_xyz`]
    Unstructured,
    /// Positions come from ranges and a precomputed lookup table
    Structured { rows: usize, lut: Arc<XyzLut> },
}

#[derive(Debug, Clone)]
struct CloudState {
    range: Arc<Vec<u32>>,
    key: Arc<Vec<f32>>,
    mask: Arc<Vec<f32>>,
    xyz: Option<Arc<Vec<[f32; 3]>>>,
    column_poses: Arc<Vec<Pose>>,
    pose: Pose,
    point_size: f32,
    palette: Arc<Palette>,
}

/// Manages the state of a point cloud
pub struct Cloud {
    n: usize,
    w: usize,
    kind: CloudKind,
    extrinsic: Pose,
    state: Mutex<CloudState>,
}

impl Cloud {
    /// Unstructured cloud with one pose per point; call [`Cloud::set_xyz`] to update
    pub fn new(n: usize) -> Result<Self> {
        Self::with_poses(n, n)
    }

    /// Unstructured cloud of `n` points sharing `w` column poses
    pub fn with_poses(n: usize, w: usize) -> Result<Self> {
        validate_counts(n, w)?;
        Ok(Self::build(n, w, CloudKind::Unstructured, Pose::identity()))
    }

    /// Structured cloud of `w` columns by `h` rows; call [`Cloud::set_range`] to update
    ///
    /// The lookup table must hold either `w * h` entries or a single row of `w`.
    pub fn structured(w: usize, h: usize, lut: Arc<XyzLut>, extrinsic: impl Into<Pose>) -> Result<Self> {
        let n = w.checked_mul(h).ok_or_else(|| {
            Error::ShapeMismatch(format!("A {} x {} cloud is too large", w, h))
        })?;
        validate_counts(n, w)?;
        if lut.len() != n && lut.len() != w {
            return Err(Error::SizeMismatch {
                expected: n,
                actual: lut.len(),
            });
        }
        Ok(Self::build(
            n,
            w,
            CloudKind::Structured { rows: h, lut },
            extrinsic.into(),
        ))
    }

    /// Structured cloud for a sensor
    pub fn from_sensor(info: &SensorInfo) -> Result<Self> {
        let lut = Arc::new(XyzLut::new(info)?);
        Self::structured(
            info.format.columns_per_frame,
            info.format.pixels_per_column,
            lut,
            info.extrinsic,
        )
    }

    fn build(n: usize, w: usize, kind: CloudKind, extrinsic: Pose) -> Self {
        let xyz = match kind {
            CloudKind::Unstructured => Some(Arc::new(vec![[0.0; 3]; n])),
            CloudKind::Structured { .. } => None,
        };
        Self {
            n,
            w,
            kind,
            extrinsic,
            state: Mutex::new(CloudState {
                range: Arc::new(vec![0; n]),
                key: Arc::new(vec![0.0; n]),
                mask: Arc::new(vec![0.0; 4 * n]),
                xyz,
                column_poses: Arc::new(vec![Pose::identity(); w]),
                pose: Pose::identity(),
                point_size: DEFAULT_POINT_SIZE,
                palette: Arc::new(Palette::default()),
            }),
        }
    }

    /// Number of points
    pub fn size(&self) -> usize {
        self.n
    }

    /// Number of column poses
    pub fn cols(&self) -> usize {
        self.w
    }

    pub fn kind(&self) -> &CloudKind {
        &self.kind
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.kind, CloudKind::Structured { .. })
    }

    pub fn extrinsic(&self) -> Pose {
        self.extrinsic
    }

    /// Set the range values, in millimetres, of a structured cloud
    ///
    /// Expects a C-contiguous 2D array of `n` elements, laid out rows by
    /// columns. Replaces any xyz override from [`Cloud::set_xyz`].
    pub fn set_range<D: Dimension>(&self, range: ArrayView<'_, u32, D>) -> Result<()> {
        if !self.is_structured() {
            return Err(Error::KindMismatch(
                "range requires a structured cloud, use set_xyz".into(),
            ));
        }
        ArraySpec::any()
            .size(self.n)
            .ndim(2)
            .layout(Layout::RowMajor)
            .check(&range)?;
        let values = row_major_slice(&range)?;

        let mut state = lock(&self.state);
        Arc::make_mut(&mut state.range).copy_from_slice(values);
        state.xyz = None;
        Ok(())
    }

    /// Set the key values used for coloring, preferably normalized to `[0, 1]`
    pub fn set_key<D: Dimension>(&self, key: ArrayView<'_, f32, D>) -> Result<()> {
        ArraySpec::any().size(self.n).layout(Layout::RowMajor).check(&key)?;
        let values = row_major_slice(&key)?;

        let mut state = lock(&self.state);
        Arc::make_mut(&mut state.key).copy_from_slice(values);
        Ok(())
    }

    /// Set the RGBA mask drawn over the key colors
    ///
    /// Expects a C-contiguous 2D or 3D array of `4n` elements.
    pub fn set_mask<D: Dimension>(&self, mask: ArrayView<'_, f32, D>) -> Result<()> {
        ArraySpec::any().size(self.n * 4).layout(Layout::RowMajor).check(&mask)?;
        check_ndim_in(&mask, &[2, 3])?;
        let values = row_major_slice(&mask)?;

        let mut state = lock(&self.state);
        Arc::make_mut(&mut state.mask).copy_from_slice(values);
        Ok(())
    }

    /// Set the XYZ positions of all points, in metres
    ///
    /// Accepts `3n` elements as a flat array where point `i` is at
    /// `(i, i + n, i + 2n)`, an `n x 3` array of points, or a `3 x n` array of
    /// coordinates. For a structured cloud the positions replace the
    /// range-derived ones until the next [`Cloud::set_range`].
    pub fn set_xyz<D: Dimension>(&self, xyz: ArrayView<'_, f32, D>) -> Result<()> {
        ArraySpec::any().size(self.n * 3).check(&xyz)?;
        check_ndim_in(&xyz, &[1, 2])?;
        let n = self.n;

        let points: Vec<[f32; 3]> = if xyz.ndim() == 1 {
            let flat: Vec<f32> = xyz.iter().copied().collect();
            (0..n).map(|i| [flat[i], flat[i + n], flat[i + 2 * n]]).collect()
        } else {
            let xyz = xyz
                .into_dimensionality::<Ix2>()
                .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
            match xyz.dim() {
                (rows, 3) if rows == n => xyz.rows().into_iter().map(|r| [r[0], r[1], r[2]]).collect(),
                (3, cols) if cols == n => (0..n).map(|i| [xyz[[0, i]], xyz[[1, i]], xyz[[2, i]]]).collect(),
                (rows, cols) => {
                    return Err(Error::ShapeMismatch(format!(
                        "Expected a {} x 3 or 3 x {} array, got {} x {}",
                        n, n, rows, cols
                    )))
                }
            }
        };

        let mut state = lock(&self.state);
        state.xyz = Some(Arc::new(points));
        Ok(())
    }

    /// Set the cloud-level pose, applied after the column poses
    pub fn set_pose(&self, pose: impl Into<Pose>) {
        lock(&self.state).pose = pose.into();
    }

    /// Set the per-column poses; exactly one pose per column is required
    pub fn set_column_poses(&self, poses: &[Pose]) -> Result<()> {
        if poses.len() != self.w {
            return Err(Error::SizeMismatch {
                expected: self.w,
                actual: poses.len(),
            });
        }
        let mut state = lock(&self.state);
        Arc::make_mut(&mut state.column_poses).copy_from_slice(poses);
        Ok(())
    }

    /// Set point size
    pub fn set_point_size(&self, size: f32) {
        lock(&self.state).point_size = size;
    }

    /// Set the color palette from a C-contiguous `N x 3` array
    pub fn set_palette<D: Dimension>(&self, palette: ArrayView<'_, f32, D>) -> Result<()> {
        let palette = Palette::from_array(palette)?;
        self.set_palette_table(palette);
        Ok(())
    }

    /// Set the color palette from an existing table, e.g. [`lidarviz_core::CALREF`]
    pub fn set_palette_table(&self, palette: Palette) {
        lock(&self.state).palette = Arc::new(palette);
    }

    /// Consistent copy of the current state; buffers are shared until the
    /// next write
    pub fn snapshot(&self) -> CloudFrame {
        let state = lock(&self.state).clone();
        CloudFrame {
            n: self.n,
            w: self.w,
            kind: self.kind.clone(),
            extrinsic: self.extrinsic,
            state,
        }
    }
}

impl fmt::Debug for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloud")
            .field("n", &self.n)
            .field("w", &self.w)
            .field("structured", &self.is_structured())
            .finish()
    }
}

fn validate_counts(n: usize, w: usize) -> Result<()> {
    if n == 0 || w == 0 {
        return Err(Error::ShapeMismatch("A cloud needs at least one point and one pose".into()));
    }
    if n % w != 0 {
        return Err(Error::ShapeMismatch(format!(
            "Point count {} is not divisible by pose count {}",
            n, w
        )));
    }
    Ok(())
}

/// Published state of a cloud as seen by a renderer
#[derive(Debug, Clone)]
pub struct CloudFrame {
    n: usize,
    w: usize,
    kind: CloudKind,
    extrinsic: Pose,
    state: CloudState,
}

impl CloudFrame {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn cols(&self) -> usize {
        self.w
    }

    pub fn pose(&self) -> Pose {
        self.state.pose
    }

    pub fn column_poses(&self) -> &[Pose] {
        &self.state.column_poses
    }

    pub fn point_size(&self) -> f32 {
        self.state.point_size
    }

    pub fn palette(&self) -> &Palette {
        &self.state.palette
    }

    pub fn range(&self) -> &[u32] {
        &self.state.range
    }

    pub fn key(&self) -> &[f32] {
        &self.state.key
    }

    pub fn mask(&self) -> &[f32] {
        &self.state.mask
    }

    /// True when positions come from an xyz buffer rather than ranges
    pub fn has_xyz(&self) -> bool {
        self.state.xyz.is_some()
    }

    /// Position of point `i` before any pose is applied
    pub fn local_point(&self, i: usize) -> [f32; 3] {
        match (&self.state.xyz, &self.kind) {
            (Some(xyz), _) => xyz[i],
            (None, CloudKind::Structured { lut, .. }) => lut.point(i, self.state.range[i]),
            (None, CloudKind::Unstructured) => [0.0; 3],
        }
    }

    /// Full transform applied to points of column `col`
    pub fn column_transform(&self, col: usize) -> Matrix4<f64> {
        (self.state.pose * self.state.column_poses[col] * self.extrinsic).matrix
    }

    /// World position of point `i`
    pub fn world_point(&self, i: usize) -> Point3<f64> {
        let p = self.local_point(i);
        let m = self.column_transform(i % self.w);
        Point3::from_homogeneous(m * Vector4::new(p[0] as f64, p[1] as f64, p[2] as f64, 1.0))
            .unwrap_or_else(Point3::origin)
    }

    /// World positions of all points
    pub fn world_points(&self) -> Vec<[f32; 3]> {
        let transforms: Vec<Matrix4<f64>> = (0..self.w).map(|c| self.column_transform(c)).collect();
        (0..self.n)
            .into_par_iter()
            .map(|i| {
                let p = self.local_point(i);
                let v = transforms[i % self.w] * Vector4::new(p[0] as f64, p[1] as f64, p[2] as f64, 1.0);
                [v.x as f32, v.y as f32, v.z as f32]
            })
            .collect()
    }

    /// Palette color of point `i` with its mask blended over
    pub fn color(&self, i: usize) -> [f32; 4] {
        let base = self.state.palette.color(self.state.key[i]);
        let m = &self.state.mask[4 * i..4 * i + 4];
        let a = m[3].clamp(0.0, 1.0);
        [
            base[0] * (1.0 - a) + m[0] * a,
            base[1] * (1.0 - a) + m[1] * a,
            base[2] * (1.0 - a) + m[2] * a,
            1.0,
        ]
    }

    /// Renderer-ready vertices
    pub fn vertices(&self) -> Vec<PointVertex> {
        let size = self.state.point_size;
        self.world_points()
            .into_par_iter()
            .enumerate()
            .map(|(i, position)| PointVertex {
                position,
                size,
                color: self.color(i),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, Array1, Array2, Array3, ShapeBuilder};

    #[test]
    fn test_construction_modes() {
        let cloud = Cloud::new(10).unwrap();
        assert_eq!((cloud.size(), cloud.cols()), (10, 10));
        assert!(!cloud.is_structured());

        assert!(Cloud::with_poses(10, 3).is_err());
        assert!(Cloud::with_poses(0, 1).is_err());

        let info = SensorInfo::synthetic(8, 4, 20.0);
        let cloud = Cloud::from_sensor(&info).unwrap();
        assert_eq!((cloud.size(), cloud.cols()), (32, 8));
        assert!(cloud.is_structured());
    }

    #[test]
    fn test_structured_rejects_wrong_lut() {
        let info = SensorInfo::synthetic(8, 4, 20.0);
        let lut = Arc::new(XyzLut::new(&info).unwrap());
        assert!(Cloud::structured(4, 4, Arc::clone(&lut), Pose::identity()).is_err());
        assert!(Cloud::structured(8, 4, Arc::clone(&lut), Pose::identity()).is_ok());
        assert!(matches!(
            Cloud::structured(usize::MAX, 2, lut, Pose::identity()),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_range_requires_row_major_2d() {
        let info = SensorInfo::synthetic(4, 2, 20.0);
        let cloud = Cloud::from_sensor(&info).unwrap();

        let flat = Array1::<u32>::from_elem(8, 1000);
        assert!(matches!(cloud.set_range(flat.view()), Err(Error::DimensionMismatch { .. })));

        let fortran = Array2::<u32>::from_elem((2, 4).f(), 1000);
        assert!(matches!(cloud.set_range(fortran.view()), Err(Error::LayoutMismatch { .. })));

        let short = Array2::<u32>::from_elem((2, 3), 1000);
        assert!(matches!(cloud.set_range(short.view()), Err(Error::SizeMismatch { .. })));

        assert!(cloud.snapshot().range().iter().all(|r| *r == 0));

        let good = Array2::<u32>::from_elem((2, 4), 1000);
        cloud.set_range(good.view()).unwrap();
        assert!(cloud.snapshot().range().iter().all(|r| *r == 1000));
    }

    #[test]
    fn test_range_on_unstructured_is_kind_mismatch() {
        let cloud = Cloud::new(4).unwrap();
        let range = Array2::<u32>::zeros((2, 2));
        assert!(matches!(cloud.set_range(range.view()), Err(Error::KindMismatch(_))));
    }

    #[test]
    fn test_failed_key_leaves_state() {
        let cloud = Cloud::new(3).unwrap();
        cloud.set_key(arr1(&[0.1f32, 0.2, 0.3]).view()).unwrap();
        assert!(cloud.set_key(arr1(&[1.0f32, 1.0]).view()).is_err());
        assert_eq!(cloud.snapshot().key(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_mask_dimensions() {
        let cloud = Cloud::new(2).unwrap();
        assert!(cloud.set_mask(Array1::<f32>::zeros(8).view()).is_err());
        assert!(cloud.set_mask(Array2::<f32>::zeros((2, 4)).view()).is_ok());
        assert!(cloud.set_mask(Array3::<f32>::zeros((1, 2, 4)).view()).is_ok());
        assert!(matches!(
            cloud.set_mask(Array2::<f32>::zeros((2, 3)).view()),
            Err(Error::SizeMismatch { expected: 8, actual: 6 })
        ));
    }

    #[test]
    fn test_xyz_layouts_agree() {
        let points = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let planar = arr1(&[1.0f32, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let per_point = Array2::from_shape_fn((2, 3), |(i, k)| points[i][k]);
        let per_axis = per_point.t().to_owned();

        for view in [planar.view().into_dyn(), per_point.view().into_dyn(), per_axis.view().into_dyn()] {
            let cloud = Cloud::new(2).unwrap();
            cloud.set_xyz(view).unwrap();
            let frame = cloud.snapshot();
            assert_eq!(frame.local_point(0), points[0]);
            assert_eq!(frame.local_point(1), points[1]);
        }

        let cloud = Cloud::new(2).unwrap();
        assert!(cloud.set_xyz(Array1::<f32>::zeros(5).view()).is_err());
        assert!(cloud.set_xyz(Array3::<f32>::zeros((1, 2, 3)).view()).is_err());
    }

    #[test]
    fn test_xyz_overrides_until_next_range() {
        let info = SensorInfo::synthetic(4, 1, 0.0);
        let cloud = Cloud::from_sensor(&info).unwrap();
        cloud.set_range(Array2::from_elem((1, 4), 2000u32).view()).unwrap();
        assert_relative_eq!(cloud.snapshot().local_point(0)[0], 2.0, epsilon = 1e-5);

        cloud.set_xyz(Array2::from_elem((4, 3), 7.0f32).view()).unwrap();
        assert_eq!(cloud.snapshot().local_point(0), [7.0; 3]);

        cloud.set_range(Array2::from_elem((1, 4), 1000u32).view()).unwrap();
        let frame = cloud.snapshot();
        assert!(!frame.has_xyz());
        assert_relative_eq!(frame.local_point(0)[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_column_pose_then_cloud_pose() {
        let cloud = Cloud::with_poses(6, 3).unwrap();
        cloud.set_xyz(Array2::<f32>::zeros((6, 3)).view()).unwrap();
        let poses = [
            Pose::translation(1.0, 0.0, 0.0),
            Pose::translation(0.0, 1.0, 0.0),
            Pose::translation(0.0, 0.0, 1.0),
        ];
        cloud.set_column_poses(&poses).unwrap();
        cloud.set_pose(Pose::rotation_z(std::f64::consts::FRAC_PI_2));
        assert!(cloud.set_column_poses(&poses[..2]).is_err());

        let frame = cloud.snapshot();
        let world = frame.world_points();
        for i in 0..6 {
            let expected = frame.pose().transform_point(&poses[i % 3].transform_point(&Point3::origin()));
            assert_relative_eq!(frame.world_point(i), expected, epsilon = 1e-9);
            assert_relative_eq!(world[i][0] as f64, expected.x, epsilon = 1e-6);
            assert_relative_eq!(world[i][1] as f64, expected.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_extrinsic_applied_before_column_pose() {
        let mut info = SensorInfo::synthetic(2, 1, 0.0);
        info.extrinsic = Pose::translation(0.0, 0.0, 2.0).matrix;
        let cloud = Cloud::from_sensor(&info).unwrap();
        cloud.set_range(Array2::from_elem((1, 2), 1000u32).view()).unwrap();
        cloud.set_column_poses(&[Pose::scaling(2.0, 2.0, 2.0), Pose::identity()]).unwrap();

        let p = cloud.snapshot().world_point(0);
        assert_relative_eq!(p, Point3::new(2.0, 0.0, 4.0), epsilon = 1e-5);
    }

    #[test]
    fn test_snapshot_is_copy_on_write() {
        let cloud = Cloud::new(2).unwrap();
        let before = cloud.snapshot();
        cloud.set_key(arr1(&[1.0f32, 1.0]).view()).unwrap();
        assert_eq!(before.key(), &[0.0, 0.0]);
        assert_eq!(cloud.snapshot().key(), &[1.0, 1.0]);
    }

    #[test]
    fn test_color_blends_mask() {
        let cloud = Cloud::new(2).unwrap();
        cloud
            .set_palette(Array2::from_shape_vec((2, 3), vec![0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap().view())
            .unwrap();
        cloud.set_key(arr1(&[1.0f32, 0.0]).view()).unwrap();
        let mask = Array2::from_shape_vec((2, 4), vec![0.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5]).unwrap();
        cloud.set_mask(mask.view()).unwrap();

        let frame = cloud.snapshot();
        assert_eq!(frame.color(0), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(frame.color(1), [0.5, 0.0, 0.0, 1.0]);

        assert!(cloud.set_palette(Array2::<f32>::zeros((3, 4)).view()).is_err());
        assert_eq!(cloud.snapshot().palette().len(), 2);
    }
}
