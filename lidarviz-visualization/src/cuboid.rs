//! Wireframe cuboid scene object

use std::sync::Mutex;

use lidarviz_core::{rgba_from_slice, Pose, Result, Rgba};
use nalgebra::Point3;

use crate::lock;

/// Vertex index pairs of the twelve cube edges, see [`CuboidFrame::corners`]
pub const CUBOID_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 3),
    (3, 2),
    (2, 0),
    (4, 5),
    (5, 7),
    (7, 6),
    (6, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A unit cube centered at the origin, placed by a pose
#[derive(Debug)]
pub struct Cuboid {
    state: Mutex<CuboidFrame>,
}

impl Cuboid {
    /// Create a cuboid; `rgba` may have fewer than four components
    pub fn new(pose: impl Into<Pose>, rgba: &[f32]) -> Result<Self> {
        let rgba = rgba_from_slice(rgba)?;
        Ok(Self {
            state: Mutex::new(CuboidFrame {
                transform: pose.into(),
                rgba,
            }),
        })
    }

    pub fn set_transform(&self, pose: impl Into<Pose>) {
        lock(&self.state).transform = pose.into();
    }

    /// Set the color; missing components are taken from `(0, 0, 0, 1)`
    pub fn set_rgba(&self, rgba: &[f32]) -> Result<()> {
        let rgba = rgba_from_slice(rgba)?;
        lock(&self.state).rgba = rgba;
        Ok(())
    }

    pub fn transform(&self) -> Pose {
        lock(&self.state).transform
    }

    pub fn rgba(&self) -> Rgba {
        lock(&self.state).rgba
    }

    pub fn snapshot(&self) -> CuboidFrame {
        *lock(&self.state)
    }
}

/// Published state of a cuboid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuboidFrame {
    pub transform: Pose,
    pub rgba: Rgba,
}

impl CuboidFrame {
    /// World positions of the eight corners; bit 0 of the index selects +x,
    /// bit 1 +y and bit 2 +z
    pub fn corners(&self) -> [Point3<f64>; 8] {
        std::array::from_fn(|i| {
            let local = Point3::new(
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            );
            self.transform.transform_point(&local)
        })
    }
}
