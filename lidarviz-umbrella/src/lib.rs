//! # lidarviz
//!
//! Real-time scene-graph visualization for dense spinning-lidar point clouds.
//!
//! This is the umbrella crate that provides convenient access to all lidarviz
//! functionality. Use the individual crates for more granular control over
//! dependencies.
//!
//! ## Features
//!
//! - **Core**: poses, palettes, sensor geometry and buffer validation
//! - **Visualization**: scene objects, camera, input handlers and the frame loop
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use lidarviz::prelude::*;
//! use ndarray::Array2;
//!
//! let mut viz = PointViz::new(VizConfig::default(), HeadlessBackend::default());
//! add_default_controls(&viz.handle());
//!
//! let info = SensorInfo::synthetic(64, 16, 30.0);
//! let cloud = Arc::new(Cloud::from_sensor(&info).unwrap());
//! viz.add(&cloud);
//!
//! cloud.set_range(Array2::from_elem((16, 64), 10_000u32).view()).unwrap();
//! viz.update();
//! viz.run_once().unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: enables visualization
//! - `visualization`: scene objects and the frame loop

// Re-export core functionality
pub use lidarviz_core::*;

#[cfg(feature = "visualization")]
pub use lidarviz_visualization as visualization;

/// Convenient imports for common use cases
pub mod prelude {
    pub use lidarviz_core::*;

    #[cfg(feature = "visualization")]
    pub use lidarviz_visualization::*;
}
