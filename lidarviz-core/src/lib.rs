//! Core data structures for lidarviz
//!
//! This crate holds the pieces of the visualizer that do not depend on a
//! scene or a renderer: poses, color palettes, sensor geometry lookup tables
//! and the validation applied to every buffer handed to a scene object.

pub mod array;
pub mod color;
pub mod error;
pub mod palette;
pub mod sensor;
pub mod transform;

pub use array::*;
pub use color::*;
pub use error::*;
pub use palette::*;
pub use sensor::*;
pub use transform::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};

/// Version of the visualizer build
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
