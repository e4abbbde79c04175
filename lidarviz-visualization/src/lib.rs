//! Scene objects, view control and the frame loop for lidarviz
//!
//! A producer builds [`Cloud`], [`Image`], [`Cuboid`] and [`Label`] objects,
//! adds them to a [`PointViz`] (or any [`VizHandle`] cloned from it), mutates
//! them from any thread and calls `update()` to publish. The thread owning the
//! `PointViz` runs frames against the published state.

pub mod backend;
pub mod camera;
pub mod cloud;
pub mod controls;
pub mod cuboid;
pub mod gate;
pub mod handlers;
pub mod image;
pub mod input;
pub mod label;
pub mod renderer;
pub mod scene;
pub mod target;
pub mod viz;

pub use backend::*;
pub use camera::*;
pub use cloud::*;
pub use controls::*;
pub use cuboid::*;
pub use gate::*;
pub use handlers::*;
pub use self::image::*;
pub use input::*;
pub use label::*;
pub use renderer::*;
pub use scene::*;
pub use target::*;
pub use viz::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a panicking thread poisoned it
///
/// Everything guarded in this crate is plain data that stays valid across a
/// panic, so poisoning is not treated as an error.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
