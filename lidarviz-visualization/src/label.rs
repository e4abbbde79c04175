//! Text labels anchored in the world or on screen

use std::sync::Mutex;

use lidarviz_core::{rgba_from_slice, Error, Result, Rgba, DEFAULT_RGBA};
use nalgebra::Point3;

use crate::lock;

/// Where a label is attached, fixed when the label is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelAnchor {
    /// Follows a point in world coordinates
    World { position: Point3<f64> },
    /// Fixed in the viewport; `x, y` in `[0, 1]` from the top left corner
    Screen {
        x: f64,
        y: f64,
        align_right: bool,
        align_top: bool,
    },
}

/// Manages the state of a text label
#[derive(Debug)]
pub struct Label {
    state: Mutex<LabelFrame>,
}

impl Label {
    /// Label attached to a world position
    pub fn new_3d(text: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self::with_anchor(
            text.into(),
            LabelAnchor::World {
                position: Point3::new(x, y, z),
            },
        )
    }

    /// Label fixed in the viewport
    pub fn new_2d(text: impl Into<String>, x: f64, y: f64, align_right: bool, align_top: bool) -> Self {
        Self::with_anchor(
            text.into(),
            LabelAnchor::Screen {
                x,
                y,
                align_right,
                align_top,
            },
        )
    }

    fn with_anchor(text: String, anchor: LabelAnchor) -> Self {
        Self {
            state: Mutex::new(LabelFrame {
                text,
                anchor,
                scale: 1.0,
                rgba: [1.0, 1.0, 1.0, DEFAULT_RGBA[3]],
            }),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        lock(&self.state).text = text.into();
    }

    /// Move a world-anchored label
    pub fn set_position(&self, x: f64, y: f64, z: f64) -> Result<()> {
        let mut state = lock(&self.state);
        match &mut state.anchor {
            LabelAnchor::World { position } => {
                *position = Point3::new(x, y, z);
                Ok(())
            }
            LabelAnchor::Screen { .. } => Err(Error::KindMismatch(
                "3D position on a screen label, use set_position_2d".into(),
            )),
        }
    }

    /// Move a screen-anchored label
    pub fn set_position_2d(&self, x: f64, y: f64, align_right: bool, align_top: bool) -> Result<()> {
        let mut state = lock(&self.state);
        if let LabelAnchor::World { .. } = state.anchor {
            return Err(Error::KindMismatch(
                "2D position on a world label, use set_position".into(),
            ));
        }
        state.anchor = LabelAnchor::Screen {
            x,
            y,
            align_right,
            align_top,
        };
        Ok(())
    }

    pub fn set_scale(&self, scale: f32) {
        lock(&self.state).scale = scale;
    }

    /// Set the text color; missing components are taken from `(0, 0, 0, 1)`
    pub fn set_rgba(&self, rgba: &[f32]) -> Result<()> {
        let rgba = rgba_from_slice(rgba)?;
        lock(&self.state).rgba = rgba;
        Ok(())
    }

    pub fn text(&self) -> String {
        lock(&self.state).text.clone()
    }

    pub fn anchor(&self) -> LabelAnchor {
        lock(&self.state).anchor
    }

    pub fn is_3d(&self) -> bool {
        matches!(self.anchor(), LabelAnchor::World { .. })
    }

    pub fn snapshot(&self) -> LabelFrame {
        lock(&self.state).clone()
    }
}

/// Published state of a label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFrame {
    pub text: String,
    pub anchor: LabelAnchor,
    pub scale: f32,
    pub rgba: Rgba,
}
