//! Camera target overlay

use serde::{Deserialize, Serialize};

const MIN_RING_SIZE: i32 = -2;
const MAX_RING_SIZE: i32 = 3;

/// State of the distance rings drawn around the camera target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDisplay {
    rings_enabled: bool,
    ring_size: i32,
}

impl TargetDisplay {
    pub fn new() -> Self {
        Self {
            rings_enabled: false,
            ring_size: 1,
        }
    }

    /// Enable or disable distance ring display
    pub fn enable_rings(&mut self, state: bool) {
        self.rings_enabled = state;
    }

    /// Set the distance between rings to `10^n` metres
    pub fn set_ring_size(&mut self, n: i32) {
        self.ring_size = n.clamp(MIN_RING_SIZE, MAX_RING_SIZE);
    }

    pub fn rings_enabled(&self) -> bool {
        self.rings_enabled
    }

    pub fn ring_size(&self) -> i32 {
        self.ring_size
    }

    /// Spacing between consecutive rings, metres
    pub fn ring_spacing(&self) -> f64 {
        10f64.powi(self.ring_size)
    }
}

impl Default for TargetDisplay {
    fn default() -> Self {
        Self::new()
    }
}
