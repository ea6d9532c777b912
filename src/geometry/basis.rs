use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use super::{Rotation, VecExt};

/// Local orthonormal frame of an oriented body. Only X and Y are stored;
/// Z is derived on demand.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Basis {
    pub x: Vec3,
    pub y: Vec3,
}

impl Default for Basis {
    fn default() -> Self {
        Self {
            x: Vec3::new(1.0, 0.0, 0.0),
            y: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

impl Basis {
    pub fn new(x: Vec3, y: Vec3) -> Self {
        Self { x, y }
    }

    pub fn z(&self) -> Vec3 {
        self.x.cross(self.y).normalized()
    }

    /// Recomputes the frame as the world frame carried by `r`, discarding
    /// accumulated drift.
    pub fn update_from_rotation(&mut self, r: &Rotation) {
        self.x = Vec3::new(1.0, 0.0, 0.0).rotated(r).normalized();
        self.y = Vec3::new(0.0, 1.0, 0.0).rotated(r).normalized();
    }

    pub fn rotated(&self, r: &Rotation) -> Basis {
        Basis::new(self.x.rotated(r).normalized(), self.y.rotated(r).normalized())
    }
}
