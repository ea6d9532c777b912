use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use super::{Basis, Quaternion, VecExt};

/// Axis-angle rotation. The axis is kept unit length and the angle is
/// compressed into [0, pi] after every composition, so two rotations with
/// the same effect have the same representation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Rotation {
    pub axis: Vec3,
    pub angle: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            axis: Vec3::new(0.0, 1.0, 0.0),
            angle: 0.0,
        }
    }
}

impl Rotation {
    pub fn new(axis: Vec3, angle: f32) -> Self {
        Self { axis, angle }
    }

    /// Shortest rotation carrying `v0` onto `v1` (both assumed unit length).
    pub fn between(v0: Vec3, v1: Vec3) -> Self {
        let angle = v0.dot(v1).clamp(-1.0, 1.0).acos();
        let mut cross = v0.cross(v1);
        if cross.mag_sq() == 0.0 {
            cross = Vec3::new(0.0, 1.0, 0.0);
        }
        Self::new(cross.normalized(), angle)
    }

    /// Rotation carrying the basis (`x0`, `y0`) onto (`x1`, `y1`): first the
    /// X axes are aligned, then the images of Y.
    pub fn between_bases(x0: Vec3, y0: Vec3, x1: Vec3, y1: Vec3) -> Self {
        let q0 = Quaternion::between(x0, x1);
        let y_mid = q0.rotate(y0).normalized_or(Vec3::new(0.0, 1.0, 0.0));
        let mut q = Quaternion::between(y_mid, y1.normalized_or(Vec3::new(0.0, 1.0, 0.0))).mul(&q0);
        q.normalize();
        q.to_axis_angle()
    }

    pub fn from_bases(b0: &Basis, b1: &Basis) -> Self {
        Self::between_bases(b0.x, b0.y, b1.x, b1.y)
    }

    /// Composition: applies `self` first, then `other`.
    pub fn then(&self, other: &Rotation) -> Rotation {
        let q = Quaternion::from_axis_angle(other.angle, other.axis)
            .mul(&Quaternion::from_axis_angle(self.angle, self.axis));
        q.to_axis_angle().compressed()
    }

    pub fn inverted(&self) -> Rotation {
        Rotation::new(-self.axis, self.angle)
    }

    /// `self` with its axis carried along by `offset`; the angle is kept.
    pub fn rotated_by(&self, offset: &Rotation) -> Rotation {
        Rotation::new(self.axis.rotated(offset), self.angle)
    }

    /// Integrates an angular velocity over one step: `w * dt` encodes the
    /// rotation increment as axis * angle.
    pub fn integrate(&self, angular_delta: Vec3) -> Rotation {
        let d_angle = angular_delta.mag();
        let axis = if d_angle > 0.0 {
            angular_delta / d_angle
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        self.then(&Rotation::new(axis, d_angle)).compressed()
    }

    /// Folds the angle back into [0, pi] by flipping the axis.
    pub fn compressed(mut self) -> Rotation {
        if self.angle > std::f32::consts::PI {
            if self.angle > std::f32::consts::TAU {
                self.angle %= std::f32::consts::TAU;
            }
            self.axis = -self.axis;
            self.angle = std::f32::consts::TAU - self.angle;
        }
        self
    }
}
