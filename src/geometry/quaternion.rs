use ultraviolet::Vec3;

use super::{Rotation, VecExt};

/// Unit quaternion used internally to compose axis-angle rotations.
/// Public API stays in `Rotation` form.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Quaternion {
    pub v: Vec3,
    pub w: f32,
}

impl Quaternion {
    pub fn from_axis_angle(angle: f32, axis: Vec3) -> Self {
        let half = angle * 0.5;
        Self {
            v: axis * half.sin(),
            w: half.cos(),
        }
    }

    /// Shortest-arc rotation carrying `from` onto `to`. Antiparallel inputs
    /// get a half-turn around an arbitrary orthogonal axis.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        let a = from.normalized_or(Vec3::new(0.0, 1.0, 0.0));
        let b = to.normalized_or(Vec3::new(0.0, 1.0, 0.0));
        let sc = a.dot(b).clamp(-1.0, 1.0);
        if sc < -0.9999 {
            Self::from_axis_angle(std::f32::consts::PI, a.ortho().normalized())
        } else {
            let mut q = Self {
                v: a.cross(b),
                w: 1.0 + sc,
            };
            q.normalize();
            q
        }
    }

    pub fn normalize(&mut self) {
        let mag = (self.w * self.w + self.v.mag_sq()).sqrt();
        // w is clamped so acos stays defined after float drift.
        self.w = (self.w / mag).min(1.0);
        self.v /= mag;
    }

    pub fn to_axis_angle(mut self) -> Rotation {
        self.normalize();
        let s = (1.0 - self.w * self.w).sqrt();
        let axis = if s == 0.0 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            self.v / s
        };
        Rotation::new(axis, 2.0 * self.w.acos())
    }

    pub fn rotate(&self, p: Vec3) -> Vec3 {
        let vcv = 2.0 * self.v.cross(p);
        p + self.w * vcv + self.v.cross(vcv)
    }

    /// Hamilton product `self * rhs` (applies `rhs` first).
    pub fn mul(&self, q2: &Quaternion) -> Quaternion {
        Quaternion {
            v: Vec3::new(
                self.v.x * q2.w + self.v.y * q2.v.z - self.v.z * q2.v.y + self.w * q2.v.x,
                -self.v.x * q2.v.z + self.v.y * q2.w + self.v.z * q2.v.x + self.w * q2.v.y,
                self.v.x * q2.v.y - self.v.y * q2.v.x + self.v.z * q2.w + self.w * q2.v.z,
            ),
            w: -self.v.x * q2.v.x - self.v.y * q2.v.y - self.v.z * q2.v.z + self.w * q2.w,
        }
    }
}
