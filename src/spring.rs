// Linear springs and angular joints, the two primitives every connection
// in the engine is built from.

use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use crate::geometry::{Rotation, VecExt};

/// Classic linear spring between two points.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spring {
    pub k: f32,
    pub c: f32,
    pub rest_length: f32,
    pub length: f32,
    pub prev_length: f32,
    /// Below `min_length_ratio * rest_length` the spring switches to a
    /// positional anti-tunneling correction.
    pub min_length_ratio: f32,
    /// Unit direction from endpoint 0 to endpoint 1.
    pub direction: Vec3,
}

impl Spring {
    pub fn new(k: f32, c: f32, rest_length: f32) -> Self {
        Self {
            k,
            c,
            rest_length,
            length: rest_length,
            prev_length: rest_length,
            min_length_ratio: crate::config::MIN_SPRING_LENGTH_RATIO,
            direction: Vec3::zero(),
        }
    }

    pub fn update_length_direction(&mut self, p0: Vec3, p1: Vec3) {
        self.direction = p1 - p0;
        self.length = self.direction.mag();
        if self.length > 0.0 {
            self.direction /= self.length;
        }
    }

    pub fn set_rest_length(&mut self, l: f32) {
        self.rest_length = l;
    }
}

/// Angular joint, usable for flexure (torque and restoring force) or
/// torsion (torque only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Joint {
    pub k: f32,
    pub current_k: f32,
    pub c: f32,
    /// Yield angle: beyond it the joint's reference rotation gives way.
    pub max_angle: f32,
    /// Rotation from the owner's frame to the joint frame.
    pub r: Rotation,
    pub delta: Rotation,
    pub prev_delta: Rotation,
    pub direction: Vec3,
    pub target: Vec3,
}

impl Joint {
    pub fn new(k: f32, c: f32, max_angle: f32) -> Self {
        Self {
            k,
            current_k: k,
            c,
            max_angle,
            r: Rotation::default(),
            delta: Rotation::default(),
            prev_delta: Rotation::default(),
            direction: Vec3::zero(),
            target: Vec3::zero(),
        }
    }

    /// Recomputes the joint direction: reference vector `v` carried by the
    /// joint frame, itself carried by the owner's current rotation.
    pub fn update_direction(&mut self, v: Vec3, owner_rotation: &Rotation) {
        self.direction = v.rotated(&self.r.rotated_by(owner_rotation));
    }

    pub fn update_delta(&mut self) {
        self.delta = Rotation::between(self.direction, self.target);
    }

    pub fn set_current_k_coef(&mut self, coef: f32) {
        self.current_k = self.k * coef;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spring_direction_is_unit_from_first_to_second() {
        let mut s = Spring::new(10.0, 1.0, 5.0);
        s.update_length_direction(Vec3::new(1.0, 0.0, 0.0), Vec3::new(4.0, 4.0, 0.0));
        assert!((s.length - 5.0).abs() < 1e-6);
        assert!((s.direction - Vec3::new(0.6, 0.8, 0.0)).mag() < 1e-6);
    }

    #[test]
    fn coincident_endpoints_leave_direction_untouched() {
        let mut s = Spring::new(10.0, 1.0, 5.0);
        let p = Vec3::new(2.0, 2.0, 2.0);
        s.update_length_direction(p, p);
        assert_eq!(s.length, 0.0);
        assert!(!s.direction.x.is_nan());
    }

    #[test]
    fn joint_delta_measures_angle_to_target() {
        let mut j = Joint::new(1.0, 0.0, 1.0);
        j.direction = Vec3::new(1.0, 0.0, 0.0);
        j.target = Vec3::new(0.0, 1.0, 0.0);
        j.update_delta();
        assert!((j.delta.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }
}
