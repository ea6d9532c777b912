use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Explicit integration scheme applied to every cell each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrator {
    Euler,
    /// Velocity Verlet; midpoint-averaged velocities, better energy
    /// behavior at the same cost.
    Verlet,
}

impl Integrator {
    pub fn step(self, c: &mut Cell, dt: f32) {
        if !c.movement_enabled {
            return;
        }
        c.prev_position = c.position;
        let inertia = c.moment_of_inertia();
        match self {
            Integrator::Euler => {
                c.velocity += c.force * (dt / c.mass);
                c.position += c.velocity * dt;
                c.angular_velocity += c.torque * (dt / inertia);
                c.orientation_rotation = c.orientation_rotation.integrate(c.angular_velocity * dt);
            }
            Integrator::Verlet => {
                let old_v = c.velocity;
                c.velocity += c.force * (dt / c.mass);
                c.position += (c.velocity + old_v) * (dt * 0.5);
                let old_w = c.angular_velocity;
                c.angular_velocity += c.torque * (dt / inertia);
                c.orientation_rotation = c
                    .orientation_rotation
                    .integrate((c.angular_velocity + old_w) * (dt * 0.5));
            }
        }
        c.update_current_orientation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use ultraviolet::Vec3;

    #[test]
    fn constant_force_accelerates_the_cell() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        c.force = Vec3::new(1.0, 0.0, 0.0);
        Integrator::Euler.step(&mut c, 1.0);
        assert!((c.velocity.x - 1.0).abs() < 1e-6);
        assert!((c.position.x - 1.0).abs() < 1e-6);
        assert_eq!(c.prev_position.x, 0.0);
    }

    #[test]
    fn verlet_advances_with_midpoint_velocity() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        c.force = Vec3::new(1.0, 0.0, 0.0);
        Integrator::Verlet.step(&mut c, 1.0);
        // From rest: v1 = 1, position advances by (0 + 1) / 2.
        assert!((c.position.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn disabled_movement_freezes_the_cell() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        c.movement_enabled = false;
        c.force = Vec3::new(100.0, 0.0, 0.0);
        Integrator::Euler.step(&mut c, 1.0);
        assert_eq!(c.position, Vec3::zero());
    }

    #[test]
    fn torque_turns_the_orientation() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        c.torque = Vec3::new(0.0, 0.0, 1.0) * c.moment_of_inertia();
        Integrator::Euler.step(&mut c, 1.0);
        // One radian of spin around Z after one unit step.
        assert!((c.angular_velocity.z - 1.0).abs() < 1e-5);
        assert!((c.orientation.x.y - 1f32.sin()).abs() < 1e-4);
    }
}
