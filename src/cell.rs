// Cell state: a movable, orientable point mass wrapped by a membrane.
//
// Cells are plain data owned by the `World`; identity is carried by a
// `CellId` handle, never by pointers, so the containers stay free to
// reorganize their storage.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use ultraviolet::Vec3;

use crate::config::SimConfig;
use crate::geometry::{Basis, Rotation};
use crate::membrane::Membrane;
use crate::utils::hsv_to_rgb;

/// Stable cell handle, assigned by the owning world in creation order.
pub type CellId = u64;

/// Spring endpoint surface: anything with a position and a velocity that
/// can absorb forces. Fixed anchor points implement it with no-op setters.
pub trait PhysicsBody {
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn set_position(&mut self, p: Vec3);
    fn set_velocity(&mut self, v: Vec3);
    /// Force along `direction`. `compressive` feeds the pressure readout.
    fn receive_force(&mut self, intensity: f32, direction: Vec3, compressive: bool);
    fn receive_force_vec(&mut self, f: Vec3);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub position: Vec3,
    pub prev_position: Vec3,
    pub velocity: Vec3,
    pub force: Vec3,
    ext_force: Vec3,
    pub mass: f32,
    pub base_mass: f32,
    /// Signed sum of compressive force intensities, feeds pressure.
    pub total_force: f32,
    pub movement_enabled: bool,

    pub angular_velocity: Vec3,
    pub torque: Vec3,
    ext_torque: Vec3,
    pub orientation: Basis,
    pub orientation_rotation: Rotation,

    pub membrane: Membrane,
    /// Ids of currently connected cells. Kept in sync by the world's
    /// connection store.
    pub connected_cells: SmallVec<[CellId; 8]>,
    dead: bool,
    pub color: [f32; 3],
}

impl Cell {
    pub fn new(position: Vec3, config: &SimConfig) -> Self {
        Self {
            id: 0,
            position,
            prev_position: position,
            velocity: Vec3::zero(),
            force: Vec3::zero(),
            ext_force: Vec3::zero(),
            mass: config.default_mass,
            base_mass: config.default_mass,
            total_force: 0.0,
            movement_enabled: true,
            angular_velocity: Vec3::zero(),
            torque: Vec3::zero(),
            ext_torque: Vec3::zero(),
            orientation: Basis::default(),
            orientation_rotation: Rotation::default(),
            membrane: Membrane::new(config),
            connected_cells: SmallVec::new(),
            dead: false,
            color: [0.75, 0.12, 0.07],
        }
    }

    /// Daughter-cell constructor: same membrane parameters, translated
    /// position, fresh dynamic state. Both the parent and the daughter are
    /// expected to be reset to the base radius by the caller.
    pub fn divided_from(&self, translation: Vec3) -> Self {
        Self {
            id: 0,
            position: self.position + translation,
            prev_position: self.position + translation,
            velocity: Vec3::zero(),
            force: Vec3::zero(),
            ext_force: Vec3::zero(),
            mass: self.mass,
            base_mass: self.base_mass,
            total_force: 0.0,
            movement_enabled: true,
            angular_velocity: Vec3::zero(),
            torque: Vec3::zero(),
            ext_torque: Vec3::zero(),
            orientation: Basis::default(),
            orientation_rotation: Rotation::default(),
            membrane: self.membrane.divided(),
            connected_cells: SmallVec::new(),
            dead: false,
            color: self.color,
        }
    }

    /// Grows (or shrinks) by `qtty`, a fraction of the base volume. Mass
    /// follows the relative volume.
    pub fn grow(&mut self, qtty: f32) {
        let rv = self.relative_volume() + qtty;
        self.membrane.set_volume(self.membrane.base_volume() * rv);
        self.mass = self.base_mass * rv;
    }

    /// Flags the cell for removal at the end of the current step.
    pub fn die(&mut self) {
        self.dead = true;
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn relative_volume(&self) -> f32 {
        self.membrane.volume() / self.membrane.base_volume()
    }

    pub fn moment_of_inertia(&self) -> f32 {
        self.membrane.moment_of_inertia(self.mass)
    }

    pub fn bounding_radius(&self) -> f32 {
        self.membrane.bounding_radius()
    }

    /// Pressure squashed into [0, 1], with 0.5 at equilibrium.
    pub fn normalized_pressure(&self) -> f32 {
        let p = self.membrane.pressure();
        let sign = if p >= 0.0 { 1.0 } else { -1.0 };
        0.5 + sign * 0.5 * (1.0 - (-(60.0 * p).abs()).exp())
    }

    pub fn set_color_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.color = [r, g, b];
    }

    pub fn set_color_hsv(&mut self, h: f32, s: f32, v: f32) {
        let (r, g, b) = hsv_to_rgb(h, s, v);
        self.color = [r, g, b];
    }

    pub fn receive_torque(&mut self, t: Vec3) {
        self.torque += t;
    }

    pub fn receive_external_force(&mut self, f: Vec3) {
        self.ext_force += f;
    }

    pub fn receive_external_torque(&mut self, t: Vec3) {
        self.ext_torque += t;
    }

    /// Folds accumulated external contributions into this step's force and
    /// torque, then clears them.
    pub fn apply_and_reset_external(&mut self) {
        self.force += self.ext_force;
        self.torque += self.ext_torque;
        self.ext_force = Vec3::zero();
        self.ext_torque = Vec3::zero();
    }

    pub fn reset_forces(&mut self) {
        self.force = Vec3::zero();
        self.torque = Vec3::zero();
        self.total_force = 0.0;
    }

    pub fn update_current_orientation(&mut self) {
        self.orientation.update_from_rotation(&self.orientation_rotation);
    }
}

impl PhysicsBody for Cell {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_position(&mut self, p: Vec3) {
        self.position = p;
    }

    fn set_velocity(&mut self, v: Vec3) {
        self.velocity = v;
    }

    fn receive_force(&mut self, intensity: f32, direction: Vec3, compressive: bool) {
        self.force += direction * intensity;
        self.total_force += if compressive { intensity } else { -intensity };
    }

    fn receive_force_vec(&mut self, f: Vec3) {
        self.force += f;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_scales_volume_and_mass_together() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        let v0 = c.membrane.volume();
        c.grow(0.5);
        assert!((c.membrane.volume() / v0 - 1.5).abs() < 1e-4);
        assert!((c.mass / c.base_mass - 1.5).abs() < 1e-4);
    }

    #[test]
    fn division_copies_membrane_parameters_and_translates() {
        let config = SimConfig::default();
        let mut parent = Cell::new(Vec3::new(1.0, 2.0, 3.0), &config);
        parent.velocity = Vec3::new(9.0, 0.0, 0.0);
        let d = parent.divided_from(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(d.position.x, 6.0);
        assert_eq!(d.velocity, Vec3::zero());
        assert_eq!(d.membrane.radius(), parent.membrane.base_radius());
        assert!(!d.is_dead());
    }

    #[test]
    fn compressive_forces_raise_total_force() {
        let config = SimConfig::default();
        let mut c = Cell::new(Vec3::zero(), &config);
        c.receive_force(2.0, Vec3::new(1.0, 0.0, 0.0), true);
        c.receive_force(0.5, Vec3::new(-1.0, 0.0, 0.0), false);
        assert!((c.total_force - 1.5).abs() < 1e-6);
        assert!((c.force.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn normalized_pressure_is_half_at_rest() {
        let config = SimConfig::default();
        let c = Cell::new(Vec3::zero(), &config);
        assert!((c.normalized_pressure() - 0.5).abs() < 1e-6);
    }
}
