// Cell-mesh contacts: one bounce spring towards the face projection plus a
// zero-rest anchor spring resisting sliding along the surface.

use std::collections::BTreeMap;

use ultraviolet::Vec3;

use crate::cell::{Cell, CellId, PhysicsBody};
use crate::config::{ANCHOR_SPRING_DAMP_RATIO, ANCHOR_SPRING_STIFFNESS};
use crate::connection::spring_step;
use crate::spring::Spring;
use crate::utils::damping_from_ratio;

/// Fixed point in space acting as a spring endpoint.
#[derive(Clone, Copy, Debug)]
pub struct SpaceAnchor {
    pub position: Vec3,
}

impl PhysicsBody for SpaceAnchor {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn velocity(&self) -> Vec3 {
        Vec3::zero()
    }
    fn set_position(&mut self, _p: Vec3) {}
    fn set_velocity(&mut self, _v: Vec3) {}
    fn receive_force(&mut self, _intensity: f32, _direction: Vec3, _compressive: bool) {}
    fn receive_force_vec(&mut self, _f: Vec3) {}
}

/// Spring endpoint pinned to a mesh face.
#[derive(Clone, Copy, Debug)]
pub struct ModelAnchor {
    pub position: Vec3,
    pub face: usize,
}

impl PhysicsBody for ModelAnchor {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn velocity(&self) -> Vec3 {
        Vec3::zero()
    }
    fn set_position(&mut self, _p: Vec3) {}
    fn set_velocity(&mut self, _v: Vec3) {}
    fn receive_force(&mut self, _intensity: f32, _direction: Vec3, _compressive: bool) {}
    fn receive_force_vec(&mut self, _f: Vec3) {}
}

/// Contacts, grouped by model name then cell id. Both maps are ordered so
/// force application order is reproducible.
pub type ContactMap = BTreeMap<String, BTreeMap<CellId, Vec<CellModelContact>>>;

#[derive(Clone, Debug)]
pub struct CellModelContact {
    pub anchor_point: SpaceAnchor,
    pub anchor_spring: Spring,
    pub bounce_point: ModelAnchor,
    pub bounce_spring: Spring,
    /// Swept at the end of detection if no fresh projection matched.
    pub dirty: bool,
}

impl CellModelContact {
    pub fn new(cell: &Cell, projection: Vec3, face: usize, rest_length: f32) -> Self {
        let stiffness = cell.membrane.stiffness;
        let mut contact = Self {
            anchor_point: SpaceAnchor {
                position: cell.position,
            },
            anchor_spring: Spring::new(
                ANCHOR_SPRING_STIFFNESS,
                damping_from_ratio(ANCHOR_SPRING_DAMP_RATIO, cell.mass, ANCHOR_SPRING_STIFFNESS),
                0.0,
            ),
            bounce_point: ModelAnchor {
                position: projection,
                face,
            },
            bounce_spring: Spring::new(
                stiffness,
                damping_from_ratio(cell.membrane.damp_ratio, cell.mass, stiffness),
                rest_length,
            ),
            dirty: false,
        };
        // Both springs start at their measured length so the first step
        // sees zero spring velocity and no damping impulse.
        contact
            .anchor_spring
            .update_length_direction(contact.anchor_point.position, cell.position);
        contact.anchor_spring.prev_length = contact.anchor_spring.length;
        contact
            .bounce_spring
            .update_length_direction(projection, cell.position);
        contact.bounce_spring.prev_length = contact.bounce_spring.length;
        contact
    }

    /// Re-targets an existing contact onto a fresh projection of the cell.
    /// The anchor point slides so it stays level with the cell (orthogonal
    /// to the bounce direction) and within one radius of the center.
    pub fn refresh(&mut self, cell: &Cell, projection: Vec3, face: usize, direction: Vec3) {
        self.dirty = false;
        self.bounce_point.position = projection;
        self.bounce_point.face = face;
        if self.anchor_spring.length > 0.0 {
            let anchor_dir = self.anchor_spring.direction;
            let mut crossp = direction.cross(direction.cross(anchor_dir));
            if crossp.mag_sq() > cell.membrane.radius() * 0.02 {
                crossp.normalize();
                let proj_length = (self.anchor_point.position - cell.position)
                    .dot(crossp)
                    .min(cell.membrane.radius());
                self.anchor_point.position = cell.position + proj_length * crossp;
            }
        }
    }

    pub fn compute_forces(&mut self, cell: &mut Cell, dt: f32) {
        spring_step(&mut self.anchor_spring, &mut self.anchor_point, cell, dt);
        spring_step(&mut self.bounce_spring, &mut self.bounce_point, cell, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn bounce_spring_pushes_the_cell_off_the_surface() {
        let config = SimConfig::default();
        let mut cell = Cell::new(Vec3::new(0.0, 30.0, 0.0), &config);
        // Wall projection right below the cell, rest length larger than the
        // current distance: the cell is too close.
        let mut contact =
            CellModelContact::new(&cell, Vec3::zero(), 0, 0.8 * cell.membrane.radius());
        contact.anchor_point.position = cell.position;
        contact.compute_forces(&mut cell, config.dt);
        assert!(cell.force.y > 0.0, "cell should be pushed away from the wall");
    }

    #[test]
    fn anchor_spring_resists_sliding() {
        let config = SimConfig::default();
        let mut cell = Cell::new(Vec3::new(0.0, 30.0, 0.0), &config);
        let mut contact =
            CellModelContact::new(&cell, Vec3::zero(), 0, 30.0);
        // Cell slid sideways away from its anchor.
        cell.position.x += 10.0;
        contact.compute_forces(&mut cell, config.dt);
        assert!(cell.force.x < 0.0, "anchor should pull the cell back");
    }

    #[test]
    fn fresh_contact_starts_without_a_damping_impulse() {
        let config = SimConfig::default();
        let mut cell = Cell::new(Vec3::new(0.0, 30.0, 0.0), &config);
        // Stretched at birth: distance 30, rest 24. The first step must see
        // the spring term only, (-k * 6) / 2 = -135 with k = 45.
        let mut contact = CellModelContact::new(&cell, Vec3::zero(), 0, 24.0);
        contact.compute_forces(&mut cell, config.dt);
        assert!(
            (cell.force.y + 135.0).abs() < 1e-3,
            "expected the bare spring force, got {}",
            cell.force.y
        );
    }

    #[test]
    fn refresh_clears_dirty_and_moves_the_bounce_point() {
        let config = SimConfig::default();
        let cell = Cell::new(Vec3::new(0.0, 30.0, 0.0), &config);
        let mut contact = CellModelContact::new(&cell, Vec3::zero(), 0, 30.0);
        contact.dirty = true;
        let p = Vec3::new(1.0, 0.0, 0.0);
        contact.refresh(&cell, p, 3, Vec3::new(0.0, -1.0, 0.0));
        assert!(!contact.dirty);
        assert_eq!(contact.bounce_point.face, 3);
        assert_eq!(contact.bounce_point.position.x, 1.0);
    }
}
