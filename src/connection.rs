// Cell-cell connections: one linear spring between the two centers plus a
// flexure and a torsion joint per endpoint. Connections are owned by a
// store keyed on the ordered id pair; cells only keep id back-references.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use crate::cell::{Cell, CellId, PhysicsBody};
use crate::config::MAX_TORSION_INCLINATION;
use crate::geometry::{Basis, Rotation, VecExt};
use crate::spring::{Joint, Spring};
use crate::utils::ordered_pair;

/// One step of a linear spring between two bodies.
///
/// Under heavy compression (below the spring's min length) the force law is
/// replaced by a positional push-apart plus an exchange of the velocity
/// components along the axis, which kills the oscillation a huge restoring
/// force would otherwise start.
pub fn spring_step<B0, B1>(sc: &mut Spring, b0: &mut B0, b1: &mut B1, dt: f32)
where
    B0: PhysicsBody,
    B1: PhysicsBody,
{
    sc.update_length_direction(b0.position(), b1.position());
    let x = sc.length - sc.rest_length;
    let min_length = sc.min_length_ratio * sc.rest_length;
    if sc.length < min_length {
        let d = min_length - sc.length;
        let axial0 = b0.velocity().dot(sc.direction) * sc.direction;
        let tangent0 = b0.velocity() - axial0;
        let axial1 = b1.velocity().dot(sc.direction) * sc.direction;
        let tangent1 = b1.velocity() - axial1;
        b0.set_position(b0.position() - sc.direction * (d * 0.5));
        b1.set_position(b1.position() + sc.direction * (d * 0.5));
        b0.set_velocity(tangent0 + axial1);
        b1.set_velocity(tangent1 + axial0);
        sc.length = min_length;
    }
    let compression = x < 0.0;
    let v = sc.length - sc.prev_length;
    let f = (-sc.k * x - sc.c * v / dt) / 2.0;
    b0.receive_force(f, -sc.direction, compression);
    b1.receive_force(f, sc.direction, compression);
    sc.prev_length = sc.length;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellCellConnection {
    /// Ordered pair of connected cell ids, `cells.0 < cells.1`.
    pub cells: (CellId, CellId),
    pub spring: Spring,
    pub flex: (Joint, Joint),
    pub torsion: (Joint, Joint),
}

impl CellCellConnection {
    pub fn new(c0: &Cell, c1: &Cell, spring: Spring, joints: (Joint, Joint)) -> Self {
        debug_assert!(c0.id < c1.id);
        let mut conn = Self {
            cells: (c0.id, c1.id),
            spring,
            flex: joints.clone(),
            torsion: joints,
        };
        conn.spring.update_length_direction(c0.position, c1.position);
        conn.spring.prev_length = conn.spring.length;
        conn.init_joints(c0, c1);
        conn
    }

    // Joint reference rotations go from each cell's frame to the connection
    // frame (cell frame -> world frame -> connection frame).
    fn init_joints(&mut self, c0: &Cell, c1: &Cell) {
        let dir = self.spring.direction;
        let ortho = dir.ortho();
        self.flex.0.r = Rotation::from_bases(&Basis::default(), &Basis::new(dir, ortho))
            .then(&c0.orientation_rotation.inverted());
        self.flex.1.r = Rotation::from_bases(&Basis::default(), &Basis::new(-dir, ortho))
            .then(&c1.orientation_rotation.inverted());
        self.torsion.0.r = self.flex.0.r;
        self.torsion.1.r = self.flex.1.r;

        self.flex.0.update_direction(c0.orientation.x, &c0.orientation_rotation);
        self.flex.1.update_direction(c1.orientation.x, &c1.orientation_rotation);
        self.torsion.0.update_direction(c0.orientation.y, &c0.orientation_rotation);
        self.torsion.1.update_direction(c1.orientation.y, &c1.orientation_rotation);
    }

    pub fn other(&self, id: CellId) -> CellId {
        if id == self.cells.0 {
            self.cells.1
        } else {
            self.cells.0
        }
    }

    pub fn update_length_direction(&mut self, c0: &Cell, c1: &Cell) {
        self.spring.update_length_direction(c0.position, c1.position);
    }

    /// Direction of the connection as seen from `id`: pointing away from it.
    pub fn direction_from(&self, id: CellId) -> Vec3 {
        if id == self.cells.0 {
            self.spring.direction
        } else {
            -self.spring.direction
        }
    }

    /// Scales the angular stiffness of all four joints by the current
    /// contact surface.
    pub fn set_contact_surface_coef(&mut self, coef: f32) {
        self.flex.0.set_current_k_coef(coef);
        self.flex.1.set_current_k_coef(coef);
        self.torsion.0.set_current_k_coef(coef);
        self.torsion.1.set_current_k_coef(coef);
    }

    /// Spring force plus flexure/torsion torques for one step. `c0` and
    /// `c1` must be the cells named by `self.cells`, in order.
    pub fn compute_forces(&mut self, c0: &mut Cell, c1: &mut Cell, dt: f32) {
        spring_step(&mut self.spring, c0, c1, dt);

        self.flex.0.update_direction(c0.orientation.x, &c0.orientation_rotation);
        self.flex.1.update_direction(c1.orientation.x, &c1.orientation_rotation);
        self.torsion.0.update_direction(c0.orientation.y, &c0.orientation_rotation);
        self.torsion.1.update_direction(c1.orientation.y, &c1.orientation_rotation);

        self.update_flex_torsion(c0, c1, true);
        self.update_flex_torsion(c1, c0, false);
    }

    fn update_flex_torsion(&mut self, node: &mut Cell, other: &mut Cell, first: bool) {
        let sign = if first { 1.0 } else { -1.0 };
        let sc_direction = self.spring.direction;
        let sc_length = self.spring.length;

        // Flexure: restoring torque on the node plus a pair of opposite
        // forces bending the connection back onto its axis.
        {
            let fj = if first { &mut self.flex.0 } else { &mut self.flex.1 };
            fj.target = sc_direction * sign;
            fj.update_delta();
            if fj.delta.angle > fj.max_angle {
                // Yield: the reference rotation gives way by the excess
                // angle, permanently.
                let dif = fj.delta.angle - fj.max_angle;
                let slip = Rotation::new(fj.delta.axis, dif);
                fj.direction = fj.direction.rotated(&slip);
                fj.r = Rotation::from_bases(
                    &Basis::default(),
                    &Basis::new(fj.direction, fj.direction.ortho()),
                )
                .then(&node.orientation_rotation.inverted());
            }
            let torque =
                fj.current_k * fj.delta.angle + fj.c * (fj.delta.angle - fj.prev_delta.angle);
            let torque_vec = fj.delta.axis * torque;
            let ortho = sc_direction.ortho_to(fj.delta.axis).normalized();
            let force = sign * ortho * torque / sc_length;
            node.receive_force_vec(-force);
            other.receive_force_vec(force);
            node.receive_torque(torque_vec);
            fj.prev_delta = fj.delta;
        }

        // Torsion: keeps the two Y references aligned with each other,
        // torque only.
        {
            let other_torsion_dir = if first {
                self.torsion.1.direction
            } else {
                self.torsion.0.direction
            };
            let tj = if first { &mut self.torsion.0 } else { &mut self.torsion.1 };
            let scalar = tj.direction.dot(sc_direction);
            if scalar.abs() > MAX_TORSION_INCLINATION {
                // Too inclined relative to the axis: rebuild the reference
                // rotation from scratch.
                tj.r = Rotation::from_bases(
                    &Basis::default(),
                    &Basis::new(sc_direction, tj.direction),
                )
                .then(&node.orientation_rotation.inverted());
            } else {
                // Cheap re-orthogonalization.
                tj.direction = tj.direction.normalized() - scalar * sc_direction;
            }
            tj.target = other_torsion_dir;
            tj.update_delta();
            let torque = tj.current_k * tj.delta.angle;
            node.receive_torque(tj.delta.axis * torque);
        }
    }
}

/// Container-owned connection storage with O(1) pair lookup. Iteration
/// follows creation order.
#[derive(Default, Debug)]
pub struct ConnectionStore {
    items: Vec<CellCellConnection>,
    by_pair: HashMap<(CellId, CellId), usize>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, a: CellId, b: CellId) -> bool {
        self.by_pair.contains_key(&ordered_pair(a, b))
    }

    pub fn insert(&mut self, conn: CellCellConnection) {
        self.by_pair.insert(conn.cells, self.items.len());
        self.items.push(conn);
    }

    pub fn get(&self, a: CellId, b: CellId) -> Option<&CellCellConnection> {
        self.by_pair
            .get(&ordered_pair(a, b))
            .map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, a: CellId, b: CellId) -> Option<&mut CellCellConnection> {
        let idx = *self.by_pair.get(&ordered_pair(a, b))?;
        Some(&mut self.items[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellCellConnection> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CellCellConnection> {
        self.items.iter_mut()
    }

    /// Removes the given pairs (already ordered), preserving the creation
    /// order of the remaining connections.
    pub fn remove_pairs(&mut self, pairs: &[(CellId, CellId)]) {
        if pairs.is_empty() {
            return;
        }
        let doomed: std::collections::HashSet<_> = pairs.iter().copied().collect();
        self.items.retain(|c| !doomed.contains(&c.cells));
        self.reindex();
    }

    /// Removes every connection involving `id`; returns the other endpoints.
    pub fn remove_all_of(&mut self, id: CellId) -> Vec<CellId> {
        let mut others = Vec::new();
        self.items.retain(|c| {
            if c.cells.0 == id || c.cells.1 == id {
                others.push(c.other(id));
                false
            } else {
                true
            }
        });
        self.reindex();
        others
    }

    fn reindex(&mut self) {
        self.by_pair.clear();
        for (i, c) in self.items.iter().enumerate() {
            self.by_pair.insert(c.cells, i);
        }
    }
}
