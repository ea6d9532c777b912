// World: owns every cell, connection, contact and mesh, and runs the
// fixed-timestep pipeline. All storage is container-owned and id-keyed;
// nothing in the engine holds a pointer into another container.
//
// Step order (one `update` call):
//   1. per-cell stats and force reset, external forces folded in
//   2. world forces (viscous drag, gravity)
//   3. cell-cell connection forces, stale connections dropped
//   4. cell-mesh contact forces
//   5. membrane shape reaction and integration
//   6. connection and contact detection on the fresh positions
//   7. behaviors (growth, division, death flags)
//   8. dead cell cleanup, queued births added

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use ultraviolet::Vec3;

use crate::behavior::{Behavior, Inert};
use crate::cell::{Cell, CellId, PhysicsBody};
use crate::config::{MIN_MODEL_CONTACT_SIMILARITY, SimConfig};
use crate::connection::{CellCellConnection, ConnectionStore};
use crate::contact::{CellModelContact, ContactMap};
use crate::geometry::{projection_in_triangle, VecExt};
use crate::grid::SpatialGrid;
use crate::membrane::NeighborLink;
use crate::model::Model;
use crate::profile_scope;
use crate::spring::{Joint, Spring};
use crate::utils::{damping_from_ratio, mix, ordered_pair};


pub struct World<B: Behavior = Inert> {
    pub config: SimConfig,
    pub behavior: B,
    cells: Vec<Cell>,
    index: HashMap<CellId, usize>,
    next_id: CellId,
    pub connections: ConnectionStore,
    pub contacts: ContactMap,
    models: BTreeMap<String, Model>,
    cell_grid: SpatialGrid<CellId>,
    model_grid: SpatialGrid<(u32, u32)>,
    /// Grid model index -> model name, frozen at the last grid rebuild.
    model_names: Vec<String>,
    cell_cell_collisions: bool,
    cell_model_collisions: bool,
    frame: u64,
}

impl World<Inert> {
    pub fn new(config: SimConfig) -> Self {
        Self::with_behavior(config, Inert)
    }
}

impl<B: Behavior> World<B> {
    pub fn with_behavior(config: SimConfig, behavior: B) -> Self {
        let cell_grid = SpatialGrid::new(config.cell_grid_size);
        let model_grid = SpatialGrid::new(config.model_grid_size);
        Self {
            config,
            behavior,
            cells: Vec::new(),
            index: HashMap::new(),
            next_id: 0,
            connections: ConnectionStore::new(),
            contacts: ContactMap::new(),
            models: BTreeMap::new(),
            cell_grid,
            model_grid,
            model_names: Vec::new(),
            cell_cell_collisions: true,
            cell_model_collisions: true,
            frame: 0,
        }
    }

    /*
     * accessors
     */

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.index.get(&id).map(|&i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        let i = *self.index.get(&id)?;
        Some(&mut self.cells[i])
    }

    pub fn models(&self) -> &BTreeMap<String, Model> {
        &self.models
    }

    /// Connected pairs in creation order.
    pub fn connected_pairs(&self) -> Vec<(CellId, CellId)> {
        self.connections.iter().map(|c| c.cells).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Velocity of every cell, in cell order.
    pub fn velocities(&self) -> Vec<Vec3> {
        self.cells.iter().map(|c| c.velocity).collect()
    }

    /// Force accumulated on every cell at the end of the last step, in
    /// cell order.
    pub fn forces(&self) -> Vec<Vec3> {
        self.cells.iter().map(|c| c.force).collect()
    }

    pub fn disable_cell_cell_collisions(&mut self) {
        self.cell_cell_collisions = false;
    }

    pub fn disable_cell_model_collisions(&mut self) {
        self.cell_model_collisions = false;
    }

    /*
     * cells & models
     */

    /// Adds a cell and returns its id. Ids are handed out by this world in
    /// creation order, so two worlds fed the same calls agree on them.
    pub fn add_cell(&mut self, mut cell: Cell) -> CellId {
        let id = self.next_id;
        self.next_id += 1;
        cell.id = id;
        self.index.insert(id, self.cells.len());
        self.cells.push(cell);
        id
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.insert(model.name.clone(), model);
        self.rebuild_model_grid();
    }

    /// Loads an OBJ file and registers it under `name`.
    pub fn load_model<P: AsRef<std::path::Path>>(
        &mut self,
        name: &str,
        path: P,
    ) -> std::io::Result<()> {
        let model = Model::load(name, path)?;
        self.add_model(model);
        Ok(())
    }

    pub fn remove_model(&mut self, name: &str) {
        self.models.remove(name);
        self.contacts.remove(name);
        self.rebuild_model_grid();
    }

    fn rebuild_model_grid(&mut self) {
        self.model_grid.clear();
        self.model_names.clear();
        for (mi, (name, model)) in self.models.iter().enumerate() {
            self.model_names.push(name.clone());
            for fi in 0..model.faces.len() {
                let (p0, p1, p2) = model.face_vertices(fi);
                self.model_grid
                    .insert_triangle((mi as u32, fi as u32), p0, p1, p2);
            }
        }
    }

    fn update_model_grid(&mut self) {
        let mut changed = false;
        for model in self.models.values_mut() {
            if model.changed_since_last_check() {
                changed = true;
            }
        }
        if changed {
            self.rebuild_model_grid();
        }
    }

    /*
     * main update routine
     */

    pub fn update(&mut self) {
        self.prepare();
        self.apply_world_forces();
        self.update_cell_cell_connections();
        self.update_cell_model_contacts();
        self.integrate();
        if self.cell_cell_collisions {
            self.detect_cell_cell_connections();
        }
        if self.cell_model_collisions && !self.models.is_empty() {
            self.update_model_grid();
            self.detect_cell_model_contacts();
        }
        self.update_behaviors();
        self.destroy_dead_cells();
        self.frame += 1;
    }

    fn prepare(&mut self) {
        profile_scope!("prepare");
        let links = self.build_links();
        for (i, c) in self.cells.iter_mut().enumerate() {
            let total = c.total_force;
            c.membrane.update_stats(&links[i], total);
            c.reset_forces();
            c.apply_and_reset_external();
        }
    }

    fn apply_world_forces(&mut self) {
        profile_scope!("world forces");
        let config = &self.config;
        for c in &mut self.cells {
            let drag = -6.0 * std::f32::consts::PI
                * config.viscosity_coef
                * c.bounding_radius()
                * c.velocity;
            c.receive_force_vec(drag);
            c.receive_force_vec(config.gravity * c.mass);
        }
    }

    /// Refreshes, prunes and applies every cell-cell connection.
    ///
    /// A connection is stale when the cells have drifted past the sum of
    /// their effective radii, or when they are no longer mutually the
    /// closest membrane along the connection axis (a third cell has wedged
    /// itself in between).
    fn update_cell_cell_connections(&mut self) {
        profile_scope!("cell-cell forces");
        self.refresh_connection_geometry();
        let links = self.build_links();

        let mut stale: Vec<(CellId, CellId)> = Vec::new();
        for conn in self.connections.iter() {
            let i0 = self.index[&conn.cells.0];
            let i1 = self.index[&conn.cells.1];
            let c0 = &self.cells[i0];
            let c1 = &self.cells[i1];
            let separated =
                conn.spring.length > c0.bounding_radius() + c1.bounding_radius();
            let (closest0, _) = c0.membrane.membrane_distance(&links[i0], conn.spring.direction);
            let (closest1, _) =
                c1.membrane.membrane_distance(&links[i1], -conn.spring.direction);
            if separated
                || !closest0.contains(&conn.cells.1)
                || !closest1.contains(&conn.cells.0)
            {
                stale.push(conn.cells);
            }
        }
        let stale_set: HashSet<(CellId, CellId)> = stale.iter().copied().collect();

        let Self {
            connections,
            cells,
            index,
            behavior,
            config,
            ..
        } = self;
        for conn in connections.iter_mut() {
            if stale_set.contains(&conn.cells) {
                continue;
            }
            let i0 = index[&conn.cells.0];
            let i1 = index[&conn.cells.1];
            {
                let c0 = &cells[i0];
                let c1 = &cells[i1];
                // Adhesive strength scales with the contact surface; this
                // proxy avoids computing the true lens intersection.
                let mean_r = (c0.membrane.radius() + c1.membrane.radius()) * 0.5;
                let contact_surface = std::f32::consts::PI
                    * (conn.spring.length * conn.spring.length + mean_r * mean_r);
                conn.set_contact_surface_coef(contact_surface);
                let adh = behavior.adhesion(c0, c1);
                let rest = Self::connection_rest_length(
                    config,
                    c0.bounding_radius() + c1.bounding_radius(),
                    adh,
                );
                conn.spring.set_rest_length(rest);
            }
            let (c0, c1) = pair_mut(cells, i0, i1);
            conn.compute_forces(c0, c1, config.dt);
        }

        self.remove_connections(&stale);
    }

    fn update_cell_model_contacts(&mut self) {
        profile_scope!("cell-model forces");
        let Self {
            contacts,
            cells,
            index,
            config,
            ..
        } = self;
        for per_model in contacts.values_mut() {
            for (cid, list) in per_model.iter_mut() {
                let cell = &mut cells[index[cid]];
                for contact in list {
                    contact.compute_forces(cell, config.dt);
                }
            }
        }
    }

    fn integrate(&mut self) {
        profile_scope!("integrate");
        let links = self.build_links();
        let config = &self.config;
        for (i, c) in self.cells.iter_mut().enumerate() {
            let w = c.angular_velocity;
            let torque = c.membrane.pre_integration(&links[i], w, config.dt);
            c.receive_torque(torque);
            config.integrator.step(c, config.dt);
        }
    }

    fn detect_cell_cell_connections(&mut self) {
        profile_scope!("cell-cell detect");
        self.refresh_connection_geometry();
        let links = self.build_links();

        {
            let Self {
                cell_grid, cells, ..
            } = self;
            cell_grid.clear();
            for c in cells.iter() {
                cell_grid.insert_sphere(c.id, c.position, c.bounding_radius());
            }
        }

        let batches = self.cell_grid.color_batches();
        let mut candidates: Vec<(CellId, CellId)> = {
            let scan = |batch: &Vec<&[CellId]>| {
                scan_color_class(
                    batch,
                    &self.cells,
                    &self.index,
                    &self.connections,
                    &links,
                )
            };
            if self.config.parallel_detection {
                // Same-color buckets never share a neighborhood, and the
                // per-class results are merged in class order, so this is
                // bit-identical to the sequential pass.
                batches.par_iter().map(scan).reduce(Vec::new, |mut a, mut b| {
                    a.append(&mut b);
                    a
                })
            } else {
                batches.iter().flat_map(|b| scan(b)).collect()
            }
        };
        candidates.sort_unstable();
        candidates.dedup();
        for (a, b) in candidates {
            self.create_connection(a, b);
        }
    }

    fn detect_cell_model_contacts(&mut self) {
        profile_scope!("cell-model detect");
        for per_model in self.contacts.values_mut() {
            for list in per_model.values_mut() {
                for contact in list.iter_mut() {
                    contact.dirty = true;
                }
            }
        }

        let Self {
            contacts,
            cells,
            models,
            model_grid,
            model_names,
            behavior,
            config,
            ..
        } = self;
        for cell in cells.iter() {
            let radius = cell.bounding_radius();
            for (mi, fi) in model_grid.retrieve(cell.position, radius) {
                let name = &model_names[mi as usize];
                let model = &models[name];
                let (p0, p1, p2) = model.face_vertices(fi as usize);
                let (inside, proj) = projection_in_triangle(p0, p1, p2, cell.position, 0.0);
                let towards = proj - cell.position;
                if !inside || towards.mag_sq() >= radius * radius {
                    continue;
                }
                let dir = towards.normalized_or(Vec3::zero());
                let list = contacts
                    .entry(name.clone())
                    .or_default()
                    .entry(cell.id)
                    .or_default();
                let mut matched = false;
                for contact in list.iter_mut() {
                    // Same face or a similar bounce angle: keep and update
                    // the existing contact instead of stacking a new one.
                    let prev_dir = (contact.bounce_point.position - cell.prev_position)
                        .normalized_or(Vec3::zero());
                    if prev_dir.dot(dir) > MIN_MODEL_CONTACT_SIMILARITY {
                        contact.refresh(cell, proj, fi as usize, dir);
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    let adh = behavior.adhesion_with_model(cell, name);
                    let cr = cell.membrane.corrected_radius();
                    let rest = mix(config.max_adh_ratio * cr, config.min_adh_ratio * cr, adh);
                    list.push(CellModelContact::new(cell, proj, fi as usize, rest));
                }
            }
        }

        for per_model in contacts.values_mut() {
            for list in per_model.values_mut() {
                list.retain(|c| !c.dirty);
            }
            per_model.retain(|_, list| !list.is_empty());
        }
        contacts.retain(|_, per_model| !per_model.is_empty());
    }

    fn update_behaviors(&mut self) {
        profile_scope!("behaviors");
        let mut births: Vec<Cell> = Vec::new();
        {
            let Self {
                cells,
                behavior,
                config,
                ..
            } = self;
            for c in cells.iter_mut() {
                if let Some(newborn) = behavior.update(c, config.dt) {
                    births.push(newborn);
                }
            }
        }
        // Births land after the loop so a newborn is never updated (or
        // divided again) within the step that created it.
        for newborn in births {
            self.add_cell(newborn);
        }
    }

    fn destroy_dead_cells(&mut self) {
        let dead: Vec<CellId> = self
            .cells
            .iter()
            .filter(|c| c.is_dead())
            .map(|c| c.id)
            .collect();
        if dead.is_empty() {
            return;
        }
        for id in &dead {
            for other in self.connections.remove_all_of(*id) {
                if let Some(&oi) = self.index.get(&other) {
                    self.cells[oi].connected_cells.retain(|x| x != id);
                }
            }
            for per_model in self.contacts.values_mut() {
                per_model.remove(id);
            }
        }
        self.contacts.retain(|_, per_model| !per_model.is_empty());
        self.cells.retain(|c| !c.is_dead());
        self.reindex_cells();
    }

    /*
     * helpers
     */

    fn reindex_cells(&mut self) {
        self.index.clear();
        for (i, c) in self.cells.iter().enumerate() {
            self.index.insert(c.id, i);
        }
    }

    fn refresh_connection_geometry(&mut self) {
        let Self {
            connections,
            cells,
            index,
            ..
        } = self;
        for conn in connections.iter_mut() {
            let c0 = &cells[index[&conn.cells.0]];
            let c1 = &cells[index[&conn.cells.1]];
            conn.update_length_direction(c0, c1);
        }
    }

    /// Per-cell contact geometry, indexed like `self.cells`.
    fn build_links(&self) -> Vec<Vec<NeighborLink>> {
        let mut links: Vec<Vec<NeighborLink>> = vec![Vec::new(); self.cells.len()];
        for conn in self.connections.iter() {
            let i0 = self.index[&conn.cells.0];
            let i1 = self.index[&conn.cells.1];
            let r0 = self.cells[i0].membrane.radius();
            let r1 = self.cells[i1].membrane.radius();
            links[i0].push(NeighborLink {
                other: conn.cells.1,
                normal: conn.spring.direction,
                length: conn.spring.length,
                other_radius: r1,
            });
            links[i1].push(NeighborLink {
                other: conn.cells.0,
                normal: -conn.spring.direction,
                length: conn.spring.length,
                other_radius: r0,
            });
        }
        links
    }

    fn connection_rest_length(config: &SimConfig, l: f32, adh: f32) -> f32 {
        if adh > config.adhesion_threshold {
            mix(config.max_adh_ratio * l, config.min_adh_ratio * l, adh)
        } else {
            l
        }
    }

    /// Builds the spring and joints for a fresh pair. Stiffness and damping
    /// are volume-weighted between the two cells, each joint is tuned to
    /// its own cell's inertia. `a < b`.
    fn create_connection(&mut self, a: CellId, b: CellId) {
        let conn = {
            let c0 = &self.cells[self.index[&a]];
            let c1 = &self.cells[self.index[&b]];
            let adh = self.behavior.adhesion(c0, c1);
            let rest = Self::connection_rest_length(
                &self.config,
                c0.bounding_radius() + c1.bounding_radius(),
                adh,
            );
            let v0 = c0.membrane.volume();
            let v1 = c1.membrane.volume();
            let vsum = v0 + v1;
            let k = (c0.membrane.stiffness * v0 + c1.membrane.stiffness * v1) / vsum;
            let dr = (c0.membrane.damp_ratio * v0 + c1.membrane.damp_ratio * v1) / vsum;
            let joint = |c: &Cell| {
                Joint::new(
                    c.membrane.angular_stiffness,
                    damping_from_ratio(
                        dr,
                        c.moment_of_inertia() * 2.0,
                        c.membrane.angular_stiffness,
                    ),
                    c.membrane.max_joint_angle,
                )
            };
            let spring = Spring::new(k, damping_from_ratio(dr, c0.mass + c1.mass, k), rest);
            CellCellConnection::new(c0, c1, spring, (joint(c0), joint(c1)))
        };
        self.connections.insert(conn);
        let i0 = self.index[&a];
        let i1 = self.index[&b];
        self.cells[i0].connected_cells.push(b);
        self.cells[i1].connected_cells.push(a);
    }

    fn remove_connections(&mut self, pairs: &[(CellId, CellId)]) {
        for (a, b) in pairs {
            let i0 = self.index[a];
            let i1 = self.index[b];
            self.cells[i0].connected_cells.retain(|x| x != b);
            self.cells[i1].connected_cells.retain(|x| x != a);
        }
        self.connections.remove_pairs(pairs);
    }
}

/// Candidate pairs from one color class of the broad phase. Pure read-only
/// scan; creation happens afterwards, serially and in sorted order.
fn scan_color_class(
    batch: &[&[CellId]],
    cells: &[Cell],
    index: &HashMap<CellId, usize>,
    connections: &ConnectionStore,
    links: &[Vec<NeighborLink>],
) -> Vec<(CellId, CellId)> {
    let mut found = Vec::new();
    for bucket in batch {
        for j in 0..bucket.len() {
            for k in j + 1..bucket.len() {
                let (a, b) = ordered_pair(bucket[j], bucket[k]);
                if a == b || connections.contains(a, b) {
                    continue;
                }
                let ca = &cells[index[&a]];
                let cb = &cells[index[&b]];
                let ab = ca.position - cb.position;
                let sq_dist = ab.mag_sq();
                let max_l = ca.bounding_radius() + cb.bounding_radius();
                if sq_dist > max_l * max_l {
                    continue;
                }
                let dist = sq_dist.sqrt();
                let dir = if dist > 0.0 { ab / dist } else { Vec3::unit_y() };
                let (_, md0) = ca.membrane.membrane_distance(&links[index[&a]], dir);
                let (_, md1) = cb.membrane.membrane_distance(&links[index[&b]], -dir);
                if dist < md0 + md1 {
                    found.push((a, b));
                }
            }
        }
    }
    found
}

/// Two distinct mutable cells out of one slice.
fn pair_mut(cells: &mut [Cell], i: usize, j: usize) -> (&mut Cell, &mut Cell) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = cells.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = cells.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}
