// Membrane approximations. Both variants describe the cell as a sphere
// deformed by its contacts; they differ in how the radius reacts.
//
// `Sphere` keeps the rest radius fixed and compensates the volume eaten by
// contact caps with an inflated corrected radius. `Volume` runs a
// second-order law on a dynamic radius driven by volume and area errors,
// which gives softer, pressure-like behavior.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use ultraviolet::Vec3;

use crate::cell::CellId;
use crate::config::SimConfig;

const FOUR_THIRD_PI: f32 = 4.188_790_2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembraneModel {
    Sphere,
    Volume,
}

/// Geometry of one cell-cell contact as seen from one of its endpoints.
/// Assembled by the world from the connection store before shape updates.
#[derive(Clone, Copy, Debug)]
pub struct NeighborLink {
    pub other: CellId,
    /// Unit direction from this cell towards the other.
    pub normal: Vec3,
    /// Center-to-center distance.
    pub length: f32,
    pub other_radius: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Membrane {
    model: MembraneModel,
    base_radius: f32,
    /// Rest radius; grows and shrinks with the cell volume.
    radius: f32,
    /// Effective radius: volume-compensated (sphere) or dynamic (volume).
    corrected_radius: f32,
    deduced_radius: f32,
    current_area: f32,
    current_volume: f32,
    pressure: f32,

    pub stiffness: f32,
    pub damp_ratio: f32,
    pub angular_stiffness: f32,
    pub max_joint_angle: f32,

    incompressibility: f32,
    area_stiffness: f32,
    reactivity: f32,
    radial_damping: f32,
    max_dyn_radius_ratio: f32,
    pub volume_conservation: bool,
}

impl Membrane {
    pub fn new(config: &SimConfig) -> Self {
        let r = config.default_radius;
        Self {
            model: config.membrane_model,
            base_radius: r,
            radius: r,
            corrected_radius: r,
            deduced_radius: r,
            current_area: 4.0 * std::f32::consts::PI * r * r,
            current_volume: FOUR_THIRD_PI * r * r * r,
            pressure: 0.0,
            stiffness: config.stiffness,
            damp_ratio: config.damp_ratio,
            angular_stiffness: config.angular_stiffness,
            max_joint_angle: config.max_joint_angle,
            incompressibility: config.incompressibility,
            area_stiffness: config.area_stiffness,
            reactivity: config.membrane_reactivity,
            radial_damping: config.radial_damping,
            max_dyn_radius_ratio: config.max_dyn_radius_ratio,
            volume_conservation: true,
        }
    }

    /// Post-division membrane: same parameters, radius back to base.
    pub fn divided(&self) -> Self {
        let mut m = self.clone();
        m.set_radius(m.base_radius);
        m
    }

    pub fn model(&self) -> MembraneModel {
        self.model
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    pub fn corrected_radius(&self) -> f32 {
        self.corrected_radius
    }

    /// Radius used by the broad phase and the connection length checks.
    pub fn bounding_radius(&self) -> f32 {
        self.corrected_radius
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn volume(&self) -> f32 {
        FOUR_THIRD_PI * self.radius * self.radius * self.radius
    }

    pub fn base_volume(&self) -> f32 {
        FOUR_THIRD_PI * self.base_radius * self.base_radius * self.base_radius
    }

    pub fn rest_area(&self) -> f32 {
        4.0 * std::f32::consts::PI * self.radius * self.radius
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn current_area(&self) -> f32 {
        self.current_area
    }

    pub fn deduced_radius(&self) -> f32 {
        self.deduced_radius
    }

    pub fn moment_of_inertia(&self, mass: f32) -> f32 {
        4.0 * mass * self.radius * self.radius
    }

    pub fn set_radius(&mut self, r: f32) {
        self.radius = r;
        self.corrected_radius = r;
    }

    pub fn set_base_radius(&mut self, r: f32) {
        self.base_radius = r;
    }

    pub fn set_volume(&mut self, v: f32) {
        self.set_radius((v / FOUR_THIRD_PI).cbrt());
    }

    /// Distance from the center of the contact disc with `link` to this
    /// cell's center, along the connection axis.
    fn midpoint(&self, link: &NeighborLink) -> f32 {
        link.length * self.radius / (self.radius + link.other_radius)
    }

    /// Where the membrane lies in direction `d` (unit), given the current
    /// contacts: every contact plane facing `d` bounds the membrane at
    /// `midpoint / (normal . d)`. Returns all neighbors at the closest
    /// distance (several can tie) and that distance.
    pub fn membrane_distance(
        &self,
        links: &[NeighborLink],
        d: Vec3,
    ) -> (SmallVec<[CellId; 4]>, f32) {
        let mut closest: SmallVec<[CellId; 4]> = SmallVec::new();
        let mut closest_dist = self.corrected_radius;
        for link in links {
            let dot = link.normal.dot(d);
            if dot > 0.0 {
                let l = self.midpoint(link) / dot;
                if (l - closest_dist).abs() < 1e-8 * closest_dist.abs() {
                    closest.push(link.other);
                } else if l < closest_dist {
                    closest_dist = l;
                    closest.clear();
                    closest.push(link.other);
                }
            }
        }
        (closest, closest_dist)
    }

    // Spherical cap volume cut off by the contact plane of `link`, using
    // radius `r` for the sphere.
    fn cap_volume_loss(&self, link: &NeighborLink, r: f32) -> f32 {
        let mid = self.midpoint(link);
        let h = r - mid;
        if h <= 0.0 {
            return 0.0;
        }
        (std::f32::consts::PI * h / 6.0) * (3.0 * (r * r - mid * mid) + h * h)
    }

    /// Sphere variant: inflates the corrected radius so that the sphere
    /// minus its contact caps keeps the rest volume. The loss is slightly
    /// overcompensated, matching the reference behavior.
    pub fn compensate_volume_loss(&mut self, links: &[NeighborLink]) {
        if !self.volume_conservation {
            return;
        }
        let mut loss = 0.0;
        for link in links {
            loss += self.cap_volume_loss(link, self.radius);
        }
        let target = self.volume() + crate::config::VOLUME_LOSS_COMPENSATION * loss;
        self.corrected_radius = (target / FOUR_THIRD_PI)
            .cbrt()
            .clamp(self.radius, self.max_dyn_radius_ratio * self.radius);
    }

    /// Sphere variant pressure readout: total compressive force over the
    /// membrane surface.
    pub fn compute_pressure(&mut self, total_force: f32) {
        let surface = 4.0 * std::f32::consts::PI * self.radius * self.radius;
        self.pressure = total_force / surface;
    }

    fn compute_current_volume(&mut self, links: &[NeighborLink]) {
        let r = self.corrected_radius;
        let mut loss = 0.0;
        for link in links {
            loss += self.cap_volume_loss(link, r);
        }
        self.current_volume = FOUR_THIRD_PI * r * r * r - loss;
    }

    fn compute_area_and_deduce_radius(&mut self, links: &[NeighborLink]) {
        let r = self.corrected_radius;
        let mut loss = 0.0;
        for link in links {
            let mid = self.midpoint(link);
            let h = r - mid;
            if h <= 0.0 {
                continue;
            }
            let disc_area = std::f32::consts::PI * (r * r - mid * mid).max(0.0);
            loss += 2.0 * std::f32::consts::PI * r * h - disc_area;
        }
        self.current_area = (4.0 * std::f32::consts::PI * r * r - loss).max(1.0);
        self.deduced_radius = (self.current_area / (4.0 * std::f32::consts::PI)).sqrt();
    }

    /// Per-step bookkeeping before forces are gathered.
    pub fn update_stats(&mut self, links: &[NeighborLink], total_force: f32) {
        match self.model {
            MembraneModel::Sphere => self.compute_pressure(total_force),
            MembraneModel::Volume => {
                self.compute_current_volume(links);
                self.compute_area_and_deduce_radius(links);
            }
        }
    }

    /// Shape reaction right before integration. Returns the torque to apply
    /// to the owning cell (the volume variant damps spinning).
    pub fn pre_integration(
        &mut self,
        links: &[NeighborLink],
        angular_velocity: Vec3,
        dt: f32,
    ) -> Vec3 {
        match self.model {
            MembraneModel::Sphere => {
                self.compensate_volume_loss(links);
                Vec3::zero()
            }
            MembraneModel::Volume => {
                self.compute_current_volume(links);
                let d_area = self.rest_area() - self.current_area;
                let d_vol = self.volume() - self.current_volume;
                let f_v = self.incompressibility * d_vol;
                let f_a = self.area_stiffness * d_area;
                self.pressure = (f_v - f_a) / self.current_area;
                self.corrected_radius = (self.corrected_radius
                    + self.reactivity * dt * dt * (f_v.cbrt() + f_a.cbrt()))
                .clamp(self.radius, self.max_dyn_radius_ratio * self.radius);
                -angular_velocity * self.radial_damping
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_membrane() -> Membrane {
        Membrane::new(&SimConfig::default())
    }

    fn volume_membrane() -> Membrane {
        let config = SimConfig {
            membrane_model: MembraneModel::Volume,
            ..SimConfig::default()
        };
        Membrane::new(&config)
    }

    fn link(normal: Vec3, length: f32, other_radius: f32) -> NeighborLink {
        NeighborLink {
            other: 1,
            normal,
            length,
            other_radius,
        }
    }

    #[test]
    fn membrane_distance_without_contacts_is_the_radius() {
        let m = sphere_membrane();
        let (cells, d) = m.membrane_distance(&[], Vec3::new(1.0, 0.0, 0.0));
        assert!(cells.is_empty());
        assert_eq!(d, m.corrected_radius());
    }

    #[test]
    fn membrane_is_flattened_towards_a_contact() {
        let m = sphere_membrane();
        let r = m.radius();
        // A same-size neighbor pressed to 1.5 r center distance.
        let l = link(Vec3::new(1.0, 0.0, 0.0), 1.5 * r, r);
        let (cells, d) = m.membrane_distance(&[l], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(cells.as_slice(), &[1]);
        // The contact plane sits at the midpoint, 0.75 r.
        assert!((d - 0.75 * r).abs() < 1e-3);
        // Away from the contact the membrane is untouched.
        let (cells, d) = m.membrane_distance(&[l], Vec3::new(-1.0, 0.0, 0.0));
        assert!(cells.is_empty());
        assert_eq!(d, m.corrected_radius());
    }

    #[test]
    fn volume_compensation_stays_within_bounds() {
        let mut m = sphere_membrane();
        let r = m.radius();
        let links: Vec<_> = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ]
        .into_iter()
        .map(|n| link(n, 1.2 * r, r))
        .collect();
        m.compensate_volume_loss(&links);
        assert!(m.corrected_radius() > r, "squeezed cell should inflate");
        assert!(m.corrected_radius() <= 1.5 * r + 1e-4);
        // No contacts: corrected radius falls back to the rest radius.
        m.compensate_volume_loss(&[]);
        assert!((m.corrected_radius() - r).abs() < 1e-4);
    }

    #[test]
    fn growth_through_set_volume_roundtrips_radius() {
        let mut m = sphere_membrane();
        let v = m.volume() * 2.0;
        m.set_volume(v);
        assert!((m.volume() - v).abs() / v < 1e-4);
        assert_eq!(m.radius(), m.corrected_radius());
    }

    #[test]
    fn volume_variant_inflates_under_compression() {
        let mut m = volume_membrane();
        let r = m.radius();
        let l = link(Vec3::new(1.0, 0.0, 0.0), 1.0 * r, r);
        m.update_stats(&[l], 0.0);
        let before = m.corrected_radius();
        let torque = m.pre_integration(&[l], Vec3::zero(), 1.0 / 45.0);
        assert_eq!(torque, Vec3::zero());
        assert!(
            m.corrected_radius() >= before,
            "losing cap volume must push the dynamic radius up"
        );
        assert!(m.corrected_radius() <= m.radius() * 1.5 + 1e-4);
    }

    #[test]
    fn volume_variant_damps_rotation() {
        let mut m = volume_membrane();
        let spin = Vec3::new(0.0, 0.0, 2.0);
        let torque = m.pre_integration(&[], spin, 1.0 / 45.0);
        assert!(torque.z < 0.0);
    }

    #[test]
    fn divided_membrane_returns_to_base_radius() {
        let mut m = sphere_membrane();
        m.set_volume(m.base_volume() * 1.9);
        assert!(m.radius() > m.base_radius());
        let d = m.divided();
        assert_eq!(d.radius(), d.base_radius());
    }
}
