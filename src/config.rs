// Centralized configuration for simulation parameters.
//
// All tuning knobs live either here as compile-time defaults or in the
// runtime `SimConfig` value handed to `World::new`. The engine itself holds
// no mutable globals.

use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use crate::integrator::Integrator;
use crate::membrane::MembraneModel;

// ====================
// Cell defaults
// ====================
pub const DEFAULT_CELL_RADIUS: f32 = 40.0;
pub const DEFAULT_CELL_MASS: f32 = 1.0;
/// Linear spring stiffness of a cell membrane.
pub const DEFAULT_CELL_STIFFNESS: f32 = 45.0;
pub const DEFAULT_CELL_DAMP_RATIO: f32 = 0.8;
pub const DEFAULT_CELL_ANG_STIFFNESS: f32 = 0.8;
/// Breaking angle of a freshly created flexure joint.
pub const DEFAULT_MAX_JOINT_ANGLE: f32 = std::f32::consts::PI / 12.0;

// ====================
// Adhesion
// ====================
/// Adhesion below this value does not shorten the rest length at all.
pub const ADHESION_THRESHOLD: f32 = 0.1;
/// Rest length at full adhesion, as a fraction of the summed radii.
pub const MIN_ADH_RATIO: f32 = 0.6;
/// Rest length at threshold adhesion, as a fraction of the summed radii.
pub const MAX_ADH_RATIO: f32 = 0.8;

// ====================
// Springs & joints
// ====================
/// Below this fraction of the rest length the spring switches to a
/// positional anti-tunneling correction.
pub const MIN_SPRING_LENGTH_RATIO: f32 = 0.5;
/// Max |dot| between a torsion joint direction and the spring axis before
/// the joint rotation is reprojected.
pub const MAX_TORSION_INCLINATION: f32 = 0.1;

// ====================
// Membrane / volume conservation
// ====================
/// Upper bound of the dynamic radius, as a multiple of the rest radius.
pub const MAX_DYN_RADIUS_RATIO: f32 = 1.5;
/// Overcompensation factor applied to the spherical-cap volume loss.
pub const VOLUME_LOSS_COMPENSATION: f32 = 1.3;
pub const DEFAULT_INCOMPRESSIBILITY: f32 = 0.005;
pub const DEFAULT_AREA_STIFFNESS: f32 = 0.04;
pub const DEFAULT_MEMBRANE_REACTIVITY: f32 = 20.0;
pub const DEFAULT_RADIAL_DAMPING: f32 = 0.5;

// ====================
// Mesh contacts
// ====================
/// Cosine similarity above which an existing cell-model contact is matched
/// to a fresh projection instead of creating a new one.
pub const MIN_MODEL_CONTACT_SIMILARITY: f32 = 0.8;
/// Stiffness of the anchor spring of a cell-model contact.
pub const ANCHOR_SPRING_STIFFNESS: f32 = 100.0;
pub const ANCHOR_SPRING_DAMP_RATIO: f32 = 0.9;

// ====================
// World
// ====================
/// Fixed timestep of the per-step entry point, in seconds.
pub const DEFAULT_DT: f32 = 1.0 / 45.0;
/// Cell grid resolution, as a multiple of the default cell radius.
pub const CELL_GRID_SIZE_FACTOR: f32 = 4.5;
/// Grid resolution of the static mesh broad phase.
pub const MODEL_GRID_SIZE: f32 = 100.0;
pub const DEFAULT_VISCOSITY_COEF: f32 = 0.0003;

/// Immutable runtime configuration of a `World`.
///
/// Constructed once and passed by value; every membrane and connection
/// parameter that used to be a global tunable is read from here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed timestep in seconds.
    pub dt: f32,
    pub integrator: Integrator,
    pub membrane_model: MembraneModel,
    pub default_radius: f32,
    pub default_mass: f32,
    pub stiffness: f32,
    pub damp_ratio: f32,
    pub angular_stiffness: f32,
    pub max_joint_angle: f32,
    pub min_adh_ratio: f32,
    pub max_adh_ratio: f32,
    pub adhesion_threshold: f32,
    pub incompressibility: f32,
    pub area_stiffness: f32,
    pub membrane_reactivity: f32,
    pub radial_damping: f32,
    pub max_dyn_radius_ratio: f32,
    pub viscosity_coef: f32,
    pub gravity: Vec3,
    /// Cell broad-phase grid cell size. Defaults to
    /// `CELL_GRID_SIZE_FACTOR * default_radius`.
    pub cell_grid_size: f32,
    pub model_grid_size: f32,
    /// Run connection detection over the 8 grid color classes in parallel.
    /// Candidate generation only; creation stays serial and sorted, so the
    /// result is identical to the sequential pass.
    pub parallel_detection: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            integrator: Integrator::Euler,
            membrane_model: MembraneModel::Sphere,
            default_radius: DEFAULT_CELL_RADIUS,
            default_mass: DEFAULT_CELL_MASS,
            stiffness: DEFAULT_CELL_STIFFNESS,
            damp_ratio: DEFAULT_CELL_DAMP_RATIO,
            angular_stiffness: DEFAULT_CELL_ANG_STIFFNESS,
            max_joint_angle: DEFAULT_MAX_JOINT_ANGLE,
            min_adh_ratio: MIN_ADH_RATIO,
            max_adh_ratio: MAX_ADH_RATIO,
            adhesion_threshold: ADHESION_THRESHOLD,
            incompressibility: DEFAULT_INCOMPRESSIBILITY,
            area_stiffness: DEFAULT_AREA_STIFFNESS,
            membrane_reactivity: DEFAULT_MEMBRANE_REACTIVITY,
            radial_damping: DEFAULT_RADIAL_DAMPING,
            max_dyn_radius_ratio: MAX_DYN_RADIUS_RATIO,
            viscosity_coef: DEFAULT_VISCOSITY_COEF,
            gravity: Vec3::zero(),
            cell_grid_size: CELL_GRID_SIZE_FACTOR * DEFAULT_CELL_RADIUS,
            model_grid_size: MODEL_GRID_SIZE,
            parallel_detection: false,
        }
    }
}

impl SimConfig {
    /// Parse a config from TOML text. Missing file handling is the caller's
    /// business; parse failures are surfaced as `InvalidData`.
    pub fn from_toml_str(s: &str) -> std::io::Result<Self> {
        toml::from_str(s)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    pub fn load<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = SimConfig::default();
        let text = toml::to_string(&config).expect("config should serialize");
        let back = SimConfig::from_toml_str(&text).expect("config should parse back");
        assert_eq!(back.dt, config.dt);
        assert_eq!(back.default_radius, config.default_radius);
        assert_eq!(back.max_dyn_radius_ratio, config.max_dyn_radius_ratio);
    }

    #[test]
    fn partial_toml_is_rejected_cleanly() {
        // SimConfig has no serde defaults on purpose: a scenario file either
        // specifies a full config or uses SimConfig::default() in code.
        let err = SimConfig::from_toml_str("dt = 0.01").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
