pub mod behavior;
pub mod cell;
pub mod config;
pub mod connection;
pub mod contact;
pub mod geometry;
pub mod grid;
pub mod integrator;
pub mod membrane;
pub mod model;
pub mod profiler;
pub mod spring;
pub mod utils;
pub mod world;

pub use behavior::Behavior;
pub use cell::{Cell, CellId, PhysicsBody};
pub use config::SimConfig;
pub use integrator::Integrator;
pub use world::World;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
