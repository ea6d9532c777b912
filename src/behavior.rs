use crate::cell::Cell;

/// User-side cell logic, polled once per cell per step after physics.
///
/// Returning a cell from `update` schedules it for insertion at the end of
/// the step (division); calling `cell.die()` schedules removal. Adhesion
/// lookups drive connection rest lengths.
pub trait Behavior {
    /// Per-cell logic. A returned cell is added to the world after the
    /// current step (typically built with `Cell::divided_from`).
    fn update(&mut self, _cell: &mut Cell, _dt: f32) -> Option<Cell> {
        None
    }

    /// Adhesion strength in [0, 1] between two cells.
    fn adhesion(&self, _a: &Cell, _b: &Cell) -> f32 {
        0.0
    }

    /// Adhesion strength in [0, 1] between a cell and a named mesh.
    fn adhesion_with_model(&self, _cell: &Cell, _model: &str) -> f32 {
        0.0
    }
}

/// Physics-only behavior: nothing divides, nothing sticks.
#[derive(Default, Clone, Copy, Debug)]
pub struct Inert;

impl Behavior for Inert {}
