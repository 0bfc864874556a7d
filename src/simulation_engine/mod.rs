// simulation_engine/mod.rs
pub mod perception;
pub mod renderer;
pub mod simulation;

pub use perception::{scan_for_gap, GapScanParams};
pub use renderer::{NullRenderer, PathOverlay, SceneRenderer, TrajectoryRecorder, VehicleId};
pub use simulation::{Simulation, SimulationSetup, TickOutcome, TickStatus, Vehicle};
