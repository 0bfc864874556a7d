// control_system/mod.rs
pub mod pid_controller;
pub mod stanley_controller;

pub use pid_controller::{PidController, PidGains};
pub use stanley_controller::{StanleyController, StanleyOutput};
