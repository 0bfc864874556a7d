// vehicle_dynamics/mod.rs
pub mod bicycle_model;

pub use bicycle_model::{BicycleModel, ControlCommand, DynamicLimits, VehicleGeometry, WheelAngles};
