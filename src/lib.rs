pub mod control_system;
pub mod errors;
pub mod global_variables;
pub mod monitoring;
pub mod path_planning;
pub mod road_network;
pub mod shared_data;
pub mod simulation_engine;
pub mod vehicle_dynamics;
