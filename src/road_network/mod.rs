// road_network/mod.rs
pub mod geometry;
pub mod graph;
pub mod obj_loader;
pub mod synthetic;

pub use graph::{GraphNode, NodeId, RoadGraph, RoadGraphBuilder, StartHeading};
