// path_planning/mod.rs
pub mod path;
pub mod planner;

pub use path::{IntersectionHeuristic, LaneChoice, Path, PathRequest, Waypoint};
pub use planner::PathPlanner;
