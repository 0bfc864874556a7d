use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::global_variables::DEFAULT_LOOKAHEAD;
use crate::road_network::{GraphNode, NodeId};

/// A graph node referenced from inside a path.
#[derive(Debug, Clone, Copy)]
pub struct Waypoint {
    pub id: NodeId,
    pub position: DVec2,
}

impl PartialEq for Waypoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Waypoint {}

impl From<&GraphNode> for Waypoint {
    fn from(node: &GraphNode) -> Self {
        Waypoint {
            id: node.id(),
            position: node.position(),
        }
    }
}

/// Ordered waypoints, index 0 nearest the vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    pub nodes: Vec<Waypoint>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|waypoint| waypoint.id).collect()
    }

    pub fn positions(&self) -> Vec<DVec2> {
        self.nodes
            .iter()
            .map(|waypoint| waypoint.position)
            .collect()
    }

    /// Consecutive waypoint pairs.
    pub fn segments(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        self.nodes
            .windows(2)
            .map(|pair| (pair[0].position, pair[1].position))
    }
}

/// Which outgoing edge to prefer at a branching node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntersectionHeuristic {
    Left,
    Right,
    #[default]
    Middle,
}

impl IntersectionHeuristic {
    /// Index into an adjacency list of length `len` (> 0).
    pub fn preferred_index(self, len: usize) -> usize {
        match self {
            IntersectionHeuristic::Middle => 0,
            IntersectionHeuristic::Right => len - 1,
            IntersectionHeuristic::Left => len / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaneChoice {
    Left,
    #[default]
    Right,
    Automatic,
}

/// Inputs for one local path query.
#[derive(Debug, Clone, Copy)]
pub struct PathRequest {
    pub position: DVec2,
    pub direction: DVec2,
    pub heuristic: IntersectionHeuristic,
    pub lookahead: usize,
}

impl PathRequest {
    pub fn new(position: DVec2, direction: DVec2) -> Self {
        Self {
            position,
            direction,
            heuristic: IntersectionHeuristic::default(),
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }

    pub fn with_heuristic(mut self, heuristic: IntersectionHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }
}
