use glam::{DAffine2, DMat2, DVec2};

use crate::errors::GraphError;
use crate::road_network::geometry::signed_angle;

/// Dense index of a node in the road graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A 2D node of the road graph with its directed adjacency.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    position: DVec2,
    /// Nodes reachable over outgoing edges, in asset order.
    to: Vec<NodeId>,
    /// Nodes with an edge into this one, in asset order.
    from: Vec<NodeId>,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Position in the road plane (asset x, asset z).
    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn to(&self) -> &[NodeId] {
        &self.to
    }

    pub fn from(&self) -> &[NodeId] {
        &self.from
    }
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GraphNode {}

/// Which neighbour a vehicle placed on a node should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartHeading {
    East,
    West,
}

/// Immutable directed road graph. Node ids equal their index in `nodes`.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    nodes: Vec<GraphNode>,
}

impl RoadGraph {
    /// Indexed lookup.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a node of this graph. Ids handed out by the graph
    /// are always valid; anything else means the asset was corrupt.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    /// Checked lookup for ids coming from outside the graph (config, CLI).
    pub fn require(&self, id: NodeId) -> Result<&GraphNode, GraphError> {
        self.get(id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All directed edges, grouped by origin node.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes
            .iter()
            .flat_map(|node| node.to.iter().map(move |&to| (node.id, to)))
    }

    /// Returns every node (except `origin`) closer than `max_distance` whose
    /// bearing from `origin` is within `angle_radius` of `direction`.
    pub fn directional_search(
        &self,
        origin: &GraphNode,
        direction: DVec2,
        angle_radius: f64,
        max_distance: f64,
    ) -> Vec<&GraphNode> {
        self.nodes
            .iter()
            .filter(|node| {
                let to_node = node.position - origin.position;
                // Distance rejects far more candidates than the angle test.
                if node.id == origin.id || to_node.length() >= max_distance {
                    return false;
                }
                let angle = signed_angle(direction, to_node);
                angle < angle_radius && angle > -angle_radius
            })
            .collect()
    }

    /// Closest node to `position`; the lowest id wins ties.
    pub fn nearest_node(&self, position: DVec2) -> Option<&GraphNode> {
        let mut nearest: Option<(&GraphNode, f64)> = None;
        for node in &self.nodes {
            let distance = node.position.distance_squared(position);
            match nearest {
                Some((_, best)) if best <= distance => {}
                _ => nearest = Some((node, distance)),
            }
        }
        nearest.map(|(node, _)| node)
    }

    /// Pose for a vehicle placed on `id`, facing along the node's first
    /// outgoing or incoming neighbour on the requested side.
    pub fn start_pose(&self, id: NodeId, heading: StartHeading) -> DAffine2 {
        let node = self.node(id);
        let mut east = None;
        let mut west = None;
        let neighbours = node.to.first().into_iter().chain(node.from.first());
        for &neighbour in neighbours {
            let Some(facing) = (self.node(neighbour).position - node.position).try_normalize()
            else {
                continue;
            };
            if facing.x > 0.0 {
                east = Some(facing);
            } else {
                west = Some(facing);
            }
        }
        let facing = match heading {
            StartHeading::East => east.or(west),
            StartHeading::West => west.or(east),
        }
        .unwrap_or(DVec2::X);
        DAffine2::from_mat2_translation(DMat2::from_cols(facing, facing.perp()), node.position)
    }

    /// Serializes the graph in the same line format the loader reads.
    pub fn to_obj_string(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(&format!("v {} 0 {}\n", node.position.x, node.position.y));
        }
        for (from, to) in self.edges() {
            out.push_str(&format!("l {} {}\n", from.0 + 1, to.0 + 1));
        }
        out
    }
}

/// Collects vertices and edges, then freezes them into a [`RoadGraph`].
#[derive(Debug, Default)]
pub struct RoadGraphBuilder {
    positions: Vec<DVec2>,
    edges: Vec<(NodeId, NodeId)>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, position: DVec2) -> NodeId {
        self.positions.push(position);
        NodeId(self.positions.len() - 1)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.push((from, to));
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Builds the adjacency lists and freezes the graph.
    pub fn build(self) -> Result<RoadGraph, GraphError> {
        if self.positions.is_empty() {
            return Err(GraphError::Empty);
        }
        let count = self.positions.len();
        let mut outgoing = vec![Vec::new(); count];
        let mut incoming = vec![Vec::new(); count];
        for &(from, to) in &self.edges {
            for id in [from, to] {
                if id.0 >= count {
                    return Err(GraphError::UnknownNode(id));
                }
            }
            outgoing[from.0].push(to);
            incoming[to.0].push(from);
        }

        let nodes = self
            .positions
            .into_iter()
            .zip(outgoing.into_iter().zip(incoming))
            .enumerate()
            .map(|(index, (position, (to, from)))| GraphNode {
                id: NodeId(index),
                position,
                to,
                from,
            })
            .collect();
        Ok(RoadGraph { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from(points: &[(f64, f64)], edges: &[(usize, usize)]) -> RoadGraph {
        let mut builder = RoadGraphBuilder::new();
        for &(x, z) in points {
            builder.add_node(DVec2::new(x, z));
        }
        for &(a, b) in edges {
            builder.add_edge(NodeId(a), NodeId(b));
        }
        builder.build().unwrap()
    }

    #[test]
    fn node_ids_match_their_index() {
        let graph = graph_from(
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.5), (3.0, 1.0)],
            &[(0, 1), (1, 2), (1, 3)],
        );
        for index in 0..graph.len() {
            assert_eq!(graph.node(NodeId(index)).id(), NodeId(index));
        }
        assert!(graph.get(NodeId(4)).is_none());
        assert!(matches!(
            graph.require(NodeId(9)),
            Err(GraphError::UnknownNode(NodeId(9)))
        ));
    }

    #[test]
    fn adjacency_is_mirrored() {
        let graph = graph_from(
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)],
            &[(0, 1), (1, 2), (0, 2)],
        );
        assert_eq!(graph.node(NodeId(0)).to(), &[NodeId(1), NodeId(2)]);
        assert_eq!(graph.node(NodeId(2)).from(), &[NodeId(1), NodeId(0)]);
        assert!(graph.node(NodeId(0)).from().is_empty());
        assert_eq!(graph.edges().count(), 3);
    }

    #[test]
    fn build_rejects_empty_and_dangling_graphs() {
        assert!(matches!(RoadGraphBuilder::new().build(), Err(GraphError::Empty)));

        let mut builder = RoadGraphBuilder::new();
        let a = builder.add_node(DVec2::ZERO);
        builder.add_edge(a, NodeId(3));
        assert!(matches!(builder.build(), Err(GraphError::UnknownNode(NodeId(3)))));
    }

    #[test]
    fn directional_search_filters_by_distance_and_bearing() {
        let graph = graph_from(
            &[(0.0, 0.0), (1.0, 0.1), (1.0, 1.5), (-1.0, 0.0), (5.0, 0.0)],
            &[],
        );
        let origin = graph.node(NodeId(0));
        let found: Vec<NodeId> = graph
            .directional_search(origin, DVec2::X, 0.5, 2.0)
            .iter()
            .map(|node| node.id())
            .collect();
        assert_eq!(found, vec![NodeId(1)]);
    }

    #[test]
    fn nearest_node_prefers_lowest_id_on_ties() {
        let graph = graph_from(&[(1.0, 0.0), (-1.0, 0.0), (3.0, 3.0)], &[]);
        assert_eq!(graph.nearest_node(DVec2::ZERO).unwrap().id(), NodeId(0));
        let nearest = graph.nearest_node(DVec2::new(2.5, 2.0)).unwrap();
        assert_eq!(nearest.id(), NodeId(2));
    }

    #[test]
    fn start_pose_faces_requested_side() {
        let graph = graph_from(&[(0.0, 0.0), (1.0, 0.0), (-1.0, 0.0)], &[(0, 1), (2, 0)]);
        let east = graph.start_pose(NodeId(0), StartHeading::East);
        assert!((east.matrix2.x_axis - DVec2::X).length() < 1e-12);
        let west = graph.start_pose(NodeId(0), StartHeading::West);
        assert!((west.matrix2.x_axis + DVec2::X).length() < 1e-12);
        assert_eq!(west.translation, DVec2::ZERO);

        // Only a westward neighbour: East falls back to it.
        let fallback = graph.start_pose(NodeId(1), StartHeading::East);
        assert!((fallback.matrix2.x_axis + DVec2::X).length() < 1e-12);
    }
}
