// planner.rs
//
// Per-vehicle local path planner. Tracks which graph node the vehicle has
// most recently passed and greedily walks the graph ahead of it.

use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

use glam::DVec2;

use crate::global_variables::{
    DEFAULT_MAX_ANGLE, LEFT_LANE_FIRST_STEP_CONE, LEFT_LANE_SEARCH_CONE, LEFT_LANE_SEARCH_RADIUS,
};
use crate::path_planning::path::{IntersectionHeuristic, Path, PathRequest, Waypoint};
use crate::road_network::geometry::in_direction;
use crate::road_network::{GraphNode, NodeId, RoadGraph};

/// Local path planner bound to one vehicle.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    graph: Arc<RoadGraph>,
    start_node: NodeId,
    /// Origin node of the edge the vehicle is currently on.
    current_node: NodeId,
    /// Current node -> first node of the adjacent left lane.
    left_lane_cache: HashMap<NodeId, NodeId>,
}

impl PathPlanner {
    pub fn new(graph: Arc<RoadGraph>, start_node: NodeId) -> Self {
        Self {
            graph,
            start_node,
            current_node: start_node,
            left_lane_cache: HashMap::new(),
        }
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn start_node(&self) -> NodeId {
        self.start_node
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    /// Back to the start node. The left-lane cache only depends on the graph
    /// and is kept.
    pub fn reset(&mut self) {
        self.current_node = self.start_node;
    }

    /// Advances tracking, then returns `current_node` followed by up to
    /// `request.lookahead` nodes ahead.
    pub fn generate_local_path(&mut self, request: &PathRequest) -> Path {
        self.advance_tracking(request.position, request.direction, request.heuristic);
        self.generate_local_path_from(self.current_node, request)
    }

    /// Greedy extension from an explicit origin, without touching tracking.
    pub fn generate_local_path_from(&self, origin: NodeId, request: &PathRequest) -> Path {
        let mut last = self.graph.node(origin);
        let mut nodes = vec![Waypoint::from(last)];
        let mut look = request.direction;
        for _ in 0..request.lookahead {
            let Some(next) =
                self.next_node_in_direction(last, look, request.heuristic, DEFAULT_MAX_ANGLE)
            else {
                break;
            };
            look = next.position() - last.position();
            nodes.push(Waypoint::from(next));
            last = next;
        }
        Path { nodes }
    }

    /// Path along the adjacent lane on the left of the current edge. Falls
    /// back to the current lane when no adjacent lane is found. Returns `None`
    /// only when the current node has no successor in the direction of travel.
    pub fn generate_local_path_on_left_lane(&mut self, request: &PathRequest) -> Option<Path> {
        self.advance_tracking(request.position, request.direction, request.heuristic);

        if let Some(&cached) = self.left_lane_cache.get(&self.current_node) {
            return Some(self.generate_local_path_from(cached, request));
        }

        let current = self.graph.node(self.current_node);
        let next = self.next_node_in_direction(
            current,
            request.direction,
            request.heuristic,
            DEFAULT_MAX_ANGLE,
        )?;
        let edge = (next.position() - current.position()).normalize_or_zero();
        let normal_left = DVec2::new(edge.y, -edge.x);
        let diagonal = DVec2::new(
            FRAC_1_SQRT_2 * normal_left.x + FRAC_1_SQRT_2 * normal_left.y,
            -FRAC_1_SQRT_2 * normal_left.x + FRAC_1_SQRT_2 * normal_left.y,
        );

        let mut best: Option<Vec<Waypoint>> = None;
        let mut lowest_distance = LEFT_LANE_SEARCH_RADIUS;
        let candidates = self.graph.directional_search(
            current,
            diagonal,
            LEFT_LANE_SEARCH_CONE,
            LEFT_LANE_SEARCH_RADIUS,
        );
        for candidate in candidates {
            let trial = self.trace_adjacent_lane(candidate, edge, request);
            let min_len = best.as_ref().map_or(2, Vec::len);
            if trial.len() < min_len {
                continue;
            }
            let distance = current.position().distance(candidate.position());
            if distance < lowest_distance {
                lowest_distance = distance;
                best = Some(trial);
            }
        }

        match best {
            Some(mut nodes) => {
                // The first node is the raw search hit.
                nodes.remove(0);
                self.left_lane_cache.insert(self.current_node, nodes[0].id);
                log::debug!(
                    "Left lane of node {:?} starts at node {:?}",
                    self.current_node,
                    nodes[0].id
                );
                Some(Path { nodes })
            }
            None => Some(self.generate_local_path_from(self.current_node, request)),
        }
    }

    /// Returns the unit vector towards the first path node (other than the
    /// current node) that is farther than `min_distance` and ahead of the
    /// vehicle.
    pub fn get_vector_to_path(
        &self,
        position: DVec2,
        direction: DVec2,
        path: &Path,
        min_distance: f64,
    ) -> Option<DVec2> {
        path.nodes
            .iter()
            .filter(|waypoint| waypoint.id != self.current_node)
            .map(|waypoint| waypoint.position - position)
            .find(|to_node| {
                min_distance < to_node.length()
                    && in_direction(direction, *to_node, DEFAULT_MAX_ANGLE)
            })
            .map(DVec2::normalize)
    }

    /// Walks `current_node` forward past every node the vehicle has already
    /// passed. Returns `false` (and keeps `current_node`) on a dead end.
    pub fn advance_tracking(
        &mut self,
        position: DVec2,
        direction: DVec2,
        heuristic: IntersectionHeuristic,
    ) -> bool {
        let mut last = self.graph.node(self.current_node);
        let Some(mut ahead) =
            self.next_node_in_direction(last, direction, heuristic, DEFAULT_MAX_ANGLE)
        else {
            log::warn!(
                "No next node in direction from node {:?}",
                self.current_node
            );
            return false;
        };
        while !in_direction(direction, ahead.position() - position, DEFAULT_MAX_ANGLE) {
            match self.next_node_in_direction(ahead, direction, heuristic, DEFAULT_MAX_ANGLE) {
                Some(next) => {
                    last = ahead;
                    ahead = next;
                }
                None => {
                    log::warn!("No next node in direction from node {:?}", ahead.id());
                    return false;
                }
            }
        }
        self.current_node = last.id();
        true
    }

    /// First neighbour of `origin` lying within `max_angle` of `direction`.
    /// Outgoing edges are tried before incoming ones; within each list the
    /// heuristic's preferred entry goes first.
    fn next_node_in_direction(
        &self,
        origin: &GraphNode,
        direction: DVec2,
        heuristic: IntersectionHeuristic,
        max_angle: f64,
    ) -> Option<&GraphNode> {
        [origin.to(), origin.from()]
            .into_iter()
            .filter(|ids| !ids.is_empty())
            .find_map(|ids| {
                let preferred = ids[heuristic.preferred_index(ids.len())];
                std::iter::once(&preferred)
                    .chain(ids.iter())
                    .map(|&id| self.graph.node(id))
                    .find(|node| {
                        in_direction(direction, node.position() - origin.position(), max_angle)
                    })
            })
    }

    /// Trial path from a left-lane candidate. The first step uses a narrow
    /// cone; rejoining the current node ends the trace.
    fn trace_adjacent_lane(
        &self,
        candidate: &GraphNode,
        edge: DVec2,
        request: &PathRequest,
    ) -> Vec<Waypoint> {
        let mut last = candidate;
        let mut nodes = vec![Waypoint::from(candidate)];
        let mut look = edge;
        for step in 0..=request.lookahead {
            let max_angle = if step == 0 {
                LEFT_LANE_FIRST_STEP_CONE
            } else {
                DEFAULT_MAX_ANGLE
            };
            match self.next_node_in_direction(last, look, request.heuristic, max_angle) {
                Some(next) if next.id() != self.current_node => {
                    look = next.position() - last.position();
                    nodes.push(Waypoint::from(next));
                    last = next;
                }
                _ => break,
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_network::synthetic::{two_lane_road, TrackLayout};
    use crate::road_network::RoadGraphBuilder;

    fn line_graph() -> Arc<RoadGraph> {
        let mut builder = RoadGraphBuilder::new();
        let a = builder.add_node(DVec2::new(0.0, 0.0));
        let b = builder.add_node(DVec2::new(1.0, 0.0));
        let c = builder.add_node(DVec2::new(2.0, 0.0));
        builder.add_edge(a, b);
        builder.add_edge(b, c);
        Arc::new(builder.build().unwrap())
    }

    /// Node 0 branches to 1 (up-right), 2 (right) and 3 (down-right).
    fn fork_graph() -> Arc<RoadGraph> {
        let mut builder = RoadGraphBuilder::new();
        let origin = builder.add_node(DVec2::ZERO);
        let up = builder.add_node(DVec2::new(1.0, 1.0));
        let straight = builder.add_node(DVec2::new(1.0, 0.0));
        let down = builder.add_node(DVec2::new(1.0, -1.0));
        builder.add_edge(origin, up);
        builder.add_edge(origin, straight);
        builder.add_edge(origin, down);
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn line_path_from_first_node() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(0));
        let request = PathRequest::new(DVec2::new(0.0, 0.0), DVec2::X).with_lookahead(2);
        let path = planner.generate_local_path(&request);
        assert_eq!(path.ids(), vec![NodeId(0), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn tracking_advances_once_node_is_passed() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(0));
        let request = PathRequest::new(DVec2::new(1.1, 0.0), DVec2::X).with_lookahead(2);
        let path = planner.generate_local_path(&request);
        assert_eq!(planner.current_node(), NodeId(1));
        assert_eq!(path.ids(), vec![NodeId(1), NodeId(2)]);
    }

    #[test]
    fn tracking_holds_at_dead_end() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(0));
        let heuristic = IntersectionHeuristic::Middle;
        let advanced = planner.advance_tracking(DVec2::new(2.5, 0.0), DVec2::X, heuristic);
        assert!(!advanced);
        assert_eq!(planner.current_node(), NodeId(0));
    }

    #[test]
    fn reset_plans_like_a_fresh_planner_and_keeps_left_lane_cache() {
        let track = two_lane_road(20, &TrackLayout::default()).unwrap();
        let graph = Arc::new(track.graph);
        let start = track.right_lane[2];
        let origin = graph.node(start).position();
        let at_start = PathRequest::new(origin, DVec2::X).with_lookahead(4);
        let past_eight = graph.node(track.right_lane[8]).position() + DVec2::new(0.05, 0.0);
        let ahead = PathRequest::new(past_eight, DVec2::X).with_lookahead(4);

        let mut planner = PathPlanner::new(graph.clone(), start);
        planner.generate_local_path(&ahead);
        let left = planner.generate_local_path_on_left_lane(&ahead).unwrap();
        assert_eq!(planner.current_node(), track.right_lane[8]);

        planner.reset();
        planner.reset();
        assert_eq!(planner.current_node(), start);
        assert_eq!(
            planner.left_lane_cache.get(&track.right_lane[8]),
            Some(&track.left_lane[8])
        );

        let mut fresh = PathPlanner::new(graph.clone(), start);
        assert_eq!(
            planner.generate_local_path(&at_start),
            fresh.generate_local_path(&at_start)
        );
        let cached = planner.generate_local_path_on_left_lane(&ahead).unwrap();
        let recomputed = fresh.generate_local_path_on_left_lane(&ahead).unwrap();
        assert_eq!(cached, recomputed);
        assert_eq!(cached, left);
        assert_eq!(planner.left_lane_cache.len(), 1);
    }

    #[test]
    fn heuristic_selects_branch() {
        let planner = PathPlanner::new(fork_graph(), NodeId(0));
        let base = PathRequest::new(DVec2::ZERO, DVec2::X).with_lookahead(1);
        let pick = |heuristic| {
            planner
                .generate_local_path_from(NodeId(0), &base.with_heuristic(heuristic))
                .ids()[1]
        };
        assert_eq!(pick(IntersectionHeuristic::Middle), NodeId(1));
        assert_eq!(pick(IntersectionHeuristic::Left), NodeId(2));
        assert_eq!(pick(IntersectionHeuristic::Right), NodeId(3));
    }

    #[test]
    fn heuristic_falls_back_to_first_node_in_direction() {
        let planner = PathPlanner::new(fork_graph(), NodeId(0));
        // Looking down-right: only node 3 is within a narrow cone.
        let direction = DVec2::new(1.0, -1.0).normalize();
        let next = planner.next_node_in_direction(
            planner.graph.node(NodeId(0)),
            direction,
            IntersectionHeuristic::Middle,
            0.5,
        );
        assert_eq!(next.map(GraphNode::id), Some(NodeId(3)));
    }

    #[test]
    fn incoming_edges_are_used_against_edge_direction() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(2));
        let request = PathRequest::new(DVec2::new(2.0, 0.0), DVec2::NEG_X).with_lookahead(5);
        let path = planner.generate_local_path(&request);
        assert_eq!(path.ids(), vec![NodeId(2), NodeId(1), NodeId(0)]);
    }

    #[test]
    fn left_lane_path_on_two_lane_road() {
        let track = two_lane_road(20, &TrackLayout::default()).unwrap();
        let graph = Arc::new(track.graph);
        let mut planner = PathPlanner::new(graph.clone(), track.right_lane[5]);
        let position = graph.node(track.right_lane[5]).position();
        let request = PathRequest::new(position, DVec2::X).with_lookahead(4);

        let path = planner.generate_local_path_on_left_lane(&request).unwrap();
        let expected: Vec<NodeId> = (5..=9).map(|j| track.left_lane[j]).collect();
        assert_eq!(path.ids(), expected);
        assert_eq!(
            planner.left_lane_cache.get(&track.right_lane[5]),
            Some(&track.left_lane[5])
        );

        // Second call hits the cache.
        let cached = planner.generate_local_path_on_left_lane(&request).unwrap();
        assert_eq!(cached, path);
    }

    #[test]
    fn left_lane_falls_back_to_current_lane() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(0));
        let request = PathRequest::new(DVec2::ZERO, DVec2::X).with_lookahead(2);
        let path = planner.generate_local_path_on_left_lane(&request).unwrap();
        assert_eq!(path.ids(), vec![NodeId(0), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn left_lane_needs_a_successor() {
        let mut planner = PathPlanner::new(line_graph(), NodeId(2));
        let request = PathRequest::new(DVec2::new(2.0, 0.0), DVec2::X);
        assert!(planner.generate_local_path_on_left_lane(&request).is_none());
    }

    #[test]
    fn vector_to_path_skips_current_and_near_nodes() {
        let planner = PathPlanner::new(line_graph(), NodeId(0));
        let path = planner.generate_local_path_from(
            NodeId(0),
            &PathRequest::new(DVec2::ZERO, DVec2::X).with_lookahead(2),
        );
        let position = DVec2::new(0.5, 0.5);
        let towards = planner
            .get_vector_to_path(position, DVec2::X, &path, 0.5)
            .unwrap();
        let expected = DVec2::new(0.5, -0.5).normalize();
        assert!((towards - expected).length() < 1e-12);

        let far = planner
            .get_vector_to_path(position, DVec2::X, &path, 1.0)
            .unwrap();
        let expected = DVec2::new(1.5, -0.5).normalize();
        assert!((far - expected).length() < 1e-12);

        let too_far = planner.get_vector_to_path(position, DVec2::X, &path, 5.0);
        assert!(too_far.is_none());
    }
}
