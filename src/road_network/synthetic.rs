// synthetic.rs
//
// Procedurally generated two-lane tracks for demos, benches and tests.
// The right lane is driven in the direction of travel; the left lane is the
// oncoming lane, offset by `lane_width` to the left and linked the opposite way.

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::errors::GraphError;
use crate::road_network::graph::{NodeId, RoadGraph, RoadGraphBuilder};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackLayout {
    /// Distance between consecutive nodes of a lane (m).
    pub node_spacing: f64,
    /// Lateral distance between the two lane centres (m).
    pub lane_width: f64,
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self {
            node_spacing: 0.25,
            lane_width: 0.35,
        }
    }
}

/// A generated graph plus the node ids of each lane in driving order.
#[derive(Debug, Clone)]
pub struct TwoLaneTrack {
    pub graph: RoadGraph,
    pub right_lane: Vec<NodeId>,
    pub left_lane: Vec<NodeId>,
}

/// Straight road along +x. Right lane node `j` sits at `(j * spacing, 0)`,
/// left lane node `j` at `(j * spacing, -lane_width)`.
pub fn two_lane_road(node_count: usize, layout: &TrackLayout) -> Result<TwoLaneTrack, GraphError> {
    let samples: Vec<(DVec2, DVec2)> = (0..node_count)
        .map(|j| (DVec2::new(j as f64 * layout.node_spacing, 0.0), DVec2::X))
        .collect();
    build_track(&samples, layout.lane_width, false)
}

/// Closed stadium, driven clockwise as seen with left on the left: two
/// straights of `straight_length` joined by half circles of `radius`. The
/// first right-lane node is at the origin facing +x.
pub fn two_lane_loop(
    straight_length: f64,
    radius: f64,
    layout: &TrackLayout,
) -> Result<TwoLaneTrack, GraphError> {
    let perimeter = 2.0 * straight_length + 2.0 * PI * radius;
    let count = ((perimeter / layout.node_spacing).round() as usize).max(4);
    let spacing = perimeter / count as f64;
    let samples: Vec<(DVec2, DVec2)> = (0..count)
        .map(|i| stadium_sample(i as f64 * spacing, straight_length, radius))
        .collect();
    build_track(&samples, layout.lane_width, true)
}

/// Position and unit tangent at arc length `t` along the stadium centre line.
fn stadium_sample(t: f64, straight: f64, radius: f64) -> (DVec2, DVec2) {
    let half_turn = PI * radius;
    if t < straight {
        (DVec2::new(t, 0.0), DVec2::X)
    } else if t < straight + half_turn {
        let theta = (t - straight) / radius;
        let x = straight + radius * theta.sin();
        let y = radius - radius * theta.cos();
        (DVec2::new(x, y), DVec2::new(theta.cos(), theta.sin()))
    } else if t < 2.0 * straight + half_turn {
        let u = t - straight - half_turn;
        (DVec2::new(straight - u, 2.0 * radius), DVec2::NEG_X)
    } else {
        let theta = (t - 2.0 * straight - half_turn) / radius;
        let x = -radius * theta.sin();
        let y = radius + radius * theta.cos();
        (DVec2::new(x, y), DVec2::new(-theta.cos(), -theta.sin()))
    }
}

fn build_track(
    samples: &[(DVec2, DVec2)],
    lane_width: f64,
    closed: bool,
) -> Result<TwoLaneTrack, GraphError> {
    let mut builder = RoadGraphBuilder::new();
    let right_lane: Vec<NodeId> = samples
        .iter()
        .map(|&(position, _)| builder.add_node(position))
        .collect();
    let left_lane: Vec<NodeId> = samples
        .iter()
        .map(|&(position, tangent)| {
            let left = DVec2::new(tangent.y, -tangent.x);
            builder.add_node(position + left * lane_width)
        })
        .collect();

    for pair in right_lane.windows(2) {
        builder.add_edge(pair[0], pair[1]);
    }
    for pair in left_lane.windows(2) {
        builder.add_edge(pair[1], pair[0]);
    }
    if closed && samples.len() > 2 {
        let last = samples.len() - 1;
        builder.add_edge(right_lane[last], right_lane[0]);
        builder.add_edge(left_lane[0], left_lane[last]);
    }

    Ok(TwoLaneTrack {
        graph: builder.build()?,
        right_lane,
        left_lane,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_road_layout() {
        let layout = TrackLayout::default();
        let track = two_lane_road(5, &layout).unwrap();
        assert_eq!(track.graph.len(), 10);
        assert_eq!(track.right_lane[3], NodeId(3));
        assert_eq!(track.left_lane[3], NodeId(8));
        assert_eq!(
            track.graph.node(track.left_lane[2]).position(),
            DVec2::new(0.5, -0.35)
        );
        // Right lane runs forward, left lane runs back.
        assert_eq!(track.graph.node(NodeId(1)).to(), &[NodeId(2)]);
        assert_eq!(track.graph.node(NodeId(6)).to(), &[NodeId(5)]);
        assert!(track.graph.node(NodeId(4)).to().is_empty());
    }

    #[test]
    fn empty_road_is_rejected() {
        assert!(matches!(
            two_lane_road(0, &TrackLayout::default()),
            Err(GraphError::Empty)
        ));
    }

    #[test]
    fn loop_is_closed_and_left_lane_is_outside() {
        let layout = TrackLayout::default();
        let track = two_lane_loop(3.0, 1.0, &layout).unwrap();
        let centre = DVec2::new(1.5, 1.0);
        for (&right, &left) in track.right_lane.iter().zip(&track.left_lane) {
            let right_node = track.graph.node(right);
            let left_node = track.graph.node(left);
            assert_eq!(right_node.to().len(), 1);
            assert_eq!(right_node.from().len(), 1);
            assert_eq!(left_node.to().len(), 1);
            let offset = left_node.position() - right_node.position();
            assert!((offset.length() - 0.35).abs() < 1e-9);
            let outer = left_node.position().distance(centre);
            assert!(outer > right_node.position().distance(centre));
        }
        let last = *track.right_lane.last().unwrap();
        assert_eq!(track.graph.node(last).to(), &[track.right_lane[0]]);
    }
}
