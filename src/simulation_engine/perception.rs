// perception.rs
//
// Lead-vehicle detection on the planned path.

use crate::global_variables::{DEFAULT_MAX_ANGLE, MAX_PERCEPTION_VIEW, PATH_CORRIDOR};
use crate::path_planning::Path;
use crate::road_network::geometry::{cross_track_distance, in_direction};
use crate::vehicle_dynamics::BicycleModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapScanParams {
    /// Obstacles at or beyond this gap are not seen (m).
    pub perception_range: f64,
    /// Half-width of the corridor around path segments (m).
    pub corridor: f64,
}

impl Default for GapScanParams {
    fn default() -> Self {
        Self {
            perception_range: MAX_PERCEPTION_VIEW,
            corridor: PATH_CORRIDOR,
        }
    }
}

/// Smallest gap (centre distance minus the ego wheelbase) to an obstacle
/// ahead of the ego vehicle that sits on `path`.
pub fn scan_for_gap<'a>(
    ego: &BicycleModel,
    obstacles: impl IntoIterator<Item = &'a BicycleModel>,
    path: &Path,
    params: &GapScanParams,
) -> Option<f64> {
    let heading = ego.heading();
    let wheelbase = ego.geometry().wheelbase;
    obstacles
        .into_iter()
        .filter_map(|obstacle| {
            let to_obstacle = obstacle.vector_from(ego.position());
            if !in_direction(heading, to_obstacle, DEFAULT_MAX_ANGLE) {
                return None;
            }
            let gap = to_obstacle.length() - wheelbase;
            if gap >= params.perception_range {
                return None;
            }
            let on_path = path.segments().any(|(p1, p2)| {
                cross_track_distance(p1, p2, obstacle.position())
                    .is_some_and(|distance| distance.abs() < params.corridor)
            });
            on_path.then_some(gap)
        })
        .min_by(f64::total_cmp)
}
