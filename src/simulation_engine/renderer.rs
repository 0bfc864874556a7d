// renderer.rs
//
// The scene the simulation draws into. A real front end implements
// `SceneRenderer`; headless runs use the null or recording renderers.

use std::collections::BTreeMap;

use glam::{DAffine2, DVec2};

use crate::path_planning::Path;
use crate::shared_data::CameraMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleId {
    Ego,
    Obstacle(usize),
}

impl VehicleId {
    pub fn label(self) -> String {
        match self {
            VehicleId::Ego => "ego".to_string(),
            VehicleId::Obstacle(index) => format!("obstacle {}", index),
        }
    }
}

/// Output side of the simulation. Every method defaults to a no-op.
pub trait SceneRenderer {
    fn set_vehicle_pose(&mut self, _vehicle: VehicleId, _pose: &DAffine2) {}

    fn draw_path(&mut self, _path: &[DVec2]) {}

    fn clear_path(&mut self) {}

    fn set_camera_mode(&mut self, _mode: CameraMode) {}

    fn set_perception_view(&mut self, _enabled: bool, _clipping_distance: f64) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl SceneRenderer for NullRenderer {}

/// Keeps pose histories and overlay draws for plotting and assertions.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    traces: BTreeMap<VehicleId, Vec<DVec2>>,
    current_path: Vec<DVec2>,
    drawn_paths: Vec<Vec<DVec2>>,
    camera_mode: CameraMode,
    clipping_distance: Option<f64>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(&self, vehicle: VehicleId) -> &[DVec2] {
        self.traces.get(&vehicle).map_or(&[], Vec::as_slice)
    }

    /// `(label, positions)` per vehicle, ego first.
    pub fn labelled_traces(&self) -> Vec<(String, Vec<DVec2>)> {
        self.traces
            .iter()
            .map(|(id, trace)| (id.label(), trace.clone()))
            .collect()
    }

    /// Overlay currently on screen; empty after a clear.
    pub fn current_path(&self) -> &[DVec2] {
        &self.current_path
    }

    /// Every overlay draw, oldest first.
    pub fn drawn_paths(&self) -> &[Vec<DVec2>] {
        &self.drawn_paths
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    pub fn clipping_distance(&self) -> Option<f64> {
        self.clipping_distance
    }
}

impl SceneRenderer for TrajectoryRecorder {
    fn set_vehicle_pose(&mut self, vehicle: VehicleId, pose: &DAffine2) {
        self.traces
            .entry(vehicle)
            .or_default()
            .push(pose.translation);
    }

    fn draw_path(&mut self, path: &[DVec2]) {
        self.current_path = path.to_vec();
        self.drawn_paths.push(path.to_vec());
    }

    fn clear_path(&mut self) {
        self.current_path.clear();
    }

    fn set_camera_mode(&mut self, mode: CameraMode) {
        self.camera_mode = mode;
    }

    fn set_perception_view(&mut self, _enabled: bool, clipping_distance: f64) {
        self.clipping_distance = Some(clipping_distance);
    }
}

/// Redraws the path overlay only when the path changes.
#[derive(Debug, Clone, Default)]
pub struct PathOverlay {
    last_drawn: Option<Path>,
}

impl PathOverlay {
    /// Returns `true` if the renderer was asked to redraw.
    pub fn update<R: SceneRenderer>(&mut self, path: &Path, renderer: &mut R) -> bool {
        if self.last_drawn.as_ref() == Some(path) {
            return false;
        }
        renderer.draw_path(&path.positions());
        self.last_drawn = Some(path.clone());
        true
    }

    pub fn clear<R: SceneRenderer>(&mut self, renderer: &mut R) {
        renderer.clear_path();
        self.last_drawn = None;
    }
}
