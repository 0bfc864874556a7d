// simulation.rs
//
// Per-tick orchestration of the ego vehicle and the obstacle vehicles:
// plan, scan for a lead vehicle, arbitrate the lane, control, integrate.

use std::sync::Arc;

use crate::control_system::{PidController, StanleyController};
use crate::errors::GraphError;
use crate::global_variables::{
    DASHBOARD_EVERY, DEFAULT_CLIPPING_DISTANCE, MAX_PERCEPTION_VIEW, MAX_SPEED, OBSTACLE_LOOKAHEAD,
    OBSTACLE_SPEED, OBSTACLE_STANLEY_GAIN, TELEMETRY_EVERY, TICK_COUNTER_PERIOD,
};
use crate::monitoring::{Telemetry, TelemetryChannel, TelemetrySample};
use crate::path_planning::{LaneChoice, Path, PathPlanner, PathRequest};
use crate::road_network::{NodeId, RoadGraph, StartHeading};
use crate::shared_data::{CameraMode, SimulationConfig, SimulationMode};
use crate::simulation_engine::perception::{scan_for_gap, GapScanParams};
use crate::simulation_engine::renderer::{PathOverlay, SceneRenderer, VehicleId};
use crate::vehicle_dynamics::{BicycleModel, ControlCommand, VehicleGeometry};

/// Where the vehicles start. All vehicles share one geometry.
#[derive(Debug, Clone)]
pub struct SimulationSetup {
    pub ego_start: NodeId,
    pub obstacle_starts: Vec<NodeId>,
    pub heading: StartHeading,
    pub geometry: VehicleGeometry,
}

impl SimulationSetup {
    pub fn new(ego_start: NodeId) -> Self {
        Self {
            ego_start,
            obstacle_starts: Vec::new(),
            heading: StartHeading::East,
            geometry: VehicleGeometry::default(),
        }
    }

    pub fn with_obstacles(mut self, starts: impl IntoIterator<Item = NodeId>) -> Self {
        self.obstacle_starts.extend(starts);
        self
    }

    pub fn with_heading(mut self, heading: StartHeading) -> Self {
        self.heading = heading;
        self
    }
}

/// A simulated car with its own planner.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub model: BicycleModel,
    pub planner: PathPlanner,
}

impl Vehicle {
    fn spawn(
        graph: &Arc<RoadGraph>,
        start: NodeId,
        heading: StartHeading,
        geometry: VehicleGeometry,
    ) -> Result<Self, GraphError> {
        graph.require(start)?;
        Ok(Self {
            model: BicycleModel::new(graph.start_pose(start, heading), geometry),
            planner: PathPlanner::new(Arc::clone(graph), start),
        })
    }

    fn reset(&mut self) {
        self.model.reset();
        self.planner.reset();
    }

    fn request(&self) -> PathRequest {
        PathRequest::new(self.model.position(), self.model.heading())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Nothing to integrate (stopped, first tick or non-positive dt).
    Idle,
    Stepped,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub status: TickStatus,
    pub samples: Vec<TelemetrySample>,
}

impl TickOutcome {
    fn idle() -> Self {
        Self {
            status: TickStatus::Idle,
            samples: Vec::new(),
        }
    }
}

pub struct Simulation<R: SceneRenderer> {
    graph: Arc<RoadGraph>,
    ego: Vehicle,
    speed_pid: PidController,
    obstacles: Vec<Vehicle>,
    renderer: R,
    overlay: PathOverlay,
    telemetry: Telemetry,
    counter: u32,
    needs_reset: bool,
    last_timestamp: Option<f64>,
    lane_change_engaged: bool,
    camera_mode: Option<CameraMode>,
    perception_view: Option<bool>,
}

impl<R: SceneRenderer> Simulation<R> {
    pub fn new(
        graph: Arc<RoadGraph>,
        setup: &SimulationSetup,
        renderer: R,
    ) -> Result<Self, GraphError> {
        let ego = Vehicle::spawn(&graph, setup.ego_start, setup.heading, setup.geometry)?;
        let obstacles = setup
            .obstacle_starts
            .iter()
            .map(|&start| Vehicle::spawn(&graph, start, setup.heading, setup.geometry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut simulation = Self {
            graph,
            ego,
            speed_pid: PidController::new(),
            obstacles,
            renderer,
            overlay: PathOverlay::default(),
            telemetry: Telemetry::default(),
            counter: 0,
            needs_reset: false,
            last_timestamp: None,
            lane_change_engaged: false,
            camera_mode: None,
            perception_view: None,
        };
        simulation.publish_poses();
        log::info!(
            "Simulation ready: ego at node {:?}, {} obstacle(s)",
            setup.ego_start,
            simulation.obstacles.len()
        );
        Ok(simulation)
    }

    /// Wall-clock entry point. The first call only records the timestamp.
    pub fn tick(&mut self, config: &SimulationConfig, timestamp: f64) -> TickOutcome {
        let dt = self
            .last_timestamp
            .replace(timestamp)
            .map_or(0.0, |last| timestamp - last);
        self.advance(config, dt)
    }

    /// Fixed-step entry point.
    pub fn advance(&mut self, config: &SimulationConfig, dt: f64) -> TickOutcome {
        self.ego.model.set_limits(config.limits);
        self.sync_view(config);

        if config.running && dt > 0.0 {
            let mut samples = Vec::new();
            match config.mode {
                SimulationMode::ManualControl => self.drive_manually(config, dt, &mut samples),
                _ => self.run_autonomy(config, dt, &mut samples),
            }
            for obstacle in &mut self.obstacles {
                drive_obstacle(obstacle, dt);
            }
            self.publish_poses();

            self.counter = (self.counter + 1) % TICK_COUNTER_PERIOD;
            self.needs_reset = true;
            for sample in &samples {
                self.telemetry.record(*sample);
            }
            return TickOutcome {
                status: TickStatus::Stepped,
                samples,
            };
        }

        if !config.running && self.needs_reset {
            self.reset();
            return TickOutcome {
                status: TickStatus::Reset,
                samples: Vec::new(),
            };
        }
        TickOutcome::idle()
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    pub fn ego(&self) -> &BicycleModel {
        &self.ego.model
    }

    pub fn ego_planner(&self) -> &PathPlanner {
        &self.ego.planner
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &BicycleModel> {
        self.obstacles.iter().map(|obstacle| &obstacle.model)
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// True while the ego follows a substituted left-lane path.
    pub fn lane_change_engaged(&self) -> bool {
        self.lane_change_engaged
    }

    fn drive_manually(
        &mut self,
        config: &SimulationConfig,
        dt: f64,
        samples: &mut Vec<TelemetrySample>,
    ) {
        let ego = &mut self.ego.model;
        ego.step_duty(config.throttle, config.steering, dt);
        if self.counter % TELEMETRY_EVERY == 0 {
            samples.push(TelemetrySample::new(
                TelemetryChannel::Speed,
                self.ego.model.display_speed(),
            ));
            samples.push(TelemetrySample::new(
                TelemetryChannel::SteeringAngle,
                self.ego.model.steering_angle(),
            ));
        }
        if self.counter % DASHBOARD_EVERY == 0 {
            self.update_dashboard();
        }
    }

    fn run_autonomy(
        &mut self,
        config: &SimulationConfig,
        dt: f64,
        samples: &mut Vec<TelemetrySample>,
    ) {
        let sample_now = self.counter % TELEMETRY_EVERY == 0;
        let request = self
            .ego
            .request()
            .with_heuristic(config.intersection_heuristic);
        let path = match config.lane_choice {
            LaneChoice::Left => self.ego.planner.generate_local_path_on_left_lane(&request),
            LaneChoice::Right | LaneChoice::Automatic => {
                Some(self.ego.planner.generate_local_path(&request))
            }
        };
        let Some(mut path) = path.filter(|path| path.len() > 3) else {
            return;
        };

        let mut speed = config.max_speed_duty * MAX_SPEED;
        let params = GapScanParams::default();
        let mut lane_change = false;
        match self.scan(&path, &params) {
            Some(gap) => {
                let trigger = config.overtake_trigger_distance;
                if config.lane_choice == LaneChoice::Automatic && gap < trigger {
                    if let Some(left) = self.clear_left_lane(&request, &params, trigger) {
                        path = left;
                        lane_change = true;
                    }
                }
                if !lane_change {
                    let command = self.speed_pid.calculate(
                        gap - config.goal_distance,
                        self.ego.model.speed(),
                        config.pid_gains,
                        dt,
                    );
                    speed = speed.min(command.max(0.0));
                    if sample_now {
                        samples.push(TelemetrySample::new(TelemetryChannel::GapDistance, gap));
                    }
                }
            }
            None => {
                if sample_now {
                    samples.push(TelemetrySample::new(TelemetryChannel::GapDistance, f64::NAN));
                }
            }
        }
        if lane_change != self.lane_change_engaged {
            let node = self.ego.planner.current_node();
            if lane_change {
                log::info!("Lane change engaged at node {:?}", node);
            } else {
                log::debug!("Back on the default lane at node {:?}", node);
            }
            self.lane_change_engaged = lane_change;
        }

        self.overlay.update(&path, &mut self.renderer);

        let stanley = StanleyController::new(config.stanley_gain).steer(
            path.nodes[1].position,
            path.nodes[2].position,
            self.ego.model.speed(),
            &self.ego.model.front_axle_pose(),
        );
        if sample_now {
            samples.push(TelemetrySample::new(
                TelemetryChannel::CrossTrackError,
                stanley.cross_track_error.abs(),
            ));
            samples.push(TelemetrySample::new(
                TelemetryChannel::HeadingError,
                stanley.heading_error.abs(),
            ));
        }

        self.ego.model.apply(stanley.command(speed), dt);
        if self.counter % DASHBOARD_EVERY == 0 {
            self.update_dashboard();
        }
    }

    fn scan(&self, path: &Path, params: &GapScanParams) -> Option<f64> {
        scan_for_gap(&self.ego.model, self.obstacles(), path, params)
    }

    /// Left-lane path to overtake on, if nothing is within `trigger` on it.
    fn clear_left_lane(
        &mut self,
        request: &PathRequest,
        params: &GapScanParams,
        trigger: f64,
    ) -> Option<Path> {
        let left = self.ego.planner.generate_local_path_on_left_lane(request)?;
        self.left_lane_is_clear(&left, params, trigger)
            .then_some(left)
    }

    fn left_lane_is_clear(&self, left: &Path, params: &GapScanParams, trigger: f64) -> bool {
        left.len() > 3 && self.scan(left, params).map_or(true, |gap| gap > trigger)
    }

    fn update_dashboard(&mut self) {
        let speed = self.ego.model.display_speed();
        let steering = self.ego.model.steering_angle();
        let dashboard = &mut self.telemetry.dashboard;
        dashboard.set_speed(speed);
        dashboard.set_wheel_angle(steering);
    }

    fn sync_view(&mut self, config: &SimulationConfig) {
        if self.camera_mode != Some(config.camera_mode) {
            self.renderer.set_camera_mode(config.camera_mode);
            self.camera_mode = Some(config.camera_mode);
        }
        if self.perception_view != Some(config.perception_view) {
            let clipping = if config.perception_view {
                MAX_PERCEPTION_VIEW
            } else {
                DEFAULT_CLIPPING_DISTANCE
            };
            self.renderer
                .set_perception_view(config.perception_view, clipping);
            self.perception_view = Some(config.perception_view);
        }
    }

    fn publish_poses(&mut self) {
        self.renderer
            .set_vehicle_pose(VehicleId::Ego, &self.ego.model.pose());
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            self.renderer
                .set_vehicle_pose(VehicleId::Obstacle(index), &obstacle.model.pose());
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
        self.ego.reset();
        for obstacle in &mut self.obstacles {
            obstacle.reset();
        }
        self.overlay.clear(&mut self.renderer);
        self.telemetry.dashboard.reset();
        self.lane_change_engaged = false;
        self.publish_poses();
        self.needs_reset = false;
        log::info!("Simulation reset to start positions");
    }
}

/// Obstacles follow their own lane at a fixed cruise speed.
fn drive_obstacle(obstacle: &mut Vehicle, dt: f64) {
    let request = obstacle.request().with_lookahead(OBSTACLE_LOOKAHEAD);
    let path = obstacle.planner.generate_local_path(&request);
    if path.len() < 3 {
        obstacle.model.apply(ControlCommand::stop(), dt);
        return;
    }
    let stanley = StanleyController::new(OBSTACLE_STANLEY_GAIN).steer(
        path.nodes[1].position,
        path.nodes[2].position,
        obstacle.model.speed(),
        &obstacle.model.front_axle_pose(),
    );
    obstacle.model.apply(stanley.command(OBSTACLE_SPEED), dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_network::synthetic::{two_lane_road, TrackLayout, TwoLaneTrack};
    use crate::simulation_engine::renderer::{NullRenderer, TrajectoryRecorder};

    fn road() -> TwoLaneTrack {
        two_lane_road(40, &TrackLayout::default()).unwrap()
    }

    fn recording(graph: RoadGraph, setup: &SimulationSetup) -> Simulation<TrajectoryRecorder> {
        Simulation::new(Arc::new(graph), setup, TrajectoryRecorder::new()).unwrap()
    }

    fn running(mode: SimulationMode) -> SimulationConfig {
        SimulationConfig {
            mode,
            running: true,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn unknown_start_node_is_rejected() {
        let track = road();
        let graph = Arc::new(track.graph);
        let setup = SimulationSetup::new(NodeId(999));
        assert!(matches!(
            Simulation::new(graph, &setup, NullRenderer),
            Err(GraphError::UnknownNode(NodeId(999)))
        ));
    }

    #[test]
    fn first_tick_only_records_timestamp() {
        let track = road();
        let setup = SimulationSetup::new(track.right_lane[0]);
        let mut sim = Simulation::new(Arc::new(track.graph), &setup, NullRenderer).unwrap();
        let mut config = running(SimulationMode::ManualControl);
        config.throttle = 1.0;
        assert_eq!(sim.tick(&config, 100.0).status, TickStatus::Idle);
        assert_eq!(sim.tick(&config, 99.0).status, TickStatus::Idle);
        assert_eq!(sim.tick(&config, 99.1).status, TickStatus::Stepped);
        assert!(sim.ego().speed() > 0.0);
    }

    #[test]
    fn manual_mode_samples_every_tenth_tick() {
        let track = road();
        let setup = SimulationSetup::new(track.right_lane[0]);
        let mut sim = Simulation::new(Arc::new(track.graph), &setup, NullRenderer).unwrap();
        let mut config = running(SimulationMode::ManualControl);
        config.throttle = 0.5;
        let mut sampled = 0;
        for _ in 0..20 {
            let outcome = sim.advance(&config, 0.05);
            if !outcome.samples.is_empty() {
                assert_eq!(outcome.samples.len(), 2);
                sampled += 1;
            }
        }
        assert_eq!(sampled, 2);
        assert_eq!(sim.counter(), 0);
        // Last dashboard refresh was on tick 19, at 0.95 m/s.
        assert_eq!(sim.telemetry().dashboard.speed(), 34);
    }

    #[test]
    fn negative_steering_turns_towards_the_left_lane() {
        let drive = |steering: f64| {
            let track = road();
            let setup = SimulationSetup::new(track.right_lane[2]);
            let mut sim = Simulation::new(Arc::new(track.graph), &setup, NullRenderer).unwrap();
            let config = SimulationConfig {
                throttle: 0.5,
                steering,
                ..running(SimulationMode::ManualControl)
            };
            for _ in 0..20 {
                sim.advance(&config, 0.05);
            }
            sim.ego().position()
        };
        let track = road();
        let left_lane_y = track.graph.node(track.left_lane[5]).position().y;
        assert!(left_lane_y < 0.0);
        assert!(drive(-1.0).y < 0.0);
        assert!(drive(1.0).y > 0.0);
    }

    #[test]
    fn stop_resets_on_next_tick_only_once() {
        let track = road();
        let start = track.graph.node(track.right_lane[2]).position();
        let lead = track.right_lane[10];
        let setup = SimulationSetup::new(track.right_lane[2]).with_obstacles([lead]);
        let mut sim = recording(track.graph, &setup);
        let mut config = running(SimulationMode::LateralControlTuning);
        for _ in 0..30 {
            sim.advance(&config, 0.05);
        }
        assert!(sim.ego().position().x > start.x);
        assert!(!sim.renderer().current_path().is_empty());

        config.running = false;
        assert_eq!(sim.advance(&config, 0.05).status, TickStatus::Reset);
        assert_eq!(sim.ego().position(), start);
        assert_eq!(sim.ego().speed(), 0.0);
        assert_eq!(sim.ego_planner().current_node(), track.right_lane[2]);
        assert_eq!(sim.counter(), 0);
        assert!(sim.renderer().current_path().is_empty());
        assert_eq!(sim.advance(&config, 0.05).status, TickStatus::Idle);
    }

    #[test]
    fn follows_lane_and_keeps_cross_track_error_small() {
        let track = road();
        let setup = SimulationSetup::new(track.right_lane[0]);
        let mut sim = Simulation::new(Arc::new(track.graph), &setup, NullRenderer).unwrap();
        let config = running(SimulationMode::LateralControlTuning);
        for _ in 0..100 {
            sim.advance(&config, 0.05);
        }
        assert!(sim.ego().position().y.abs() < 0.05);
        assert!(sim.ego().position().x > 1.0);
        let errors = sim.telemetry().channel(TelemetryChannel::CrossTrackError);
        assert!(errors.iter().all(|cte| *cte < 0.05));
    }

    #[test]
    fn follows_lead_vehicle_without_overtaking() {
        let track = road();
        let setup = SimulationSetup::new(track.right_lane[0]).with_obstacles([track.right_lane[4]]);
        let mut sim = Simulation::new(Arc::new(track.graph), &setup, NullRenderer).unwrap();
        let config = running(SimulationMode::LongitudinalControlTuning);
        let mut gaps = Vec::new();
        for _ in 0..200 {
            let outcome = sim.advance(&config, 0.05);
            let gap_samples = outcome
                .samples
                .iter()
                .filter(|sample| sample.channel == TelemetryChannel::GapDistance)
                .map(|sample| sample.value);
            gaps.extend(gap_samples);
        }
        assert!(!sim.lane_change_engaged());
        assert!(gaps.iter().any(|gap| gap.is_finite()));
        let lead = sim.obstacles().next().unwrap().position();
        assert!(lead.x > sim.ego().position().x);
        assert!(lead.x - sim.ego().position().x > 0.25);
    }

    #[test]
    fn view_changes_reach_the_renderer() {
        let track = road();
        let setup = SimulationSetup::new(track.right_lane[0]);
        let mut sim = recording(track.graph, &setup);
        let mut config = SimulationConfig::default();
        sim.advance(&config, 0.0);
        assert_eq!(
            sim.renderer().clipping_distance(),
            Some(DEFAULT_CLIPPING_DISTANCE)
        );
        config.perception_view = true;
        config.camera_mode = CameraMode::Onboard;
        sim.advance(&config, 0.0);
        assert_eq!(
            sim.renderer().clipping_distance(),
            Some(MAX_PERCEPTION_VIEW)
        );
        assert_eq!(sim.renderer().camera_mode(), CameraMode::Onboard);
    }
}
