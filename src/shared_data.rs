// src/shared_data.rs

use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::control_system::PidGains;
use crate::errors::ConfigError;
use crate::path_planning::{IntersectionHeuristic, LaneChoice};
use crate::vehicle_dynamics::DynamicLimits;

/// Which scenario drives the ego vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    #[default]
    ManualControl,
    LateralControlTuning,
    LongitudinalControlTuning,
    OvertakeManeuver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    Overview,
    Onboard,
}

/// Everything the presentation layer can change while the simulation runs.
/// A snapshot of this is handed to every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mode: SimulationMode,
    pub lane_choice: LaneChoice,
    pub intersection_heuristic: IntersectionHeuristic,
    pub pid_gains: PidGains,
    /// Gap (m) the speed controller tries to hold behind a lead vehicle.
    pub goal_distance: f64,
    /// Gap (m) below which Automatic lane choice tries to overtake.
    pub overtake_trigger_distance: f64,
    /// Cruise speed as a fraction of the vehicle's top speed.
    pub max_speed_duty: f64,
    pub limits: DynamicLimits,
    pub stanley_gain: f64,
    pub running: bool,
    /// Manual throttle duty cycle in [-1, 1].
    pub throttle: f64,
    /// Manual steering duty cycle in [-1, 1], positive steers right.
    pub steering: f64,
    pub camera_mode: CameraMode,
    pub perception_view: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: SimulationMode::default(),
            lane_choice: LaneChoice::default(),
            intersection_heuristic: IntersectionHeuristic::default(),
            pid_gains: PidGains::default(),
            goal_distance: 0.3,
            overtake_trigger_distance: 0.6,
            max_speed_duty: 0.5,
            limits: DynamicLimits::default(),
            stanley_gain: 1.0,
            running: false,
            throttle: 0.0,
            steering: 0.0,
            camera_mode: CameraMode::default(),
            perception_view: false,
        }
    }
}

impl SimulationConfig {
    /// Loads a config from JSON. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Single value shared between the simulation driver and its readers.
/// Reads return whole clones, so a reader never sees a half-written value.
#[derive(Debug, Default)]
pub struct SharedState<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedState<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn snapshot(&self) -> T {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update<R>(&self, edit: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut *guard)
    }

    pub fn replace(&self, value: T) {
        self.update(|current| *current = value);
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}
