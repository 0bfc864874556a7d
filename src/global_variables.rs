// Vehicle limits (1:10 scale robocar)
pub const MAX_STEERING_ANGLE: f64 = 30.0; // deg
pub const MAX_SPEED: f64 = 2.7; // m/s
pub const DEFAULT_WHEELBASE: f64 = 0.25; // m
pub const DEFAULT_TRACK_WIDTH: f64 = 0.2; // m

/// Multiplier from model m/s to the km/h shown on the dashboard at 1:1 scale.
pub const DISPLAY_SPEED_FACTOR: f64 = 36.0;
/// Multiplier from steering angle to the dashboard steering-wheel angle.
pub const DASHBOARD_WHEEL_RATIO: f64 = 18.0;

// Path planning
pub const DEFAULT_MAX_ANGLE: f64 = 1.57; // rad
pub const DEFAULT_LOOKAHEAD: usize = 8;
pub const LEFT_LANE_SEARCH_CONE: f64 = 0.75; // rad
pub const LEFT_LANE_SEARCH_RADIUS: f64 = 2.0; // m
pub const LEFT_LANE_FIRST_STEP_CONE: f64 = 0.6; // rad

// Perception
pub const MAX_PERCEPTION_VIEW: f64 = 4.0; // m
pub const PATH_CORRIDOR: f64 = 0.1; // m
pub const DEFAULT_CLIPPING_DISTANCE: f64 = 30.0; // m

// Obstacle vehicles
pub const OBSTACLE_LOOKAHEAD: usize = 4;
pub const OBSTACLE_STANLEY_GAIN: f64 = 1.5;
pub const OBSTACLE_SPEED: f64 = 0.4; // m/s

// Tick decimation
pub const TICK_COUNTER_PERIOD: u32 = 10;
pub const TELEMETRY_EVERY: u32 = 10;
pub const DASHBOARD_EVERY: u32 = 2;

pub const TELEMETRY_CAPACITY: usize = 60;
