// bicycle_model.rs
//
// Kinematic single-track model of the robocar. The pose is the rear axle
// centre; body +x is forward and body +y is right, since road coordinates
// mirror the asset's (x, z) plane. Positive steering turns right.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

use crate::global_variables::{
    DEFAULT_TRACK_WIDTH, DEFAULT_WHEELBASE, DISPLAY_SPEED_FACTOR, MAX_SPEED, MAX_STEERING_ANGLE,
};
use crate::road_network::geometry::signed_angle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleGeometry {
    pub wheelbase: f64,
    pub track_width: f64,
}

impl Default for VehicleGeometry {
    fn default() -> Self {
        Self {
            wheelbase: DEFAULT_WHEELBASE,
            track_width: DEFAULT_TRACK_WIDTH,
        }
    }
}

/// Rate limits, tunable while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicLimits {
    pub max_acceleration: f64,  // m/s^2
    pub max_deceleration: f64,  // m/s^2
    pub max_steering_rate: f64, // deg/s
}

impl Default for DynamicLimits {
    fn default() -> Self {
        Self {
            max_acceleration: 1.0,
            max_deceleration: 3.0,
            max_steering_rate: 90.0,
        }
    }
}

/// What a controller hands to the kinematics for one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlCommand {
    /// m/s
    pub target_speed: f64,
    /// deg, positive steers right
    pub steering_angle: f64,
}

impl ControlCommand {
    pub fn new(target_speed: f64, steering_angle: f64) -> Self {
        Self {
            target_speed,
            steering_angle,
        }
    }

    pub fn stop() -> Self {
        Self::default()
    }
}

/// Front wheel angles (rad) for display only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelAngles {
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone)]
pub struct BicycleModel {
    geometry: VehicleGeometry,
    limits: DynamicLimits,
    initial_pose: DAffine2,
    pose: DAffine2,
    speed: f64,
    steering_angle: f64,
    wheel_angles: WheelAngles,
}

impl BicycleModel {
    pub fn new(initial_pose: DAffine2, geometry: VehicleGeometry) -> Self {
        Self {
            geometry,
            limits: DynamicLimits::default(),
            initial_pose,
            pose: initial_pose,
            speed: 0.0,
            steering_angle: 0.0,
            wheel_angles: WheelAngles::default(),
        }
    }

    pub fn with_limits(mut self, limits: DynamicLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Integrates one step towards `target_speed` (m/s) and
    /// `target_steering` (deg).
    pub fn step(&mut self, target_speed: f64, target_steering: f64, dt: f64) {
        self.update_speed(target_speed, dt);

        let target_steering = target_steering.clamp(-MAX_STEERING_ANGLE, MAX_STEERING_ANGLE);
        let max_change = self.limits.max_steering_rate * dt;
        self.steering_angle +=
            (target_steering - self.steering_angle).clamp(-max_change, max_change);

        let delta = if self.steering_angle == 0.0 {
            self.wheel_angles = WheelAngles::default();
            DAffine2::from_translation(DVec2::new(self.speed * dt, 0.0))
        } else {
            let radius = self.geometry.wheelbase / self.steering_angle.to_radians().tan();
            let yaw_rate = self.speed / radius;
            self.wheel_angles = self.ackermann_angles(radius);
            // Rotate about the turn centre, which lies on the rear axle line.
            let centre = DVec2::new(0.0, radius);
            DAffine2::from_translation(centre)
                * DAffine2::from_angle(yaw_rate * dt)
                * DAffine2::from_translation(-centre)
        };
        self.pose = self.pose * delta;
    }

    pub fn apply(&mut self, command: ControlCommand, dt: f64) {
        self.step(command.target_speed, command.steering_angle, dt);
    }

    /// Manual driving with duty cycles in `[-1, 1]`.
    pub fn step_duty(&mut self, throttle: f64, steering: f64, dt: f64) {
        let speed = throttle.clamp(-1.0, 1.0) * MAX_SPEED;
        let steering = steering.clamp(-1.0, 1.0) * MAX_STEERING_ANGLE;
        self.step(speed, steering, dt);
    }

    /// Snaps the heading onto `direction` and drives `speed` (m/s) along the
    /// previous heading. Steering-rate limits do not apply.
    pub fn step_towards(&mut self, direction: DVec2, speed: f64, dt: f64) {
        self.update_speed(speed, dt);
        let yaw = -signed_angle(self.heading(), direction);
        let yaw = if yaw.is_finite() { yaw } else { 0.0 };
        let delta = DAffine2::from_angle_translation(yaw, DVec2::new(self.speed * dt, 0.0));
        self.pose = self.pose * delta;
    }

    pub fn reset(&mut self) {
        self.pose = self.initial_pose;
        self.speed = 0.0;
        self.steering_angle = 0.0;
        self.wheel_angles = WheelAngles::default();
    }

    pub fn set_limits(&mut self, limits: DynamicLimits) {
        self.limits = limits;
    }

    pub fn limits(&self) -> DynamicLimits {
        self.limits
    }

    pub fn geometry(&self) -> VehicleGeometry {
        self.geometry
    }

    pub fn pose(&self) -> DAffine2 {
        self.pose
    }

    pub fn position(&self) -> DVec2 {
        self.pose.translation
    }

    /// Unit vector along body +x.
    pub fn heading(&self) -> DVec2 {
        self.pose.matrix2.x_axis.normalize_or_zero()
    }

    /// Pose moved forward by the wheelbase; the Stanley reference point.
    pub fn front_axle_pose(&self) -> DAffine2 {
        self.pose * DAffine2::from_translation(DVec2::new(self.geometry.wheelbase, 0.0))
    }

    /// m/s
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Speed as a full-size car would show it, in km/h.
    pub fn display_speed(&self) -> f64 {
        self.speed * DISPLAY_SPEED_FACTOR
    }

    pub fn steering_angle(&self) -> f64 {
        self.steering_angle
    }

    pub fn wheel_angles(&self) -> WheelAngles {
        self.wheel_angles
    }

    pub fn vector_from(&self, point: DVec2) -> DVec2 {
        self.position() - point
    }

    pub fn distance_from(&self, point: DVec2) -> f64 {
        self.vector_from(point).length()
    }

    fn update_speed(&mut self, target_speed: f64, dt: f64) {
        let change = (target_speed - self.speed).clamp(
            -self.limits.max_deceleration * dt,
            self.limits.max_acceleration * dt,
        );
        self.speed += change;
    }

    fn ackermann_angles(&self, radius: f64) -> WheelAngles {
        let half_track = self.geometry.track_width / 2.0;
        WheelAngles {
            left: -(self.geometry.wheelbase / (radius - half_track)).atan(),
            right: -(self.geometry.wheelbase / (radius + half_track)).atan(),
        }
    }
}
