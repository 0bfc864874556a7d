use glam::{DAffine2, DVec2};

use crate::road_network::geometry::{cross_track_distance, signed_angle};
use crate::vehicle_dynamics::ControlCommand;

/// Result of one Stanley evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StanleyOutput {
    /// deg, positive steers right
    pub steering_angle: f64,
    /// Signed distance of the front axle from the path line (m).
    pub cross_track_error: f64,
    /// rad
    pub heading_error: f64,
}

impl StanleyOutput {
    /// Pairs the steering angle with a target speed.
    pub fn command(&self, target_speed: f64) -> ControlCommand {
        ControlCommand::new(target_speed, self.steering_angle)
    }
}

/// Stanley path-tracking law on one path segment, evaluated at the front axle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StanleyController {
    pub gain: f64,
}

impl Default for StanleyController {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

impl StanleyController {
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }

    pub fn steer(
        &self,
        previous: DVec2,
        next: DVec2,
        speed: f64,
        front_axle: &DAffine2,
    ) -> StanleyOutput {
        let segment = next - previous;
        let heading = front_axle.matrix2.x_axis;
        // Coincident waypoints leave only the heading term.
        let cross_track_error =
            cross_track_distance(previous, next, front_axle.translation).unwrap_or(0.0);
        let heading_error = -signed_angle(heading, segment);
        let steering = heading_error + (self.gain * cross_track_error).atan2(speed);
        StanleyOutput {
            steering_angle: steering.to_degrees(),
            cross_track_error,
            heading_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_the_line_and_aligned_gives_zero() {
        let controller = StanleyController::new(1.0);
        let pose = DAffine2::from_translation(DVec2::new(0.5, 0.0));
        let out = controller.steer(DVec2::ZERO, DVec2::new(1.0, 0.0), 1.0, &pose);
        assert_eq!(out.cross_track_error, 0.0);
        assert!(out.heading_error.abs() < 1e-12);
        assert!(out.steering_angle.abs() < 1e-9);
    }

    #[test]
    fn offset_to_the_left_steers_right() {
        let controller = StanleyController::new(1.0);
        let pose = DAffine2::from_translation(DVec2::new(0.5, -0.5));
        let out = controller.steer(DVec2::ZERO, DVec2::new(1.0, 0.0), 1.0, &pose);
        assert!((out.cross_track_error - 0.5).abs() < 1e-12);
        let expected = 0.5_f64.atan2(1.0).to_degrees();
        assert!((out.steering_angle - expected).abs() < 1e-9);
    }

    #[test]
    fn heading_error_turns_towards_segment() {
        let controller = StanleyController::new(0.0);
        // Segment turns towards +y, to the right of a +x heading.
        let pose = DAffine2::IDENTITY;
        let out = controller.steer(DVec2::ZERO, DVec2::new(1.0, 1.0), 1.0, &pose);
        let quarter_turn = std::f64::consts::FRAC_PI_4;
        assert!((out.heading_error - quarter_turn).abs() < 1e-12);
        assert!((out.steering_angle - 45.0).abs() < 1e-9);
    }

    #[test]
    fn output_becomes_a_command() {
        let controller = StanleyController::new(1.0);
        let pose = DAffine2::from_translation(DVec2::new(0.5, -0.5));
        let out = controller.steer(DVec2::ZERO, DVec2::new(1.0, 0.0), 1.0, &pose);
        let command = out.command(0.8);
        assert_eq!(command.target_speed, 0.8);
        assert_eq!(command.steering_angle, out.steering_angle);
    }

    #[test]
    fn coincident_waypoints_are_finite() {
        let controller = StanleyController::new(2.0);
        let pose = DAffine2::from_translation(DVec2::new(3.0, -1.0));
        let out = controller.steer(DVec2::ONE, DVec2::ONE, 0.0, &pose);
        assert_eq!(out.cross_track_error, 0.0);
        assert!(out.steering_angle.is_finite());
        assert!(out.heading_error.is_finite());
    }
}
