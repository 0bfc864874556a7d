use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            p: 1.0,
            i: 0.0,
            d: 0.0,
        }
    }
}

/// Textbook PID. The integral is not clamped.
#[derive(Debug, Clone, Default)]
pub struct PidController {
    integral: f64,
    previous_error: f64,
}

impl PidController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calculate(&mut self, target: f64, previous: f64, gains: PidGains, dt: f64) -> f64 {
        let error = target - previous;
        self.integral += error * dt;
        let derivative = if dt > 0.0 {
            (error - self.previous_error) / dt
        } else {
            0.0
        };
        self.previous_error = error;
        gains.p * error + gains.i * self.integral + gains.d * derivative
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_gains(p: f64, i: f64, d: f64) -> PidGains {
        PidGains { p, i, d }
    }

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new();
        let gains = pid_gains(2.0, 0.0, 0.0);
        assert_eq!(pid.calculate(3.0, 1.0, gains, 0.1), 4.0);
        assert_eq!(pid.calculate(1.0, 1.5, gains, 0.1), -1.0);
    }

    #[test]
    fn integral_and_derivative_terms() {
        let mut pid = PidController::new();
        let gains = pid_gains(0.0, 1.0, 0.0);
        pid.calculate(1.0, 0.0, gains, 0.5);
        let out = pid.calculate(1.0, 0.0, gains, 0.5);
        assert!((out - 1.0).abs() < 1e-12);

        let mut pid = PidController::new();
        let gains = pid_gains(0.0, 0.0, 1.0);
        assert!((pid.calculate(1.0, 0.0, gains, 0.5) - 2.0).abs() < 1e-12);
        assert!(pid.calculate(1.0, 0.0, gains, 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_positive_dt_has_no_derivative() {
        let mut pid = PidController::new();
        let gains = pid_gains(1.0, 0.0, 10.0);
        let out = pid.calculate(2.0, 0.0, gains, 0.0);
        assert_eq!(out, 2.0);
        assert!(out.is_finite());
    }

    #[test]
    fn integral_is_unbounded() {
        let mut pid = PidController::new();
        let gains = pid_gains(0.0, 1.0, 0.0);
        for _ in 0..1000 {
            pid.calculate(10.0, 0.0, gains, 1.0);
        }
        assert_eq!(pid.integral(), 10_000.0);
    }
}
