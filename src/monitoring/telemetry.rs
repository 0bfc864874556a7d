// telemetry.rs
//
// Rolling telemetry buffers and dashboard readouts read back by the
// presentation layer.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::global_variables::{DASHBOARD_WHEEL_RATIO, TELEMETRY_CAPACITY};

/// Fixed-capacity FIFO; writing to a full buffer drops the oldest value.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Full buffer holding `capacity` copies of `value`, so charts start
    /// with a flat line instead of an empty axis.
    pub fn prefilled(capacity: usize, value: T) -> Self {
        Self {
            values: std::iter::repeat(value).take(capacity).collect(),
            capacity,
        }
    }

    pub fn write(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelemetryChannel {
    Speed,
    SteeringAngle,
    CrossTrackError,
    HeadingError,
    GapDistance,
}

impl TelemetryChannel {
    pub const ALL: [TelemetryChannel; 5] = [
        TelemetryChannel::Speed,
        TelemetryChannel::SteeringAngle,
        TelemetryChannel::CrossTrackError,
        TelemetryChannel::HeadingError,
        TelemetryChannel::GapDistance,
    ];

    pub fn unit(self) -> &'static str {
        match self {
            TelemetryChannel::Speed => "km/h",
            TelemetryChannel::SteeringAngle => "deg",
            TelemetryChannel::CrossTrackError => "m",
            TelemetryChannel::HeadingError => "rad",
            TelemetryChannel::GapDistance => "m",
        }
    }
}

impl fmt::Display for TelemetryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryChannel::Speed => "speed",
            TelemetryChannel::SteeringAngle => "steering angle",
            TelemetryChannel::CrossTrackError => "cross-track error",
            TelemetryChannel::HeadingError => "heading error",
            TelemetryChannel::GapDistance => "gap distance",
        };
        f.write_str(name)
    }
}

/// One value emitted by a tick. Gap samples are NaN when nothing is ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub channel: TelemetryChannel,
    pub value: f64,
}

impl TelemetrySample {
    pub fn new(channel: TelemetryChannel, value: f64) -> Self {
        Self { channel, value }
    }
}

/// Integer readouts that only change when the displayed value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dashboard {
    speed: i32,
    wheel_angle: i32,
}

impl Dashboard {
    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn wheel_angle(&self) -> i32 {
        self.wheel_angle
    }

    /// Returns `true` if the shown speed changed.
    pub fn set_speed(&mut self, display_speed: f64) -> bool {
        let value = display_speed as i32;
        let changed = value != self.speed;
        self.speed = value;
        changed
    }

    /// Returns `true` if the shown steering-wheel angle changed.
    pub fn set_wheel_angle(&mut self, steering_angle: f64) -> bool {
        let value = (steering_angle * DASHBOARD_WHEEL_RATIO) as i32;
        let changed = value != self.wheel_angle;
        self.wheel_angle = value;
        changed
    }

    pub fn reset(&mut self) {
        self.set_speed(0.0);
        self.set_wheel_angle(0.0);
    }
}

/// Rolling buffers for every channel plus the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    speeds: RingBuffer<f64>,
    steering_angles: RingBuffer<f64>,
    cross_track_errors: RingBuffer<f64>,
    heading_errors: RingBuffer<f64>,
    gap_distances: RingBuffer<f64>,
    pub dashboard: Dashboard,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::with_capacity(TELEMETRY_CAPACITY)
    }
}

impl Telemetry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            speeds: RingBuffer::prefilled(capacity, 0.0),
            steering_angles: RingBuffer::prefilled(capacity, 0.0),
            cross_track_errors: RingBuffer::prefilled(capacity, 0.0),
            heading_errors: RingBuffer::prefilled(capacity, 0.0),
            gap_distances: RingBuffer::prefilled(capacity, f64::NAN),
            dashboard: Dashboard::default(),
        }
    }

    pub fn record(&mut self, sample: TelemetrySample) {
        self.channel_mut(sample.channel).write(sample.value);
    }

    pub fn channel(&self, channel: TelemetryChannel) -> &RingBuffer<f64> {
        match channel {
            TelemetryChannel::Speed => &self.speeds,
            TelemetryChannel::SteeringAngle => &self.steering_angles,
            TelemetryChannel::CrossTrackError => &self.cross_track_errors,
            TelemetryChannel::HeadingError => &self.heading_errors,
            TelemetryChannel::GapDistance => &self.gap_distances,
        }
    }

    fn channel_mut(&mut self, channel: TelemetryChannel) -> &mut RingBuffer<f64> {
        match channel {
            TelemetryChannel::Speed => &mut self.speeds,
            TelemetryChannel::SteeringAngle => &mut self.steering_angles,
            TelemetryChannel::CrossTrackError => &mut self.cross_track_errors,
            TelemetryChannel::HeadingError => &mut self.heading_errors,
            TelemetryChannel::GapDistance => &mut self.gap_distances,
        }
    }
}
