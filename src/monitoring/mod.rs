// monitoring/mod.rs
pub mod admin_console;
pub mod telemetry;
pub mod telemetry_report;

pub use admin_console::{run_console, ConsoleCommand};
pub use telemetry::{Dashboard, RingBuffer, Telemetry, TelemetryChannel, TelemetrySample};
pub use telemetry_report::{TelemetryRecord, TelemetryRecorder};
