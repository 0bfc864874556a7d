// admin_console.rs
//
// Line-based operator console that edits the shared simulation config
// while the driver loop runs.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::control_system::PidGains;
use crate::monitoring::telemetry::{Telemetry, TelemetryChannel};
use crate::path_planning::{IntersectionHeuristic, LaneChoice};
use crate::shared_data::{CameraMode, SharedState, SimulationConfig, SimulationMode};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Mode(SimulationMode),
    Lane(LaneChoice),
    Heuristic(IntersectionHeuristic),
    Throttle(f64),
    Steer(f64),
    SpeedDuty(f64),
    Gains(PidGains),
    Camera(CameraMode),
    PerceptionView(bool),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  start | stop
  mode manual|lateral|longitudinal|overtake
  lane left|right|auto
  heuristic left|right|middle
  throttle <duty> | speed <duty>
  steer <duty>  (-1 full left, 1 full right)
  pid <p> <i> <d>
  camera overview|onboard
  perception on|off
  status | help | quit";

impl ConsoleCommand {
    /// Parses one console line. Returns a message suitable for the operator
    /// on failure.
    pub fn parse(line: &str) -> Result<Self, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = words.split_first() else {
            return Err("empty command".to_string());
        };
        let arg = args.first().copied().unwrap_or("");
        let command = match head.to_ascii_lowercase().as_str() {
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            "mode" => ConsoleCommand::Mode(match arg {
                "manual" => SimulationMode::ManualControl,
                "lateral" => SimulationMode::LateralControlTuning,
                "longitudinal" => SimulationMode::LongitudinalControlTuning,
                "overtake" => SimulationMode::OvertakeManeuver,
                other => return Err(format!("unknown mode '{}'", other)),
            }),
            "lane" => ConsoleCommand::Lane(match arg {
                "left" => LaneChoice::Left,
                "right" => LaneChoice::Right,
                "auto" | "automatic" => LaneChoice::Automatic,
                other => return Err(format!("unknown lane '{}'", other)),
            }),
            "heuristic" => ConsoleCommand::Heuristic(match arg {
                "left" => IntersectionHeuristic::Left,
                "right" => IntersectionHeuristic::Right,
                "middle" => IntersectionHeuristic::Middle,
                other => return Err(format!("unknown heuristic '{}'", other)),
            }),
            "throttle" => ConsoleCommand::Throttle(parse_number(arg)?),
            "steer" => ConsoleCommand::Steer(parse_number(arg)?),
            "speed" => ConsoleCommand::SpeedDuty(parse_number(arg)?),
            "pid" => {
                if args.len() != 3 {
                    return Err("pid needs three gains".to_string());
                }
                ConsoleCommand::Gains(PidGains {
                    p: parse_number(args[0])?,
                    i: parse_number(args[1])?,
                    d: parse_number(args[2])?,
                })
            }
            "camera" => ConsoleCommand::Camera(match arg {
                "overview" => CameraMode::Overview,
                "onboard" => CameraMode::Onboard,
                other => return Err(format!("unknown camera '{}'", other)),
            }),
            "perception" => ConsoleCommand::PerceptionView(match arg {
                "on" => true,
                "off" => false,
                other => return Err(format!("expected on/off, got '{}'", other)),
            }),
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(command)
    }

    /// Applies the command to `config`. Returns `false` for commands that
    /// do not edit the config.
    pub fn apply(&self, config: &mut SimulationConfig) -> bool {
        match *self {
            ConsoleCommand::Start => config.running = true,
            ConsoleCommand::Stop => config.running = false,
            ConsoleCommand::Mode(mode) => config.mode = mode,
            ConsoleCommand::Lane(lane) => config.lane_choice = lane,
            ConsoleCommand::Heuristic(heuristic) => config.intersection_heuristic = heuristic,
            ConsoleCommand::Throttle(duty) => config.throttle = duty.clamp(-1.0, 1.0),
            ConsoleCommand::Steer(duty) => config.steering = duty.clamp(-1.0, 1.0),
            ConsoleCommand::SpeedDuty(duty) => config.max_speed_duty = duty.clamp(0.0, 1.0),
            ConsoleCommand::Gains(gains) => config.pid_gains = gains,
            ConsoleCommand::Camera(mode) => config.camera_mode = mode,
            ConsoleCommand::PerceptionView(enabled) => config.perception_view = enabled,
            ConsoleCommand::Status | ConsoleCommand::Help | ConsoleCommand::Quit => return false,
        }
        true
    }
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("expected a number, got '{}'", raw))
}

/// One-line readout of the dashboard and the newest sample per channel.
pub fn status_line(telemetry: &Telemetry) -> String {
    let mut line = format!(
        "speed {} km/h, wheel {} deg",
        telemetry.dashboard.speed(),
        telemetry.dashboard.wheel_angle()
    );
    for channel in TelemetryChannel::ALL {
        if let Some(value) = telemetry.channel(channel).latest() {
            line.push_str(&format!(", {} {:.3} {}", channel, value, channel.unit()));
        }
    }
    line
}

/// Reads commands from stdin until `quit` or end of input. `telemetry` is
/// the copy the driver republishes after every tick.
pub async fn run_console(
    shared: SharedState<SimulationConfig>,
    telemetry: SharedState<Telemetry>,
) {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error reading console input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Quit) => {
                shared.update(|config| config.running = false);
                println!("Exiting console.");
                break;
            }
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(ConsoleCommand::Status) => {
                println!("{:?}", shared.snapshot());
                println!("{}", status_line(&telemetry.snapshot()));
            }
            Ok(command) => {
                shared.update(|config| command.apply(config));
                log::debug!("Console applied {:?}", command);
            }
            Err(message) => eprintln!("{}", message),
        }
    }
}
