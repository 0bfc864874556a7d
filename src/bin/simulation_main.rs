// simulation_main.rs
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tokio::time::{interval, Duration, MissedTickBehavior};

use robocar_sim::monitoring::telemetry_report::plot_trajectories;
use robocar_sim::monitoring::{run_console, TelemetryRecorder};
use robocar_sim::road_network::obj_loader::load_road_graph;
use robocar_sim::road_network::synthetic::{two_lane_loop, TrackLayout};
use robocar_sim::road_network::{NodeId, RoadGraph, StartHeading};
use robocar_sim::shared_data::{current_timestamp, SharedState, SimulationConfig};
use robocar_sim::simulation_engine::{Simulation, SimulationSetup, TickStatus, TrajectoryRecorder};

#[derive(Debug, Parser)]
#[command(about = "Drive the ego vehicle and its obstacles around a road graph")]
struct Args {
    /// Road graph asset (.obj). Without one a two-lane loop is generated.
    #[arg(long)]
    graph: Option<PathBuf>,
    /// Start node of the ego vehicle when a graph asset is given.
    #[arg(long, default_value_t = 0)]
    start_node: usize,
    /// Simulation config as JSON. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of obstacle vehicles.
    #[arg(long, default_value_t = 2)]
    obstacles: usize,
    /// Seed for obstacle placement.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Step length in seconds.
    #[arg(long, default_value_t = 0.05)]
    dt: f64,
    /// Fixed-step run of this many ticks without the console.
    #[arg(long)]
    headless: Option<u32>,
    /// Set the running flag before the first tick.
    #[arg(long)]
    autostart: bool,
    /// Directory for the telemetry CSV and the trajectory plot.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

/// Graph plus the setup to spawn on it.
fn prepare_world(args: &Args) -> Result<(RoadGraph, SimulationSetup), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    match &args.graph {
        Some(path) => {
            let graph = load_road_graph(path)?;
            let ego = NodeId(args.start_node);
            let candidates: Vec<NodeId> = graph
                .nodes()
                .iter()
                .map(|node| node.id())
                .filter(|id| *id != ego)
                .collect();
            let obstacles: Vec<NodeId> = candidates
                .choose_multiple(&mut rng, args.obstacles)
                .copied()
                .collect();
            let setup = SimulationSetup::new(ego)
                .with_obstacles(obstacles)
                .with_heading(StartHeading::East);
            Ok((graph, setup))
        }
        None => {
            let track = two_lane_loop(6.0, 1.5, &TrackLayout::default())?;
            // Keep the first few nodes free so the ego has room to start.
            let candidates = track.right_lane.get(6..).unwrap_or(&[]);
            let obstacles: Vec<NodeId> = candidates
                .choose_multiple(&mut rng, args.obstacles)
                .copied()
                .collect();
            let setup = SimulationSetup::new(track.right_lane[0]).with_obstacles(obstacles);
            Ok((track.graph, setup))
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if !(args.dt > 0.0) {
        return Err(format!("step length must be positive, got {}", args.dt).into());
    }
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    config.running |= args.autostart || args.headless.is_some();

    let (graph, setup) = prepare_world(&args)?;
    let graph = Arc::new(graph);
    let road: Vec<_> = graph.nodes().iter().map(|node| node.position()).collect();
    let mut sim = Simulation::new(Arc::clone(&graph), &setup, TrajectoryRecorder::new())?;
    let mut recorder = TelemetryRecorder::new();

    match args.headless {
        Some(ticks) => {
            for tick in 0..ticks {
                let outcome = sim.advance(&config, args.dt);
                recorder.record(f64::from(tick) * args.dt, &outcome.samples);
            }
            println!("Headless run finished after {} ticks.", ticks);
        }
        None => {
            let shared = SharedState::new(config);
            let telemetry = SharedState::new(sim.telemetry().clone());
            let console = tokio::spawn(run_console(shared.clone(), telemetry.clone()));
            let mut clock = interval(Duration::from_secs_f64(args.dt));
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let started = current_timestamp();
            loop {
                tokio::select! {
                    _ = clock.tick() => {
                        let now = current_timestamp();
                        let outcome = sim.tick(&shared.snapshot(), now);
                        if outcome.status == TickStatus::Reset {
                            println!("Simulation reset.");
                        }
                        recorder.record(now - started, &outcome.samples);
                        if outcome.status != TickStatus::Idle {
                            telemetry.replace(sim.telemetry().clone());
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
                if console.is_finished() {
                    break;
                }
            }
        }
    }

    log::info!(
        "Ego finished at ({:.2}, {:.2}), lane change engaged: {}",
        sim.ego().position().x,
        sim.ego().position().y,
        sim.lane_change_engaged()
    );

    fs::create_dir_all(&args.output_dir)?;
    let csv_path = args.output_dir.join("telemetry.csv");
    if recorder.is_empty() {
        println!("No telemetry recorded.");
    } else {
        recorder.append_to_csv(&csv_path)?;
        println!("Telemetry written to {}", csv_path.display());
    }
    let plot_path = args.output_dir.join("trajectories.png");
    plot_trajectories(&road, &sim.renderer().labelled_traces(), &plot_path)?;
    println!("Trajectories written to {}", plot_path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("Starting simulation...");
    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            1
        }
    };
    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(code);
}
