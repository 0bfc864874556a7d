// telemetry_report_main.rs
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use robocar_sim::monitoring::telemetry_report::{plot_telemetry, read_telemetry_csv};

#[derive(Debug, Parser)]
#[command(about = "Render charts from a recorded telemetry CSV")]
struct Args {
    /// Telemetry CSV written by simulation_main.
    #[arg(default_value = "output/telemetry.csv")]
    csv: PathBuf,
    /// Output PNG.
    #[arg(long, default_value = "output/telemetry.png")]
    output: PathBuf,
}

fn generate_report(args: &Args) -> Result<(), Box<dyn Error>> {
    let records = read_telemetry_csv(&args.csv)?;
    println!(
        "Loaded {} telemetry records from {}",
        records.len(),
        args.csv.display()
    );
    plot_telemetry(&records, &args.output)?;
    println!("Report saved to {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("Generating telemetry report...");
    if let Err(e) = generate_report(&args) {
        eprintln!("Error generating report: {}", e);
        std::process::exit(1);
    }
}
