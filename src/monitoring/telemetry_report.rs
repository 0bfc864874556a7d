// telemetry_report.rs
//
// CSV recording of a run and PNG charts built from it.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use glam::DVec2;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;
use crate::monitoring::telemetry::{TelemetryChannel, TelemetrySample};

/// One telemetry sample with the simulation time it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub time: f64,
    pub channel: TelemetryChannel,
    pub value: f64,
}

impl<E: Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ReportError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ReportError::Plot(err.to_string())
    }
}

/// Collects every sample of a run for export.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecorder {
    records: Vec<TelemetryRecord>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: f64, samples: &[TelemetrySample]) {
        self.records.extend(samples.iter().map(|sample| TelemetryRecord {
            time,
            channel: sample.channel,
            value: sample.value,
        }));
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends all records to `path`, writing the header only for a new file.
    pub fn append_to_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        log_to_csv(path.as_ref(), &self.records)
    }
}

fn log_to_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<(), ReportError> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_telemetry_csv(path: impl AsRef<Path>) -> Result<Vec<TelemetryRecord>, ReportError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

type ChannelSeries = BTreeMap<usize, (TelemetryChannel, Vec<(f64, f64)>)>;

/// Splits records into per-channel `(time, value)` series. NaN values
/// (no gap measured) are dropped.
pub fn channel_series(records: &[TelemetryRecord]) -> ChannelSeries {
    let mut series = ChannelSeries::new();
    for record in records.iter().filter(|record| record.value.is_finite()) {
        let index = TelemetryChannel::ALL
            .iter()
            .position(|channel| *channel == record.channel)
            .unwrap_or(0);
        series
            .entry(index)
            .or_insert_with(|| (record.channel, Vec::new()))
            .1
            .push((record.time, record.value));
    }
    series
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let init = (f64::INFINITY, f64::NEG_INFINITY);
    let (min, max) = values.fold(init, |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < 1e-9 {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

/// One stacked line chart per telemetry channel.
pub fn plot_telemetry(
    records: &[TelemetryRecord],
    output: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let series = channel_series(records);
    if series.is_empty() {
        return Err(ReportError::NoSamples("any".to_string()));
    }

    let height = 220 * series.len() as u32;
    let root = BitMapBackend::new(output.as_ref(), (1000, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((series.len(), 1));

    for (panel, (index, (channel, points))) in panels.iter().zip(series.iter()) {
        let (t_min, t_max) = bounds(points.iter().map(|(t, _)| *t));
        let (v_min, v_max) = bounds(points.iter().map(|(_, v)| *v));
        let caption = format!("{} ({})", channel, channel.unit());
        let mut chart = ChartBuilder::on(panel)
            .caption(caption, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(t_min..t_max, v_min..v_max)?;
        chart.configure_mesh().x_desc("time (s)").draw()?;
        chart.draw_series(LineSeries::new(points.iter().copied(), &Palette99::pick(*index)))?;
    }

    root.present()?;
    log::info!("Telemetry chart saved to {}", output.as_ref().display());
    Ok(())
}

/// Chart coordinates of a road point. Road +y lies to the right of +x, so it
/// is drawn downwards and the left of travel stays on the left.
pub fn to_chart(point: DVec2) -> (f64, f64) {
    (point.x, -point.y)
}

/// Top-down plot of vehicle traces, e.g. ego and obstacles, over the road
/// nodes.
pub fn plot_trajectories(
    road: &[DVec2],
    traces: &[(String, Vec<DVec2>)],
    output: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let all = road
        .iter()
        .chain(traces.iter().flat_map(|(_, trace)| trace.iter()))
        .map(|p| to_chart(*p));
    let (x_min, x_max) = bounds(all.clone().map(|(x, _)| x));
    let (y_min, y_max) = bounds(all.map(|(_, y)| y));
    let pad = 0.05 * (x_max - x_min).max(y_max - y_min);
    let x_range = (x_min - pad)..(x_max + pad);
    let y_range = (y_min - pad)..(y_max + pad);

    let root = BitMapBackend::new(output.as_ref(), (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Vehicle trajectories", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc("x (m)")
        .y_desc("-y (m)")
        .draw()?;

    let dots = road
        .iter()
        .map(|p| Circle::new(to_chart(*p), 2, BLACK.mix(0.3).filled()));
    chart.draw_series(dots)?;
    for (index, (label, trace)) in traces.iter().enumerate() {
        let color = Palette99::pick(index);
        chart
            .draw_series(LineSeries::new(trace.iter().map(|p| to_chart(*p)), &color))?
            .label(label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(index))
            });
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    log::info!("Trajectory plot saved to {}", output.as_ref().display());
    Ok(())
}
