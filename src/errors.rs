use std::path::PathBuf;

use thiserror::Error;

use crate::road_network::graph::NodeId;

/// Failures while building a road graph or resolving nodes against it.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read road graph asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: edge to vertex {index}, but only {count} declared")]
    DanglingEdge {
        line: usize,
        index: usize,
        count: usize,
    },
    #[error("road graph asset declares no vertices")]
    Empty,
    #[error("node {0:?} does not exist in the road graph")]
    UnknownNode(NodeId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("plotting failed: {0}")]
    Plot(String),
    #[error("no samples recorded for channel {0}")]
    NoSamples(String),
}
