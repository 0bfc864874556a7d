// obj_loader.rs
//
// Reads the road graph asset: `v x y z` vertices and `l a b ...` polylines.
// Only x and z of a vertex are used; polylines are directed edges between
// consecutive 1-based vertex indices.

use std::fs;
use std::path::Path;

use glam::DVec2;

use crate::errors::GraphError;
use crate::road_network::graph::{NodeId, RoadGraph, RoadGraphBuilder};

pub fn load_road_graph(path: impl AsRef<Path>) -> Result<RoadGraph, GraphError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = parse_road_graph(&source)?;
    log::info!(
        "Loaded road graph from {} ({} nodes, {} edges)",
        path.display(),
        graph.len(),
        graph.edges().count()
    );
    Ok(graph)
}

pub fn parse_road_graph(source: &str) -> Result<RoadGraph, GraphError> {
    let mut builder = RoadGraphBuilder::new();
    let mut polylines: Vec<(usize, Vec<usize>)> = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let coords: Vec<&str> = fields.collect();
                match parse_vertex(&coords) {
                    Some(position) => {
                        builder.add_node(position);
                    }
                    None => log::warn!("line {line_number}: malformed vertex '{line}'"),
                }
            }
            Some("l") => {
                let indices: Result<Vec<usize>, _> = fields.map(str::parse::<usize>).collect();
                match indices {
                    Ok(indices) => polylines.push((line_number, indices)),
                    Err(_) => log::warn!("line {line_number}: malformed polyline '{line}'"),
                }
            }
            _ => {}
        }
    }

    // Edges are resolved after all vertices so polylines may precede them.
    let count = builder.node_count();
    for (line_number, indices) in polylines {
        let mut ids = Vec::with_capacity(indices.len());
        for index in indices {
            if index == 0 || index > count {
                return Err(GraphError::DanglingEdge {
                    line: line_number,
                    index,
                    count,
                });
            }
            ids.push(NodeId(index - 1));
        }
        for pair in ids.windows(2) {
            builder.add_edge(pair[0], pair[1]);
        }
    }

    builder.build()
}

fn parse_vertex(coords: &[&str]) -> Option<DVec2> {
    if coords.len() < 3 {
        return None;
    }
    let x = coords[0].parse::<f64>().ok()?;
    let z = coords[2].parse::<f64>().ok()?;
    Some(DVec2::new(x, z))
}
