mod astar;
mod cost;
mod grid;
mod grid_router;
mod lanes;
mod mesh;
mod ports;
mod queue;
mod smooth;
mod visibility;

pub use grid_router::GridRouter;
pub use mesh::MeshRouter;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;
use crate::geom::manhattan;
use crate::graph::Graph;

/// Routes every edge of a graph. Implementations never fail an edge:
/// anything unroutable gets a direct elbow instead.
pub trait RoutingStrategy {
    fn execute(&self, graph: &Graph, config: &RouterConfig) -> Graph;
}

/// Which routing backend `route_graph` dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Cell-by-cell A* over a uniform grid, welded to exact port positions.
    Grid,
    /// A* over an obstacle-derived vertex mesh, with lane offsets on
    /// shared segments.
    Mesh,
}

/// Routes all edges of `graph` and returns the routed copy.
pub fn route_graph(graph: &Graph, config: &RouterConfig) -> Graph {
    match config.strategy {
        StrategyKind::Grid => GridRouter.execute(graph, config),
        StrategyKind::Mesh => MeshRouter.execute(graph, config),
    }
}

// Longest edges claim contested space first; ties fall back to id order.
fn edge_order(graph: &Graph) -> Vec<String> {
    let mut spans: Vec<(f32, &str)> = graph
        .edges
        .values()
        .map(|edge| {
            let span = match (
                graph.nodes.get(&edge.source_id),
                graph.nodes.get(&edge.target_id),
            ) {
                (Some(source), Some(target)) => {
                    manhattan(source.bbox.center(), target.bbox.center())
                }
                _ => 0.0,
            };
            (span, edge.id.as_str())
        })
        .collect();
    spans.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });
    spans.into_iter().map(|(_, id)| id.to_string()).collect()
}
