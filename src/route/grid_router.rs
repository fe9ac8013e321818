//! Grid routing strategy. Each edge independently searches a uniform
//! occupancy grid; cells a finished path crosses collect congestion so
//! later edges drift into free rows instead of stacking.

use crate::config::{PortCandidatePolicy, RouterConfig};
use crate::error::{RouteError, RouteResult};
use crate::geom::Point;
use crate::graph::{Graph, Node, PortSide};
use crate::route::astar::search_grid;
use crate::route::grid::Grid;
use crate::route::ports::{best_port_pair, candidate_side_pairs, entry_cell, PortPair};
use crate::route::smooth::{extract_corners, fallback_elbow, weld_path};
use crate::route::{edge_order, RoutingStrategy};

pub struct GridRouter;

impl RoutingStrategy for GridRouter {
    fn execute(&self, graph: &Graph, config: &RouterConfig) -> Graph {
        let mut out = graph.clone();
        out.sync_group_membership();
        out.ensure_ports(config.ports_per_side);

        let mut grid = Grid::build(&out, config);
        let budget = if config.routing.max_expansions > 0 {
            config.routing.max_expansions
        } else {
            (grid.cols as usize).saturating_mul(grid.rows as usize).max(1)
        };
        log::debug!(
            "grid routing {} edges over {}x{} cells",
            out.edges.len(),
            grid.cols,
            grid.rows
        );

        for edge_id in edge_order(&out) {
            let Some((source_id, target_id)) = out
                .edges
                .get(&edge_id)
                .map(|e| (e.source_id.clone(), e.target_id.clone()))
            else {
                continue;
            };
            let (Some(source), Some(target)) =
                (out.nodes.get(&source_id), out.nodes.get(&target_id))
            else {
                let missing = if out.nodes.contains_key(&source_id) {
                    &target_id
                } else {
                    &source_id
                };
                log::warn!(
                    "{}, skipped",
                    RouteError::MalformedReference {
                        edge: edge_id.clone(),
                        node: missing.clone(),
                    }
                );
                continue;
            };

            let routed = match config.routing.port_candidates {
                PortCandidatePolicy::Exhaustive => {
                    route_exhaustive(&grid, &edge_id, source, target, config, budget)
                }
                PortCandidatePolicy::First => {
                    route_first(&grid, &edge_id, source, target, config, budget)
                }
            };

            match routed {
                Ok(winner) => {
                    for &(cx, cy) in &winner.cells {
                        grid.add_congestion(cx, cy);
                    }
                    let corners = extract_corners(&winner.cells, &grid);
                    let path = weld_path(
                        &corners,
                        winner.source_port,
                        winner.source_side,
                        winner.target_port,
                        winner.target_side,
                    );
                    if let Some(edge) = out.edges.get_mut(&edge_id) {
                        edge.path = Some(path);
                        edge.vertex_path = None;
                    }
                }
                Err(err) => {
                    log::debug!("edge {edge_id}: {err}, using direct elbow");
                    let (source_side, target_side) = candidate_side_pairs(source, target)[0];
                    let sp = source.port_position(source_side, 0.5);
                    let tp = target.port_position(target_side, 0.5);
                    if let Some(edge) = out.edges.get_mut(&edge_id) {
                        edge.path = Some(fallback_elbow(sp, tp));
                        edge.vertex_path = None;
                    }
                }
            }
        }
        out
    }
}

struct GridCandidate {
    cells: Vec<(i32, i32)>,
    cost: u64,
    source_port: Point,
    source_side: PortSide,
    target_port: Point,
    target_side: PortSide,
}

/// Runs the search for every side pair and every port combination,
/// keeping the cheapest finished path. Ties keep the earlier candidate,
/// so the side-pair preference order decides between equals.
fn route_exhaustive(
    grid: &Grid,
    edge_id: &str,
    source: &Node,
    target: &Node,
    config: &RouterConfig,
    budget: usize,
) -> RouteResult<GridCandidate> {
    let mut best: Option<GridCandidate> = None;
    for (source_side, target_side) in candidate_side_pairs(source, target) {
        if source.ports_on(source_side).next().is_none() {
            log::trace!(
                "{}",
                RouteError::PortUnavailable {
                    node: source.id.clone(),
                    side: source_side,
                }
            );
            continue;
        }
        if target.ports_on(target_side).next().is_none() {
            log::trace!(
                "{}",
                RouteError::PortUnavailable {
                    node: target.id.clone(),
                    side: target_side,
                }
            );
            continue;
        }
        for s_port in source.ports_on(source_side) {
            for t_port in target.ports_on(target_side) {
                let sp = source.port_position(source_side, s_port.offset);
                let tp = target.port_position(target_side, t_port.offset);
                match try_ports(
                    grid, edge_id, source, sp, source_side, target, tp, target_side, config, budget,
                ) {
                    Ok(found) => {
                        log::trace!(
                            "candidate {source_side:?} -> {target_side:?} cost {}",
                            found.cost
                        );
                        if best.as_ref().is_none_or(|b| found.cost < b.cost) {
                            best = Some(found);
                        }
                    }
                    Err(err) => {
                        log::trace!("candidate {source_side:?} -> {target_side:?}: {err}");
                    }
                }
            }
        }
    }
    best.ok_or_else(|| RouteError::PathNotFound {
        edge: edge_id.to_string(),
    })
}

/// Single-shot variant: one geometrically chosen port pair, one search.
fn route_first(
    grid: &Grid,
    edge_id: &str,
    source: &Node,
    target: &Node,
    config: &RouterConfig,
    budget: usize,
) -> RouteResult<GridCandidate> {
    let pair = best_port_pair(source, target).unwrap_or_else(|| {
        let (source_side, target_side) = candidate_side_pairs(source, target)[0];
        PortPair {
            source: source.port_position(source_side, 0.5),
            target: target.port_position(target_side, 0.5),
            source_side,
            target_side,
        }
    });
    try_ports(
        grid,
        edge_id,
        source,
        pair.source,
        pair.source_side,
        target,
        pair.target,
        pair.target_side,
        config,
        budget,
    )
}

#[allow(clippy::too_many_arguments)]
fn try_ports(
    grid: &Grid,
    edge_id: &str,
    source: &Node,
    source_port: Point,
    source_side: PortSide,
    target: &Node,
    target_port: Point,
    target_side: PortSide,
    config: &RouterConfig,
    budget: usize,
) -> RouteResult<GridCandidate> {
    let steps = config.routing.max_expand_steps;
    let (start, start_dir) =
        entry_cell(grid, source_port, source_side, steps).ok_or_else(|| {
            RouteError::EntryPointBlocked {
                node: source.id.clone(),
                side: source_side,
            }
        })?;
    let (goal, _) = entry_cell(grid, target_port, target_side, steps).ok_or_else(|| {
        RouteError::EntryPointBlocked {
            node: target.id.clone(),
            side: target_side,
        }
    })?;
    let path = search_grid(
        grid,
        start,
        goal,
        start_dir,
        &config.cost,
        config.routing.blocked_policy,
        budget,
    )
    .ok_or_else(|| RouteError::PathNotFound {
        edge: edge_id.to_string(),
    })?;
    Ok(GridCandidate {
        cells: path.cells,
        cost: path.cost,
        source_port,
        source_side,
        target_port,
        target_side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{path_bend_count, path_is_orthogonal, segment_hits_rect, Rect};
    use crate::graph::{Edge, Node};

    fn far_pair() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", Rect::new(0.0, 0.0, 40.0, 20.0)));
        graph.add_node(Node::new("b", Rect::new(200.0, 0.0, 40.0, 20.0)));
        graph.add_edge(Edge::new("e1", "a", "b"));
        graph
    }

    fn anchored_on(graph: &Graph, node: &str, p: Point) -> bool {
        graph.nodes[node]
            .ports
            .iter()
            .any(|port| {
                let pos = graph.nodes[node].port_position(port.side, port.offset);
                (pos.x - p.x).abs() < 1e-3 && (pos.y - p.y).abs() < 1e-3
            })
    }

    #[test]
    fn facing_pair_collapses_to_a_straight_line() {
        let graph = far_pair();
        let routed = GridRouter.execute(&graph, &RouterConfig::default());

        let path = routed.edges["e1"].path.as_ref().unwrap();
        assert_eq!(path.len(), 2, "straight run expected, got {path:?}");
        assert_eq!(path[0].x, 40.0);
        assert_eq!(path[1].x, 200.0);
        assert_eq!(path[0].y, path[1].y);
        assert!(anchored_on(&routed, "a", path[0]));
        assert!(anchored_on(&routed, "b", path[1]));
    }

    #[test]
    fn first_port_policy_also_finds_the_straight_run() {
        let graph = far_pair();
        let mut config = RouterConfig::default();
        config.routing.port_candidates = PortCandidatePolicy::First;
        let routed = GridRouter.execute(&graph, &config);

        let path = routed.edges["e1"].path.as_ref().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].x, 40.0);
        assert_eq!(path[1].x, 200.0);
    }

    #[test]
    fn wall_forces_a_clean_detour() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", Rect::new(-120.0, 40.0, 40.0, 20.0)));
        graph.add_node(Node::new("b", Rect::new(120.0, 40.0, 40.0, 20.0)));
        graph.add_node(Node::new("wall", Rect::new(0.0, -40.0, 20.0, 180.0)));
        graph.add_edge(Edge::new("e1", "a", "b"));

        let routed = GridRouter.execute(&graph, &RouterConfig::default());
        let path = routed.edges["e1"].path.as_ref().unwrap();

        assert!(path_is_orthogonal(path));
        assert!(path_bend_count(path) >= 2, "detour expected, got {path:?}");
        assert!(anchored_on(&routed, "a", path[0]));
        assert!(anchored_on(&routed, "b", path[path.len() - 1]));
        for node in routed.nodes.values() {
            for pair in path.windows(2) {
                assert!(
                    !segment_hits_rect(pair[0], pair[1], &node.bbox),
                    "segment {:?} -> {:?} crosses {}",
                    pair[0],
                    pair[1],
                    node.id
                );
            }
        }
    }

    #[test]
    fn second_edge_avoids_the_congested_row() {
        let mut graph = far_pair();
        graph.add_edge(Edge::new("e2", "a", "b"));

        let routed = GridRouter.execute(&graph, &RouterConfig::default());
        let first = routed.edges["e1"].path.as_ref().unwrap();
        let second = routed.edges["e2"].path.as_ref().unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert!(
            (first[0].y - second[0].y).abs() > 1.0,
            "second edge should pick a different row: {first:?} vs {second:?}"
        );
    }

    #[test]
    fn routing_is_deterministic() {
        let mut graph = far_pair();
        graph.add_edge(Edge::new("e2", "a", "b"));
        graph.add_node(Node::new("c", Rect::new(80.0, 80.0, 40.0, 20.0)));
        graph.add_edge(Edge::new("e3", "a", "c"));

        let config = RouterConfig::default();
        let once = GridRouter.execute(&graph, &config);
        let twice = GridRouter.execute(&graph, &config);
        for (id, edge) in &once.edges {
            assert_eq!(edge.path, twice.edges[id].path, "edge {id} diverged");
        }
    }

    #[test]
    fn missing_endpoint_leaves_edge_unrouted() {
        let mut graph = far_pair();
        graph.add_edge(Edge::new("e0", "ghost", "b"));

        let routed = GridRouter.execute(&graph, &RouterConfig::default());
        assert!(routed.edges["e0"].path.is_none());
        assert!(routed.edges["e1"].path.is_some());
    }
}
