//! Mesh routing strategy. Edges travel along visibility-graph
//! corridors, deliberately sharing segments that the lane pass later
//! fans out into parallel runs.

use crate::config::RouterConfig;
use crate::error::RouteError;
use crate::geom::{manhattan, Point, Rect, EPS_AXIS};
use crate::graph::{Graph, Node, PortSide};
use crate::route::cost::scaled;
use crate::route::lanes::assign_lanes;
use crate::route::ports::candidate_side_pairs;
use crate::route::queue::MinQueue;
use crate::route::smooth::{cleanup_collinear, fallback_elbow};
use crate::route::visibility::{
    build_visibility_graph, create_routing_vertices, entry_obstacles, segment_obstructed,
    VisibilityGraph,
};
use crate::route::{edge_order, RoutingStrategy};

pub struct MeshRouter;

impl RoutingStrategy for MeshRouter {
    fn execute(&self, graph: &Graph, config: &RouterConfig) -> Graph {
        let mut out = graph.clone();
        out.sync_group_membership();
        out.ensure_ports(config.ports_per_side);

        let vertices = create_routing_vertices(&out, config);
        let mut mesh = build_visibility_graph(vertices, &out);
        let budget = if config.routing.max_expansions > 0 {
            config.routing.max_expansions
        } else {
            mesh.vertices.len().max(1)
        };
        log::debug!(
            "mesh routing {} edges over {} vertices",
            out.edges.len(),
            mesh.vertices.len()
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

            let start = find_ramp(source, target, &mesh, &out);
            let end = find_ramp(target, source, &mesh, &out);
            let vertex_path = match (&start, &end) {
                (Some(s), Some(e)) => {
                    search_mesh(s.vertex, e.vertex, &mesh, config.bus.congestion_penalty, budget)
                }
                _ => None,
            };

            match vertex_path {
                Some(vertex_path) => {
                    for pair in vertex_path.windows(2) {
                        mesh.add_usage(pair[0], pair[1]);
                    }
                    let (Some(s), Some(e)) = (start, end) else { continue };
                    let path = stitch_path(s.port, e.port, &vertex_path, &mesh);
                    if let Some(edge) = out.edges.get_mut(&edge_id) {
                        edge.path = Some(path);
                        edge.vertex_path = Some(vertex_path);
                    }
                }
                None => {
                    log::debug!(
                        "{}, using direct elbow",
                        RouteError::PathNotFound {
                            edge: edge_id.clone(),
                        }
                    );
                    let sp = start
                        .map(|s| s.port)
                        .unwrap_or_else(|| source.port_position(PortSide::Right, 0.5));
                    let tp = end
                        .map(|e| e.port)
                        .unwrap_or_else(|| target.port_position(PortSide::Left, 0.5));
                    if let Some(edge) = out.edges.get_mut(&edge_id) {
                        edge.path = Some(fallback_elbow(sp, tp));
                        edge.vertex_path = None;
                    }
                }
            }
        }

        assign_lanes(&mut out, &mesh, config);
        out
    }
}

/// Where an edge gets on or off the mesh: the chosen port and the
/// nearest reachable vertex.
struct Ramp {
    vertex: usize,
    port: Point,
}

/// Scans the node's sides in preference order against the target and
/// returns the first side that can reach a mesh vertex, picking the
/// cheapest port-to-vertex run on that side. Only vertices straight out
/// from the port along its side's normal qualify, so the entry run is
/// the exact segment the obstruction test sees. Vertices in the node's
/// own partition qualify, and for grouped nodes so do open-space
/// vertices whose run clears everything but the group's own boundary,
/// the same rule gateway edges use. A projected port entry that landed
/// on an open-space coordinate stays reachable that way.
fn find_ramp(node: &Node, toward: &Node, mesh: &VisibilityGraph, graph: &Graph) -> Option<Ramp> {
    let local = entry_obstacles(graph, node);
    let crossing: Option<Vec<Rect>> = node.group_id.as_deref().map(|gid| {
        let mut obstacles: Vec<Rect> = graph
            .nodes
            .values()
            .filter(|n| n.id != node.id)
            .map(|n| n.bbox)
            .collect();
        obstacles.extend(
            graph
                .groups
                .values()
                .filter(|g| g.id != gid)
                .map(|g| g.bbox),
        );
        obstacles
    });
    for (side, _) in candidate_side_pairs(node, toward) {
        let mut best: Option<(f32, usize, Point)> = None;
        for port in node.ports_on(side) {
            let pos = node.port_position(side, port.offset);
            for vertex in &mesh.vertices {
                let vp = vertex.point();
                let straight_out = match side {
                    PortSide::Left => vp.x < pos.x - EPS_AXIS && (vp.y - pos.y).abs() < EPS_AXIS,
                    PortSide::Right => vp.x > pos.x + EPS_AXIS && (vp.y - pos.y).abs() < EPS_AXIS,
                    PortSide::Top => vp.y < pos.y - EPS_AXIS && (vp.x - pos.x).abs() < EPS_AXIS,
                    PortSide::Bottom => vp.y > pos.y + EPS_AXIS && (vp.x - pos.x).abs() < EPS_AXIS,
                };
                if !straight_out {
                    continue;
                }
                let obstacles = if vertex.owner.as_deref() == node.group_id.as_deref() {
                    &local
                } else if vertex.owner.is_none() {
                    match &crossing {
                        Some(obstacles) => obstacles,
                        None => continue,
                    }
                } else {
                    continue;
                };
                if segment_obstructed(pos, vp, obstacles) {
                    continue;
                }
                let cost = manhattan(pos, vp);
                if best.is_none_or(|(c, _, _)| cost < c) {
                    best = Some((cost, vertex.id, pos));
                }
            }
        }
        if let Some((_, vertex, port)) = best {
            return Some(Ramp { vertex, port });
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MeshEntry {
    est: u64,
    cost: u64,
    vertex: usize,
}

impl Ord for MeshEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.est
            .cmp(&other.est)
            .then_with(|| self.cost.cmp(&other.cost))
    }
}

impl PartialOrd for MeshEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over mesh vertices. Segment cost is the Manhattan run plus a
/// penalty per edge already assigned to that segment, so later edges
/// drift to free corridors once shared ones fill up.
fn search_mesh(
    start: usize,
    goal: usize,
    mesh: &VisibilityGraph,
    congestion_penalty: f32,
    budget: usize,
) -> Option<Vec<usize>> {
    let count = mesh.vertices.len();
    if start >= count || goal >= count {
        return None;
    }
    let goal_point = mesh.point(goal);

    let mut best: Vec<u64> = vec![u64::MAX; count];
    let mut prev: Vec<Option<usize>> = vec![None; count];
    let mut open = MinQueue::new();
    best[start] = 0;
    open.push(MeshEntry {
        est: scaled(manhattan(mesh.point(start), goal_point)),
        cost: 0,
        vertex: start,
    });

    let mut expansions = 0usize;
    let mut reached = false;
    while let Some(MeshEntry { cost, vertex, .. }) = open.pop() {
        if cost != best[vertex] {
            continue;
        }
        if vertex == goal {
            reached = true;
            break;
        }
        expansions += 1;
        if expansions > budget {
            log::trace!("mesh search stopped after {expansions} expansions");
            return None;
        }

        let here = mesh.point(vertex);
        for &nb in &mesh.adjacency[vertex] {
            let there = mesh.point(nb);
            let step = manhattan(here, there)
                + mesh.usage(vertex, nb) as f32 * congestion_penalty;
            let next_cost = cost.saturating_add(scaled(step));
            if next_cost >= best[nb] {
                continue;
            }
            best[nb] = next_cost;
            prev[nb] = Some(vertex);
            open.push(MeshEntry {
                est: next_cost.saturating_add(scaled(manhattan(there, goal_point))),
                cost: next_cost,
                vertex: nb,
            });
        }
    }
    if !reached {
        return None;
    }

    let mut path = vec![goal];
    let mut cursor = goal;
    while let Some(p) = prev[cursor] {
        path.push(p);
        cursor = p;
    }
    path.reverse();
    Some(path)
}

/// Threads port, vertices and port into one polyline. A diagonal hop
/// between consecutive waypoints gets a corner that continues the
/// previous segment's direction before turning.
fn stitch_path(
    start_port: Point,
    end_port: Point,
    vertex_path: &[usize],
    mesh: &VisibilityGraph,
) -> Vec<Point> {
    let mut waypoints: Vec<Point> = Vec::with_capacity(vertex_path.len() + 2);
    waypoints.push(start_port);
    waypoints.extend(vertex_path.iter().map(|&id| mesh.point(id)));
    waypoints.push(end_port);

    let mut path: Vec<Point> = vec![waypoints[0]];
    for &curr in &waypoints[1..] {
        let prev = path[path.len() - 1];
        if (prev.x - curr.x).abs() > EPS_AXIS && (prev.y - curr.y).abs() > EPS_AXIS {
            let prev_prev = if path.len() > 1 {
                path[path.len() - 2]
            } else {
                prev
            };
            if (prev_prev.y - prev.y).abs() < EPS_AXIS {
                path.push(Point::new(curr.x, prev.y));
            } else {
                path.push(Point::new(prev.x, curr.y));
            }
        }
        path.push(curr);
    }
    cleanup_collinear(path)
}
