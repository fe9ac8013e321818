//! Routing mesh construction for the vertex strategy: candidate
//! waypoints from bounding-box and port axes, then axis-aligned
//! visibility edges between them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::config::RouterConfig;
use crate::geom::{segment_hits_rect, Point, Rect, EPS_AXIS};
use crate::graph::{Graph, Group, Node, PortSide};

/// A candidate waypoint on the routing mesh. `owner` names the group
/// whose interior the vertex sits in, `None` for open space.
#[derive(Debug, Clone)]
pub(super) struct RoutingVertex {
    pub(super) id: usize,
    pub(super) x: f32,
    pub(super) y: f32,
    pub(super) owner: Option<String>,
}

impl RoutingVertex {
    pub(super) fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Mesh the vertex strategy searches. `adjacency[id]` lists neighbor
/// vertex ids; `edge_usage` counts routed edges per mesh segment and
/// starts empty.
#[derive(Debug)]
pub(super) struct VisibilityGraph {
    pub(super) vertices: Vec<RoutingVertex>,
    pub(super) adjacency: Vec<Vec<usize>>,
    pub(super) edge_usage: BTreeMap<(usize, usize), u32>,
}

impl VisibilityGraph {
    pub(super) fn point(&self, id: usize) -> Point {
        self.vertices[id].point()
    }

    pub(super) fn usage(&self, a: usize, b: usize) -> u32 {
        self.edge_usage.get(&usage_key(a, b)).copied().unwrap_or(0)
    }

    pub(super) fn add_usage(&mut self, a: usize, b: usize) {
        *self.edge_usage.entry(usage_key(a, b)).or_insert(0) += 1;
    }
}

/// Canonical key for an undirected mesh segment.
pub(super) fn usage_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

pub(super) fn segment_obstructed(a: Point, b: Point, obstacles: &[Rect]) -> bool {
    obstacles.iter().any(|rect| segment_hits_rect(a, b, rect))
}

// ── Vertex generation ────────────────────────────────────────────────

/// Builds the candidate waypoints: every intersection of the expanded
/// bounding-box axes and port axes that does not land inside an
/// obstacle, plus a projected entry vertex per port.
pub(super) fn create_routing_vertices(graph: &Graph, config: &RouterConfig) -> Vec<RoutingVertex> {
    let margin = config.routing.bbox_expand as f32 * config.grid_size;
    let (xs, ys) = extract_axes(graph, margin);
    let world = world_obstacles(graph);
    let children = children_by_group(graph);

    let mut vertices: Vec<RoutingVertex> = Vec::new();
    let mut seen: HashSet<(i64, i64)> = HashSet::new();

    for &x in &xs {
        for &y in &ys {
            let p = Point::new(x, y);
            match owning_group(graph, p) {
                Some(group) => {
                    let inside_child = children
                        .get(group.id.as_str())
                        .is_some_and(|boxes| boxes.iter().any(|r| r.contains_inside(p)));
                    if inside_child {
                        continue;
                    }
                    push_vertex(&mut vertices, &mut seen, x, y, Some(group.id.clone()));
                }
                None => {
                    if world.iter().any(|r| r.contains_inside(p)) {
                        continue;
                    }
                    push_vertex(&mut vertices, &mut seen, x, y, None);
                }
            }
        }
    }

    // Each port projects onto the nearest axis along its outward normal.
    // The projection may revive a spot the intersection pass rejected,
    // as long as the run from the port is clear of everything but the
    // port's own node.
    for node in graph.nodes.values() {
        let obstacles = entry_obstacles(graph, node);
        for port in &node.ports {
            let pos = node.port_position(port.side, port.offset);
            let entry = match port.side {
                PortSide::Left => xs
                    .iter()
                    .rev()
                    .copied()
                    .find(|&x| x < pos.x)
                    .map(|x| Point::new(x, pos.y)),
                PortSide::Right => xs
                    .iter()
                    .copied()
                    .find(|&x| x > pos.x)
                    .map(|x| Point::new(x, pos.y)),
                PortSide::Top => ys
                    .iter()
                    .rev()
                    .copied()
                    .find(|&y| y < pos.y)
                    .map(|y| Point::new(pos.x, y)),
                PortSide::Bottom => ys
                    .iter()
                    .copied()
                    .find(|&y| y > pos.y)
                    .map(|y| Point::new(pos.x, y)),
            };
            let Some(entry) = entry else { continue };
            if segment_obstructed(pos, entry, &obstacles) {
                continue;
            }
            push_vertex(&mut vertices, &mut seen, entry.x, entry.y, node.group_id.clone());
        }
    }

    log::debug!("generated {} routing vertices", vertices.len());
    vertices
}

fn push_vertex(
    vertices: &mut Vec<RoutingVertex>,
    seen: &mut HashSet<(i64, i64)>,
    x: f32,
    y: f32,
    owner: Option<String>,
) {
    let key = (x.round() as i64, y.round() as i64);
    if !seen.insert(key) {
        return;
    }
    let id = vertices.len();
    vertices.push(RoutingVertex { id, x, y, owner });
}

fn extract_axes(graph: &Graph, margin: f32) -> (Vec<f32>, Vec<f32>) {
    let mut xs: Vec<f32> = Vec::new();
    let mut ys: Vec<f32> = Vec::new();
    for node in graph.nodes.values() {
        xs.push(node.bbox.x - margin);
        xs.push(node.bbox.max_x() + margin);
        ys.push(node.bbox.y - margin);
        ys.push(node.bbox.max_y() + margin);
        for port in &node.ports {
            let pos = node.port_position(port.side, port.offset);
            if port.side.is_horizontal() {
                ys.push(pos.y);
            } else {
                xs.push(pos.x);
            }
        }
    }
    for group in graph.groups.values() {
        xs.push(group.bbox.x - margin);
        xs.push(group.bbox.max_x() + margin);
        ys.push(group.bbox.y - margin);
        ys.push(group.bbox.max_y() + margin);
    }
    sort_dedup(&mut xs);
    sort_dedup(&mut ys);
    (xs, ys)
}

fn sort_dedup(values: &mut Vec<f32>) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup();
}

/// Innermost group whose box contains the point, boundary included.
/// Smallest area wins so nested groups claim their own interior.
fn owning_group(graph: &Graph, p: Point) -> Option<&Group> {
    graph
        .groups
        .values()
        .filter(|g| g.bbox.contains(p))
        .min_by(|a, b| {
            (a.bbox.width * a.bbox.height)
                .partial_cmp(&(b.bbox.width * b.bbox.height))
                .unwrap_or(Ordering::Equal)
        })
}

/// Obstacles for open space: top-level nodes plus whole group boxes.
/// Grouped nodes are covered by their group's box.
fn world_obstacles(graph: &Graph) -> Vec<Rect> {
    let mut obstacles: Vec<Rect> = graph
        .nodes
        .values()
        .filter(|n| n.group_id.is_none())
        .map(|n| n.bbox)
        .collect();
    obstacles.extend(graph.groups.values().map(|g| g.bbox));
    obstacles
}

fn children_by_group(graph: &Graph) -> BTreeMap<&str, Vec<Rect>> {
    let mut map: BTreeMap<&str, Vec<Rect>> = BTreeMap::new();
    for node in graph.nodes.values() {
        if let Some(gid) = node.group_id.as_deref() {
            map.entry(gid).or_default().push(node.bbox);
        }
    }
    map
}

/// What a port's entry run must clear: siblings inside the same group,
/// or the open-space set for top-level nodes. The port's own node never
/// blocks its own entries. Ramp searches use the same scoping.
pub(super) fn entry_obstacles(graph: &Graph, node: &Node) -> Vec<Rect> {
    match node.group_id.as_deref() {
        Some(gid) if graph.groups.contains_key(gid) => graph
            .nodes
            .values()
            .filter(|n| n.id != node.id && n.group_id.as_deref() == Some(gid))
            .map(|n| n.bbox)
            .collect(),
        _ => {
            let mut obstacles: Vec<Rect> = graph
                .nodes
                .values()
                .filter(|n| n.id != node.id && n.group_id.is_none())
                .map(|n| n.bbox)
                .collect();
            obstacles.extend(graph.groups.values().map(|g| g.bbox));
            obstacles
        }
    }
}

// ── Visibility edges ─────────────────────────────────────────────────

/// Connects axis-aligned neighbor vertices. Vertices are partitioned by
/// owner and each partition sees only its own obstacles; open-space
/// corridors treat whole group boxes as solid, so the only way into a
/// group is a gateway edge across its boundary.
pub(super) fn build_visibility_graph(vertices: Vec<RoutingVertex>, graph: &Graph) -> VisibilityGraph {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
    let world = world_obstacles(graph);
    let children = children_by_group(graph);

    let mut partitions: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for v in &vertices {
        partitions.entry(v.owner.as_deref()).or_default().push(v.id);
    }

    for (owner, members) in &partitions {
        let obstacles: Vec<Rect> = match owner {
            Some(gid) => children.get(gid).cloned().unwrap_or_default(),
            None => world.clone(),
        };
        connect_aligned(&vertices, members, &obstacles, &mut adjacency);
    }

    // Gateways: a group vertex reaches an open-space vertex on a shared
    // axis when the crossing clears every node and every other group.
    let world_members = partitions.get(&None).cloned().unwrap_or_default();
    for (owner, members) in &partitions {
        let Some(gid) = owner else { continue };
        let mut obstacles: Vec<Rect> = graph.nodes.values().map(|n| n.bbox).collect();
        obstacles.extend(
            graph
                .groups
                .values()
                .filter(|g| g.id.as_str() != *gid)
                .map(|g| g.bbox),
        );
        for &a in members {
            let pa = vertices[a].point();
            for &b in &world_members {
                let pb = vertices[b].point();
                if (pa.x - pb.x).abs() >= EPS_AXIS && (pa.y - pb.y).abs() >= EPS_AXIS {
                    continue;
                }
                if segment_obstructed(pa, pb, &obstacles) {
                    continue;
                }
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
    }

    let edge_count: usize = adjacency.iter().map(Vec::len).sum::<usize>() / 2;
    log::debug!(
        "visibility graph: {} vertices, {} edges",
        vertices.len(),
        edge_count
    );
    VisibilityGraph {
        vertices,
        adjacency,
        edge_usage: BTreeMap::new(),
    }
}

/// Buckets members by rounded row then column and links consecutive
/// pairs whose joining segment is clear.
fn connect_aligned(
    vertices: &[RoutingVertex],
    members: &[usize],
    obstacles: &[Rect],
    adjacency: &mut [Vec<usize>],
) {
    let mut rows: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &id in members {
        rows.entry(vertices[id].y.round() as i64).or_default().push(id);
    }
    for row in rows.values_mut() {
        row.sort_by(|&a, &b| {
            vertices[a]
                .x
                .partial_cmp(&vertices[b].x)
                .unwrap_or(Ordering::Equal)
        });
        link_consecutive(vertices, row, obstacles, adjacency);
    }

    let mut cols: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &id in members {
        cols.entry(vertices[id].x.round() as i64).or_default().push(id);
    }
    for col in cols.values_mut() {
        col.sort_by(|&a, &b| {
            vertices[a]
                .y
                .partial_cmp(&vertices[b].y)
                .unwrap_or(Ordering::Equal)
        });
        link_consecutive(vertices, col, obstacles, adjacency);
    }
}

fn link_consecutive(
    vertices: &[RoutingVertex],
    bucket: &[usize],
    obstacles: &[Rect],
    adjacency: &mut [Vec<usize>],
) {
    for pair in bucket.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if segment_obstructed(vertices[a].point(), vertices[b].point(), obstacles) {
            continue;
        }
        adjacency[a].push(b);
        adjacency[b].push(a);
    }
}
