//! Lane assignment for mesh-routed edges. Edges sharing a mesh segment
//! are shifted sideways into parallel runs instead of drawing on top of
//! each other, then every joint is re-squared.

use std::collections::BTreeMap;

use crate::config::RouterConfig;
use crate::geom::{Point, EPS_AXIS};
use crate::graph::{Graph, Node};
use crate::route::smooth::cleanup_collinear;
use crate::route::visibility::{usage_key, VisibilityGraph};

type SegmentUsage = BTreeMap<(usize, usize), Vec<String>>;

/// Rewrites the path of every edge that carries a vertex path. Edges
/// without one (fallbacks, grid routes) are left untouched.
pub(super) fn assign_lanes(graph: &mut Graph, mesh: &VisibilityGraph, config: &RouterConfig) {
    let mut usage: SegmentUsage = BTreeMap::new();
    for edge in graph.edges.values() {
        let Some(vp) = &edge.vertex_path else { continue };
        for pair in vp.windows(2) {
            usage
                .entry(usage_key(pair[0], pair[1]))
                .or_default()
                .push(edge.id.clone());
        }
    }
    for ids in usage.values_mut() {
        ids.sort();
    }

    let mut rebuilt: Vec<(String, Vec<Point>)> = Vec::new();
    for edge in graph.edges.values() {
        let (Some(vp), Some(path)) = (&edge.vertex_path, &edge.path) else {
            continue;
        };
        if path.len() < 2 {
            continue;
        }
        let Some(source) = graph.nodes.get(&edge.source_id) else {
            continue;
        };
        rebuilt.push((
            edge.id.clone(),
            rebuild_path(
                &edge.id,
                vp,
                path,
                source,
                mesh,
                &usage,
                config.bus.lane_width,
            ),
        ));
    }
    for (id, path) in rebuilt {
        if let Some(edge) = graph.edges.get_mut(&id) {
            edge.path = Some(path);
        }
    }
}

/// An edge's sideways shift on a segment: lane index centered around
/// the segment's midline, spaced `lane_width` apart.
fn lane_offset(
    usage: &SegmentUsage,
    edge_id: &str,
    a: usize,
    b: usize,
    lane_width: f32,
) -> f32 {
    let Some(users) = usage.get(&usage_key(a, b)) else {
        return 0.0;
    };
    let index = users.iter().position(|id| id == edge_id).unwrap_or(0);
    (index as f32 - (users.len() as f32 - 1.0) / 2.0) * lane_width
}

fn rebuild_path(
    edge_id: &str,
    vp: &[usize],
    old_path: &[Point],
    source: &Node,
    mesh: &VisibilityGraph,
    usage: &SegmentUsage,
    lane_width: f32,
) -> Vec<Point> {
    let start_port = old_path[0];
    let end_port = old_path[old_path.len() - 1];

    // The port's side decides whether the path leaves horizontally or
    // vertically. Matched by position since paths store bare points.
    let start_side = source
        .ports
        .iter()
        .find(|p| {
            let pos = source.port_position(p.side, p.offset);
            (pos.x - start_port.x).abs() < EPS_AXIS && (pos.y - start_port.y).abs() < EPS_AXIS
        })
        .map(|p| p.side);

    let mut path: Vec<Point> = vec![start_port];

    let first = mesh.point(vp[0]);
    let mut first_corner = first;
    if vp.len() > 1 {
        let offset = lane_offset(usage, edge_id, vp[0], vp[1], lane_width);
        let next = mesh.point(vp[1]);
        if (first.x - next.x).abs() < EPS_AXIS {
            first_corner.x += offset;
        } else {
            first_corner.y += offset;
        }
    }
    match start_side {
        Some(side) if side.is_horizontal() => {
            if (start_port.y - first_corner.y).abs() > EPS_AXIS {
                path.push(Point::new(first_corner.x, start_port.y));
            }
        }
        _ => {
            if (start_port.x - first_corner.x).abs() > EPS_AXIS {
                path.push(Point::new(start_port.x, first_corner.y));
            }
        }
    }
    path.push(first_corner);

    // Middle joints carry two offsets, one per adjoining segment. The
    // corner lands on the crossing of the two shifted runs.
    for i in 1..vp.len().saturating_sub(1) {
        let prev = mesh.point(vp[i - 1]);
        let curr = mesh.point(vp[i]);
        let in_offset = lane_offset(usage, edge_id, vp[i - 1], vp[i], lane_width);
        let out_offset = lane_offset(usage, edge_id, vp[i], vp[i + 1], lane_width);

        let prev_horizontal = (prev.y - curr.y).abs() < EPS_AXIS;
        let corner = if prev_horizontal {
            Point::new(curr.x + out_offset, curr.y + in_offset)
        } else {
            Point::new(curr.x + in_offset, curr.y + out_offset)
        };

        let last = path[path.len() - 1];
        if prev_horizontal {
            if (last.x - corner.x).abs() > EPS_AXIS {
                path.push(Point::new(corner.x, last.y));
            }
        } else if (last.y - corner.y).abs() > EPS_AXIS {
            path.push(Point::new(last.x, corner.y));
        }
        path.push(corner);
    }

    if vp.len() > 1 {
        let last_v = mesh.point(vp[vp.len() - 1]);
        let prev_v = mesh.point(vp[vp.len() - 2]);
        let offset = lane_offset(
            usage,
            edge_id,
            vp[vp.len() - 2],
            vp[vp.len() - 1],
            lane_width,
        );
        let mut last_corner = last_v;
        if (last_v.x - prev_v.x).abs() < EPS_AXIS {
            last_corner.x += offset;
        } else {
            last_corner.y += offset;
        }

        let last = path[path.len() - 1];
        let horizontal_in = (last.y - last_corner.y).abs() < EPS_AXIS;
        if !horizontal_in && (last.x - last_corner.x).abs() > EPS_AXIS {
            path.push(Point::new(last_corner.x, last.y));
        }
        path.push(last_corner);

        if (end_port.x - last_corner.x).abs() > EPS_AXIS
            && (end_port.y - last_corner.y).abs() > EPS_AXIS
        {
            if (prev_v.y - last_v.y).abs() < EPS_AXIS {
                path.push(Point::new(last_corner.x, end_port.y));
            } else {
                path.push(Point::new(end_port.x, last_corner.y));
            }
        }
    } else if (end_port.x - first_corner.x).abs() > EPS_AXIS
        && (end_port.y - first_corner.y).abs() > EPS_AXIS
    {
        // A lone vertex has no trailing segment to orient the exit, so
        // the final joint continues the incoming leg's axis.
        let before = path[path.len() - 2];
        if (before.y - first_corner.y).abs() < EPS_AXIS {
            path.push(Point::new(end_port.x, first_corner.y));
        } else {
            path.push(Point::new(first_corner.x, end_port.y));
        }
    }

    path.push(end_port);
    cleanup_collinear(path)
}
