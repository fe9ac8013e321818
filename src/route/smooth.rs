use crate::geom::{EPS_ALIGN, EPS_AXIS, Point};
use crate::graph::PortSide;

use super::cost;
use super::grid::Grid;

/// Cell path to world corners: first and last cell centers plus every
/// cell where the walk changes axis.
pub(super) fn extract_corners(cells: &[(i32, i32)], grid: &Grid) -> Vec<Point> {
    if cells.len() < 2 {
        return cells
            .iter()
            .map(|&(cx, cy)| grid.cell_center(cx, cy))
            .collect();
    }
    let mut corners = vec![grid.cell_center(cells[0].0, cells[0].1)];
    for i in 1..cells.len() - 1 {
        let dir_in = cost::dir_from(cells[i - 1], cells[i]);
        let dir_out = cost::dir_from(cells[i], cells[i + 1]);
        if cost::is_turn(Some(dir_in), Some(dir_out)) {
            corners.push(grid.cell_center(cells[i].0, cells[i].1));
        }
    }
    let last = cells[cells.len() - 1];
    corners.push(grid.cell_center(last.0, last.1));
    corners
}

/// Drops duplicate points and the middle of collinear triples until the
/// path stops shrinking. Endpoints always survive.
pub(super) fn cleanup_collinear(mut path: Vec<Point>) -> Vec<Point> {
    loop {
        let before = path.len();
        path = cleanup_pass(path);
        if path.len() == before {
            return path;
        }
    }
}

fn cleanup_pass(path: Vec<Point>) -> Vec<Point> {
    if path.len() < 2 {
        return path;
    }
    let same = |a: f32, b: f32| (a - b).abs() <= EPS_ALIGN;
    let mut cleaned: Vec<Point> = vec![path[0]];
    for i in 1..path.len() - 1 {
        let prev = cleaned[cleaned.len() - 1];
        let curr = path[i];
        let next = path[i + 1];
        if same(curr.x, prev.x) && same(curr.y, prev.y) {
            continue;
        }
        let collinear = (same(prev.x, curr.x) && same(curr.x, next.x))
            || (same(prev.y, curr.y) && same(curr.y, next.y));
        if !collinear {
            cleaned.push(curr);
        }
    }
    let last = path[path.len() - 1];
    if let Some(&tail) = cleaned.last() {
        if cleaned.len() > 1 && same(tail.x, last.x) && same(tail.y, last.y) {
            cleaned.pop();
        }
    }
    cleaned.push(last);
    cleaned
}

/// Welds a corner polyline onto its exact port pixels.
///
/// When the first segment already runs along the start port's outward
/// axis the whole run slides onto the port line; otherwise a connector
/// point bridges the perpendicular gap. The end mirrors this: a last
/// point within [`EPS_AXIS`] of the port's approach line is snapped
/// onto it, anything else gets a connector. The result is cleaned, so
/// welding its own output changes nothing.
pub(super) fn weld_path(
    corners: &[Point],
    start_port: Point,
    start_side: PortSide,
    end_port: Point,
    end_side: PortSide,
) -> Vec<Point> {
    if corners.len() < 2 {
        let mid = if start_side.is_horizontal() {
            Point::new(end_port.x, start_port.y)
        } else {
            Point::new(start_port.x, end_port.y)
        };
        return cleanup_collinear(vec![start_port, mid, end_port]);
    }

    let mut path = vec![start_port];
    let first = corners[0];
    let second = corners[1];
    let port_horizontal = start_side.is_horizontal();
    let first_segment_horizontal = (first.y - second.y).abs() < EPS_AXIS;

    let from = if port_horizontal == first_segment_horizontal {
        // Aligned: slide the first run onto the port line and drop the
        // first corner.
        if port_horizontal {
            path.push(Point::new(second.x, start_port.y));
        } else {
            path.push(Point::new(start_port.x, second.y));
        }
        1
    } else {
        if port_horizontal {
            path.push(Point::new(first.x, start_port.y));
        } else {
            path.push(Point::new(start_port.x, first.y));
        }
        0
    };
    path.extend_from_slice(&corners[from..]);

    let last = *path.last().unwrap_or(&start_port);
    let end_horizontal = end_side.is_horizontal();
    let aligned = if end_horizontal {
        (last.x - end_port.x).abs() < EPS_AXIS
    } else {
        (last.y - end_port.y).abs() < EPS_AXIS
    };
    if aligned {
        if let Some(tail) = path.last_mut() {
            *tail = if end_horizontal {
                Point::new(end_port.x, last.y)
            } else {
                Point::new(last.x, end_port.y)
            };
        }
    } else if end_horizontal {
        path.push(Point::new(last.x, end_port.y));
    } else {
        path.push(Point::new(end_port.x, last.y));
    }
    path.push(end_port);

    cleanup_collinear(path)
}

/// Last-resort two-segment route between two ports.
pub(super) fn fallback_elbow(source_port: Point, target_port: Point) -> Vec<Point> {
    cleanup_collinear(vec![
        source_port,
        Point::new(target_port.x, source_port.y),
        target_port,
    ])
}
