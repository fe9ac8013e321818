use serde::{Deserialize, Serialize};

// ── Geometry tolerances ─────────────────────────────────────────────
/// Coordinates closer than this are treated as exactly collinear.
pub const EPS_ALIGN: f32 = 1e-3;
/// Margin used by containment tests around rect boundaries.
const EPS_INSIDE: f32 = 0.1;
/// Endpoints within this distance on an axis count as aligned for
/// obstruction tests, port welding, and lane rebuilding.
pub(crate) const EPS_AXIS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict interior test; points on the boundary do not count.
    pub fn contains_inside(&self, p: Point) -> bool {
        p.x > self.x + EPS_INSIDE
            && p.x < self.max_x() - EPS_INSIDE
            && p.y > self.y + EPS_INSIDE
            && p.y < self.max_y() - EPS_INSIDE
    }

    /// Loose containment test; points on or just outside the boundary count.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.x - EPS_INSIDE
            && p.x < self.max_x() + EPS_INSIDE
            && p.y > self.y - EPS_INSIDE
            && p.y < self.max_y() + EPS_INSIDE
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }
}

pub fn manhattan(a: Point, b: Point) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Largest multiple of `step` that is <= `v`.
pub fn snap_down(v: f32, step: f32) -> f32 {
    (v / step).floor() * step
}

/// Smallest multiple of `step` that is >= `v`.
pub fn snap_up(v: f32, step: f32) -> f32 {
    (v / step).ceil() * step
}

/// Whether the segment from `a` to `b` crosses the interior of `rect`.
///
/// A segment running along a rect edge does not count as blocked, and
/// segments that are neither horizontal nor vertical within [`EPS_AXIS`]
/// are never blocked.
pub fn segment_hits_rect(a: Point, b: Point, rect: &Rect) -> bool {
    let min_x = a.x.min(b.x);
    let max_x = a.x.max(b.x);
    let min_y = a.y.min(b.y);
    let max_y = a.y.max(b.y);
    if rect.x >= max_x || rect.max_x() <= min_x || rect.y >= max_y || rect.max_y() <= min_y {
        return false;
    }
    if (a.y - b.y).abs() < EPS_AXIS {
        return a.y > rect.y && a.y < rect.max_y() && min_x < rect.max_x() && max_x > rect.x;
    }
    if (a.x - b.x).abs() < EPS_AXIS {
        return a.x > rect.x && a.x < rect.max_x() && min_y < rect.max_y() && max_y > rect.y;
    }
    false
}

pub fn path_length(points: &[Point]) -> f32 {
    let mut length = 0.0;
    for segment in points.windows(2) {
        let dx = segment[1].x - segment[0].x;
        let dy = segment[1].y - segment[0].y;
        length += (dx * dx + dy * dy).sqrt();
    }
    length
}

pub fn path_bend_count(points: &[Point]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for idx in 1..points.len() - 1 {
        let p0 = points[idx - 1];
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let dx1 = p1.x - p0.x;
        let dy1 = p1.y - p0.y;
        let dx2 = p2.x - p1.x;
        let dy2 = p2.y - p1.y;
        if (dx1.abs() <= EPS_ALIGN && dy1.abs() <= EPS_ALIGN)
            || (dx2.abs() <= EPS_ALIGN && dy2.abs() <= EPS_ALIGN)
        {
            continue;
        }
        let cross = dx1 * dy2 - dy1 * dx2;
        if cross.abs() > EPS_ALIGN {
            bends += 1;
        }
    }
    bends
}

/// Whether every consecutive point pair shares an x or a y coordinate.
pub fn path_is_orthogonal(points: &[Point]) -> bool {
    points.windows(2).all(|seg| {
        (seg[0].x - seg[1].x).abs() <= EPS_ALIGN || (seg[0].y - seg[1].y).abs() <= EPS_ALIGN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_sums_axes() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, -2.0);
        assert_eq!(manhattan(a, b), 7.0);
    }

    #[test]
    fn snap_rounds_to_step_multiples() {
        assert_eq!(snap_down(25.0, 12.0), 24.0);
        assert_eq!(snap_up(25.0, 12.0), 36.0);
        assert_eq!(snap_down(-5.0, 12.0), -12.0);
        assert_eq!(snap_up(-5.0, 12.0), 0.0);
        assert_eq!(snap_down(24.0, 12.0), 24.0);
    }

    #[test]
    fn contains_inside_excludes_boundary() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_inside(Point::new(5.0, 5.0)));
        assert!(!rect.contains_inside(Point::new(0.0, 5.0)));
        assert!(!rect.contains_inside(Point::new(10.0, 10.0)));
    }

    #[test]
    fn contains_includes_boundary() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(0.0, 5.0)));
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(11.0, 5.0)));
    }

    #[test]
    fn horizontal_segment_through_rect_is_blocked() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(segment_hits_rect(
            Point::new(0.0, 20.0),
            Point::new(40.0, 20.0),
            &rect
        ));
        // Along the top edge: not blocked.
        assert!(!segment_hits_rect(
            Point::new(0.0, 10.0),
            Point::new(40.0, 10.0),
            &rect
        ));
        // Above the rect entirely.
        assert!(!segment_hits_rect(
            Point::new(0.0, 5.0),
            Point::new(40.0, 5.0),
            &rect
        ));
    }

    #[test]
    fn vertical_segment_beside_rect_is_clear() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(!segment_hits_rect(
            Point::new(5.0, 0.0),
            Point::new(5.0, 40.0),
            &rect
        ));
        assert!(segment_hits_rect(
            Point::new(20.0, 0.0),
            Point::new(20.0, 40.0),
            &rect
        ));
    }

    #[test]
    fn diagonal_segment_is_never_blocked() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(!segment_hits_rect(
            Point::new(0.0, 0.0),
            Point::new(40.0, 40.0),
            &rect
        ));
    }

    #[test]
    fn bend_count_tracks_turns() {
        let straight = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
        ];
        assert_eq!(path_bend_count(&straight), 0);
        let elbow = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert_eq!(path_bend_count(&elbow), 1);
        assert!(path_is_orthogonal(&elbow));
    }
}
