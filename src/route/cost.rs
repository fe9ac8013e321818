use crate::config::CostWeights;
use crate::graph::PortSide;

// ── Cost model ──────────────────────────────────────────────────────
/// Fixed-point scale applied to float costs before they enter a heap.
pub(super) const COST_SCALE: f32 = 1000.0;
/// Multiplier on the bend weight for a first step that leaves a port
/// against its outward direction.
pub(super) const FIRST_STEP_BIAS: f32 = 10.0;

/// Cardinal step direction on the routing grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dir {
    Right,
    Left,
    Down,
    Up,
}

/// Neighbor expansion order; part of the routing contract.
pub(super) const NEIGHBORS: [Dir; 4] = [Dir::Right, Dir::Left, Dir::Down, Dir::Up];

impl Dir {
    pub(super) fn delta(self) -> (i32, i32) {
        match self {
            Dir::Right => (1, 0),
            Dir::Left => (-1, 0),
            Dir::Down => (0, 1),
            Dir::Up => (0, -1),
        }
    }

    pub(super) fn is_horizontal(self) -> bool {
        matches!(self, Dir::Right | Dir::Left)
    }

    /// Direction a port on `side` leaves its node.
    pub(super) fn outward(side: PortSide) -> Dir {
        match side {
            PortSide::Top => Dir::Up,
            PortSide::Bottom => Dir::Down,
            PortSide::Left => Dir::Left,
            PortSide::Right => Dir::Right,
        }
    }
}

/// Direction of the axis-aligned step from cell `a` to cell `b`.
pub(super) fn dir_from(a: (i32, i32), b: (i32, i32)) -> Dir {
    if b.0 > a.0 {
        Dir::Right
    } else if b.0 < a.0 {
        Dir::Left
    } else if b.1 > a.1 {
        Dir::Down
    } else {
        Dir::Up
    }
}

/// A corner: one direction horizontal, the other vertical. Absent
/// directions (the first step) never count as a turn.
pub(super) fn is_turn(prev: Option<Dir>, next: Option<Dir>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => prev.is_horizontal() != next.is_horizontal(),
        _ => false,
    }
}

/// Cost of a single move covering `base_dist` distance units.
pub(super) fn step_cost(
    weights: &CostWeights,
    base_dist: f32,
    turning: bool,
    on_obstacle: bool,
    congestion: u32,
) -> f32 {
    let mut cost = weights.distance * base_dist;
    if turning {
        cost += weights.bend;
    }
    if on_obstacle {
        cost += weights.obstacle;
    }
    if congestion > 0 {
        cost += weights.congestion * congestion as f32;
    }
    cost
}

/// Manhattan heuristic over `dist` distance units. Admissible: every
/// step costs at least one distance unit, penalties only add.
pub(super) fn heuristic(weights: &CostWeights, dist: f32) -> f32 {
    weights.distance * dist
}

pub(super) fn scaled(cost: f32) -> u64 {
    (cost * COST_SCALE).round() as u64
}
