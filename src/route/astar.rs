use std::cmp::Ordering;

use crate::config::{BlockedPolicy, CostWeights};

use super::cost::{self, Dir, FIRST_STEP_BIAS, NEIGHBORS};
use super::grid::Grid;
use super::queue::MinQueue;

#[derive(Debug, Clone, Copy)]
struct CellEntry {
    est: u64,
    cost: u64,
    cell: (i32, i32),
    came: Option<Dir>,
}

impl Ord for CellEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.est
            .cmp(&other.est)
            .then_with(|| self.cost.cmp(&other.cost))
    }
}

impl PartialOrd for CellEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CellEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellEntry {}

#[derive(Debug)]
pub(super) struct GridPath {
    pub(super) cells: Vec<(i32, i32)>,
    /// Total path cost in fixed-point units; comparable across candidates.
    pub(super) cost: u64,
}

/// A* over grid cells from `start` to `goal`.
///
/// Costs are per-cell: one distance unit per step, a bend penalty when
/// the axis changes, the congestion penalty of the entered cell, and a
/// tenfold bend penalty on a first step that ignores `start_dir`. The
/// cost map is keyed by cell, so the arrival direction of a closed cell
/// is fixed; this trades a sliver of turn optimality for a quarter of
/// the state space, as the original router did.
pub(super) fn search_grid(
    grid: &Grid,
    start: (i32, i32),
    goal: (i32, i32),
    start_dir: Dir,
    weights: &CostWeights,
    policy: BlockedPolicy,
    budget: usize,
) -> Option<GridPath> {
    if !grid.in_bounds(start.0, start.1) || !grid.in_bounds(goal.0, goal.1) {
        return None;
    }
    if policy == BlockedPolicy::Hard
        && (grid.is_blocked(start.0, start.1) || grid.is_blocked(goal.0, goal.1))
    {
        log::trace!("grid search rejected: start or goal cell blocked");
        return None;
    }

    let cols = grid.cols;
    let states = (cols as usize) * (grid.rows as usize);
    let index = |cell: (i32, i32)| (cell.1 * cols + cell.0) as usize;
    let estimate = |cell: (i32, i32)| {
        let dist = (cell.0 - goal.0).abs() + (cell.1 - goal.1).abs();
        cost::scaled(cost::heuristic(weights, dist as f32))
    };

    let mut best = vec![u64::MAX; states];
    let mut prev: Vec<Option<(i32, i32)>> = vec![None; states];
    let mut closed = vec![false; states];
    let mut open = MinQueue::new();

    best[index(start)] = 0;
    open.push(CellEntry {
        est: estimate(start),
        cost: 0,
        cell: start,
        came: None,
    });

    let mut expansions = 0usize;
    let mut reached = false;

    while let Some(entry) = open.pop() {
        let CellEntry {
            cost, cell, came, ..
        } = entry;
        let cell_idx = index(cell);
        if cost != best[cell_idx] || closed[cell_idx] {
            continue;
        }
        if cell == goal {
            reached = true;
            break;
        }
        closed[cell_idx] = true;
        expansions += 1;
        if expansions > budget {
            log::trace!("grid search gave up: expansion budget {budget} exhausted");
            return None;
        }

        for dir in NEIGHBORS {
            let (dx, dy) = dir.delta();
            let next = (cell.0 + dx, cell.1 + dy);
            if !grid.in_bounds(next.0, next.1) {
                continue;
            }
            let blocked = grid.is_blocked(next.0, next.1);
            if blocked && policy == BlockedPolicy::Hard {
                continue;
            }
            let next_idx = index(next);
            if closed[next_idx] {
                continue;
            }

            let turning = cost::is_turn(came, Some(dir));
            let mut step = cost::step_cost(
                weights,
                1.0,
                turning,
                blocked,
                grid.congestion_at(next.0, next.1),
            );
            if came.is_none() && dir != start_dir {
                step += weights.bend * FIRST_STEP_BIAS;
            }
            let next_cost = cost.saturating_add(cost::scaled(step));
            if next_cost >= best[next_idx] {
                continue;
            }
            best[next_idx] = next_cost;
            prev[next_idx] = Some(cell);
            open.push(CellEntry {
                est: next_cost.saturating_add(estimate(next)),
                cost: next_cost,
                cell: next,
                came: Some(dir),
            });
        }
    }

    if !reached {
        return None;
    }

    let mut cells = Vec::new();
    let mut cur = goal;
    loop {
        cells.push(cur);
        match prev[index(cur)] {
            Some(p) => cur = p,
            None => break,
        }
    }
    cells.reverse();
    Some(GridPath {
        cells,
        cost: best[index(goal)],
    })
}
