use crate::geom::{Point, manhattan};
use crate::graph::{Node, PortSide};

use super::cost::Dir;
use super::grid::Grid;

/// Outward cells between a port and its preferred entry cell.
const ENTRY_SAFE_DIST: i32 = 2;

/// Ranked (source side, target side) pairs for two nodes, most direct
/// first. A mostly-horizontal layout leads with the facing left/right
/// pair, then the matched top/bottom pairs, then mixed pairs keeping
/// one primary side; a mostly-vertical layout mirrors the list.
pub(super) fn candidate_side_pairs(source: &Node, target: &Node) -> [(PortSide, PortSide); 7] {
    let ca = source.bbox.center();
    let cb = target.bbox.center();
    let dx = cb.x - ca.x;
    let dy = cb.y - ca.y;

    if dx.abs() > dy.abs() {
        let primary = if ca.x < cb.x {
            (PortSide::Right, PortSide::Left)
        } else {
            (PortSide::Left, PortSide::Right)
        };
        [
            primary,
            (PortSide::Top, PortSide::Top),
            (PortSide::Bottom, PortSide::Bottom),
            (primary.0, PortSide::Top),
            (primary.0, PortSide::Bottom),
            (PortSide::Top, primary.1),
            (PortSide::Bottom, primary.1),
        ]
    } else {
        let primary = if ca.y < cb.y {
            (PortSide::Bottom, PortSide::Top)
        } else {
            (PortSide::Top, PortSide::Bottom)
        };
        [
            primary,
            (PortSide::Right, PortSide::Right),
            (PortSide::Left, PortSide::Left),
            (primary.0, PortSide::Left),
            (primary.0, PortSide::Right),
            (PortSide::Left, primary.1),
            (PortSide::Right, primary.1),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct PortPair {
    pub(super) source: Point,
    pub(super) target: Point,
    pub(super) source_side: PortSide,
    pub(super) target_side: PortSide,
}

/// Cheapest concrete port pair across all candidate side pairs.
///
/// Pair cost is the Manhattan distance plus twice the misalignment
/// across the source side's perpendicular axis, so facing ports at the
/// same height beat closer ports that would force a jog. None when the
/// nodes expose no ports on any candidate side.
pub(super) fn best_port_pair(source: &Node, target: &Node) -> Option<PortPair> {
    let mut best: Option<PortPair> = None;
    let mut min_cost = f32::INFINITY;

    for (source_side, target_side) in candidate_side_pairs(source, target) {
        for s_port in source.ports_on(source_side) {
            for t_port in target.ports_on(target_side) {
                let sp = source.port_position(source_side, s_port.offset);
                let tp = target.port_position(target_side, t_port.offset);
                let misalign = if source_side.is_horizontal() {
                    (sp.y - tp.y).abs()
                } else {
                    (sp.x - tp.x).abs()
                };
                let cost = manhattan(sp, tp) + misalign * 2.0;
                if cost < min_cost {
                    min_cost = cost;
                    best = Some(PortPair {
                        source: sp,
                        target: tp,
                        source_side,
                        target_side,
                    });
                }
            }
        }
    }
    best
}

/// First routable cell reached walking outward from a port.
///
/// The preferred entry sits `ENTRY_SAFE_DIST` cells out along the
/// side's normal, past the blocked ring around the node. When that cell
/// is blocked the walk restarts at the port cell and marches outward
/// one cell at a time, giving up after `max_expand_steps` steps beyond
/// the preferred distance.
pub(super) fn entry_cell(
    grid: &Grid,
    port: Point,
    side: PortSide,
    max_expand_steps: usize,
) -> Option<((i32, i32), Dir)> {
    let (px, py) = grid.world_to_cell(port);
    let dir = Dir::outward(side);
    let (dx, dy) = dir.delta();

    let cx = px + dx * ENTRY_SAFE_DIST;
    let cy = py + dy * ENTRY_SAFE_DIST;
    if grid.in_bounds(cx, cy) && !grid.is_blocked(cx, cy) {
        return Some(((cx, cy), dir));
    }

    let (mut cx, mut cy) = (px, py);
    for _ in 0..ENTRY_SAFE_DIST as usize + max_expand_steps {
        cx += dx;
        cy += dy;
        if grid.in_bounds(cx, cy) && !grid.is_blocked(cx, cy) {
            return Some(((cx, cy), dir));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::geom::Rect;
    use crate::graph::Graph;

    fn make_node(id: &str, x: f32, y: f32) -> Node {
        Node::new(id, Rect::new(x, y, 40.0, 20.0))
    }

    #[test]
    fn horizontal_neighbors_lead_with_facing_sides() {
        let a = make_node("a", 0.0, 0.0);
        let b = make_node("b", 100.0, 10.0);
        let pairs = candidate_side_pairs(&a, &b);
        assert_eq!(pairs[0], (PortSide::Right, PortSide::Left));
        assert_eq!(pairs[1], (PortSide::Top, PortSide::Top));
        assert_eq!(pairs[3], (PortSide::Right, PortSide::Top));
        let reversed = candidate_side_pairs(&b, &a);
        assert_eq!(reversed[0], (PortSide::Left, PortSide::Right));
    }

    #[test]
    fn vertical_neighbors_lead_with_stacked_sides() {
        let a = make_node("a", 0.0, 0.0);
        let b = make_node("b", 10.0, 200.0);
        let pairs = candidate_side_pairs(&a, &b);
        assert_eq!(pairs[0], (PortSide::Bottom, PortSide::Top));
        assert_eq!(pairs[1], (PortSide::Right, PortSide::Right));
    }

    #[test]
    fn best_pair_prefers_aligned_ports() {
        let mut graph = Graph::new();
        graph.add_node(make_node("a", 0.0, 0.0));
        graph.add_node(make_node("b", 100.0, 0.0));
        graph.ensure_ports(4);

        let a = &graph.nodes["a"];
        let b = &graph.nodes["b"];
        let pair = best_port_pair(a, b).expect("ports exist");
        assert_eq!(pair.source_side, PortSide::Right);
        assert_eq!(pair.target_side, PortSide::Left);
        // Same offset on facing sides: zero misalignment.
        assert!((pair.source.y - pair.target.y).abs() < 1e-3);
        assert_eq!(pair.source.x, 40.0);
        assert_eq!(pair.target.x, 100.0);
    }

    #[test]
    fn best_pair_requires_ports() {
        let a = make_node("a", 0.0, 0.0);
        let b = make_node("b", 100.0, 0.0);
        assert!(best_port_pair(&a, &b).is_none());
    }

    #[test]
    fn entry_cell_steps_clear_of_the_blocked_ring() {
        let mut graph = Graph::new();
        graph.add_node(make_node("a", 0.0, 0.0));
        let config = RouterConfig::default();
        let grid = Grid::build(&graph, &config);

        let node = &graph.nodes["a"];
        let port = node.port_position(PortSide::Right, 0.5);
        let ((cx, cy), dir) = entry_cell(
            &grid,
            port,
            PortSide::Right,
            config.routing.max_expand_steps,
        )
        .expect("entry found");
        assert_eq!(dir, Dir::Right);
        assert!(!grid.is_blocked(cx, cy));
        // The safe-distance cell is still inside the blocked ring, so
        // the outward march must have gone past it.
        let (px, _) = grid.world_to_cell(port);
        assert!(cx > px + ENTRY_SAFE_DIST);
        assert_eq!(cy, grid.world_to_cell(port).1);
    }

    #[test]
    fn entry_cell_gives_up_when_the_ray_stays_blocked() {
        let mut graph = Graph::new();
        graph.add_node(make_node("a", 0.0, 0.0));
        let config = RouterConfig::default();
        let grid = Grid::build(&graph, &config);

        let node = &graph.nodes["a"];
        let port = node.port_position(PortSide::Right, 0.5);
        assert!(entry_cell(&grid, port, PortSide::Right, 0).is_none());
    }
}
