use crate::config::RouterConfig;
use crate::geom::{Point, Rect, snap_down};
use crate::graph::Graph;

/// Free cells kept around the world bounds on every side.
const GRID_MARGIN_CELLS: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct GridCell {
    pub(super) blocked: bool,
    pub(super) congestion: u32,
}

/// Rasterized world map for the grid strategy. Cells are stored
/// row-major; congestion accumulates as edges are routed.
#[derive(Debug, Clone)]
pub(super) struct Grid {
    pub(super) cols: i32,
    pub(super) rows: i32,
    pub(super) cell_size: f32,
    pub(super) origin_x: f32,
    pub(super) origin_y: f32,
    cells: Vec<GridCell>,
}

impl Grid {
    /// Builds the obstacle map: world bounds plus a 10-cell margin,
    /// origin snapped down to a cell multiple, every node bbox blocked
    /// with `routing.bbox_expand` cells of padding. Groups are left
    /// open so paths may cross their interiors.
    pub(super) fn build(graph: &Graph, config: &RouterConfig) -> Self {
        let cell = config.grid_size;
        let margin = GRID_MARGIN_CELLS * cell;
        let bounds = world_bounds(graph);

        let origin_x = snap_down(bounds.x - margin, cell);
        let origin_y = snap_down(bounds.y - margin, cell);
        let cols = (((bounds.max_x() + margin - origin_x) / cell).ceil() as i32).max(1);
        let rows = (((bounds.max_y() + margin - origin_y) / cell).ceil() as i32).max(1);

        let mut grid = Self {
            cols,
            rows,
            cell_size: cell,
            origin_x,
            origin_y,
            cells: vec![GridCell::default(); (cols as usize) * (rows as usize)],
        };
        for node in graph.nodes.values() {
            grid.block_rect(&node.bbox, config.routing.bbox_expand);
        }
        log::debug!(
            "grid built: {}x{} cells, {} blocked",
            grid.cols,
            grid.rows,
            grid.cells.iter().filter(|c| c.blocked).count()
        );
        grid
    }

    fn index(&self, cx: i32, cy: i32) -> usize {
        (cy * self.cols + cx) as usize
    }

    pub(super) fn in_bounds(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && cx < self.cols && cy < self.rows
    }

    /// Cells outside the grid count as blocked.
    pub(super) fn is_blocked(&self, cx: i32, cy: i32) -> bool {
        !self.in_bounds(cx, cy) || self.cells[self.index(cx, cy)].blocked
    }

    pub(super) fn congestion_at(&self, cx: i32, cy: i32) -> u32 {
        if self.in_bounds(cx, cy) {
            self.cells[self.index(cx, cy)].congestion
        } else {
            0
        }
    }

    pub(super) fn add_congestion(&mut self, cx: i32, cy: i32) {
        if self.in_bounds(cx, cy) {
            let idx = self.index(cx, cy);
            self.cells[idx].congestion += 1;
        }
    }

    fn block_rect(&mut self, bbox: &Rect, pad_cells: i32) {
        let cell = self.cell_size;
        let min_cx = ((bbox.x - self.origin_x) / cell).floor() as i32 - pad_cells;
        let min_cy = ((bbox.y - self.origin_y) / cell).floor() as i32 - pad_cells;
        let max_cx = ((bbox.max_x() - self.origin_x) / cell).ceil() as i32 + pad_cells;
        let max_cy = ((bbox.max_y() - self.origin_y) / cell).ceil() as i32 + pad_cells;
        for cy in min_cy.max(0)..max_cy.min(self.rows) {
            for cx in min_cx.max(0)..max_cx.min(self.cols) {
                let idx = self.index(cx, cy);
                self.cells[idx].blocked = true;
            }
        }
    }

    /// Nearest cell to a world point.
    pub(super) fn world_to_cell(&self, p: Point) -> (i32, i32) {
        (
            ((p.x - self.origin_x) / self.cell_size).round() as i32,
            ((p.y - self.origin_y) / self.cell_size).round() as i32,
        )
    }

    /// World position of a cell's center.
    pub(super) fn cell_center(&self, cx: i32, cy: i32) -> Point {
        Point::new(
            self.origin_x + cx as f32 * self.cell_size + self.cell_size / 2.0,
            self.origin_y + cy as f32 * self.cell_size + self.cell_size / 2.0,
        )
    }
}

/// Union of all node and group bboxes; the origin rect when empty.
fn world_bounds(graph: &Graph) -> Rect {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let rects = graph
        .nodes
        .values()
        .map(|n| &n.bbox)
        .chain(graph.groups.values().map(|g| &g.bbox));
    let mut seen = false;
    for rect in rects {
        seen = true;
        min_x = min_x.min(rect.x);
        min_y = min_y.min(rect.y);
        max_x = max_x.max(rect.max_x());
        max_y = max_y.max(rect.max_y());
    }
    if !seen {
        return Rect::new(0.0, 0.0, 0.0, 0.0);
    }
    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
