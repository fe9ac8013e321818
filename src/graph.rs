use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geom::{Point, Rect};

/// Ports generated per node side when a node declares none of its own.
pub const DEFAULT_PORTS_PER_SIDE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl PortSide {
    pub const ALL: [PortSide; 4] = [
        PortSide::Top,
        PortSide::Bottom,
        PortSide::Left,
        PortSide::Right,
    ];

    /// Whether the side's outward normal runs along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, PortSide::Left | PortSide::Right)
    }
}

/// A connection point on a node face. `offset` is the fractional
/// position along that face, exclusive of the corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub side: PortSide,
    pub offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub bbox: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Node {
    pub fn new(id: impl Into<String>, bbox: Rect) -> Self {
        Self {
            id: id.into(),
            bbox,
            group_id: None,
            ports: Vec::new(),
        }
    }

    pub fn port_position(&self, side: PortSide, offset: f32) -> Point {
        let b = &self.bbox;
        match side {
            PortSide::Top => Point::new(b.x + b.width * offset, b.y),
            PortSide::Bottom => Point::new(b.x + b.width * offset, b.y + b.height),
            PortSide::Left => Point::new(b.x, b.y + b.height * offset),
            PortSide::Right => Point::new(b.x + b.width, b.y + b.height * offset),
        }
    }

    pub fn ports_on(&self, side: PortSide) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(move |p| p.side == side)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub bbox: Rect,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Routed orthogonal polyline, port to port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
    /// Visibility-graph vertex ids the path follows. Absent on fallback
    /// paths and on grid-routed edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_path: Option<Vec<usize>>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            path: None,
            vertex_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: BTreeMap<String, Edge>,
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.id.clone(), group);
    }

    /// Gives every portless node `ports_per_side` evenly spaced ports on
    /// each face. Nodes that already declare ports keep them untouched.
    pub fn ensure_ports(&mut self, ports_per_side: usize) {
        let count = ports_per_side.max(1);
        for node in self.nodes.values_mut() {
            if !node.ports.is_empty() {
                continue;
            }
            for side in PortSide::ALL {
                for i in 0..count {
                    let offset = (i + 1) as f32 / (count + 1) as f32;
                    node.ports.push(Port { side, offset });
                }
            }
        }
    }

    /// Copies group membership onto nodes: every node listed in a group's
    /// `children` gets that group's id. Child ids with no matching node
    /// are ignored; later groups win if membership lists overlap.
    pub fn sync_group_membership(&mut self) {
        for group in self.groups.values() {
            for child_id in &group.children {
                if let Some(node) = self.nodes.get_mut(child_id) {
                    node.group_id = Some(group.id.clone());
                }
            }
        }
    }
}
