use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::DEFAULT_PORTS_PER_SIDE;
use crate::route::StrategyKind;

/// How the grid A* treats blocked cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockedPolicy {
    /// Blocked cells are never expanded. Matches the shipped behavior.
    Hard,
    /// Blocked cells are traversable at `cost.obstacle` extra per step.
    Soft,
}

/// How many port combinations the grid router tries per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortCandidatePolicy {
    /// Every port pair on every candidate side pair; cheapest path wins.
    Exhaustive,
    /// Only the single best-scored port pair.
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    pub distance: f32,
    pub bend: f32,
    pub obstacle: f32,
    pub congestion: f32,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            bend: 5.0,
            obstacle: 100.0,
            congestion: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingOptions {
    /// Obstacle margin around node bboxes, in grid cells.
    pub bbox_expand: i32,
    /// Extra outward steps tried when a port's entry cell is blocked.
    pub max_expand_steps: usize,
    /// A* expansion budget per search; 0 derives it from the search space.
    pub max_expansions: usize,
    pub blocked_policy: BlockedPolicy,
    pub port_candidates: PortCandidatePolicy,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            bbox_expand: 3,
            max_expand_steps: 3,
            max_expansions: 0,
            blocked_policy: BlockedPolicy::Hard,
            port_candidates: PortCandidatePolicy::Exhaustive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusOptions {
    /// Distance between parallel lanes on a shared segment.
    pub lane_width: f32,
    /// Per-prior-use penalty on a visibility segment.
    pub congestion_penalty: f32,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            lane_width: 8.0,
            congestion_penalty: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Cell size in pixels; also scales the visibility-axis margin.
    pub grid_size: f32,
    /// Ports generated per side for nodes that declare none.
    pub ports_per_side: usize,
    pub strategy: StrategyKind,
    pub cost: CostWeights,
    pub routing: RoutingOptions,
    pub bus: BusOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            grid_size: 12.0,
            ports_per_side: DEFAULT_PORTS_PER_SIDE,
            strategy: StrategyKind::Mesh,
            cost: CostWeights::default(),
            routing: RoutingOptions::default(),
            bus: BusOptions::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    grid_size: Option<f32>,
    ports_per_side: Option<usize>,
    strategy: Option<StrategyKind>,
    cost: Option<CostFile>,
    routing: Option<RoutingFile>,
    bus: Option<BusFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostFile {
    distance: Option<f32>,
    bend: Option<f32>,
    obstacle: Option<f32>,
    congestion: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingFile {
    bbox_expand: Option<i32>,
    max_expand_steps: Option<usize>,
    max_expansions: Option<usize>,
    blocked_policy: Option<BlockedPolicy>,
    port_candidates: Option<PortCandidatePolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusFile {
    lane_width: Option<f32>,
    congestion_penalty: Option<f32>,
}

/// Parses a JSON5 config (plain JSON is a subset) and merges it onto the
/// defaults. Unknown keys, including the legacy channel-router options,
/// are ignored.
pub fn parse_config(contents: &str) -> anyhow::Result<RouterConfig> {
    let mut config = RouterConfig::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(v) = parsed.grid_size {
        config.grid_size = v;
    }
    if let Some(v) = parsed.ports_per_side {
        config.ports_per_side = v;
    }
    if let Some(v) = parsed.strategy {
        config.strategy = v;
    }
    if let Some(cost) = parsed.cost {
        if let Some(v) = cost.distance {
            config.cost.distance = v;
        }
        if let Some(v) = cost.bend {
            config.cost.bend = v;
        }
        if let Some(v) = cost.obstacle {
            config.cost.obstacle = v;
        }
        if let Some(v) = cost.congestion {
            config.cost.congestion = v;
        }
    }
    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.bbox_expand {
            config.routing.bbox_expand = v;
        }
        if let Some(v) = routing.max_expand_steps {
            config.routing.max_expand_steps = v;
        }
        if let Some(v) = routing.max_expansions {
            config.routing.max_expansions = v;
        }
        if let Some(v) = routing.blocked_policy {
            config.routing.blocked_policy = v;
        }
        if let Some(v) = routing.port_candidates {
            config.routing.port_candidates = v;
        }
    }
    if let Some(bus) = parsed.bus {
        if let Some(v) = bus.lane_width {
            config.bus.lane_width = v;
        }
        if let Some(v) = bus.congestion_penalty {
            config.bus.congestion_penalty = v;
        }
    }
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<RouterConfig> {
    let Some(path) = path else {
        return Ok(RouterConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}
