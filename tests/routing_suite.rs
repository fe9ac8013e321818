use std::path::Path;

use orthoflow::config::RouterConfig;
use orthoflow::geom::{manhattan, path_bend_count, path_is_orthogonal, path_length, segment_hits_rect, Point};
use orthoflow::graph::Graph;
use orthoflow::route::{route_graph, StrategyKind};

fn load_fixture(name: &str) -> Graph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    serde_json::from_str(&input).expect("fixture parse failed")
}

fn config_for(strategy: StrategyKind) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.strategy = strategy;
    config
}

/// Endpoint must sit on the perimeter of the node it attaches to.
fn on_perimeter(graph: &Graph, node_id: &str, p: Point) -> bool {
    let b = &graph.nodes[node_id].bbox;
    let eps = 1e-3;
    let on_x = (p.x - b.x).abs() < eps || (p.x - b.max_x()).abs() < eps;
    let on_y = (p.y - b.y).abs() < eps || (p.y - b.max_y()).abs() < eps;
    let within_x = p.x >= b.x - eps && p.x <= b.max_x() + eps;
    let within_y = p.y >= b.y - eps && p.y <= b.max_y() + eps;
    (on_x && within_y) || (on_y && within_x)
}

/// Exact match against one of the node's declared (or generated) ports.
fn on_port(graph: &Graph, node_id: &str, p: Point) -> bool {
    let node = &graph.nodes[node_id];
    node.ports.iter().any(|port| {
        let pos = node.port_position(port.side, port.offset);
        (pos.x - p.x).abs() < 1e-3 && (pos.y - p.y).abs() < 1e-3
    })
}

/// Core output contract: every well-formed edge carries an orthogonal,
/// perimeter-anchored path with no collinear interior points.
fn assert_routed(routed: &Graph, fixture: &str) {
    for (id, edge) in &routed.edges {
        let well_formed = routed.nodes.contains_key(&edge.source_id)
            && routed.nodes.contains_key(&edge.target_id);
        let Some(path) = &edge.path else {
            assert!(!well_formed, "{fixture}/{id}: well-formed edge left unrouted");
            continue;
        };
        assert!(well_formed, "{fixture}/{id}: dangling edge got a path");
        assert!(path.len() >= 2, "{fixture}/{id}: degenerate path {path:?}");
        assert!(
            path_is_orthogonal(path),
            "{fixture}/{id}: non-orthogonal path {path:?}"
        );
        assert_eq!(
            path_bend_count(path),
            path.len() - 2,
            "{fixture}/{id}: collinear interior points in {path:?}"
        );
        assert!(
            on_perimeter(routed, &edge.source_id, path[0]),
            "{fixture}/{id}: start {:?} off the source perimeter",
            path[0]
        );
        assert!(
            on_perimeter(routed, &edge.target_id, path[path.len() - 1]),
            "{fixture}/{id}: end {:?} off the target perimeter",
            path[path.len() - 1]
        );
    }
}

#[test]
fn all_fixtures_route_under_both_strategies() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let fixtures = [
        "pair.json",
        "detour.json",
        "corridor.json",
        "clusters.json",
        "scatter.json",
    ];
    for name in fixtures {
        let graph = load_fixture(name);
        for node in graph.nodes.values() {
            for other in graph.nodes.values() {
                assert!(
                    node.id == other.id || !node.bbox.intersects(&other.bbox),
                    "{name}: fixture nodes {} and {} overlap",
                    node.id,
                    other.id
                );
            }
        }
        for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
            let routed = route_graph(&graph, &config_for(strategy));
            assert_routed(&routed, name);
        }
    }
}

#[test]
fn routing_is_reproducible() {
    let graph = load_fixture("scatter.json");
    for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
        let config = config_for(strategy);
        let once = route_graph(&graph, &config);
        let twice = route_graph(&graph, &config);
        for (id, edge) in &once.edges {
            assert_eq!(edge.path, twice.edges[id].path, "{strategy:?}/{id} diverged");
            assert_eq!(edge.vertex_path, twice.edges[id].vertex_path);
        }
    }
}

#[test]
fn facing_pair_routes_straight() {
    let graph = load_fixture("pair.json");
    for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
        let mut config = config_for(strategy);
        // The 60px gap only fits a one-cell obstacle ring; the default
        // three-cell rings overlap and push the grid route over the top.
        config.routing.bbox_expand = 1;
        let routed = route_graph(&graph, &config);
        let path = routed.edges["e1"].path.as_ref().unwrap();
        assert_eq!(path.len(), 2, "{strategy:?}: expected a straight run, got {path:?}");
        assert_eq!(path_bend_count(path), 0);
        assert_eq!(path[0].x, 40.0, "{strategy:?}: start off a's right face");
        assert_eq!(path[1].x, 100.0, "{strategy:?}: end off b's left face");
        assert!((path[0].y - path[1].y).abs() < 1e-3);
        assert!(on_port(&routed, "a", path[0]));
        assert!(on_port(&routed, "b", path[1]));
    }
}

#[test]
fn blocking_node_forces_a_detour() {
    let graph = load_fixture("detour.json");
    for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
        let routed = route_graph(&graph, &config_for(strategy));
        let path = routed.edges["e1"].path.as_ref().unwrap();
        assert!(
            path_bend_count(path) >= 1,
            "{strategy:?}: detour needs a bend, got {path:?}"
        );
        let blocker = routed.nodes["b"].bbox;
        for pair in path.windows(2) {
            assert!(
                !segment_hits_rect(pair[0], pair[1], &blocker),
                "{strategy:?}: segment {:?} -> {:?} crosses the blocking node",
                pair[0],
                pair[1]
            );
        }
        let direct = manhattan(path[0], path[path.len() - 1]);
        assert!(
            path_length(path) > direct + 1.0,
            "{strategy:?}: detour should exceed the direct run"
        );
    }
}

/// Samples the corridor between the nodes of corridor.json: the y of
/// the horizontal segment that crosses x = 70.
fn corridor_y(routed: &Graph, edge_id: &str) -> f32 {
    let path = routed.edges[edge_id].path.as_ref().unwrap();
    path.windows(2)
        .find(|pair| {
            (pair[0].y - pair[1].y).abs() < 1e-3
                && pair[0].x.min(pair[1].x) < 70.0
                && pair[0].x.max(pair[1].x) > 70.0
        })
        .map(|pair| pair[0].y)
        .unwrap_or_else(|| panic!("{edge_id}: no corridor segment in {path:?}"))
}

#[test]
fn shared_corridor_separates_into_lanes() {
    let graph = load_fixture("corridor.json");
    let config = config_for(StrategyKind::Mesh);
    let routed = route_graph(&graph, &config);

    let separation = (corridor_y(&routed, "e1") - corridor_y(&routed, "e2")).abs();
    assert!(
        (separation - config.bus.lane_width).abs() < 1e-3,
        "lane separation was {separation}, expected {}",
        config.bus.lane_width
    );
    for id in ["e1", "e2"] {
        let path = routed.edges[id].path.as_ref().unwrap();
        assert!(path_is_orthogonal(path));
        assert!(on_port(&routed, "a", path[0]));
        assert!(on_port(&routed, "b", path[path.len() - 1]));
    }
}

#[test]
fn congestion_spreads_parallel_grid_routes() {
    let graph = load_fixture("corridor.json");
    let routed = route_graph(&graph, &config_for(StrategyKind::Grid));

    let first = routed.edges["e1"].path.as_ref().unwrap();
    let second = routed.edges["e2"].path.as_ref().unwrap();
    assert_ne!(first, second, "second edge should avoid the used corridor");
}

#[test]
fn grouped_clusters_route_around_each_other() {
    let graph = load_fixture("clusters.json");
    for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
        let routed = route_graph(&graph, &config_for(strategy));
        // The dangling edge is skipped; everything else still routes.
        assert!(routed.edges["broken"].path.is_none());
        for id in ["e1", "e2", "e3"] {
            assert!(
                routed.edges[id].path.is_some(),
                "{strategy:?}/{id}: edge lost to an unrelated failure"
            );
        }
    }
}

#[test]
fn search_completes_within_the_cell_count_budget() {
    // The closed set caps grid expansions at one per cell, so a budget
    // at the cell count can never starve a reachable goal.
    let graph = load_fixture("detour.json");
    let mut config = config_for(StrategyKind::Grid);
    config.routing.max_expansions = 1200;
    let routed = route_graph(&graph, &config);

    let path = routed.edges["e1"].path.as_ref().unwrap();
    assert!(path_bend_count(path) >= 1, "budgeted search still detours");
}

#[test]
fn starved_budget_degrades_to_elbows_not_panics() {
    let graph = load_fixture("scatter.json");
    for strategy in [StrategyKind::Grid, StrategyKind::Mesh] {
        let mut config = config_for(strategy);
        config.routing.max_expansions = 1;
        let routed = route_graph(&graph, &config);
        for (id, edge) in &routed.edges {
            let path = edge.path.as_ref().unwrap_or_else(|| {
                panic!("{strategy:?}/{id}: starved edge lost its fallback")
            });
            assert!(
                path.len() <= 3,
                "{strategy:?}/{id}: expected an elbow, got {path:?}"
            );
            assert!(path_is_orthogonal(path));
        }
    }
}

#[test]
fn routed_graphs_survive_a_serde_round_trip() {
    let graph = load_fixture("pair.json");
    let routed = route_graph(&graph, &config_for(StrategyKind::Mesh));
    let json = serde_json::to_string(&routed).unwrap();
    let back: Graph = serde_json::from_str(&json).unwrap();
    assert_eq!(back.edges["e1"].path, routed.edges["e1"].path);
    assert_eq!(back.edges["e1"].vertex_path, routed.edges["e1"].vertex_path);
}
