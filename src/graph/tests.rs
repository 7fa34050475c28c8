use crate::graph::planar_graph::{NodeKey, PlanarGraph};
use geo::Winding;
use geo_types::{Coord, LineString};

fn node_idx(graph: &PlanarGraph, x: f64, y: f64) -> usize {
    *graph
        .node_map
        .get(&NodeKey::from(Coord { x, y }))
        .expect("node should exist")
}

fn triangle(graph: &mut PlanarGraph, a: (f64, f64), b: (f64, f64), c: (f64, f64)) {
    graph.add_line_string(LineString::from(vec![a, b]));
    graph.add_line_string(LineString::from(vec![b, c]));
    graph.add_line_string(LineString::from(vec![c, a]));
}

#[test]
fn test_graph_construction() {
    let mut graph = PlanarGraph::new();
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (0.0, 10.0)]));

    assert_eq!(graph.nodes.len(), 3); // (0,0), (10,0), (0,10)
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(graph.directed_edges.len(), 4);

    let center = node_idx(&graph, 0.0, 0.0);
    assert_eq!(graph.nodes[center].outgoing_edges.len(), 2);
}

#[test]
fn test_bulk_load_shares_nodes() {
    use geo::Line;
    let mut graph = PlanarGraph::new();
    graph.bulk_load(vec![
        Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }),
        Line::new(Coord { x: 1.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }),
        Line::new(Coord { x: 1.0, y: 1.0 }, Coord { x: 1.0, y: 1.0 }), // degenerate
    ]);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);
}

#[test]
fn test_edge_sorting() {
    let mut graph = PlanarGraph::new();
    // Added out of angular order on purpose
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (-10.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (0.0, -10.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (0.0, 10.0)]));

    graph.sort_edges();

    let center = node_idx(&graph, 0.0, 0.0);
    let edges = &graph.nodes[center].outgoing_edges;
    assert_eq!(edges.len(), 4);

    let dst = |idx: usize| graph.nodes[graph.directed_edges[idx].dst].coordinate;

    // Ascending angle in (-pi, pi]: Down, Right, Up, Left
    assert_eq!(dst(edges[0]), Coord { x: 0.0, y: -10.0 });
    assert_eq!(dst(edges[1]), Coord { x: 10.0, y: 0.0 });
    assert_eq!(dst(edges[2]), Coord { x: 0.0, y: 10.0 });
    assert_eq!(dst(edges[3]), Coord { x: -10.0, y: 0.0 });
}

#[test]
fn test_dangle_pruning() {
    let mut graph = PlanarGraph::new();
    triangle(&mut graph, (0.0, 0.0), (10.0, 0.0), (0.0, 10.0));
    // Two-segment tail at B
    graph.add_line_string(LineString::from(vec![(10.0, 0.0), (20.0, 0.0), (30.0, 5.0)]));

    graph.sort_edges();
    let dangles = graph.prune_dangles();
    assert_eq!(dangles.len(), 2);

    let b = node_idx(&graph, 10.0, 0.0);
    assert_eq!(graph.nodes[b].degree, 2);
}

#[test]
fn test_simple_cycle_orientation() {
    let mut graph = PlanarGraph::new();
    triangle(&mut graph, (0.0, 0.0), (10.0, 0.0), (0.0, 10.0));

    graph.sort_edges();
    let rings = graph.get_edge_rings();

    assert_eq!(rings.len(), 2);
    assert_eq!(rings.iter().filter(|r| r.is_ccw()).count(), 1);
    assert_eq!(rings.iter().filter(|r| r.is_cw()).count(), 1);
}

#[test]
fn test_faces_and_outer_ring() {
    let mut graph = PlanarGraph::new();
    // Unit square split by a diagonal
    graph.add_line_string(LineString::from(vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (0.0, 0.0),
    ]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));

    graph.sort_edges();
    let rings = graph.get_edge_rings();

    assert_eq!(rings.len(), 3);
    let faces: Vec<_> = rings.iter().filter(|r| r.is_ccw()).collect();
    assert_eq!(faces.len(), 2);
    for face in faces {
        assert_eq!(face.0.len(), 4, "triangular face expected, got {:?}", face);
    }
    let outer: Vec<_> = rings.iter().filter(|r| r.is_cw()).collect();
    assert_eq!(outer.len(), 1);
    assert_eq!(outer[0].0.len(), 5);
}

#[test]
fn test_cut_edges() {
    let mut graph = PlanarGraph::new();
    triangle(&mut graph, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
    triangle(&mut graph, (5.0, 0.0), (6.0, 0.0), (5.0, 1.0));
    // Bridge
    graph.add_line_string(LineString::from(vec![(1.0, 0.0), (5.0, 0.0)]));

    graph.sort_edges();
    assert!(graph.prune_dangles().is_empty());

    let cut = graph.mark_cut_edges();
    assert_eq!(cut.len(), 1);
    assert_eq!(cut[0].start.x.min(cut[0].end.x), 1.0);

    let rings = graph.get_edge_rings();
    assert_eq!(rings.len(), 4);
}

#[test]
fn test_merge_path() {
    let mut graph = PlanarGraph::new();
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(2.0, 1.0), (1.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(2.0, 1.0), (3.0, 1.0)]));

    let merged = graph.merge_lines();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].0.len(), 4);
}

#[test]
fn test_merge_stops_at_junction() {
    let mut graph = PlanarGraph::new();
    // Y shape: three arms meeting at (0,0)
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (-1.0, 1.0)]));
    graph.add_line_string(LineString::from(vec![(0.0, 0.0), (-1.0, -1.0)]));

    let merged = graph.merge_lines();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.iter().map(|l| l.0.len() - 1).sum::<usize>(), 4);
}

#[test]
fn test_merge_cycle() {
    let mut graph = PlanarGraph::new();
    triangle(&mut graph, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));

    let merged = graph.merge_lines();
    assert_eq!(merged.len(), 1);
    assert!(merged[0].is_closed());
    assert_eq!(merged[0].0.len(), 4);
}
