use std::collections::HashSet;

use approx::assert_relative_eq;
use geo::Area;
use geo_types::{Coord, Geometry, Line, LineString, MultiLineString, Polygon};
use natural_cities::extractor::{merge_linework, threshold_edges};
use natural_cities::{Crs, Edge, Point, PointId, PolygonExtractor, Polygonizer, TriangulationBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn edge(from: u64, to: u64, a: (f64, f64), b: (f64, f64)) -> Edge {
    let line = Line::new(Coord { x: a.0, y: a.1 }, Coord { x: b.0, y: b.1 });
    let d = line.delta();
    Edge {
        from: PointId(from),
        to: PointId(to),
        line,
        length: d.x.hypot(d.y),
    }
}

fn jittered_grid(seed: u64, n: usize) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            points.push(Point::new(
                (i * n + j) as u64,
                i as f64 + rng.gen_range(-0.1..0.1),
                j as f64 + rng.gen_range(-0.1..0.1),
            ));
        }
    }
    points
}

#[test]
fn test_thresholded_delaunay_linework_dissolves_onto_input_vertices() {
    let points = jittered_grid(11, 8);
    let tin = TriangulationBuilder::default().triangulate(&points).unwrap();
    let (_, head) = threshold_edges(&tin.edges).unwrap();

    let mut poly = Polygonizer::new();
    poly.node_input = true;
    poly.add_geometry(Geometry::MultiLineString(MultiLineString::new(
        merge_linework(&head),
    )));
    let output = poly.polygonize_full().unwrap();
    assert!(!output.is_empty());

    // Faces tile the dissolved region exactly.
    let union = output.union();
    assert!(!union.is_empty());
    let face_area: f64 = output.polygons.iter().map(|p| p.unsigned_area()).sum();
    let union_area: f64 = union.iter().map(|p| p.unsigned_area()).sum();
    assert_relative_eq!(face_area, union_area, epsilon = 1e-9);

    // Delaunay edges never cross, so no vertex is invented.
    let inputs: HashSet<(u64, u64)> = points
        .iter()
        .map(|p| (p.coord.x.to_bits(), p.coord.y.to_bits()))
        .collect();
    for polygon in &union {
        assert!(polygon.interiors().is_empty());
        assert!(polygon
            .exterior()
            .coords()
            .all(|c| inputs.contains(&(c.x.to_bits(), c.y.to_bits()))));
    }
}

#[test]
fn test_bounding_polygon_hole_is_cut_back_out() {
    let edges = vec![
        edge(0, 1, (0.0, 0.0), (10.0, 0.0)),
        edge(1, 2, (10.0, 0.0), (10.0, 10.0)),
        edge(2, 3, (10.0, 10.0), (0.0, 10.0)),
        edge(3, 0, (0.0, 10.0), (0.0, 0.0)),
        edge(0, 4, (0.0, 0.0), (500.0, 500.0)),
    ];
    let bounding = Polygon::new(
        LineString::from(vec![(-1.0, -1.0), (11.0, -1.0), (11.0, 11.0), (-1.0, 11.0), (-1.0, -1.0)]),
        vec![LineString::from(vec![(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0), (4.0, 4.0)])],
    );

    let extracted = PolygonExtractor::default()
        .extract(edges, Some(&bounding), &Crs::default())
        .unwrap()
        .expect("the square closes");
    assert_eq!(extracted.linework.len(), 4);
    assert_eq!(extracted.polygons.len(), 1);
    assert_eq!(extracted.polygons[0].interiors().len(), 1);
    assert_relative_eq!(extracted.polygons[0].unsigned_area(), 96.0, epsilon = 1e-9);
}
