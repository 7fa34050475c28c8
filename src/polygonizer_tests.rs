#[cfg(test)]
mod tests {
    use crate::Polygonizer;
    use geo::{Area, Winding};
    use geo_types::{Coord, Geometry, Line, LineString};

    fn square(x0: f64, y0: f64, size: f64) -> Geometry<f64> {
        LineString::from(vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
            (x0, y0),
        ])
        .into()
    }

    #[test]
    fn test_polygonize_simple_triangle() {
        let mut poly = Polygonizer::new();
        poly.add_geometry(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]).into());
        poly.add_geometry(LineString::from(vec![(10.0, 0.0), (0.0, 10.0)]).into());
        poly.add_geometry(LineString::from(vec![(0.0, 10.0), (0.0, 0.0)]).into());

        let polygons = poly.polygonize().unwrap();
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].unsigned_area() - 50.0).abs() < 1e-9);
        assert!(polygons[0].exterior().is_ccw());
    }

    #[test]
    fn test_polygonize_hole() {
        let mut poly = Polygonizer::new();
        poly.add_geometry(square(0.0, 0.0, 10.0));
        poly.add_geometry(square(2.0, 2.0, 6.0));

        let polygons = poly.polygonize().unwrap();
        assert_eq!(polygons.len(), 2, "Expected 2 polygons, found {}", polygons.len());

        let donut = polygons.iter().find(|p| (p.unsigned_area() - 64.0).abs() < 1e-9);
        assert!(donut.is_some(), "Donut polygon not found");
        assert_eq!(donut.unwrap().interiors().len(), 1);

        let island = polygons.iter().find(|p| (p.unsigned_area() - 36.0).abs() < 1e-9);
        assert!(island.is_some(), "Island polygon not found");
    }

    #[test]
    fn test_noding_crossing_lines() {
        let mut poly = Polygonizer::new();
        poly.node_input = true;

        poly.add_geometry(square(0.0, 0.0, 10.0));
        poly.add_geometry(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]).into());
        poly.add_geometry(LineString::from(vec![(0.0, 10.0), (10.0, 0.0)]).into());

        // The frame is the outer boundary, not a face.
        let polygons = poly.polygonize().expect("Polygonization failed");
        assert_eq!(polygons.len(), 4, "Expected 4 triangles, found {}", polygons.len());
        let triangles_count = polygons.iter().filter(|p| (p.unsigned_area() - 25.0).abs() < 1e-6).count();
        assert_eq!(triangles_count, 4, "Expected 4 triangles of area 25");
    }

    #[test]
    fn test_noding_collinear_lines() {
        let mut poly = Polygonizer::new();
        poly.node_input = true;

        // (0,0)-(10,0) and (5,0)-(15,0) overlap on 5..10, which also
        // closes the box (5,0)-(10,0)-(10,10)-(5,10).
        poly.add_geometry(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]).into());
        poly.add_geometry(LineString::from(vec![(5.0, 0.0), (15.0, 0.0)]).into());
        poly.add_geometry(LineString::from(vec![
            (10.0, 0.0), (10.0, 10.0), (5.0, 10.0), (5.0, 0.0)
        ]).into());

        let output = poly.polygonize_full().expect("Polygonization failed");
        assert_eq!(output.polygons.len(), 1);
        assert!((output.polygons[0].unsigned_area() - 50.0).abs() < 1e-6);
        assert_eq!(output.dangles.len(), 2);
    }

    #[test]
    fn test_full_output_reports_leftovers() {
        let mut poly = Polygonizer::new();
        // Two squares joined by a bridge, plus a tail
        poly.add_geometry(square(0.0, 0.0, 1.0));
        poly.add_geometry(square(3.0, 0.0, 1.0));
        poly.add_geometry(LineString::from(vec![(1.0, 0.0), (3.0, 0.0)]).into());
        poly.add_geometry(LineString::from(vec![(4.0, 1.0), (5.0, 2.0), (6.0, 2.0)]).into());

        let output = poly.polygonize_full().unwrap();
        assert_eq!(output.polygons.len(), 2);
        assert_eq!(output.dangles.len(), 2);
        assert_eq!(
            output.cut_edges,
            vec![Line::new(Coord { x: 1.0, y: 0.0 }, Coord { x: 3.0, y: 0.0 })]
        );
        assert!(output.invalid_rings.is_empty());
    }

    #[test]
    fn test_union_dissolves_shared_edges() {
        let mut poly = Polygonizer::new();
        poly.node_input = true;
        poly.add_geometry(square(0.0, 0.0, 50.0));
        poly.add_geometry(square(50.0, 0.0, 50.0));

        let output = poly.polygonize_full().unwrap();
        assert_eq!(output.polygons.len(), 2);

        let union = output.union();
        assert_eq!(union.len(), 1);
        assert!((union[0].unsigned_area() - 5000.0).abs() < 1e-9);
        assert!(union[0].interiors().is_empty());
        assert!(union[0].exterior().is_ccw());
    }

    #[test]
    fn test_union_swallows_nested_components() {
        let mut poly = Polygonizer::new();
        poly.add_geometry(square(0.0, 0.0, 100.0));
        poly.add_geometry(square(20.0, 20.0, 60.0));
        poly.add_geometry(square(40.0, 40.0, 20.0));
        // A separate component far away
        poly.add_geometry(square(200.0, 0.0, 10.0));

        let output = poly.polygonize_full().unwrap();
        assert_eq!(output.polygons.len(), 4);

        let mut areas: Vec<f64> = output.union().iter().map(|p| p.unsigned_area()).collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas, vec![100.0, 10000.0]);
    }

    #[test]
    fn test_union_splits_pinched_boundary() {
        // Two triangles touching at one vertex
        let mut poly = Polygonizer::new();
        poly.add_geometry(LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).into());
        poly.add_geometry(LineString::from(vec![(1.0, 1.0), (2.0, 2.0), (0.0, 2.0), (1.0, 1.0)]).into());

        let output = poly.polygonize_full().unwrap();
        assert_eq!(output.polygons.len(), 2);
        let union = output.union();
        assert_eq!(union.len(), 2);
        assert!(union.iter().all(|p| (p.unsigned_area() - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_no_faces() {
        let mut poly = Polygonizer::new();
        poly.add_geometry(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)]).into());
        let output = poly.polygonize_full().unwrap();
        assert!(output.is_empty());
        assert!(output.union().is_empty());
        assert_eq!(output.dangles.len(), 2);
    }
}
