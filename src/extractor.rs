//! One natural-polygon extraction: threshold triangulation edges at their
//! mean length, keep the short ones, and polygonize what they enclose.

use geo::BooleanOps;
use geo_types::{Geometry, LineString, MultiLineString, Polygon};

use crate::config::HierarchyConfig;
use crate::error::Result;
use crate::graph::PlanarGraph;
use crate::model::{Crs, Edge, ExtractedPolygons, Point};
use crate::noding::dedup_segments;
use crate::polygonizer::Polygonizer;
use crate::predicates::PolygonIndex;
use crate::triangulation::{mean_length, TriangulationBuilder};

/// Splits `edges` at their mean length. Returns the mean and the edges
/// strictly shorter than it, in input order.
pub fn threshold_edges(edges: &[Edge]) -> Option<(f64, Vec<Edge>)> {
    let mean = mean_length(edges)?;
    let head = edges.iter().filter(|e| e.length < mean).copied().collect();
    Some((mean, head))
}

/// Line-merges segments into maximal lines. Repeated segments (shared
/// triangle edges) count once.
pub fn merge_linework(edges: &[Edge]) -> Vec<LineString<f64>> {
    let mut graph = PlanarGraph::new();
    graph.bulk_load(dedup_segments(edges.iter().map(|e| e.line).collect()));
    graph.merge_lines()
}

#[derive(Clone, Copy, Debug)]
pub struct PolygonExtractor {
    pub triangulator: TriangulationBuilder,
    pub boundary_tolerance: f64,
    pub snap_grid_size: Option<f64>,
}

impl Default for PolygonExtractor {
    fn default() -> Self {
        Self::new(&HierarchyConfig::default())
    }
}

impl PolygonExtractor {
    pub fn new(config: &HierarchyConfig) -> Self {
        Self {
            triangulator: TriangulationBuilder::new(config.length_metric)
                .with_dedup_edges(config.dedup_edges),
            boundary_tolerance: config.boundary_tolerance,
            snap_grid_size: config.snap_grid_size,
        }
    }

    /// Triangulates `points` and extracts from the resulting edges.
    /// Fails with `DegenerateInput` when the points cannot be triangulated.
    pub fn extract_points(
        &self,
        points: &[Point],
        bounding_polygon: Option<&Polygon<f64>>,
        crs: &Crs,
    ) -> Result<Option<ExtractedPolygons>> {
        let triangulation = self.triangulator.triangulate(points)?;
        self.extract(triangulation.edges, bounding_polygon, crs)
    }

    /// `Ok(None)` means the surviving linework encloses nothing.
    pub fn extract(
        &self,
        edges: Vec<Edge>,
        bounding_polygon: Option<&Polygon<f64>>,
        crs: &Crs,
    ) -> Result<Option<ExtractedPolygons>> {
        let total = edges.len();
        let Some((threshold, mut linework)) = threshold_edges(&edges) else {
            return Ok(None);
        };
        drop(edges);

        if let Some(bounding) = bounding_polygon {
            let index = PolygonIndex::new(bounding, self.boundary_tolerance);
            linework.retain(|e| index.covers_segment(e.line));
        }

        log::debug!(
            "mean edge length {:.6}: kept {} of {} edges",
            threshold,
            linework.len(),
            total
        );

        if linework.is_empty() {
            return Ok(None);
        }

        let merged = merge_linework(&linework);

        let mut polygonizer = Polygonizer::new();
        polygonizer.node_input = true;
        polygonizer.snap_grid_size = self.snap_grid_size;
        polygonizer.add_geometry(Geometry::MultiLineString(MultiLineString::new(merged)));

        let output = polygonizer.polygonize_full()?;
        if output.is_empty() {
            log::debug!(
                "linework does not close ({} dangles, {} cut edges)",
                output.dangles.len(),
                output.cut_edges.len()
            );
            return Ok(None);
        }

        let mut polygons = output.union();
        if let Some(bounding) = bounding_polygon {
            if !bounding.interiors().is_empty() {
                // Faces may close over a hole of the parent; cut it back out.
                polygons = polygons
                    .iter()
                    .flat_map(|p| p.intersection(bounding).0)
                    .collect();
            }
        }

        if polygons.is_empty() {
            return Ok(None);
        }

        Ok(Some(ExtractedPolygons {
            linework,
            polygons,
            crs: crs.clone(),
            threshold,
        }))
    }
}
