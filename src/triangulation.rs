//! Delaunay triangulation of a point set, flattened into measured edges.

use std::collections::HashSet;

use delaunator::{triangulate, Point as DPoint};
use geo::{Distance, Euclidean, Haversine};
use geo_types::{Line, Point as GeoPoint};

use crate::config::LengthMetric;
use crate::error::{NaturalCitiesError, Result};
use crate::model::{Edge, Point};

/// Edges of one triangulation. Without deduplication every triangle
/// contributes its three edges, so interior edges appear twice.
#[derive(Clone, Debug)]
pub struct Triangulation {
    pub triangle_count: usize,
    pub edges: Vec<Edge>,
}

impl Triangulation {
    pub fn mean_length(&self) -> Option<f64> {
        mean_length(&self.edges)
    }
}

pub fn mean_length(edges: &[Edge]) -> Option<f64> {
    if edges.is_empty() {
        return None;
    }
    let total: f64 = edges.iter().map(|e| e.length).sum();
    Some(total / edges.len() as f64)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TriangulationBuilder {
    pub metric: LengthMetric,
    pub dedup_edges: bool,
}

impl TriangulationBuilder {
    pub fn new(metric: LengthMetric) -> Self {
        Self {
            metric,
            dedup_edges: false,
        }
    }

    pub fn with_dedup_edges(mut self, dedup: bool) -> Self {
        self.dedup_edges = dedup;
        self
    }

    pub fn triangulate(&self, points: &[Point]) -> Result<Triangulation> {
        if let Some(p) = points
            .iter()
            .find(|p| !p.coord.x.is_finite() || !p.coord.y.is_finite())
        {
            return Err(NaturalCitiesError::InvalidGeometry(format!(
                "point {} has a non-finite coordinate",
                p.id
            )));
        }

        // Coincident points would give zero-length edges; keep the first id.
        let mut unique: Vec<Point> = points.to_vec();
        unique.sort_by(|a, b| {
            a.coord
                .x
                .total_cmp(&b.coord.x)
                .then_with(|| a.coord.y.total_cmp(&b.coord.y))
                .then_with(|| a.id.cmp(&b.id))
        });
        unique.dedup_by(|a, b| a.coord == b.coord);

        if unique.len() < 3 {
            return Err(NaturalCitiesError::DegenerateInput(format!(
                "need at least 3 distinct points, got {}",
                unique.len()
            )));
        }

        let d_points: Vec<DPoint> = unique
            .iter()
            .map(|p| DPoint {
                x: p.coord.x,
                y: p.coord.y,
            })
            .collect();

        let triangulation = triangulate(&d_points);
        let triangle_count = triangulation.triangles.len() / 3;
        if triangle_count == 0 {
            return Err(NaturalCitiesError::DegenerateInput(format!(
                "all {} points are collinear",
                unique.len()
            )));
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut edges = Vec::with_capacity(triangle_count * 3);
        for tri in triangulation.triangles.chunks_exact(3) {
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                if self.dedup_edges && !seen.insert((a.min(b), a.max(b))) {
                    continue;
                }
                let (pa, pb) = (&unique[a], &unique[b]);
                edges.push(Edge {
                    from: pa.id,
                    to: pb.id,
                    line: Line::new(pa.coord, pb.coord),
                    length: self.measure(pa, pb),
                });
            }
        }

        log::trace!(
            "triangulated {} points into {} triangles, {} edges",
            unique.len(),
            triangle_count,
            edges.len()
        );

        Ok(Triangulation {
            triangle_count,
            edges,
        })
    }

    fn measure(&self, a: &Point, b: &Point) -> f64 {
        let (pa, pb) = (GeoPoint::from(a.coord), GeoPoint::from(b.coord));
        match self.metric {
            LengthMetric::Euclidean => Euclidean.distance(pa, pb),
            LengthMetric::Haversine => Haversine.distance(pa, pb),
        }
    }
}
