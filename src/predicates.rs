//! Spatial predicates for the containment filter and the containment join.
//!
//! Both treat polygons as closed sets: a point or segment on the boundary is
//! covered. A tolerance, relative to the polygon's bbox diagonal, absorbs
//! round-off between the linework and the polygon built from it.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BoundingRect};
use geo_types::{Coord, Line, Polygon};
use rstar::{Envelope, RTree, RTreeObject, AABB};

use crate::noding::{index_lines, IndexedLine};

// Wrapper for Polygon to be indexable by rstar
pub(crate) struct IndexedPolygon {
    pub polygon: Polygon<f64>,
    pub index: usize,
    pub area: f64,
    envelope: AABB<[f64; 2]>,
}

impl IndexedPolygon {
    pub fn new(polygon: Polygon<f64>, index: usize) -> Option<Self> {
        let envelope = Self::aabb_of(&polygon)?;
        let area = polygon.unsigned_area();
        Some(Self {
            polygon,
            index,
            area,
            envelope,
        })
    }

    pub fn aabb_of(polygon: &Polygon<f64>) -> Option<AABB<[f64; 2]>> {
        let bbox = polygon.bounding_rect()?;
        Some(AABB::from_corners(
            [bbox.min().x, bbox.min().y],
            [bbox.max().x, bbox.max().y],
        ))
    }
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn point_segment_distance(p: Coord<f64>, s: &Line<f64>) -> f64 {
    let d = s.delta();
    let len2 = d.x * d.x + d.y * d.y;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x - s.start.x) * d.x + (p.y - s.start.y) * d.y) / len2).clamp(0.0, 1.0)
    };
    let proj = Coord {
        x: s.start.x + t * d.x,
        y: s.start.y + t * d.y,
    };
    (p.x - proj.x).hypot(p.y - proj.y)
}

fn param_along(s: &Line<f64>, p: Coord<f64>) -> f64 {
    let d = s.delta();
    let len2 = d.x * d.x + d.y * d.y;
    if len2 == 0.0 {
        return 0.0;
    }
    (((p.x - s.start.x) * d.x + (p.y - s.start.y) * d.y) / len2).clamp(0.0, 1.0)
}

/// One polygon prepared for repeated point and segment queries.
pub struct PolygonIndex {
    /// Every ring segment, exterior and interiors.
    segments: RTree<IndexedLine>,
    max_x: f64,
    envelope: Option<AABB<[f64; 2]>>,
    tolerance: f64,
}

impl PolygonIndex {
    pub fn new(polygon: &Polygon<f64>, relative_tolerance: f64) -> Self {
        let lines: Vec<Line<f64>> = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.lines())
            .collect();

        let bbox = polygon.bounding_rect();
        let tolerance = bbox
            .map(|b| relative_tolerance * b.width().hypot(b.height()))
            .unwrap_or(0.0);
        let envelope = bbox.map(|b| {
            AABB::from_corners(
                [b.min().x - tolerance, b.min().y - tolerance],
                [b.max().x + tolerance, b.max().y + tolerance],
            )
        });

        Self {
            segments: index_lines(&lines),
            max_x: bbox.map(|b| b.max().x).unwrap_or(f64::NEG_INFINITY),
            envelope,
            tolerance,
        }
    }

    fn on_boundary(&self, c: Coord<f64>) -> bool {
        let t = self.tolerance;
        let window = AABB::from_corners([c.x - t, c.y - t], [c.x + t, c.y + t]);
        self.segments
            .locate_in_envelope_intersecting(&window)
            .any(|s| point_segment_distance(c, &s.line) <= t)
    }

    /// Crossing number along a ray towards +x, over all rings.
    fn strictly_inside(&self, c: Coord<f64>) -> bool {
        let ray = AABB::from_corners([c.x, c.y], [self.max_x.max(c.x), c.y]);
        let crossings = self
            .segments
            .locate_in_envelope_intersecting(&ray)
            .filter(|s| {
                let (p1, p2) = (s.line.start, s.line.end);
                ((p1.y > c.y) != (p2.y > c.y))
                    && (c.x < (p2.x - p1.x) * (c.y - p1.y) / (p2.y - p1.y) + p1.x)
            })
            .count();
        crossings % 2 != 0
    }

    /// Closed point-in-polygon test.
    pub fn covers_point(&self, c: Coord<f64>) -> bool {
        match &self.envelope {
            Some(env) if env.contains_point(&[c.x, c.y]) => {}
            _ => return false,
        }
        self.on_boundary(c) || self.strictly_inside(c)
    }

    /// True when no part of `segment` lies outside the closed polygon.
    pub fn covers_segment(&self, segment: Line<f64>) -> bool {
        if !self.covers_point(segment.start) || !self.covers_point(segment.end) {
            return false;
        }

        // Cut the segment wherever it meets the boundary; each piece is then
        // entirely inside or entirely outside, so its midpoint decides.
        let t = self.tolerance;
        let (s, e) = (segment.start, segment.end);
        let window = AABB::from_corners(
            [s.x.min(e.x) - t, s.y.min(e.y) - t],
            [s.x.max(e.x) + t, s.y.max(e.y) + t],
        );

        let mut params = vec![0.0, 1.0];
        for ring_segment in self.segments.locate_in_envelope_intersecting(&window) {
            match line_intersection(segment, ring_segment.line) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    params.push(param_along(&segment, intersection));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    params.push(param_along(&segment, intersection.start));
                    params.push(param_along(&segment, intersection.end));
                }
                None => {}
            }
        }
        params.sort_by(f64::total_cmp);
        params.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        params.windows(2).all(|w| {
            let mid = (w[0] + w[1]) / 2.0;
            self.covers_point(Coord {
                x: s.x + mid * (e.x - s.x),
                y: s.y + mid * (e.y - s.y),
            })
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct PolygonEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Containment join: which polygon of a collection covers a point.
pub struct PolygonLocator {
    polygons: Vec<PolygonIndex>,
    tree: RTree<PolygonEnvelope>,
}

impl PolygonLocator {
    pub fn new(polygons: &[Polygon<f64>], relative_tolerance: f64) -> Self {
        let polygons: Vec<PolygonIndex> = polygons
            .iter()
            .map(|p| PolygonIndex::new(p, relative_tolerance))
            .collect();
        let envelopes = polygons
            .iter()
            .enumerate()
            .filter_map(|(index, p)| p.envelope.map(|envelope| PolygonEnvelope { index, envelope }))
            .collect();
        Self {
            polygons,
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Index of the first polygon covering `c`. A point on a boundary shared
    /// by several polygons goes to the lowest index only.
    pub fn locate(&self, c: Coord<f64>) -> Option<usize> {
        let mut candidates: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([c.x, c.y]))
            .map(|e| e.index)
            .collect();
        candidates.sort_unstable();
        candidates
            .into_iter()
            .find(|&i| self.polygons[i].covers_point(c))
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, LineString};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)]
    }

    #[test]
    fn test_covers_point_closed() {
        let poly = square();
        let index = PolygonIndex::new(&poly, 1e-9);
        assert!(index.covers_point(c(5.0, 5.0)));
        assert!(index.covers_point(c(0.0, 0.0)));
        assert!(index.covers_point(c(10.0, 4.0)));
        assert!(!index.covers_point(c(10.5, 4.0)));
        assert!(!index.covers_point(c(-3.0, 4.0)));
    }

    #[test]
    fn test_covers_point_respects_holes() {
        let poly = Polygon::new(
            square().exterior().clone(),
            vec![LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])],
        );
        let index = PolygonIndex::new(&poly, 1e-9);
        assert!(!index.covers_point(c(5.0, 5.0)));
        assert!(index.covers_point(c(4.0, 5.0)));
        assert!(index.covers_point(c(2.0, 2.0)));
    }

    #[test]
    fn test_covers_segment() {
        let poly = square();
        let index = PolygonIndex::new(&poly, 1e-9);
        // inside
        assert!(index.covers_segment(Line::new(c(1.0, 1.0), c(9.0, 8.0))));
        // along the boundary
        assert!(index.covers_segment(Line::new(c(0.0, 0.0), c(10.0, 0.0))));
        // crosses out and back in
        assert!(!index.covers_segment(Line::new(c(1.0, 1.0), c(12.0, 5.0))));
    }

    #[test]
    fn test_segment_leaving_through_concave_notch() {
        // U shape: both endpoints inside, segment crosses the notch
        let poly = polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 7.0, y: 10.0),
            (x: 7.0, y: 3.0), (x: 3.0, y: 3.0), (x: 3.0, y: 10.0), (x: 0.0, y: 10.0)
        ];
        let index = PolygonIndex::new(&poly, 1e-9);
        assert!(index.covers_point(c(1.0, 8.0)));
        assert!(index.covers_point(c(9.0, 8.0)));
        assert!(!index.covers_segment(Line::new(c(1.0, 8.0), c(9.0, 8.0))));
        // passing exactly through the notch corners
        assert!(!index.covers_segment(Line::new(c(0.0, 10.0), c(10.0, 10.0))));
        assert!(index.covers_segment(Line::new(c(0.0, 3.0), c(10.0, 3.0))));
    }

    #[test]
    fn test_locator_first_match_wins() {
        let left = square();
        let right = polygon![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 10.0), (x: 10.0, y: 10.0)];
        let polygons = vec![left, right];
        let locator = PolygonLocator::new(&polygons, 1e-9);

        assert_eq!(locator.len(), 2);
        assert_eq!(locator.locate(c(5.0, 5.0)), Some(0));
        assert_eq!(locator.locate(c(15.0, 5.0)), Some(1));
        // shared edge belongs to the lower id only
        assert_eq!(locator.locate(c(10.0, 5.0)), Some(0));
        assert_eq!(locator.locate(c(25.0, 5.0)), None);
    }
}
