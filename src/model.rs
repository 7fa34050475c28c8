//! Typed records flowing through the natural cities pipeline.
//!
//! Every level of the hierarchy owns its own arena of polygons and linework,
//! indexed by `poly_id` / `edge_id`. Nesting between levels is recorded once,
//! in `parent_poly_id`, when a branch is extracted inside its parent polygon.

use std::collections::BTreeMap;
use std::fmt;

use geo_types::{Coord, Line, Polygon};

use crate::predicates::PolygonIndex;

/// Stable identifier of an input point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(pub u64);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub coord: Coord<f64>,
}

impl Point {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id: PointId(id),
            coord: Coord { x, y },
        }
    }
}

/// Coordinate reference system tag. Carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Crs(pub Option<String>);

impl Crs {
    pub fn named(name: impl Into<String>) -> Self {
        Crs(Some(name.into()))
    }
}

/// An ordered collection of points plus the CRS they are expressed in.
#[derive(Clone, Debug, Default)]
pub struct PointSet {
    pub points: Vec<Point>,
    pub crs: Crs,
}

impl PointSet {
    pub fn new(points: Vec<Point>, crs: Crs) -> Self {
        Self { points, crs }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One triangulation edge between two input points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub from: PointId,
    pub to: PointId,
    pub line: Line<f64>,
    pub length: f64,
}

/// Output of one polygon extraction: the linework that survived the
/// threshold (and the containment filter) and the polygons it encloses.
#[derive(Clone, Debug)]
pub struct ExtractedPolygons {
    pub linework: Vec<Edge>,
    pub polygons: Vec<Polygon<f64>>,
    pub crs: Crs,
    /// Mean edge length used as the threshold for this extraction.
    pub threshold: f64,
}

#[derive(Clone, Debug)]
pub struct LevelPolygon {
    pub level: usize,
    pub poly_id: usize,
    /// Polygon of the previous level this one was extracted inside.
    pub parent_poly_id: Option<usize>,
    pub geometry: Polygon<f64>,
    /// Points of this level's input that fell inside the polygon.
    pub member_count: usize,
}

#[derive(Clone, Debug)]
pub struct LevelEdge {
    pub level: usize,
    pub edge_id: usize,
    pub parent_poly_id: Option<usize>,
    pub edge: Edge,
}

#[derive(Clone, Debug, Default)]
pub struct Level {
    pub index: usize,
    pub polygons: Vec<LevelPolygon>,
    pub linework: Vec<LevelEdge>,
    /// Each point covered by one of this level's polygons, with that polygon's `poly_id`.
    pub membership: Vec<(PointId, usize)>,
}

impl Level {
    pub fn polygon(&self, poly_id: usize) -> Option<&LevelPolygon> {
        self.polygons.get(poly_id)
    }

    /// Groups member points by containing polygon, in `poly_id` order.
    pub fn groups(&self) -> BTreeMap<usize, Vec<PointId>> {
        let mut groups: BTreeMap<usize, Vec<PointId>> = BTreeMap::new();
        for &(point_id, poly_id) in &self.membership {
            groups.entry(poly_id).or_default().push(point_id);
        }
        groups
    }
}

/// The full multi-level result. Levels with no polygons are never stored,
/// so `levels.len()` is the number of populated levels.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    pub levels: Vec<Level>,
    pub crs: Crs,
}

impl Hierarchy {
    pub fn empty(crs: Crs) -> Self {
        Self {
            levels: Vec::new(),
            crs,
        }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn polygons(&self) -> impl Iterator<Item = &LevelPolygon> {
        self.levels.iter().flat_map(|level| level.polygons.iter())
    }

    pub fn linework(&self) -> impl Iterator<Item = &LevelEdge> {
        self.levels.iter().flat_map(|level| level.linework.iter())
    }

    /// For every point that reached at least one level: its `poly_id` at
    /// level 0, 1, ... down to the deepest level containing it.
    pub fn membership_table(&self) -> BTreeMap<PointId, Vec<usize>> {
        let mut table: BTreeMap<PointId, Vec<usize>> = BTreeMap::new();
        for level in &self.levels {
            for &(point_id, poly_id) in &level.membership {
                let chain = table.entry(point_id).or_default();
                if chain.len() == level.index {
                    chain.push(poly_id);
                }
            }
        }
        table
    }

    /// Checks that every polygon below level 0 names an existing parent and
    /// lies inside it.
    pub fn check_nesting(&self, tolerance: f64) -> bool {
        for pair in self.levels.windows(2) {
            let (parent_level, child_level) = (&pair[0], &pair[1]);
            for child in &child_level.polygons {
                let Some(parent) = child
                    .parent_poly_id
                    .and_then(|id| parent_level.polygon(id))
                else {
                    return false;
                };
                let index = PolygonIndex::new(&parent.geometry, tolerance);
                let inside = child
                    .geometry
                    .exterior()
                    .lines()
                    .all(|segment| index.covers_segment(segment));
                if !inside {
                    return false;
                }
            }
        }
        true
    }
}
