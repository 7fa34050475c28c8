use crate::error::Result;
use crate::graph::PlanarGraph;
use crate::graph::planar_graph::NodeKey;
use crate::noding::{self, SnapNoder};
use crate::predicates::IndexedPolygon;
use geo::algorithm::contains::Contains;
use geo::{Area, Line, Winding};
use geo_types::{Coord, Geometry, LineString, Polygon};
use rstar::RTree;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Rings with less area than this are slivers from collapsed geometry.
const MIN_RING_AREA: f64 = 1e-12;

/// Everything `polygonize_full` derives from a set of lines.
#[derive(Clone, Debug, Default)]
pub struct PolygonizeOutput {
    /// Bounded faces, with holes where other linework sits inside them.
    pub polygons: Vec<Polygon<f64>>,
    /// Segments hanging off the rest of the linework by one end.
    pub dangles: Vec<Line<f64>>,
    /// Segments with the same face on both sides (bridges).
    pub cut_edges: Vec<Line<f64>>,
    /// Ring walks that never closed, or closed onto nothing.
    pub invalid_rings: Vec<LineString<f64>>,
    /// Outer boundaries of the connected components that are not nested
    /// inside any face, counter-clockwise.
    outer_shells: Vec<Polygon<f64>>,
}

impl PolygonizeOutput {
    /// The union of all faces.
    ///
    /// Every bounded region cut out by the linework is a face, so the faces
    /// of one connected component dissolve into the region inside that
    /// component's outer boundary. Components nested inside a face of
    /// another are swallowed by it. The result is hole free and reuses the
    /// input vertices exactly.
    pub fn union(&self) -> Vec<Polygon<f64>> {
        self.outer_shells.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

pub struct Polygonizer {
    graph: PlanarGraph,
    // Configuration
    pub check_valid_rings: bool,
    pub node_input: bool,
    /// Snap-round while noding. Only used with `node_input`.
    pub snap_grid_size: Option<f64>,

    // Buffer for inputs, noded when the graph is built
    inputs: Vec<Geometry<f64>>,
}

impl Default for Polygonizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Polygonizer {
    pub fn new() -> Self {
        Self {
            graph: PlanarGraph::new(),
            check_valid_rings: true,
            node_input: false,
            snap_grid_size: None,
            inputs: Vec::new(),
        }
    }

    /// Adds a geometry to the graph.
    pub fn add_geometry(&mut self, geom: Geometry<f64>) {
        self.inputs.push(geom);
    }

    fn build_graph(&mut self) -> Result<()> {
        // Flatten inputs to lineal components
        let mut lines = Vec::new();
        for geom in &self.inputs {
            extract_lines(geom, &mut lines);
        }

        let segments = if self.node_input {
            match self.snap_grid_size {
                Some(grid_size) => SnapNoder::new(grid_size).node(&lines)?,
                None => noding::node_lines(&lines),
            }
        } else {
            noding::segments_of(&lines)
        };

        self.graph = PlanarGraph::new();
        self.graph.bulk_load(segments);
        Ok(())
    }

    /// Computes the polygons.
    pub fn polygonize(&mut self) -> Result<Vec<Polygon<f64>>> {
        Ok(self.polygonize_full()?.polygons)
    }

    /// Computes the polygons together with the leftovers: dangles, cut
    /// edges and invalid rings.
    pub fn polygonize_full(&mut self) -> Result<PolygonizeOutput> {
        self.build_graph()?;

        self.graph.sort_edges();
        let dangles = self.graph.prune_dangles();
        let cut_edges = self.graph.mark_cut_edges();
        let (rings, mut invalid_rings) = self.graph.get_all_rings();

        let mut shells = Vec::new();
        let mut holes = Vec::new();
        for ring in rings {
            for part in split_at_repeated_nodes(&ring) {
                if part.0.len() < 4 {
                    if self.check_valid_rings {
                        invalid_rings.push(part);
                    }
                    continue;
                }
                let poly = Polygon::new(part, vec![]);
                let area = poly.signed_area();
                if area.abs() < MIN_RING_AREA {
                    if self.check_valid_rings {
                        invalid_rings.push(poly.exterior().clone());
                    }
                    continue;
                }
                if area > 0.0 {
                    shells.push(poly);
                } else {
                    holes.push(poly);
                }
            }
        }

        let assignments = assign_holes(&shells, &holes);

        let mut shell_holes: Vec<Vec<LineString<f64>>> = vec![vec![]; shells.len()];
        let mut outer_shells = Vec::new();
        for (hole, assignment) in holes.into_iter().zip(assignments) {
            let (mut exterior, _) = hole.into_inner();
            match assignment {
                Some(idx) => shell_holes[idx].push(exterior),
                None => {
                    exterior.make_ccw_winding();
                    outer_shells.push(Polygon::new(exterior, vec![]));
                }
            }
        }

        let polygons = shells
            .into_iter()
            .zip(shell_holes)
            .map(|(shell, holes)| Polygon::new(shell.into_inner().0, holes))
            .collect::<Vec<_>>();

        log::trace!(
            "polygonized {} faces, {} components, {} dangles, {} cut edges, {} invalid rings",
            polygons.len(),
            outer_shells.len(),
            dangles.len(),
            cut_edges.len(),
            invalid_rings.len()
        );

        Ok(PolygonizeOutput {
            polygons,
            dangles,
            cut_edges,
            invalid_rings,
            outer_shells,
        })
    }
}

/// For each clockwise ring, the smallest face strictly larger than it that
/// contains it.
fn assign_holes(shells: &[Polygon<f64>], holes: &[Polygon<f64>]) -> Vec<Option<usize>> {
    let indexed_shells: Vec<IndexedPolygon> = shells
        .iter()
        .enumerate()
        .filter_map(|(i, shell)| IndexedPolygon::new(shell.clone(), i))
        .collect();
    let tree = RTree::bulk_load(indexed_shells);

    let assign = |hole: &Polygon<f64>| -> Option<usize> {
        let hole_area = hole.unsigned_area();
        let hole_aabb = IndexedPolygon::aabb_of(hole)?;

        let mut best: Option<(usize, f64)> = None;
        for cand in tree.locate_in_envelope_intersecting(&hole_aabb) {
            let area = cand.area;
            // a face with the hole's own outline is its twin, not its container
            if area <= hole_area * (1.0 + 1e-9) + MIN_RING_AREA {
                continue;
            }
            if best.is_some_and(|(_, min_area)| area >= min_area) {
                continue;
            }
            if cand.polygon.contains(hole) {
                best = Some((cand.index, area));
            }
        }
        best.map(|(idx, _)| idx)
    };

    #[cfg(feature = "parallel")]
    let assignments = holes.par_iter().map(assign).collect();
    #[cfg(not(feature = "parallel"))]
    let assignments = holes.iter().map(assign).collect();

    assignments
}

/// Splits a closed walk at every node it passes through more than once,
/// giving simple closed rings.
fn split_at_repeated_nodes(ring: &LineString<f64>) -> Vec<LineString<f64>> {
    let coords = &ring.0;
    if coords.len() < 2 {
        return vec![ring.clone()];
    }

    let mut parts = Vec::new();
    let mut stack: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    let mut position: HashMap<NodeKey, usize> = HashMap::new();

    // The closing coordinate repeats the first, skip it.
    for &c in &coords[..coords.len() - 1] {
        let key = NodeKey::from(c);
        if let Some(&i) = position.get(&key) {
            let mut part: Vec<Coord<f64>> = stack.drain(i..).collect();
            for removed in &part[1..] {
                position.remove(&NodeKey::from(*removed));
            }
            part.push(c);
            parts.push(LineString::new(part));
            stack.push(c);
        } else {
            position.insert(key, stack.len());
            stack.push(c);
        }
    }

    if let Some(&first) = stack.first() {
        stack.push(first);
        parts.push(LineString::new(stack));
    }
    parts
}

fn extract_lines(geom: &Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geom {
        Geometry::Line(line) => out.push(LineString::new(vec![line.start, line.end])),
        Geometry::LineString(ls) => out.push(ls.clone()),
        Geometry::MultiLineString(mls) => {
            out.extend(mls.0.clone());
        }
        Geometry::Polygon(poly) => {
            out.push(poly.exterior().clone());
            out.extend(poly.interiors().iter().cloned());
        }
        Geometry::MultiPolygon(mpoly) => {
            for poly in mpoly {
                out.push(poly.exterior().clone());
                out.extend(poly.interiors().iter().cloned());
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                extract_lines(g, out);
            }
        }
        _ => {}
    }
}
