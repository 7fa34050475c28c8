//! Noding: splitting linework at every intersection so the planar graph
//! sees a node wherever two lines meet. Together with segment
//! deduplication this is the geometric union of a set of lines.

pub mod snap;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::Line;
use geo_types::{Coord, LineString};
use rstar::{RTree, RTreeObject, AABB};
use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use snap::SnapNoder;

const TOLERANCE: f64 = 1e-10;

// Wrapper for Line to be indexable by rstar
#[derive(Clone, Copy, Debug)]
pub(crate) struct IndexedLine {
    pub line: Line<f64>,
    pub index: usize,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let p1 = self.line.start;
        let p2 = self.line.end;
        AABB::from_corners(
            [p1.x.min(p2.x), p1.y.min(p2.y)],
            [p1.x.max(p2.x), p1.y.max(p2.y)],
        )
    }
}

pub(crate) fn index_lines(lines: &[Line<f64>]) -> RTree<IndexedLine> {
    RTree::bulk_load(
        lines
            .iter()
            .enumerate()
            .map(|(index, line)| IndexedLine { line: *line, index })
            .collect(),
    )
}

/// Orients a segment so that it starts at its lexicographically smaller end.
pub fn normalize(mut segment: Line<f64>) -> Line<f64> {
    let start = (segment.start.x, segment.start.y);
    let end = (segment.end.x, segment.end.y);
    if start.partial_cmp(&end) == Some(Ordering::Greater) {
        std::mem::swap(&mut segment.start, &mut segment.end);
    }
    segment
}

fn cmp_segments(a: &Line<f64>, b: &Line<f64>) -> Ordering {
    a.start
        .x
        .total_cmp(&b.start.x)
        .then(a.start.y.total_cmp(&b.start.y))
        .then(a.end.x.total_cmp(&b.end.x))
        .then(a.end.y.total_cmp(&b.end.y))
}

/// Drops zero-length segments and every repeat of a segment, whichever way
/// it was digitized.
pub fn dedup_segments(segments: Vec<Line<f64>>) -> Vec<Line<f64>> {
    let mut segments: Vec<Line<f64>> = segments
        .into_iter()
        .filter(|s| s.start != s.end)
        .map(normalize)
        .collect();

    #[cfg(feature = "parallel")]
    segments.par_sort_unstable_by(cmp_segments);
    #[cfg(not(feature = "parallel"))]
    segments.sort_unstable_by(cmp_segments);

    segments.dedup_by(|a, b| {
        (a.start.x - b.start.x).abs() < TOLERANCE
            && (a.start.y - b.start.y).abs() < TOLERANCE
            && (a.end.x - b.end.x).abs() < TOLERANCE
            && (a.end.y - b.end.y).abs() < TOLERANCE
    });
    segments
}

/// Moves every coordinate lying within `TOLERANCE` of an earlier one onto
/// it, so near-coincident vertices and intersection points become a single
/// graph node.
#[derive(Default)]
struct VertexSnapper {
    nodes: RTree<[f64; 2]>,
}

impl VertexSnapper {
    fn snap(&mut self, c: Coord<f64>) -> Coord<f64> {
        let p = [c.x, c.y];
        match self.nodes.nearest_neighbor(&p).copied() {
            Some(n) if (n[0] - p[0]).hypot(n[1] - p[1]) <= TOLERANCE => Coord { x: n[0], y: n[1] },
            _ => {
                self.nodes.insert(p);
                c
            }
        }
    }
}

/// Flattens line strings into their segments.
pub fn segments_of(lines: &[LineString<f64>]) -> Vec<Line<f64>> {
    lines.iter().flat_map(|ls| ls.lines()).collect()
}

fn is_internal(s: Line<f64>, p: Coord<f64>) -> bool {
    let dx0 = p.x - s.start.x;
    let dy0 = p.y - s.start.y;
    let dx1 = p.x - s.end.x;
    let dy1 = p.y - s.end.y;
    let tol2 = TOLERANCE * TOLERANCE;
    (dx0 * dx0 + dy0 * dy0) > tol2 && (dx1 * dx1 + dy1 * dy1) > tol2
}

fn intersection_events(
    acc: &mut Vec<(usize, Coord<f64>)>,
    cand1: &IndexedLine,
    cand2: &IndexedLine,
) {
    let (idx1, idx2) = (cand1.index, cand2.index);
    // only process unique pairs
    if idx1 >= idx2 {
        return;
    }
    let (s1, s2) = (cand1.line, cand2.line);

    let Some(res) = line_intersection(s1, s2) else {
        return;
    };

    match res {
        LineIntersection::SinglePoint { intersection: pt, .. } => {
            if is_internal(s1, pt) {
                acc.push((idx1, pt));
            }
            if is_internal(s2, pt) {
                acc.push((idx2, pt));
            }
        }
        LineIntersection::Collinear { intersection: overlap } => {
            for p in [overlap.start, overlap.end] {
                if is_internal(s1, p) {
                    acc.push((idx1, p));
                }
                if is_internal(s2, p) {
                    acc.push((idx2, p));
                }
            }
        }
    }
}

/// Splits `segment` at the given points. Points on either end are ignored.
fn split_segment(segment: Line<f64>, mut points: Vec<Coord<f64>>, out: &mut Vec<Line<f64>>) {
    let start = segment.start;
    points.retain(|p| is_internal(segment, *p));
    points.sort_by(|a, b| {
        let da = (a.x - start.x).powi(2) + (a.y - start.y).powi(2);
        let db = (b.x - start.x).powi(2) + (b.y - start.y).powi(2);
        da.total_cmp(&db)
    });
    points.dedup_by(|a, b| (a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE);

    let mut curr = start;
    for pt in points {
        if (pt.x - curr.x).powi(2) + (pt.y - curr.y).powi(2) > TOLERANCE * TOLERANCE {
            out.push(Line::new(curr, pt));
            curr = pt;
        }
    }
    if (segment.end.x - curr.x).powi(2) + (segment.end.y - curr.y).powi(2) > TOLERANCE * TOLERANCE {
        out.push(Line::new(curr, segment.end));
    }
}

/// One-pass noding over an R-tree self join, followed by a global dedup.
///
/// Vertices closer than `TOLERANCE` are merged first, and every split point
/// is snapped onto the vertex or earlier split point it nearly coincides
/// with, so segments meeting at one place share one exact coordinate.
pub fn node_lines(input_lines: &[LineString<f64>]) -> Vec<Line<f64>> {
    let mut snapper = VertexSnapper::default();
    let segments: Vec<Line<f64>> = segments_of(input_lines)
        .into_iter()
        .map(|s| Line::new(snapper.snap(s.start), snapper.snap(s.end)))
        .filter(|s| s.start != s.end)
        .collect();
    let tree = index_lines(&segments);

    #[cfg(feature = "parallel")]
    let mut events: Vec<(usize, Coord<f64>)> = tree
        .intersection_candidates_with_other_tree(&tree)
        .par_bridge()
        .fold(Vec::new, |mut acc, (cand1, cand2)| {
            intersection_events(&mut acc, cand1, cand2);
            acc
        })
        .reduce(Vec::new, |mut a, mut b| {
            a.append(&mut b);
            a
        });

    #[cfg(not(feature = "parallel"))]
    let mut events: Vec<(usize, Coord<f64>)> = tree
        .intersection_candidates_with_other_tree(&tree)
        .fold(Vec::new(), |mut acc, (cand1, cand2)| {
            intersection_events(&mut acc, cand1, cand2);
            acc
        });

    log::trace!(
        "noding {} segments, {} split events",
        segments.len(),
        events.len()
    );

    if events.is_empty() {
        return dedup_segments(segments);
    }

    // Sorted fully so the snapping order does not depend on the join order.
    events.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.x.total_cmp(&b.1.x))
            .then(a.1.y.total_cmp(&b.1.y))
    });
    for event in events.iter_mut() {
        event.1 = snapper.snap(event.1);
    }

    let mut noded = Vec::with_capacity(segments.len() + events.len());
    let mut event_idx = 0;
    for (seg_idx, segment) in segments.iter().enumerate() {
        let mut points_on_seg = Vec::new();
        while event_idx < events.len() && events[event_idx].0 == seg_idx {
            points_on_seg.push(events[event_idx].1);
            event_idx += 1;
        }

        if points_on_seg.is_empty() {
            noded.push(*segment);
        } else {
            split_segment(*segment, points_on_seg, &mut noded);
        }
    }

    dedup_segments(noded)
}
