use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line};
use geo_types::LineString;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{dedup_segments, index_lines, segments_of};
use crate::error::{NaturalCitiesError, Result};

/// Snap-rounding noder: every vertex and intersection is rounded to a
/// grid, and splitting repeats until no new intersections show up.
#[derive(Clone, Copy, Debug)]
pub struct SnapNoder {
    pub grid_size: f64,
    pub max_iter: usize,
}

impl SnapNoder {
    pub fn new(grid_size: f64) -> Self {
        Self {
            grid_size,
            max_iter: 10,
        }
    }

    /// Fails if new intersections still appear after `max_iter` passes.
    pub fn node(&self, input_lines: &[LineString<f64>]) -> Result<Vec<Line<f64>>> {
        let mut lines: Vec<Line<f64>> = segments_of(input_lines)
            .into_iter()
            .map(|l| Line::new(self.snap(l.start), self.snap(l.end)))
            .filter(|l| l.start != l.end)
            .collect();

        for iteration in 0..self.max_iter {
            let split_map = self.find_splits(&lines);
            if split_map.is_empty() {
                log::trace!("snap noding converged after {} passes", iteration);
                return Ok(dedup_segments(lines));
            }

            let mut new_lines = Vec::with_capacity(lines.len() * 2);
            for (i, line) in lines.iter().enumerate() {
                let Some(splits) = split_map.get(&i) else {
                    new_lines.push(*line);
                    continue;
                };

                let mut points = splits.clone();
                points.push(line.start);
                points.push(line.end);

                let start = line.start;
                points.sort_by(|a, b| {
                    let da = (a.x - start.x).powi(2) + (a.y - start.y).powi(2);
                    let db = (b.x - start.x).powi(2) + (b.y - start.y).powi(2);
                    da.partial_cmp(&db).unwrap_or(Ordering::Equal)
                });
                points.dedup();

                for w in points.windows(2) {
                    if w[0] != w[1] {
                        new_lines.push(Line::new(w[0], w[1]));
                    }
                }
            }

            lines = dedup_segments(new_lines);
        }

        if self.find_splits(&lines).is_empty() {
            Ok(lines)
        } else {
            Err(NaturalCitiesError::NodingError(format!(
                "snap rounding at grid {} did not converge in {} passes",
                self.grid_size, self.max_iter
            )))
        }
    }

    fn snap(&self, c: Coord<f64>) -> Coord<f64> {
        if self.grid_size == 0.0 {
            return c;
        }
        Coord {
            x: (c.x / self.grid_size).round() * self.grid_size,
            y: (c.y / self.grid_size).round() * self.grid_size,
        }
    }

    fn push_split(&self, splits: &mut HashMap<usize, Vec<Coord<f64>>>, idx: usize, line: Line<f64>, p: Coord<f64>) {
        if p != line.start && p != line.end {
            splits.entry(idx).or_default().push(p);
        }
    }

    fn find_splits(&self, lines: &[Line<f64>]) -> HashMap<usize, Vec<Coord<f64>>> {
        let mut splits = HashMap::new();
        let tree = index_lines(lines);

        for (c1, c2) in tree.intersection_candidates_with_other_tree(&tree) {
            let (i, j) = (c1.index, c2.index);
            if i >= j {
                continue;
            }
            let (l1, l2) = (c1.line, c2.line);

            match line_intersection(l1, l2) {
                Some(LineIntersection::SinglePoint { intersection: pt, .. }) => {
                    let snapped = self.snap(pt);
                    self.push_split(&mut splits, i, l1, snapped);
                    self.push_split(&mut splits, j, l2, snapped);
                }
                Some(LineIntersection::Collinear { intersection: overlap }) => {
                    for p in [self.snap(overlap.start), self.snap(overlap.end)] {
                        self.push_split(&mut splits, i, l1, p);
                        self.push_split(&mut splits, j, l2, p);
                    }
                }
                None => {}
            }
        }

        splits
    }
}
