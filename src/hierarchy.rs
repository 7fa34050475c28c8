//! Level-by-level recursion: extract polygons, join the points against
//! them, and extract again inside every polygon holding enough points.

use std::collections::BTreeMap;

use geo_types::Polygon;

use crate::config::HierarchyConfig;
use crate::error::{NaturalCitiesError, Result};
use crate::extractor::PolygonExtractor;
use crate::model::{
    Crs, ExtractedPolygons, Hierarchy, Level, LevelEdge, LevelPolygon, Point, PointSet,
};
use crate::predicates::PolygonLocator;
use crate::utils::parallel::map_tasks;

/// Points fed to one extraction, and the previous-level polygon bounding it.
#[derive(Clone, Debug)]
struct Branch {
    parent: Option<usize>,
    points: Vec<Point>,
}

struct BranchOutput {
    parent: Option<usize>,
    extracted: ExtractedPolygons,
    /// Covered points with the branch-local index of their polygon.
    members: Vec<(Point, usize)>,
}

#[derive(Clone, Debug, Default)]
pub struct LevelHierarchyBuilder {
    config: HierarchyConfig,
    extractor: PolygonExtractor,
}

impl LevelHierarchyBuilder {
    pub fn new(config: HierarchyConfig) -> Self {
        let extractor = PolygonExtractor::new(&config);
        Self { config, extractor }
    }

    /// Builds up to `depth` levels. Only an empty input or a bad
    /// configuration fails; a branch that cannot be polygonized just ends.
    pub fn build(&self, input: &PointSet) -> Result<Hierarchy> {
        self.config.validate()?;
        if input.is_empty() {
            return Err(NaturalCitiesError::InputRead("point set is empty".into()));
        }

        let crs = input.crs.clone();
        let mut levels: Vec<Level> = Vec::new();
        let mut branches = vec![Branch {
            parent: None,
            points: input.points.clone(),
        }];

        for index in 0..self.config.depth {
            let previous = levels.last();
            let outputs = map_tasks(branches, |branch| {
                let bounding = branch
                    .parent
                    .and_then(|id| previous.and_then(|level| level.polygon(id)))
                    .map(|p| &p.geometry);
                self.run_branch(index, branch, bounding, &crs)
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

            let (level, covered) = assemble_level(index, outputs);
            if level.polygons.is_empty() {
                log::info!("level {}: no polygons, stopping", index);
                break;
            }

            branches = self.next_branches(covered);
            log::info!(
                "level {}: {} polygons, {} linework edges, {} points covered, {} branches to recurse",
                index,
                level.polygons.len(),
                level.linework.len(),
                level.membership.len(),
                branches.len()
            );
            levels.push(level);

            if branches.is_empty() {
                break;
            }
        }

        Ok(Hierarchy { levels, crs })
    }

    fn run_branch(
        &self,
        level: usize,
        branch: Branch,
        bounding: Option<&Polygon<f64>>,
        crs: &Crs,
    ) -> Result<Option<BranchOutput>> {
        let parent = branch.parent;
        let extracted = match self.extractor.extract_points(&branch.points, bounding, crs) {
            Ok(Some(extracted)) => extracted,
            Ok(None) => {
                log::debug!(
                    "level {} branch {:?}: {} points, nothing closed",
                    level,
                    parent,
                    branch.points.len()
                );
                return Ok(None);
            }
            Err(err) if err.is_branch_local() => {
                log::warn!("level {} branch {:?}: {}", level, parent, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let members = {
            let locator = PolygonLocator::new(&extracted.polygons, self.config.boundary_tolerance);
            branch
                .points
                .into_iter()
                .filter_map(|p| locator.locate(p.coord).map(|i| (p, i)))
                .collect::<Vec<_>>()
        };

        log::debug!(
            "level {} branch {:?}: threshold {:.6}, {} edges, {} polygons, {} members",
            level,
            parent,
            extracted.threshold,
            extracted.linework.len(),
            extracted.polygons.len(),
            members.len()
        );

        Ok(Some(BranchOutput {
            parent,
            extracted,
            members,
        }))
    }

    /// Groups covered points by polygon, keeping groups strictly larger than
    /// `min_cluster_size`, in `poly_id` order.
    fn next_branches(&self, covered: Vec<(Point, usize)>) -> Vec<Branch> {
        let mut groups: BTreeMap<usize, Vec<Point>> = BTreeMap::new();
        for (point, poly_id) in covered {
            groups.entry(poly_id).or_default().push(point);
        }
        groups
            .into_iter()
            .filter(|(_, points)| points.len() > self.config.min_cluster_size)
            .map(|(poly_id, points)| Branch {
                parent: Some(poly_id),
                points,
            })
            .collect()
    }
}

/// Concatenates branch outputs into one level, numbering polygons and
/// edges by their position in the concatenation.
fn assemble_level(index: usize, outputs: Vec<Option<BranchOutput>>) -> (Level, Vec<(Point, usize)>) {
    let mut level = Level {
        index,
        ..Level::default()
    };
    let mut covered = Vec::new();

    for output in outputs.into_iter().flatten() {
        let offset = level.polygons.len();
        let mut counts = vec![0usize; output.extracted.polygons.len()];
        for (point, local) in output.members {
            counts[local] += 1;
            level.membership.push((point.id, offset + local));
            covered.push((point, offset + local));
        }

        for (local, geometry) in output.extracted.polygons.into_iter().enumerate() {
            level.polygons.push(LevelPolygon {
                level: index,
                poly_id: offset + local,
                parent_poly_id: output.parent,
                geometry,
                member_count: counts[local],
            });
        }

        for edge in output.extracted.linework {
            level.linework.push(LevelEdge {
                level: index,
                edge_id: level.linework.len(),
                parent_poly_id: output.parent,
                edge,
            });
        }
    }

    (level, covered)
}

/// Shorthand for `LevelHierarchyBuilder::new(config.clone()).build(points)`.
pub fn build_hierarchy(points: &PointSet, config: &HierarchyConfig) -> Result<Hierarchy> {
    LevelHierarchyBuilder::new(config.clone()).build(points)
}
