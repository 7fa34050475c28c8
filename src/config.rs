use crate::error::{NaturalCitiesError, Result};

/// How triangulation edge lengths are measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthMetric {
    /// Planar distance in the units of the input coordinates.
    #[default]
    Euclidean,
    /// Great circle distance in metres, for lon/lat input.
    Haversine,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyConfig {
    /// Maximum number of levels to build.
    pub depth: usize,
    /// A point group recurses only when it holds strictly more points than this.
    pub min_cluster_size: usize,
    pub length_metric: LengthMetric,
    /// Containment tolerance, relative to the bounding polygon's bbox diagonal.
    pub boundary_tolerance: f64,
    /// Snap-round the linework to this grid before polygonizing.
    pub snap_grid_size: Option<f64>,
    /// Count each shared triangle edge once when computing the mean length.
    pub dedup_edges: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            min_cluster_size: 500,
            length_metric: LengthMetric::Euclidean,
            boundary_tolerance: 1e-9,
            snap_grid_size: None,
            dedup_edges: false,
        }
    }
}

impl HierarchyConfig {
    pub fn new(depth: usize, min_cluster_size: usize) -> Self {
        Self {
            depth,
            min_cluster_size,
            ..Self::default()
        }
    }

    pub fn with_length_metric(mut self, metric: LengthMetric) -> Self {
        self.length_metric = metric;
        self
    }

    pub fn with_boundary_tolerance(mut self, tolerance: f64) -> Self {
        self.boundary_tolerance = tolerance;
        self
    }

    pub fn with_snap_grid(mut self, grid_size: f64) -> Self {
        self.snap_grid_size = Some(grid_size);
        self
    }

    pub fn with_dedup_edges(mut self, dedup: bool) -> Self {
        self.dedup_edges = dedup;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(NaturalCitiesError::InvalidConfig(
                "depth must be at least 1".into(),
            ));
        }
        if !self.boundary_tolerance.is_finite() || self.boundary_tolerance < 0.0 {
            return Err(NaturalCitiesError::InvalidConfig(format!(
                "boundary tolerance must be a finite non-negative number, got {}",
                self.boundary_tolerance
            )));
        }
        if let Some(grid) = self.snap_grid_size {
            if !grid.is_finite() || grid <= 0.0 {
                return Err(NaturalCitiesError::InvalidConfig(format!(
                    "snap grid size must be positive, got {}",
                    grid
                )));
            }
        }
        Ok(())
    }
}
