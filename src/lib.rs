pub mod config;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod hierarchy;
pub mod io;
pub mod model;
pub mod noding;
pub mod polygonizer;
pub mod predicates;
pub mod triangulation;
pub mod utils;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

#[cfg(test)]
mod polygonizer_tests;

pub use config::{HierarchyConfig, LengthMetric};
pub use error::{NaturalCitiesError, Result};
pub use extractor::PolygonExtractor;
pub use hierarchy::{build_hierarchy, LevelHierarchyBuilder};
pub use model::{
    Crs, Edge, ExtractedPolygons, Hierarchy, Level, LevelEdge, LevelPolygon, Point, PointId,
    PointSet,
};
pub use polygonizer::{PolygonizeOutput, Polygonizer};
pub use triangulation::{Triangulation, TriangulationBuilder};
