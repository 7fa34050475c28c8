pub mod planar_graph;

#[cfg(test)]
mod tests;

pub use planar_graph::{DirEdgeId, EdgeId, NodeId, PlanarGraph};
