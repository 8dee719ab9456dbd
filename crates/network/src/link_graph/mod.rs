mod graph;
mod types;

#[cfg(test)]
mod tests;

pub use graph::LinkGraph;
pub use types::{EdgeId, LinkEdge, LinkElement, LinkTarget, RoadEnd, RoadLink};
