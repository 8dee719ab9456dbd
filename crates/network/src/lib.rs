//! Road topology and continuity engine.
//!
//! Roads, lane sections, junctions and shared reference curves live in the
//! [`RoadMap`] resource. Every edit goes through it and leaves linked roads,
//! lane links, boundary profiles and junction connections consistent.

pub mod config;
pub mod continuity;
pub mod cubic_profile;
pub mod engine_params;
pub mod errors;
pub mod junction_resolver;
pub mod lane_continuation;
pub mod link_graph;
pub mod map_validator;
pub mod model;
pub mod plugin;
pub mod reference_curve;
pub mod road_map;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use engine_params::EngineParams;
pub use errors::{JunctionError, ProfileError, PropagationError, RoadError, ValidationError};
pub use plugin::{MapDiagnostics, RoadCommand, RoadMapChanged, RoadNetworkPlugin};
pub use road_map::{LaneLayout, RoadMap, RoadSpec};
