//! Road, lane section, lane and junction data model.
//!
//! Links between roads are deliberately absent from [`Road`]: they live in the
//! [`crate::link_graph::LinkGraph`] as undirected edges so both sides of a
//! link can never disagree.

mod ids;
mod junction;
mod lane;
mod lane_section;
mod road;

#[cfg(test)]
mod tests;

pub use ids::{is_facing, ConnectionId, ContactPoint, CurveId, JunctionId, RoadId};
pub use junction::{Junction, JunctionConnection, LaneLinkEntry, TurnType};
pub use lane::{Lane, LaneHeight, LaneSide, LaneType, RoadMark, TravelDirection};
pub use lane_section::LaneSection;
pub use road::{ProfileKind, Road, RoadTail};
