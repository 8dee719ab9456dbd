//! OpenDRIVE (`.xodr`) exchange.
//!
//! [`export_xodr`] writes roads, links, lane sections, profiles and junctions
//! with the standard OpenDRIVE vocabulary. Shared reference curves, turn types
//! and engine parameters have no OpenDRIVE element, so they travel as
//! `<userData>` and a file written here re-imports without loss. Files from
//! other tools import from their `planView` instead; each road then gets a
//! reference curve of its own.

mod export;
mod import;

#[cfg(test)]
mod tests;

pub use export::export_xodr;
pub use import::import_xodr;

use network::model::{JunctionId, RoadId, TravelDirection, TurnType};
use network::reference_curve::SegmentOwner;

/// `userData` codes written by the exporter.
pub(crate) mod codes {
    pub const REFERENCE_CURVE: &str = "referenceCurve";
    pub const ENGINE_PARAMS: &str = "engineParams";
    pub const TRAVEL_DIRECTION: &str = "travelDirection";
    pub const TURN: &str = "turn";
    pub const CORNER: &str = "corner";
    pub const AUTO: &str = "auto";
}

pub(crate) fn direction_str(direction: TravelDirection) -> &'static str {
    match direction {
        TravelDirection::Forward => "forward",
        TravelDirection::Backward => "backward",
        TravelDirection::Undirected => "undirected",
    }
}

pub(crate) fn parse_direction(value: &str) -> Option<TravelDirection> {
    match value {
        "forward" => Some(TravelDirection::Forward),
        "backward" => Some(TravelDirection::Backward),
        "undirected" => Some(TravelDirection::Undirected),
        _ => None,
    }
}

pub(crate) fn turn_str(turn: TurnType) -> &'static str {
    match turn {
        TurnType::Straight => "straight",
        TurnType::Left => "left",
        TurnType::Right => "right",
        TurnType::UTurn => "uTurn",
    }
}

pub(crate) fn parse_turn(value: &str) -> Option<TurnType> {
    match value {
        "straight" => Some(TurnType::Straight),
        "left" => Some(TurnType::Left),
        "right" => Some(TurnType::Right),
        "uTurn" => Some(TurnType::UTurn),
        _ => None,
    }
}

pub(crate) fn owner_str(owner: SegmentOwner) -> String {
    match owner {
        SegmentOwner::Road(id) => format!("road:{id}"),
        SegmentOwner::Junction(id) => format!("junction:{id}"),
        SegmentOwner::Unused => "unused".to_string(),
    }
}

pub(crate) fn parse_owner(value: &str) -> Option<SegmentOwner> {
    if value == "unused" {
        return Some(SegmentOwner::Unused);
    }
    let (kind, id) = value.split_once(':')?;
    let id: u32 = id.parse().ok()?;
    match kind {
        "road" => Some(SegmentOwner::Road(RoadId(id))),
        "junction" => Some(SegmentOwner::Junction(JunctionId(id))),
        _ => None,
    }
}
