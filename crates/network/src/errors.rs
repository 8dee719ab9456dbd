// ---------------------------------------------------------------------------
// Typed errors for the road network engine
// ---------------------------------------------------------------------------

use std::fmt;

use crate::link_graph::RoadLink;
use crate::model::{ContactPoint, CurveId, JunctionId, LaneSide, RoadId};

/// A cubic profile could not be (re)computed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// Total length is negative or not finite.
    InvalidLength(f32),
    /// A record has a NaN/infinite position or value.
    NonFinite { s: f32 },
    /// A record lies outside `[0, length]`; callers prune these first.
    RecordOutOfRange { s: f32, length: f32 },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::InvalidLength(length) => write!(f, "invalid profile length {length}"),
            ProfileError::NonFinite { s } => write!(f, "non-finite profile record at s={s}"),
            ProfileError::RecordOutOfRange { s, length } => {
                write!(f, "profile record at s={s} is outside [0, {length}]")
            }
        }
    }
}

impl std::error::Error for ProfileError {}

/// An invariant of the map does not hold. Raised by the map validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The linked road or junction does not exist.
    LinkedElementMissing { road: RoadId, link: RoadLink },
    /// The road boundary and the linked boundary are not at the same place.
    LinkedElementDistanceShouldBeZero {
        road: RoadId,
        link: RoadLink,
        distance: f32,
    },
    LanesOutOfOrder {
        road: RoadId,
        section_s: f32,
        side: LaneSide,
    },
    SectionsOutOfOrder { road: RoadId },
    /// A lane width profile does not start at local s = 0.
    WidthGap {
        road: RoadId,
        section_s: f32,
        lane: i32,
    },
    /// `length`, the section spans and the curve sub-range disagree.
    LengthMismatch {
        road: RoadId,
        length: f32,
        expected: f32,
    },
    /// The road's reference curve cannot be evaluated.
    MissingGeometry { road: RoadId },
}

impl ValidationError {
    pub fn road(&self) -> RoadId {
        match self {
            ValidationError::LinkedElementMissing { road, .. }
            | ValidationError::LinkedElementDistanceShouldBeZero { road, .. }
            | ValidationError::LanesOutOfOrder { road, .. }
            | ValidationError::SectionsOutOfOrder { road }
            | ValidationError::WidthGap { road, .. }
            | ValidationError::LengthMismatch { road, .. }
            | ValidationError::MissingGeometry { road } => *road,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::LinkedElementMissing { road, link } => {
                write!(f, "road {road}: linked element {link} does not exist")
            }
            ValidationError::LinkedElementDistanceShouldBeZero {
                road,
                link,
                distance,
            } => write!(
                f,
                "road {road}: LinkedElementDistanceShouldBeZero, {link} is {distance:.4} away"
            ),
            ValidationError::LanesOutOfOrder {
                road,
                section_s,
                side,
            } => write!(
                f,
                "road {road}: {side:?} lanes out of order in section at s={section_s}"
            ),
            ValidationError::SectionsOutOfOrder { road } => {
                write!(f, "road {road}: lane sections are not ascending from s=0")
            }
            ValidationError::WidthGap {
                road,
                section_s,
                lane,
            } => write!(
                f,
                "road {road}: lane {lane} width in section at s={section_s} does not start at 0"
            ),
            ValidationError::LengthMismatch {
                road,
                length,
                expected,
            } => write!(f, "road {road}: length {length} but expected {expected}"),
            ValidationError::MissingGeometry { road } => {
                write!(f, "road {road}: reference curve cannot be evaluated")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A junction connection attempt was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum JunctionError {
    /// Both gates are on the same road.
    SameRoad(RoadId),
    /// The selected lane does not travel into (first gate) or out of (second
    /// gate) the junction.
    IncompatibleLaneDirection { road: RoadId, lane: i32 },
    /// The road already links somewhere else at this contact point.
    LinkMismatch {
        road: RoadId,
        contact: ContactPoint,
        existing: RoadLink,
    },
    /// The operation is not valid in the attempt's current state.
    InvalidState(&'static str),
    RoadNotFound(RoadId),
    /// The reference lines of the two roads never cross.
    NoCrossing(RoadId, RoadId),
}

impl fmt::Display for JunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JunctionError::SameRoad(road) => {
                write!(f, "both junction gates are on road {road}")
            }
            JunctionError::IncompatibleLaneDirection { road, lane } => {
                write!(f, "lane {lane} of road {road} travels the wrong way for this gate")
            }
            JunctionError::LinkMismatch {
                road,
                contact,
                existing,
            } => write!(
                f,
                "road {road} is already linked to {existing} at its {} point",
                contact.as_str()
            ),
            JunctionError::InvalidState(msg) => write!(f, "invalid connection state: {msg}"),
            JunctionError::RoadNotFound(road) => write!(f, "road {road} not found"),
            JunctionError::NoCrossing(a, b) => write!(f, "roads {a} and {b} do not cross"),
        }
    }
}

impl std::error::Error for JunctionError {}

/// Continuity propagation onto a neighbor failed; the neighbor is left as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationError {
    MissingNeighbor(RoadId),
    DegenerateLength { road: RoadId, length: f32 },
    Profile { road: RoadId, source: ProfileError },
}

impl fmt::Display for PropagationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationError::MissingNeighbor(road) => {
                write!(f, "neighbor road {road} does not exist")
            }
            PropagationError::DegenerateLength { road, length } => {
                write!(f, "road {road} has degenerate length {length}")
            }
            PropagationError::Profile { road, source } => {
                write!(f, "road {road}: {source}")
            }
        }
    }
}

impl std::error::Error for PropagationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PropagationError::Profile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors surfaced by `RoadMap` mutation operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RoadError {
    /// An explicitly requested id is already taken. Raised before any change.
    IdConflict { kind: &'static str, id: u32 },
    RoadNotFound(RoadId),
    JunctionNotFound(JunctionId),
    CurveNotFound(CurveId),
    SectionNotFound { road: RoadId, index: usize },
    LaneNotFound { road: RoadId, lane: i32 },
    /// Fewer than two control points. Mutations treat this as a no-op.
    GeometryDegenerate { points: usize },
    InvalidSplit { road: RoadId, s: f32 },
    InvalidWidth(f32),
    Profile(ProfileError),
    Junction(JunctionError),
    Validation(ValidationError),
}

impl fmt::Display for RoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadError::IdConflict { kind, id } => write!(f, "{kind} id {id} is already in use"),
            RoadError::RoadNotFound(id) => write!(f, "road {id} not found"),
            RoadError::JunctionNotFound(id) => write!(f, "junction {id} not found"),
            RoadError::CurveNotFound(id) => write!(f, "reference curve {id} not found"),
            RoadError::SectionNotFound { road, index } => {
                write!(f, "road {road} has no lane section #{index}")
            }
            RoadError::LaneNotFound { road, lane } => write!(f, "road {road} has no lane {lane}"),
            RoadError::GeometryDegenerate { points } => {
                write!(f, "reference curve needs at least 2 control points, has {points}")
            }
            RoadError::InvalidSplit { road, s } => {
                write!(f, "cannot split road {road} at s={s}")
            }
            RoadError::InvalidWidth(width) => write!(f, "invalid lane width {width}"),
            RoadError::Profile(e) => write!(f, "profile error: {e}"),
            RoadError::Junction(e) => write!(f, "junction error: {e}"),
            RoadError::Validation(e) => write!(f, "validation error: {e}"),
        }
    }
}

impl std::error::Error for RoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoadError::Profile(e) => Some(e),
            RoadError::Junction(e) => Some(e),
            RoadError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProfileError> for RoadError {
    fn from(e: ProfileError) -> Self {
        RoadError::Profile(e)
    }
}

impl From<JunctionError> for RoadError {
    fn from(e: JunctionError) -> Self {
        RoadError::Junction(e)
    }
}

impl From<ValidationError> for RoadError {
    fn from(e: ValidationError) -> Self {
        RoadError::Validation(e)
    }
}
