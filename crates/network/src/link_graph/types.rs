use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ContactPoint, JunctionId, RoadId};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub struct EdgeId(pub u32);

/// One end of a road.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub struct RoadEnd {
    pub road: RoadId,
    pub contact: ContactPoint,
}

impl RoadEnd {
    pub fn new(road: RoadId, contact: ContactPoint) -> Self {
        Self { road, contact }
    }

    pub fn start(road: RoadId) -> Self {
        Self::new(road, ContactPoint::Start)
    }

    pub fn end(road: RoadId) -> Self {
        Self::new(road, ContactPoint::End)
    }
}

/// What a road end can be linked to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub enum LinkTarget {
    Road(RoadEnd),
    Junction(JunctionId),
}

impl LinkTarget {
    pub fn road_end(self) -> Option<RoadEnd> {
        match self {
            LinkTarget::Road(end) => Some(end),
            LinkTarget::Junction(_) => None,
        }
    }

    pub fn references_road(self, road: RoadId) -> bool {
        matches!(self, LinkTarget::Road(end) if end.road == road)
    }
}

/// A single link record. A mutual edge is visible from both endpoints; a
/// one-way edge only from `a` (a connecting road pointing at an outer road).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct LinkEdge {
    pub a: RoadEnd,
    pub b: LinkTarget,
    pub mutual: bool,
}

impl LinkEdge {
    pub fn touches_road(&self, road: RoadId) -> bool {
        self.a.road == road || self.b.references_road(road)
    }

    /// The far side of the edge as seen from `end`, if `end` can see it.
    pub fn seen_from(&self, end: RoadEnd) -> Option<LinkTarget> {
        if self.a == end {
            return Some(self.b);
        }
        if self.mutual && self.b == LinkTarget::Road(end) {
            return Some(LinkTarget::Road(self.a));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkElement {
    Road(RoadId),
    Junction(JunctionId),
}

/// OpenDRIVE-style predecessor/successor record derived from the graph.
/// `contact_point` is only set for road elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoadLink {
    pub element: LinkElement,
    pub contact_point: Option<ContactPoint>,
}

impl RoadLink {
    /// The linked road, if the element is a road.
    pub fn road(&self) -> Option<RoadId> {
        match self.element {
            LinkElement::Road(id) => Some(id),
            LinkElement::Junction(_) => None,
        }
    }
}

impl From<LinkTarget> for RoadLink {
    fn from(target: LinkTarget) -> Self {
        match target {
            LinkTarget::Road(end) => RoadLink {
                element: LinkElement::Road(end.road),
                contact_point: Some(end.contact),
            },
            LinkTarget::Junction(id) => RoadLink {
                element: LinkElement::Junction(id),
                contact_point: None,
            },
        }
    }
}

impl fmt::Display for RoadLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.element, self.contact_point) {
            (LinkElement::Road(id), Some(contact)) => {
                write!(f, "road {id} ({})", contact.as_str())
            }
            (LinkElement::Road(id), None) => write!(f, "road {id}"),
            (LinkElement::Junction(id), _) => write!(f, "junction {id}"),
        }
    }
}
