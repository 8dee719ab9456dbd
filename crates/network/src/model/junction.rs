use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{ConnectionId, ContactPoint, JunctionId, RoadId};

/// Geometric intent of a junction movement.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub enum TurnType {
    Straight,
    Left,
    Right,
    UTurn,
}

/// One row of a connection's lane-link table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct LaneLinkEntry {
    pub incoming: i32,
    pub connecting: i32,
    pub outgoing: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct JunctionConnection {
    pub id: ConnectionId,
    pub incoming_road: RoadId,
    pub incoming_contact: ContactPoint,
    pub connecting_road: RoadId,
    pub outgoing_road: RoadId,
    pub outgoing_contact: ContactPoint,
    /// Empty when the movement carries no valid lanes; kept anyway.
    pub lane_links: Vec<LaneLinkEntry>,
    pub turn: TurnType,
    pub is_corner_connection: bool,
}

impl JunctionConnection {
    pub fn touches_road(&self, road: RoadId) -> bool {
        self.incoming_road == road || self.outgoing_road == road || self.connecting_road == road
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct Junction {
    pub id: JunctionId,
    pub name: String,
    /// System-generated (true) vs. user-authored.
    pub auto: bool,
    pub connections: BTreeMap<ConnectionId, JunctionConnection>,
}

impl Junction {
    pub fn new(id: JunctionId, auto: bool) -> Self {
        Self {
            id,
            name: format!("Junction {}", id.0),
            auto,
            connections: BTreeMap::new(),
        }
    }

    /// Lowest connection id >= 0 that is not in use.
    pub fn next_connection_id(&self) -> ConnectionId {
        let mut candidate = 0;
        while self.connections.contains_key(&ConnectionId(candidate)) {
            candidate += 1;
        }
        ConnectionId(candidate)
    }

    pub fn connecting_roads(&self) -> Vec<RoadId> {
        self.connections.values().map(|c| c.connecting_road).collect()
    }

    /// Outer roads (incoming or outgoing) attached to this junction.
    pub fn outer_roads(&self) -> Vec<(RoadId, ContactPoint)> {
        let mut ends: Vec<(RoadId, ContactPoint)> = self
            .connections
            .values()
            .flat_map(|c| {
                [
                    (c.incoming_road, c.incoming_contact),
                    (c.outgoing_road, c.outgoing_contact),
                ]
            })
            .collect();
        ends.sort();
        ends.dedup();
        ends
    }
}
