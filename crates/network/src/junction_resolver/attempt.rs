use super::build::derive_connection;
use super::gates::{entry_lanes, exit_lanes, JunctionGate};
use crate::errors::{JunctionError, RoadError};
use crate::link_graph::{LinkTarget, RoadEnd};
use crate::model::{ConnectionId, JunctionId};
use crate::road_map::RoadMap;

/// Progress of one interactive connection attempt. The caller holds it
/// between synchronous calls while the user picks gates.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    SelectingFirstGate,
    SelectingSecondGate { first: JunctionGate },
    Validated { first: JunctionGate, second: JunctionGate },
    Committed(ConnectionId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionAttempt {
    pub junction: JunctionId,
    state: AttemptState,
}

impl ConnectionAttempt {
    pub fn new(junction: JunctionId) -> Self {
        Self {
            junction,
            state: AttemptState::SelectingFirstGate,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = AttemptState::SelectingFirstGate;
    }

    /// Pick the next gate. A rejected gate leaves the state unchanged so the
    /// user can pick again.
    pub fn select_gate(&mut self, map: &RoadMap, gate: JunctionGate) -> Result<(), JunctionError> {
        self.state = match &self.state {
            AttemptState::SelectingFirstGate => {
                check_gate_lane(map, &gate, true)?;
                AttemptState::SelectingSecondGate { first: gate }
            }
            AttemptState::SelectingSecondGate { first } => {
                validate(map, self.junction, first, &gate)?;
                AttemptState::Validated {
                    first: *first,
                    second: gate,
                }
            }
            AttemptState::Validated { .. } => {
                return Err(JunctionError::InvalidState("both gates already selected"))
            }
            AttemptState::Committed(_) => {
                return Err(JunctionError::InvalidState("attempt already committed"))
            }
        };
        Ok(())
    }

    /// Build the connecting road and record the connection.
    pub fn commit(&mut self, map: &mut RoadMap) -> Result<ConnectionId, RoadError> {
        let AttemptState::Validated { first, second } = self.state else {
            return Err(JunctionError::InvalidState("gates not validated").into());
        };
        // The map may have changed since the gates were picked.
        validate(map, self.junction, &first, &second)?;
        let connection = map
            .junction(self.junction)
            .ok_or(RoadError::JunctionNotFound(self.junction))?
            .next_connection_id();
        let road = map.allocate_road_id();
        derive_connection(map, self.junction, connection, road, &first, &second)?;
        self.state = AttemptState::Committed(connection);
        Ok(connection)
    }
}

fn check_gate_lane(map: &RoadMap, gate: &JunctionGate, entering: bool) -> Result<(), JunctionError> {
    let road = map.road(gate.road).ok_or(JunctionError::RoadNotFound(gate.road))?;
    let Some(lane) = gate.lane else {
        return Ok(());
    };
    let valid = if entering {
        entry_lanes(road, gate.contact)
    } else {
        exit_lanes(road, gate.contact)
    };
    if valid.contains(&lane) {
        Ok(())
    } else {
        Err(JunctionError::IncompatibleLaneDirection {
            road: gate.road,
            lane,
        })
    }
}

fn check_gate_link(map: &RoadMap, junction: JunctionId, gate: &JunctionGate) -> Result<(), JunctionError> {
    match map.link_target(RoadEnd::new(gate.road, gate.contact)) {
        None => Ok(()),
        Some(LinkTarget::Junction(id)) if id == junction => Ok(()),
        Some(existing) => Err(JunctionError::LinkMismatch {
            road: gate.road,
            contact: gate.contact,
            existing: existing.into(),
        }),
    }
}

/// Checks run before a connection between `first` (entry) and `second`
/// (exit) is committed.
pub fn validate(
    map: &RoadMap,
    junction: JunctionId,
    first: &JunctionGate,
    second: &JunctionGate,
) -> Result<(), JunctionError> {
    if first.road == second.road {
        return Err(JunctionError::SameRoad(first.road));
    }
    check_gate_lane(map, first, true)?;
    check_gate_lane(map, second, false)?;
    check_gate_link(map, junction, first)?;
    check_gate_link(map, junction, second)
}
