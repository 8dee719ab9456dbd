use crate::model::{ContactPoint, Lane, Road, RoadId, TravelDirection};

/// A road boundary coordinate picked as one side of a junction connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionGate {
    pub road: RoadId,
    pub contact: ContactPoint,
    /// Restrict the movement to one lane; `None` uses every valid lane.
    pub lane: Option<i32>,
    pub s: f32,
    pub t: f32,
}

impl JunctionGate {
    /// Gate on the reference line at the given end of `road`.
    pub fn at(road: &Road, contact: ContactPoint) -> Self {
        Self {
            road: road.id,
            contact,
            lane: None,
            s: contact.boundary_s(road.length),
            t: 0.0,
        }
    }

    pub fn with_lane(mut self, lane: i32) -> Self {
        self.lane = Some(lane);
        self
    }
}

/// Whether traffic on `lane` moves towards the `contact` end of its road.
pub(crate) fn moves_into(lane: &Lane, contact: ContactPoint) -> bool {
    match (lane.direction, contact) {
        (TravelDirection::Forward, ContactPoint::End)
        | (TravelDirection::Backward, ContactPoint::Start)
        | (TravelDirection::Undirected, _) => true,
        _ => false,
    }
}

pub(crate) fn moves_out(lane: &Lane, contact: ContactPoint) -> bool {
    match (lane.direction, contact) {
        (TravelDirection::Forward, ContactPoint::Start)
        | (TravelDirection::Backward, ContactPoint::End)
        | (TravelDirection::Undirected, _) => true,
        _ => false,
    }
}

/// Boundary lanes of one class at `contact`, innermost first.
pub(crate) fn gate_lanes(road: &Road, contact: ContactPoint, into: bool, drivable: bool) -> Vec<&Lane> {
    let Some(section) = road.boundary_section(contact) else {
        return Vec::new();
    };
    let mut lanes: Vec<&Lane> = section
        .non_center_lanes()
        .filter(|lane| lane.lane_type.is_drivable() == drivable)
        .filter(|lane| {
            if into {
                moves_into(lane, contact)
            } else {
                moves_out(lane, contact)
            }
        })
        .collect();
    lanes.sort_by_key(|lane| (lane.id.abs(), lane.id));
    lanes
}

/// Drivable lanes whose traffic enters a junction at `contact`.
pub fn entry_lanes(road: &Road, contact: ContactPoint) -> Vec<i32> {
    gate_lanes(road, contact, true, true)
        .into_iter()
        .map(|lane| lane.id)
        .collect()
}

/// Drivable lanes whose traffic leaves a junction into `road` at `contact`.
pub fn exit_lanes(road: &Road, contact: ContactPoint) -> Vec<i32> {
    gate_lanes(road, contact, false, true)
        .into_iter()
        .map(|lane| lane.id)
        .collect()
}
