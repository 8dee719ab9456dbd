use std::f32::consts::PI;

use bevy::prelude::*;

use super::attempt::validate;
use super::gates::{gate_lanes, JunctionGate};
use super::turns::{classify_turn, pair_lanes};
use crate::config::MIN_ROAD_LENGTH;
use crate::continuity;
use crate::cubic_profile::{CubicProfile, CubicRecord};
use crate::errors::{JunctionError, RoadError};
use crate::link_graph::{LinkTarget, RoadEnd};
use crate::model::{
    ConnectionId, ContactPoint, Junction, JunctionConnection, JunctionId, LaneLinkEntry,
    LaneSection, LaneSide, LaneType, Road, RoadId, TravelDirection, TurnType,
};
use crate::reference_curve::{wrap_angle, RoadGeometry, SegmentOwner};
use crate::road_map::RoadMap;

/// One lane carried through a connecting road.
#[derive(Debug, Clone, Copy)]
struct CarriedLane {
    incoming: i32,
    outgoing: i32,
    lane_type: LaneType,
    entry_width: f32,
    exit_width: f32,
}

/// Everything the connecting road needs, read from the outer roads.
struct ConnectionPlan {
    points: Vec<Vec2>,
    turn: TurnType,
    lanes: Vec<CarriedLane>,
    is_corner: bool,
    entry_elevation: f32,
    exit_elevation: f32,
}

fn plan_connection(
    map: &RoadMap,
    first: &JunctionGate,
    second: &JunctionGate,
) -> Result<ConnectionPlan, RoadError> {
    let incoming = map.require_road(first.road)?;
    let outgoing = map.require_road(second.road)?;
    let geometry = map.curves();

    let p0 = geometry
        .boundary_point(incoming, first.contact)
        .ok_or(RoadError::CurveNotFound(incoming.curve))?;
    let p3 = geometry
        .boundary_point(outgoing, second.contact)
        .ok_or(RoadError::CurveNotFound(outgoing.curve))?;
    let in_heading = geometry
        .outward_heading(incoming, first.contact)
        .ok_or(RoadError::CurveNotFound(incoming.curve))?;
    let out_heading = geometry
        .outward_heading(outgoing, second.contact)
        .map(|h| wrap_angle(h + PI))
        .ok_or(RoadError::CurveNotFound(outgoing.curve))?;

    let turn = classify_turn(in_heading, out_heading, map.params());
    let points = if turn == TurnType::Straight {
        vec![p0, p3]
    } else {
        let k = p0.distance(p3) * map.params().connections.tangent_factor;
        vec![
            p0,
            p0 + Vec2::from_angle(in_heading) * k,
            p3 - Vec2::from_angle(out_heading) * k,
            p3,
        ]
    };

    let keep = |gate: &JunctionGate, id: i32| gate.lane.is_none_or(|lane| lane == id);
    let entries: Vec<_> = gate_lanes(incoming, first.contact, true, true)
        .into_iter()
        .filter(|lane| keep(first, lane.id))
        .collect();
    let exits: Vec<_> = gate_lanes(outgoing, second.contact, false, true)
        .into_iter()
        .filter(|lane| keep(second, lane.id))
        .collect();

    let mut is_corner = false;
    let mut pairs = pair_lanes(turn, &entries, &exits);
    if pairs.is_empty() && first.lane.is_none() && second.lane.is_none() {
        let corner_in = gate_lanes(incoming, first.contact, true, false);
        let corner_out = gate_lanes(outgoing, second.contact, false, false);
        if let (Some(a), Some(b)) = (corner_in.last(), corner_out.last()) {
            pairs.push((*a, *b));
            is_corner = true;
        }
    }

    let in_s = first.contact.boundary_s(incoming.length);
    let out_s = second.contact.boundary_s(outgoing.length);
    let in_local = incoming
        .boundary_section(first.contact)
        .map(|section| in_s - section.s)
        .unwrap_or(0.0);
    let out_local = outgoing
        .boundary_section(second.contact)
        .map(|section| out_s - section.s)
        .unwrap_or(0.0);
    let lanes = pairs
        .into_iter()
        .map(|(entry, exit)| CarriedLane {
            incoming: entry.id,
            outgoing: exit.id,
            lane_type: entry.lane_type,
            entry_width: entry.width_at(in_local),
            exit_width: exit.width_at(out_local),
        })
        .collect();

    Ok(ConnectionPlan {
        points,
        turn,
        lanes,
        is_corner,
        entry_elevation: incoming.elevation.evaluate(in_s),
        exit_elevation: outgoing.elevation.evaluate(out_s),
    })
}

fn taper(from: f32, to: f32, length: f32) -> CubicProfile {
    CubicProfile::from_records(
        vec![CubicRecord::anchor(0.0, from), CubicRecord::anchor(length, to)],
        0.0,
    )
}

/// Build (or rebuild) connection `connection` of `junction` with connecting
/// road `road`, from `first` (entry) to `second` (exit).
pub(crate) fn derive_connection(
    map: &mut RoadMap,
    junction: JunctionId,
    connection: ConnectionId,
    road: RoadId,
    first: &JunctionGate,
    second: &JunctionGate,
) -> Result<(), RoadError> {
    if !map.junctions.contains_key(&junction) {
        return Err(RoadError::JunctionNotFound(junction));
    }
    let plan = plan_connection(map, first, second)?;

    let curve = map.curves.insert(plan.points);
    let length = match map.curves.get_mut(curve) {
        Some(reference) => {
            let length = reference.length();
            reference.assign(0.0, length, SegmentOwner::Road(road));
            length
        }
        None => return Err(RoadError::CurveNotFound(curve)),
    };

    let mut section = LaneSection::new(0.0);
    if plan.lanes.is_empty() {
        section.add_lane(LaneSide::Right, LaneType::None);
    }
    let mut lane_links = Vec::with_capacity(plan.lanes.len());
    for carried in &plan.lanes {
        let id = section.add_lane(LaneSide::Right, carried.lane_type);
        if let Some(lane) = section.lane_mut(id) {
            lane.direction = TravelDirection::Forward;
            lane.width = taper(carried.entry_width, carried.exit_width, length);
            lane.predecessor = Some(carried.incoming);
            lane.successor = Some(carried.outgoing);
        }
        lane_links.push(LaneLinkEntry {
            incoming: carried.incoming,
            connecting: id,
            outgoing: carried.outgoing,
        });
    }

    let mut connecting = Road::new(road, curve, length, section);
    connecting.name = format!("Connection {junction}.{connection}");
    connecting.junction = Some(junction);
    connecting.elevation = taper(plan.entry_elevation, plan.exit_elevation, length);
    connecting.elevation.compute_coefficients(length)?;
    connecting.recompute_lane_widths()?;
    map.roads.insert(road, connecting);

    let entry_end = RoadEnd::new(first.road, first.contact);
    let exit_end = RoadEnd::new(second.road, second.contact);
    map.links
        .link_one_way(RoadEnd::start(road), LinkTarget::Road(entry_end));
    map.links
        .link_one_way(RoadEnd::end(road), LinkTarget::Road(exit_end));
    for end in [entry_end, exit_end] {
        if map.links.target(end) != Some(LinkTarget::Junction(junction)) {
            map.links.link(end, LinkTarget::Junction(junction));
        }
    }

    let record = JunctionConnection {
        id: connection,
        incoming_road: first.road,
        incoming_contact: first.contact,
        connecting_road: road,
        outgoing_road: second.road,
        outgoing_contact: second.contact,
        lane_links,
        turn: plan.turn,
        is_corner_connection: plan.is_corner,
    };
    if let Some(j) = map.junctions.get_mut(&junction) {
        j.connections.insert(connection, record);
    }
    map.changed.insert(road);
    Ok(())
}

/// Drop a connecting road with its curve and one-way links.
pub(crate) fn remove_connecting_road(map: &mut RoadMap, road: RoadId) {
    if let Some(removed) = map.roads.remove(&road) {
        map.links.remove_road(road);
        map.curves.release(removed.curve, road);
    }
}

/// Create an automatic junction joining `ends`, with one connection for
/// every ordered pair of ends on distinct roads.
pub fn build_junction(map: &mut RoadMap, ends: &[RoadEnd]) -> Result<JunctionId, RoadError> {
    for end in ends {
        map.require_road(end.road)?;
        if let Some(existing) = map.link_target(*end) {
            return Err(JunctionError::LinkMismatch {
                road: end.road,
                contact: end.contact,
                existing: existing.into(),
            }
            .into());
        }
    }

    let junction = map.allocate_junction_id();
    map.junctions.insert(junction, Junction::new(junction, true));
    for first in ends {
        for second in ends {
            if first.road == second.road {
                continue;
            }
            let first_gate = gate_for(map, *first)?;
            let second_gate = gate_for(map, *second)?;
            validate(map, junction, &first_gate, &second_gate)?;
            let connection = next_connection(map, junction)?;
            let road = map.allocate_road_id();
            derive_connection(map, junction, connection, road, &first_gate, &second_gate)?;
        }
    }
    info!(
        "junction {junction}: {} connections between {} road ends",
        map.junctions.get(&junction).map_or(0, |j| j.connections.len()),
        ends.len()
    );
    Ok(junction)
}

fn gate_for(map: &RoadMap, end: RoadEnd) -> Result<JunctionGate, RoadError> {
    Ok(JunctionGate::at(map.require_road(end.road)?, end.contact))
}

fn next_connection(map: &RoadMap, junction: JunctionId) -> Result<ConnectionId, RoadError> {
    map.junction(junction)
        .map(Junction::next_connection_id)
        .ok_or(RoadError::JunctionNotFound(junction))
}

fn is_attached(map: &RoadMap, junction: JunctionId, end: RoadEnd) -> bool {
    map.links.target(end) == Some(LinkTarget::Junction(junction))
}

/// Re-derive every connection of `junction` from the current outer roads,
/// keeping connection and connecting-road ids. Connections whose outer roads
/// are gone, or no longer end at the junction, are dropped.
pub fn rebuild_junction(map: &mut RoadMap, junction: JunctionId) -> Result<(), RoadError> {
    let target = map
        .junction(junction)
        .ok_or(RoadError::JunctionNotFound(junction))?;
    let auto = target.auto;
    let connections: Vec<JunctionConnection> = target.connections.values().cloned().collect();

    for connection in connections {
        remove_connecting_road(map, connection.connecting_road);
        if let Some(j) = map.junctions.get_mut(&junction) {
            j.connections.remove(&connection.id);
        }
        if !map.contains_road(connection.incoming_road) || !map.contains_road(connection.outgoing_road) {
            continue;
        }
        let entry_end = RoadEnd::new(connection.incoming_road, connection.incoming_contact);
        let exit_end = RoadEnd::new(connection.outgoing_road, connection.outgoing_contact);
        if let Some(detached) = [entry_end, exit_end]
            .into_iter()
            .find(|end| !is_attached(map, junction, *end))
        {
            debug!(
                "junction {junction}: connection {} dropped, road {} no longer ends here",
                connection.id, detached.road
            );
            continue;
        }
        let mut first = gate_for(map, entry_end)?;
        let mut second = gate_for(map, exit_end)?;
        // A hand-made single-lane connection keeps its lanes while they exist.
        if let (false, [only]) = (auto, connection.lane_links.as_slice()) {
            let restricted = (first.with_lane(only.incoming), second.with_lane(only.outgoing));
            if validate(map, junction, &restricted.0, &restricted.1).is_ok() {
                (first, second) = restricted;
            }
        }
        derive_connection(
            map,
            junction,
            connection.id,
            connection.connecting_road,
            &first,
            &second,
        )?;
    }
    Ok(())
}

/// Find where the reference lines of two roads cross, as `(s_a, s_b)`.
pub fn find_crossing(map: &RoadMap, a: RoadId, b: RoadId) -> Option<(f32, f32)> {
    let road_a = map.road(a)?;
    let road_b = map.road(b)?;
    let samples_a = sample_reference(map, road_a);
    let samples_b = sample_reference(map, road_b);
    for wa in samples_a.windows(2) {
        for wb in samples_b.windows(2) {
            let ((sa0, pa0), (sa1, pa1)) = (wa[0], wa[1]);
            let ((sb0, pb0), (sb1, pb1)) = (wb[0], wb[1]);
            if let Some((u, v)) = segment_intersection(pa0, pa1, pb0, pb1) {
                return Some((sa0 + (sa1 - sa0) * u, sb0 + (sb1 - sb0) * v));
            }
        }
    }
    None
}

fn sample_reference(map: &RoadMap, road: &Road) -> Vec<(f32, Vec2)> {
    let steps = road.length.ceil().max(1.0) as usize;
    (0..=steps)
        .filter_map(|i| {
            let s = road.length * i as f32 / steps as f32;
            map.curves()
                .world_position_at(road, s, 0.0)
                .map(|p| (s, p.truncate()))
        })
        .collect()
}

fn segment_intersection(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<(f32, f32)> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-9 {
        return None;
    }
    let d = q0 - p0;
    let u = d.perp_dot(s) / denom;
    let v = d.perp_dot(r) / denom;
    ((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)).then_some((u, v))
}

/// Cut `[s - clearance, s + clearance]` out of `road`. Returns the head and
/// tail roads and the removed curve range.
fn carve(
    map: &mut RoadMap,
    road: RoadId,
    s: f32,
    clearance: f32,
) -> Result<(RoadId, RoadId, (f32, f32)), RoadError> {
    let length = map.require_road(road)?.length;
    if s - clearance < MIN_ROAD_LENGTH || s + clearance > length - MIN_ROAD_LENGTH {
        return Err(RoadError::InvalidSplit { road, s });
    }
    let middle = map.split_road(road, s - clearance)?;
    let tail = map.split_road(middle, 2.0 * clearance)?;
    let curve = map.require_road(middle)?.curve;
    let range = map
        .curves
        .segment_range(curve, middle)
        .ok_or(RoadError::CurveNotFound(curve))?;
    map.links.remove_road(middle);
    if let Some(reference) = map.curves.get_mut(curve) {
        reference.release(SegmentOwner::Road(middle));
    }
    map.roads.remove(&middle);
    map.changed.remove(&middle);
    Ok((road, tail, range))
}

/// Turn two crossing roads into a 4-way junction: both are split around the
/// crossing point, leaving `clearance` on each side, and the four new road
/// ends are joined by an automatic junction.
pub fn create_crossing_junction(
    map: &mut RoadMap,
    a: RoadId,
    b: RoadId,
    clearance: f32,
) -> Result<JunctionId, RoadError> {
    let (s_a, s_b) = find_crossing(map, a, b).ok_or(JunctionError::NoCrossing(a, b))?;
    for (road, s) in [(a, s_a), (b, s_b)] {
        let length = map.require_road(road)?.length;
        if s - clearance < MIN_ROAD_LENGTH || s + clearance > length - MIN_ROAD_LENGTH {
            return Err(RoadError::InvalidSplit { road, s });
        }
    }
    let curve_a = map.require_road(a)?.curve;
    let curve_b = map.require_road(b)?.curve;

    let (a_head, a_tail, range_a) = carve(map, a, s_a, clearance)?;
    let (b_head, b_tail, range_b) = carve(map, b, s_b, clearance)?;
    let ends = [
        RoadEnd::new(a_head, ContactPoint::End),
        RoadEnd::new(a_tail, ContactPoint::Start),
        RoadEnd::new(b_head, ContactPoint::End),
        RoadEnd::new(b_tail, ContactPoint::Start),
    ];
    let junction = build_junction(map, &ends)?;
    for (curve, (start, end)) in [(curve_a, range_a), (curve_b, range_b)] {
        if let Some(reference) = map.curves.get_mut(curve) {
            reference.assign(start, end, SegmentOwner::Junction(junction));
        }
    }
    for end in ends {
        continuity::propagate_lanes(map, end.road)?;
        map.changed.insert(end.road);
    }
    Ok(junction)
}
