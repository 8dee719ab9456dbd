//! Lane continuation across a road boundary.
//!
//! Given the boundary lane sections of two linked roads, pair their lanes
//! (side by side, center outward, drivable and non-drivable lanes kept apart)
//! and derive predecessor/successor lane ids plus matching boundary widths.

use std::collections::BTreeMap;

use crate::cubic_profile::CubicProfile;
use crate::errors::ProfileError;
use crate::model::{is_facing, ContactPoint, Lane, LaneSection, LaneSide};


/// A lane section seen from one side of a road boundary.
#[derive(Debug, Clone, Copy)]
pub struct BoundarySection<'a> {
    pub section: &'a LaneSection,
    pub contact: ContactPoint,
}

impl<'a> BoundarySection<'a> {
    pub fn new(section: &'a LaneSection, contact: ContactPoint) -> Self {
        Self { section, contact }
    }

    /// Section-local `s` of the boundary.
    pub fn local_s(&self) -> f32 {
        self.contact.boundary_s(self.section.length)
    }
}

/// Result of pairing two boundary sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneMapping {
    /// `from` lane id -> `to` lane id.
    pub forward: BTreeMap<i32, Option<i32>>,
    /// `to` lane id -> `from` lane id.
    pub backward: BTreeMap<i32, Option<i32>>,
    /// Sides of `from` where neither section has a lane.
    pub empty_sides: Vec<LaneSide>,
    pub facing: bool,
}

impl LaneMapping {
    pub fn successor_of(&self, from_lane: i32) -> Option<i32> {
        self.forward.get(&from_lane).copied().flatten()
    }

    pub fn partner_of(&self, to_lane: i32) -> Option<i32> {
        self.backward.get(&to_lane).copied().flatten()
    }
}

/// Pair the lanes of `from` with the lanes of `to`.
///
/// Same-direction meetings (END to START, START to END) keep side and sign.
/// Facing meetings (END to END, START to START) swap sides, negating ids.
pub fn continue_lanes(from: BoundarySection<'_>, to: BoundarySection<'_>) -> LaneMapping {
    let facing = is_facing(from.contact, to.contact);
    let mut mapping = LaneMapping {
        facing,
        ..Default::default()
    };
    for side in [LaneSide::Left, LaneSide::Right] {
        let target_side = if facing { side.opposite() } else { side };
        let from_lanes = from.section.lanes_on(side);
        let to_lanes = to.section.lanes_on(target_side);
        if from_lanes.is_empty() && to_lanes.is_empty() {
            mapping.empty_sides.push(side);
            continue;
        }
        pair_side(&from_lanes, &to_lanes, &mut mapping.forward);
        pair_side(&to_lanes, &from_lanes, &mut mapping.backward);
    }
    mapping
}

/// Within each lane class, the k-th lane pairs with the k-th lane of the other
/// side, or with its outermost lane when the other side runs out.
fn pair_side(from: &[&Lane], to: &[&Lane], out: &mut BTreeMap<i32, Option<i32>>) {
    for drivable in [true, false] {
        let to_class: Vec<i32> = to
            .iter()
            .filter(|lane| lane.lane_type.is_drivable() == drivable)
            .map(|lane| lane.id)
            .collect();
        let from_class = from
            .iter()
            .filter(|lane| lane.lane_type.is_drivable() == drivable);
        for (k, lane) in from_class.enumerate() {
            let partner = to_class.get(k).or(to_class.last()).copied();
            out.insert(lane.id, partner);
        }
    }
}

/// Write lane links for the lanes of `section` at `contact`: END writes
/// successors, START writes predecessors. Lanes missing from `links` are
/// cleared.
pub fn write_lane_links(
    section: &mut LaneSection,
    contact: ContactPoint,
    links: &BTreeMap<i32, Option<i32>>,
) {
    for lane in section.lanes.values_mut().filter(|lane| !lane.is_center()) {
        let target = links.get(&lane.id).copied().flatten();
        match contact {
            ContactPoint::End => lane.successor = target,
            ContactPoint::Start => lane.predecessor = target,
        }
    }
}

/// Link consecutive sections inside one road (always same-direction).
pub fn link_inner_sections(sections: &mut [LaneSection]) {
    for i in 1..sections.len() {
        let (head, tail) = sections.split_at_mut(i);
        let prev = &mut head[i - 1];
        let next = &mut tail[0];
        let mapping = continue_lanes(
            BoundarySection::new(prev, ContactPoint::End),
            BoundarySection::new(next, ContactPoint::Start),
        );
        write_lane_links(prev, ContactPoint::End, &mapping.forward);
        write_lane_links(next, ContactPoint::Start, &mapping.backward);
    }
}

/// Make the widths of `to` at its boundary match their partners in `from`.
///
/// The record sitting exactly at the boundary is replaced; a lane with no
/// partner and no width records gets its type's default width. Each touched
/// lane's profile is recomputed.
pub fn sync_boundary_widths(
    from: BoundarySection<'_>,
    to: &mut LaneSection,
    to_contact: ContactPoint,
    mapping: &LaneMapping,
) -> Result<(), ProfileError> {
    let from_s = from.local_s();
    let length = to.length;
    let boundary = to_contact.boundary_s(length);
    for lane in to.lanes.values_mut().filter(|lane| !lane.is_center()) {
        let partner_width = mapping
            .partner_of(lane.id)
            .and_then(|partner| from.section.width_at(partner, from_s));
        match partner_width {
            Some(width) => {
                let own = lane.width_at(boundary);
                lane.width.ensure_endpoints(length, own);
                lane.width.set_value_at(boundary, width);
            }
            None if lane.width.is_empty() => {
                lane.width = CubicProfile::constant(lane.lane_type.default_width());
            }
            None => continue,
        }
        lane.width.prune_outside(length);
        lane.width.compute_coefficients(length)?;
    }
    Ok(())
}
