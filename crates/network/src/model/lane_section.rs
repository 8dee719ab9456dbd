use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::lane::{Lane, LaneSide, LaneType};
use crate::errors::ProfileError;

/// A longitudinal slice of a road with a constant lane topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct LaneSection {
    /// Start offset along the road.
    pub s: f32,
    /// Derived span; maintained by `Road::sync_section_lengths`.
    pub length: f32,
    pub lanes: BTreeMap<i32, Lane>,
}

impl LaneSection {
    /// A section holding only the center divider.
    pub fn new(s: f32) -> Self {
        let mut lanes = BTreeMap::new();
        lanes.insert(0, Lane::center());
        Self {
            s,
            length: 0.0,
            lanes,
        }
    }

    /// A symmetric section with `types` applied center-outward on both sides.
    pub fn symmetric(s: f32, types: &[LaneType]) -> Self {
        let mut section = Self::new(s);
        for &lane_type in types {
            section.add_lane(LaneSide::Left, lane_type);
            section.add_lane(LaneSide::Right, lane_type);
        }
        section
    }

    pub fn end_s(&self) -> f32 {
        self.s + self.length
    }

    pub fn lane(&self, id: i32) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    pub fn lane_mut(&mut self, id: i32) -> Option<&mut Lane> {
        self.lanes.get_mut(&id)
    }

    /// Left lanes ordered from the center outward.
    pub fn left_lanes(&self) -> Vec<&Lane> {
        self.lanes.range(1..).map(|(_, lane)| lane).collect()
    }

    /// Right lanes ordered from the center outward.
    pub fn right_lanes(&self) -> Vec<&Lane> {
        self.lanes.range(..0).rev().map(|(_, lane)| lane).collect()
    }

    pub fn lanes_on(&self, side: LaneSide) -> Vec<&Lane> {
        match side {
            LaneSide::Left => self.left_lanes(),
            LaneSide::Right => self.right_lanes(),
            LaneSide::Center => self.lanes.get(&0).into_iter().collect(),
        }
    }

    pub fn lane_count(&self, side: LaneSide) -> usize {
        match side {
            LaneSide::Left => self.lanes.range(1..).count(),
            LaneSide::Right => self.lanes.range(..0).count(),
            LaneSide::Center => usize::from(self.lanes.contains_key(&0)),
        }
    }

    /// Lanes other than the center divider.
    pub fn non_center_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values().filter(|lane| !lane.is_center())
    }

    /// Append a lane on `side`, one step further from the center than the
    /// current outermost lane. Returns the new id.
    pub fn add_lane(&mut self, side: LaneSide, lane_type: LaneType) -> i32 {
        let id = match side {
            LaneSide::Left => self.lanes.keys().next_back().copied().unwrap_or(0).max(0) + 1,
            LaneSide::Right => self.lanes.keys().next().copied().unwrap_or(0).min(0) - 1,
            LaneSide::Center => {
                self.lanes.entry(0).or_insert_with(Lane::center);
                return 0;
            }
        };
        self.lanes.insert(id, Lane::new(id, lane_type));
        id
    }

    /// Remove a lane and close the id gap by shifting outer lanes inward.
    pub fn remove_lane(&mut self, id: i32) -> Option<Lane> {
        if id == 0 {
            return None;
        }
        let removed = self.lanes.remove(&id)?;
        let outer: Vec<i32> = if id > 0 {
            self.lanes.range(id + 1..).map(|(k, _)| *k).collect()
        } else {
            self.lanes.range(..id).rev().map(|(k, _)| *k).collect()
        };
        for old_id in outer {
            if let Some(mut lane) = self.lanes.remove(&old_id) {
                let new_id = old_id - old_id.signum();
                lane.id = new_id;
                self.lanes.insert(new_id, lane);
            }
        }
        Some(removed)
    }

    /// Absolute ids strictly increase moving away from the center.
    pub fn are_left_lanes_in_order(&self) -> bool {
        lanes_in_order(self.lanes.range(1..).map(|(id, lane)| (*id, lane.id)))
    }

    pub fn are_right_lanes_in_order(&self) -> bool {
        lanes_in_order(self.lanes.range(..0).rev().map(|(id, lane)| (*id, lane.id)))
    }

    /// Width of a lane at a section-local offset.
    pub fn width_at(&self, id: i32, local_s: f32) -> Option<f32> {
        self.lane(id).map(|lane| lane.width_at(local_s))
    }

    /// Total width of one side at `local_s`.
    pub fn side_width(&self, side: LaneSide, local_s: f32) -> f32 {
        self.lanes_on(side)
            .iter()
            .filter(|lane| !lane.is_center())
            .map(|lane| lane.width_at(local_s))
            .sum()
    }

    /// Recompute every lane width profile for the current section length.
    pub fn recompute_widths(&mut self) -> Result<(), ProfileError> {
        let length = self.length;
        for lane in self.lanes.values_mut() {
            lane.width.prune_outside(length);
            lane.width.compute_coefficients(length)?;
        }
        Ok(())
    }

    /// Forget every lane link (used before re-deriving continuity).
    pub fn clear_lane_links(&mut self) {
        for lane in self.lanes.values_mut() {
            lane.predecessor = None;
            lane.successor = None;
        }
    }
}

/// Stored ids keep the sign of their key and their magnitude strictly grows
/// moving away from the center. Gaps are tolerated.
fn lanes_in_order(ids: impl Iterator<Item = (i32, i32)>) -> bool {
    let mut previous = 0;
    for (key, stored) in ids {
        if stored.signum() != key.signum() || stored.abs() <= previous {
            return false;
        }
        previous = stored.abs();
    }
    true
}
