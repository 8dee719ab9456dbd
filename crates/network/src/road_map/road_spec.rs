use bevy::prelude::*;

use crate::config::DEFAULT_LANES_PER_SIDE;
use crate::link_graph::LinkTarget;
use crate::model::{LaneSection, LaneSide, LaneType, RoadId, TravelDirection};

/// Lane types per side, listed from the center outward.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneLayout {
    pub left: Vec<LaneType>,
    pub right: Vec<LaneType>,
    /// Every lane travels forward (right-side lanes only, by convention).
    pub one_way: bool,
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self::symmetric(&[LaneType::Driving; DEFAULT_LANES_PER_SIDE])
    }
}

impl LaneLayout {
    pub fn symmetric(types: &[LaneType]) -> Self {
        Self {
            left: types.to_vec(),
            right: types.to_vec(),
            one_way: false,
        }
    }

    pub fn driving(lanes_per_side: usize) -> Self {
        Self::symmetric(&vec![LaneType::Driving; lanes_per_side])
    }

    /// `lanes` forward-travelling driving lanes on the right side.
    pub fn one_way(lanes: usize) -> Self {
        Self {
            left: Vec::new(),
            right: vec![LaneType::Driving; lanes],
            one_way: true,
        }
    }

    pub fn build_section(&self, s: f32) -> LaneSection {
        let mut section = LaneSection::new(s);
        for &lane_type in &self.left {
            section.add_lane(LaneSide::Left, lane_type);
        }
        for &lane_type in &self.right {
            section.add_lane(LaneSide::Right, lane_type);
        }
        if self.one_way {
            for lane in section.lanes.values_mut().filter(|lane| !lane.is_center()) {
                lane.direction = TravelDirection::Forward;
            }
        }
        section
    }
}

/// Everything needed to create a road.
#[derive(Debug, Clone, Default)]
pub struct RoadSpec {
    /// Explicit id (e.g. from an external id service); allocated if `None`.
    pub id: Option<RoadId>,
    pub name: Option<String>,
    pub points: Vec<Vec2>,
    pub lanes: LaneLayout,
    pub predecessor: Option<LinkTarget>,
    pub successor: Option<LinkTarget>,
}

impl RoadSpec {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    pub fn straight(from: Vec2, to: Vec2) -> Self {
        Self::new(vec![from, to])
    }

    pub fn with_id(mut self, id: RoadId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_lanes(mut self, lanes: LaneLayout) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn with_predecessor(mut self, target: LinkTarget) -> Self {
        self.predecessor = Some(target);
        self
    }

    pub fn with_successor(mut self, target: LinkTarget) -> Self {
        self.successor = Some(target);
        self
    }
}
