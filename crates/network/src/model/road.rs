use serde::{Deserialize, Serialize};

use super::ids::{ContactPoint, CurveId, JunctionId, RoadId};
use super::lane_section::LaneSection;
use crate::config::S_EPSILON;
use crate::cubic_profile::CubicProfile;
use crate::errors::ProfileError;

/// Road-level profiles that must stay continuous across links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    Elevation,
    SuperElevation,
    LaneOffset,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 3] = [
        ProfileKind::Elevation,
        ProfileKind::SuperElevation,
        ProfileKind::LaneOffset,
    ];

    /// Banking and lateral offset are measured relative to the driving
    /// direction, so they change sign where two roads face each other.
    pub fn flips_when_facing(self) -> bool {
        match self {
            ProfileKind::Elevation => false,
            ProfileKind::SuperElevation | ProfileKind::LaneOffset => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct Road {
    pub id: RoadId,
    pub name: String,
    pub length: f32,
    /// Ascending by `s`, first section at 0.
    pub sections: Vec<LaneSection>,
    pub lane_offset: CubicProfile,
    pub elevation: CubicProfile,
    pub superelevation: CubicProfile,
    /// Set for connecting roads that live inside a junction.
    pub junction: Option<JunctionId>,
    pub curve: CurveId,
}

impl Road {
    pub fn new(id: RoadId, curve: CurveId, length: f32, section: LaneSection) -> Self {
        let mut road = Self {
            id,
            name: format!("Road {}", id.0),
            length,
            sections: vec![section],
            lane_offset: CubicProfile::new(),
            elevation: CubicProfile::new(),
            superelevation: CubicProfile::new(),
            junction: None,
            curve,
        };
        road.sync_section_lengths();
        road
    }

    pub fn is_junction_road(&self) -> bool {
        self.junction.is_some()
    }

    pub fn profile(&self, kind: ProfileKind) -> &CubicProfile {
        match kind {
            ProfileKind::Elevation => &self.elevation,
            ProfileKind::SuperElevation => &self.superelevation,
            ProfileKind::LaneOffset => &self.lane_offset,
        }
    }

    pub fn profile_mut(&mut self, kind: ProfileKind) -> &mut CubicProfile {
        match kind {
            ProfileKind::Elevation => &mut self.elevation,
            ProfileKind::SuperElevation => &mut self.superelevation,
            ProfileKind::LaneOffset => &mut self.lane_offset,
        }
    }

    /// Section touching the given road boundary.
    pub fn boundary_section(&self, contact: ContactPoint) -> Option<&LaneSection> {
        match contact {
            ContactPoint::Start => self.sections.first(),
            ContactPoint::End => self.sections.last(),
        }
    }

    pub fn boundary_section_mut(&mut self, contact: ContactPoint) -> Option<&mut LaneSection> {
        match contact {
            ContactPoint::Start => self.sections.first_mut(),
            ContactPoint::End => self.sections.last_mut(),
        }
    }

    /// Index of the section whose `[s, end_s)` range contains `s`.
    pub fn section_index_at(&self, s: f32) -> Option<usize> {
        if self.sections.is_empty() {
            return None;
        }
        let idx = self.sections.partition_point(|section| section.s <= s + S_EPSILON);
        Some(idx.saturating_sub(1))
    }

    pub fn section_at(&self, s: f32) -> Option<&LaneSection> {
        self.section_index_at(s).map(|i| &self.sections[i])
    }

    /// Sort sections, drop duplicates and sections that start past the road
    /// end, pin the first to 0 and derive each section's length.
    pub fn sync_section_lengths(&mut self) {
        self.sections.sort_by(|a, b| a.s.total_cmp(&b.s));
        self.sections.dedup_by(|b, a| (a.s - b.s).abs() <= S_EPSILON);
        let length = self.length;
        if self.sections.len() > 1 {
            let first = self.sections.remove(0);
            self.sections.retain(|section| section.s < length - S_EPSILON);
            self.sections.insert(0, first);
        }
        if let Some(first) = self.sections.first_mut() {
            first.s = 0.0;
        }
        let count = self.sections.len();
        for i in 0..count {
            let end = if i + 1 < count {
                self.sections[i + 1].s
            } else {
                length
            };
            self.sections[i].length = (end - self.sections[i].s).max(0.0);
        }
    }

    /// Change the road length, re-deriving section spans and re-fitting lane
    /// widths. Road-level profiles are re-anchored by the continuity pass.
    pub fn resize(&mut self, new_length: f32) -> Result<(), ProfileError> {
        self.length = new_length;
        self.sync_section_lengths();
        self.recompute_lane_widths()
    }

    pub fn recompute_lane_widths(&mut self) -> Result<(), ProfileError> {
        for section in &mut self.sections {
            section.recompute_widths()?;
        }
        Ok(())
    }

    /// Sum of section spans; equals `length` on a consistent road.
    pub fn sections_span(&self) -> f32 {
        self.sections.iter().map(|section| section.length).sum()
    }

    /// Split the road at `s`: this road keeps `[0, s)`, the returned parts
    /// describe `[s, length)` shifted to start at 0.
    pub fn split_tail(&mut self, s: f32) -> RoadTail {
        let split_idx = self.section_index_at(s).unwrap_or(0);
        let mut tail_sections: Vec<LaneSection> = self.sections.split_off(split_idx + 1);
        let mut straddling = self.sections[split_idx].clone();
        let local = s - straddling.s;
        for lane in straddling.lanes.values_mut() {
            lane.width = lane.width.split_off(local);
        }
        straddling.s = s;
        tail_sections.insert(0, straddling);
        for section in &mut tail_sections {
            section.s -= s;
        }

        let tail = RoadTail {
            length: self.length - s,
            sections: tail_sections,
            lane_offset: self.lane_offset.split_off(s),
            elevation: self.elevation.split_off(s),
            superelevation: self.superelevation.split_off(s),
        };
        self.length = s;
        self.sync_section_lengths();
        tail
    }

    /// Grow the road at its end; the last section absorbs the extra span.
    pub fn extend_with(&mut self, extra_length: f32) {
        self.length += extra_length;
        self.sync_section_lengths();
    }
}

/// The part of a road cut off by [`Road::split_tail`].
#[derive(Debug, Clone)]
pub struct RoadTail {
    pub length: f32,
    pub sections: Vec<LaneSection>,
    pub lane_offset: CubicProfile,
    pub elevation: CubicProfile,
    pub superelevation: CubicProfile,
}
