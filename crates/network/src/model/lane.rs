use serde::{Deserialize, Serialize};

use crate::cubic_profile::CubicProfile;

/// Functional type of a lane.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub enum LaneType {
    #[default]
    Driving,
    Sidewalk,
    Shoulder,
    Parking,
    Border,
    Median,
    Curb,
    Restricted,
    Biking,
    Stop,
    Bidirectional,
    Entry,
    Exit,
    OnRamp,
    OffRamp,
    None,
}

impl LaneType {
    pub const ALL: [LaneType; 16] = [
        LaneType::Driving,
        LaneType::Sidewalk,
        LaneType::Shoulder,
        LaneType::Parking,
        LaneType::Border,
        LaneType::Median,
        LaneType::Curb,
        LaneType::Restricted,
        LaneType::Biking,
        LaneType::Stop,
        LaneType::Bidirectional,
        LaneType::Entry,
        LaneType::Exit,
        LaneType::OnRamp,
        LaneType::OffRamp,
        LaneType::None,
    ];

    /// Width used whenever there is no adjacent lane to take a width from.
    pub fn default_width(self) -> f32 {
        match self {
            LaneType::Driving => 3.6,
            LaneType::Parking => 5.5,
            LaneType::Sidewalk | LaneType::Biking | LaneType::Stop => 2.0,
            LaneType::Shoulder | LaneType::Border => 0.5,
            LaneType::Median | LaneType::Curb => 1.0,
            LaneType::Restricted
            | LaneType::Bidirectional
            | LaneType::Entry
            | LaneType::Exit
            | LaneType::OnRamp
            | LaneType::OffRamp => 3.6,
            LaneType::None => 0.0,
        }
    }

    /// Lanes vehicles may use to move through a junction.
    pub fn is_drivable(self) -> bool {
        matches!(
            self,
            LaneType::Driving
                | LaneType::Bidirectional
                | LaneType::Entry
                | LaneType::Exit
                | LaneType::OnRamp
                | LaneType::OffRamp
        )
    }

    /// OpenDRIVE spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            LaneType::Driving => "driving",
            LaneType::Sidewalk => "sidewalk",
            LaneType::Shoulder => "shoulder",
            LaneType::Parking => "parking",
            LaneType::Border => "border",
            LaneType::Median => "median",
            LaneType::Curb => "curb",
            LaneType::Restricted => "restricted",
            LaneType::Biking => "biking",
            LaneType::Stop => "stop",
            LaneType::Bidirectional => "bidirectional",
            LaneType::Entry => "entry",
            LaneType::Exit => "exit",
            LaneType::OnRamp => "onRamp",
            LaneType::OffRamp => "offRamp",
            LaneType::None => "none",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        LaneType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Side of the reference line a lane sits on, derived from its id sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneSide {
    Left,
    Center,
    Right,
}

impl LaneSide {
    pub fn of(id: i32) -> Self {
        match id.signum() {
            1 => LaneSide::Left,
            -1 => LaneSide::Right,
            _ => LaneSide::Center,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            LaneSide::Left => LaneSide::Right,
            LaneSide::Right => LaneSide::Left,
            LaneSide::Center => LaneSide::Center,
        }
    }

    /// Sign applied to an absolute lane index on this side.
    pub fn sign(self) -> i32 {
        match self {
            LaneSide::Left => 1,
            LaneSide::Right => -1,
            LaneSide::Center => 0,
        }
    }
}

/// Direction vehicles travel along a lane relative to increasing `s`.
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
pub enum TravelDirection {
    Forward,
    Backward,
    Undirected,
}

impl TravelDirection {
    /// Right-hand traffic default for a lane on `side`.
    pub fn default_for(side: LaneSide) -> Self {
        match side {
            LaneSide::Right => TravelDirection::Forward,
            LaneSide::Left => TravelDirection::Backward,
            LaneSide::Center => TravelDirection::Undirected,
        }
    }
}

/// Road mark record. Only its position matters to the topology core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct RoadMark {
    pub s_offset: f32,
    pub kind: String,
    pub width: f32,
}

/// Lane height record (inner/outer elevation above the road surface).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct LaneHeight {
    pub s_offset: f32,
    pub inner: f32,
    pub outer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct Lane {
    pub id: i32,
    pub lane_type: LaneType,
    pub direction: TravelDirection,
    /// Width segments keyed by local `s` offset within the section.
    pub width: CubicProfile,
    pub predecessor: Option<i32>,
    pub successor: Option<i32>,
    pub road_marks: Vec<RoadMark>,
    pub heights: Vec<LaneHeight>,
}

impl Lane {
    /// A lane of the given type with its default width and the default travel
    /// direction for its side.
    pub fn new(id: i32, lane_type: LaneType) -> Self {
        let width = if id == 0 {
            CubicProfile::new()
        } else {
            CubicProfile::constant(lane_type.default_width())
        };
        Self {
            id,
            lane_type,
            direction: TravelDirection::default_for(LaneSide::of(id)),
            width,
            predecessor: None,
            successor: None,
            road_marks: Vec::new(),
            heights: Vec::new(),
        }
    }

    pub fn center() -> Self {
        Self::new(0, LaneType::None)
    }

    pub fn side(&self) -> LaneSide {
        LaneSide::of(self.id)
    }

    pub fn is_center(&self) -> bool {
        self.id == 0
    }

    pub fn width_at(&self, local_s: f32) -> f32 {
        if self.width.is_empty() {
            return if self.is_center() {
                0.0
            } else {
                self.lane_type.default_width()
            };
        }
        self.width.evaluate(local_s)
    }

    pub fn with_direction(mut self, direction: TravelDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = CubicProfile::constant(width);
        self
    }
}
