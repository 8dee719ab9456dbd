use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
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
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable road identifier; survives edits, split and relinking.
    RoadId
);
id_type!(JunctionId);
id_type!(
    /// Index of a shared reference curve in the curve arena.
    CurveId
);
id_type!(
    /// Connection id, unique within its junction only.
    ConnectionId
);

/// Which end of a road's parametric length a link attaches to.
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
pub enum ContactPoint {
    Start,
    End,
}

impl ContactPoint {
    pub fn opposite(self) -> Self {
        match self {
            ContactPoint::Start => ContactPoint::End,
            ContactPoint::End => ContactPoint::Start,
        }
    }

    /// `s` of this boundary on something of the given length.
    pub fn boundary_s(self, length: f32) -> f32 {
        match self {
            ContactPoint::Start => 0.0,
            ContactPoint::End => length,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContactPoint::Start => "start",
            ContactPoint::End => "end",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(ContactPoint::Start),
            "end" => Some(ContactPoint::End),
            _ => None,
        }
    }
}

/// Two road boundaries meeting at these contact points face each other
/// (END-END or START-START), i.e. their driving directions are opposed.
pub fn is_facing(a: ContactPoint, b: ContactPoint) -> bool {
    a == b
}
