//! Shared reference curves.
//!
//! Several roads may run along one curve (a road split in two, or the two
//! halves of a road cut by a junction). Curves live in a [`CurveArena`] and
//! each curve's segment map records which road or junction consumes which
//! arc-length range.

mod arena;
mod curve;
mod geometry;

#[cfg(test)]
mod tests;

pub use arena::CurveArena;
pub use curve::{CurveSegment, ReferenceCurve, SegmentOwner};
pub use geometry::{wrap_angle, RoadCoord, RoadGeometry};
