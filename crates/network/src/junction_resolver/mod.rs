//! Junction connection resolution.
//!
//! A connection joins an entry gate (a road end whose lanes flow into the
//! junction) to an exit gate through a short synthetic connecting road. The
//! resolver classifies the turn, picks the lanes the movement carries and
//! builds the connecting road with its lane-link table.

mod attempt;
mod build;
mod gates;
mod turns;


pub use attempt::{validate, AttemptState, ConnectionAttempt};
pub use build::{build_junction, create_crossing_junction, find_crossing, rebuild_junction};
pub(crate) use build::remove_connecting_road;
pub use gates::{entry_lanes, exit_lanes, JunctionGate};
pub use turns::classify_turn;
