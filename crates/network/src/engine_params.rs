//! Data-driven engine parameters.
//!
//! Tunables of the junction resolver and the mutation pipeline live in a
//! single [`EngineParams`] resource that tools can adjust at runtime. The
//! resource is saved with the map, so a reopened file derives junctions with
//! the same thresholds.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Angular thresholds (degrees) used to classify a junction movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct TurnParams {
    /// Headings within this many degrees of each other are a straight movement.
    pub straight_threshold_deg: f32,
    /// Headings at least this many degrees apart are a U-turn.
    pub u_turn_threshold_deg: f32,
}

impl Default for TurnParams {
    fn default() -> Self {
        Self {
            straight_threshold_deg: 20.0,
            u_turn_threshold_deg: 160.0,
        }
    }
}

/// Shape of the synthetic connecting roads built inside junctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct ConnectionParams {
    /// Tangent handle length as a fraction of the entry/exit chord.
    pub tangent_factor: f32,
    /// Gap left on each side of a crossing point when two roads are split
    /// into a junction.
    pub crossing_clearance: f32,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            tangent_factor: 1.0 / 3.0,
            crossing_clearance: 10.0,
        }
    }
}

/// Runtime-tunable engine parameters.
#[derive(
    Resource, Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct EngineParams {
    pub turns: TurnParams,
    pub connections: ConnectionParams,
    /// Run the map validator on touched roads after every mutation.
    pub validate_after_mutation: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            turns: TurnParams::default(),
            connections: ConnectionParams::default(),
            validate_after_mutation: cfg!(debug_assertions),
        }
    }
}

impl EngineParams {
    pub fn straight_threshold_rad(&self) -> f32 {
        self.turns.straight_threshold_deg.to_radians()
    }

    pub fn u_turn_threshold_rad(&self) -> f32 {
        self.turns.u_turn_threshold_deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_are_ordered() {
        let params = EngineParams::default();
        assert!(params.straight_threshold_rad() > 0.0);
        assert!(params.straight_threshold_rad() < params.u_turn_threshold_rad());
        assert!(params.u_turn_threshold_rad() < std::f32::consts::PI);
    }

    #[test]
    fn test_params_bitcode_roundtrip() {
        let mut params = EngineParams::default();
        params.turns.straight_threshold_deg = 12.5;
        params.connections.crossing_clearance = 4.0;
        let bytes = bitcode::encode(&params);
        let decoded: EngineParams = bitcode::decode(&bytes).expect("decode");
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_params_json_uses_field_names() {
        let json = serde_json::to_string(&EngineParams::default()).expect("serialize");
        assert!(json.contains("straight_threshold_deg"), "got: {json}");
        assert!(json.contains("validate_after_mutation"), "got: {json}");
    }
}
