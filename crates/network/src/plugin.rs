//! Bevy integration.
//!
//! Editing tools send [`RoadCommand`] events; `apply_road_commands` drains
//! them into the [`RoadMap`] in arrival order, then `validate_changed_roads`
//! re-validates every touched road and announces the change with a
//! [`RoadMapChanged`] event. Findings accumulate in [`MapDiagnostics`] as
//! non-blocking diagnostics.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::engine_params::EngineParams;
use crate::errors::{RoadError, ValidationError};
use crate::junction_resolver::JunctionGate;
use crate::link_graph::LinkTarget;
use crate::map_validator;
use crate::model::{ContactPoint, CurveId, JunctionId, LaneSide, LaneType, RoadId};
use crate::road_map::{RoadMap, RoadSpec};

// =============================================================================
// Events
// =============================================================================

/// One mutation request from an editing tool.
#[derive(Event, Debug, Clone)]
pub enum RoadCommand {
    CreateRoad(RoadSpec),
    UpdateRoadCurve {
        road: RoadId,
        points: Vec<Vec2>,
    },
    SplitRoad {
        road: RoadId,
        s: f32,
    },
    RemoveRoad(RoadId),
    CreateLane {
        road: RoadId,
        section: usize,
        side: LaneSide,
        lane_type: LaneType,
    },
    UpdateLaneType {
        road: RoadId,
        section: usize,
        lane: i32,
        lane_type: LaneType,
    },
    UpdateLaneWidth {
        road: RoadId,
        section: usize,
        lane: i32,
        width: f32,
    },
    AddLaneSection {
        road: RoadId,
        s: f32,
    },
    LinkPredecessor {
        road: RoadId,
        target: LinkTarget,
    },
    LinkSuccessor {
        road: RoadId,
        target: LinkTarget,
    },
    Unlink {
        road: RoadId,
        contact: ContactPoint,
    },
    CreateJunction {
        name: String,
    },
    CreateJunctionConnection {
        junction: JunctionId,
        entry: JunctionGate,
        exit: JunctionGate,
    },
    CreateCrossingJunction {
        a: RoadId,
        b: RoadId,
    },
    RemoveJunction(JunctionId),
    RecomputeCurve(CurveId),
}

impl RoadCommand {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RoadCommand::CreateRoad(_) => "create_road",
            RoadCommand::UpdateRoadCurve { .. } => "update_road_curve",
            RoadCommand::SplitRoad { .. } => "split_road",
            RoadCommand::RemoveRoad(_) => "remove_road",
            RoadCommand::CreateLane { .. } => "create_lane",
            RoadCommand::UpdateLaneType { .. } => "update_lane_type",
            RoadCommand::UpdateLaneWidth { .. } => "update_lane_width",
            RoadCommand::AddLaneSection { .. } => "add_lane_section",
            RoadCommand::LinkPredecessor { .. } => "link_predecessor",
            RoadCommand::LinkSuccessor { .. } => "link_successor",
            RoadCommand::Unlink { .. } => "unlink",
            RoadCommand::CreateJunction { .. } => "create_junction",
            RoadCommand::CreateJunctionConnection { .. } => "create_junction_connection",
            RoadCommand::CreateCrossingJunction { .. } => "create_crossing_junction",
            RoadCommand::RemoveJunction(_) => "remove_junction",
            RoadCommand::RecomputeCurve(_) => "recompute_curve",
        }
    }

    /// Apply the command to `map`.
    pub fn apply(self, map: &mut RoadMap) -> Result<(), RoadError> {
        match self {
            RoadCommand::CreateRoad(spec) => map.create_road(spec).map(|_| ()),
            RoadCommand::UpdateRoadCurve { road, points } => map.update_road_curve(road, points),
            RoadCommand::SplitRoad { road, s } => map.split_road(road, s).map(|_| ()),
            RoadCommand::RemoveRoad(road) => map.remove_road(road),
            RoadCommand::CreateLane {
                road,
                section,
                side,
                lane_type,
            } => map.create_lane(road, section, side, lane_type).map(|_| ()),
            RoadCommand::UpdateLaneType {
                road,
                section,
                lane,
                lane_type,
            } => map.update_lane_type(road, section, lane, lane_type),
            RoadCommand::UpdateLaneWidth {
                road,
                section,
                lane,
                width,
            } => map.update_lane_width(road, section, lane, width),
            RoadCommand::AddLaneSection { road, s } => map.add_lane_section(road, s).map(|_| ()),
            RoadCommand::LinkPredecessor { road, target } => map.link_predecessor(road, target),
            RoadCommand::LinkSuccessor { road, target } => map.link_successor(road, target),
            RoadCommand::Unlink { road, contact } => map.unlink(road, contact).map(|_| ()),
            RoadCommand::CreateJunction { name } => {
                map.create_junction(name);
                Ok(())
            }
            RoadCommand::CreateJunctionConnection {
                junction,
                entry,
                exit,
            } => map
                .create_junction_connection(junction, entry, exit)
                .map(|_| ()),
            RoadCommand::CreateCrossingJunction { a, b } => {
                map.create_crossing_junction(a, b).map(|_| ())
            }
            RoadCommand::RemoveJunction(junction) => map.remove_junction(junction),
            RoadCommand::RecomputeCurve(curve) => map.recompute_curve(curve).map(|_| ()),
        }
    }
}

/// Sent once per frame with every road touched by that frame's commands.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RoadMapChanged {
    pub roads: Vec<RoadId>,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Validation findings and rejected commands, shown to the user without
/// blocking further edits.
#[derive(Resource, Debug, Clone, Default)]
pub struct MapDiagnostics {
    pub violations: BTreeMap<RoadId, Vec<ValidationError>>,
    pub rejected_commands: Vec<String>,
}

impl MapDiagnostics {
    pub fn record(&mut self, violation: ValidationError) {
        let list = self.violations.entry(violation.road()).or_default();
        if !list.contains(&violation) {
            list.push(violation);
        }
    }

    pub fn clear_road(&mut self, road: RoadId) {
        self.violations.remove(&road);
    }

    pub fn violation_count(&self) -> usize {
        self.violations.values().map(Vec::len).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.rejected_commands.is_empty()
    }

    /// JSON summary for tools and the command line.
    pub fn report(&self) -> serde_json::Value {
        let roads: Vec<serde_json::Value> = self
            .violations
            .iter()
            .map(|(road, list)| {
                serde_json::json!({
                    "road": road.0,
                    "violations": list.iter().map(ToString::to_string).collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::json!({
            "violation_count": self.violation_count(),
            "roads": roads,
            "rejected_commands": self.rejected_commands,
        })
    }
}

// =============================================================================
// Systems
// =============================================================================

pub fn apply_road_commands(
    mut commands: EventReader<RoadCommand>,
    mut map: ResMut<RoadMap>,
    mut diagnostics: ResMut<MapDiagnostics>,
) {
    for command in commands.read() {
        let label = command.label();
        match command.clone().apply(&mut map) {
            Ok(()) => {}
            Err(RoadError::GeometryDegenerate { points }) => {
                debug!("{label}: waiting for more control points ({points})");
            }
            Err(err) => {
                warn!("{label} rejected: {err}");
                diagnostics.rejected_commands.push(format!("{label}: {err}"));
            }
        }
    }
}

pub fn validate_changed_roads(
    mut map: ResMut<RoadMap>,
    mut diagnostics: ResMut<MapDiagnostics>,
    mut changed_events: EventWriter<RoadMapChanged>,
) {
    let changed = map.take_changed();
    let immediate = map.take_diagnostics();
    if changed.is_empty() && immediate.is_empty() {
        return;
    }
    for road in &changed {
        diagnostics.clear_road(*road);
    }
    for violation in immediate {
        let road = violation.road();
        if !changed.contains(&road) && map.contains_road(road) {
            diagnostics.record(violation);
        }
    }
    for &road in &changed {
        if !map.contains_road(road) {
            continue;
        }
        for violation in map_validator::road_violations(&map, map.curves(), road) {
            diagnostics.record(violation);
        }
    }
    if !changed.is_empty() {
        changed_events.send(RoadMapChanged {
            roads: changed.into_iter().collect(),
        });
    }
}

/// Copy edited engine parameters into the map.
pub fn sync_engine_params(params: Res<EngineParams>, mut map: ResMut<RoadMap>) {
    if params.is_changed() && map.params() != &*params {
        map.set_params(params.clone());
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct RoadNetworkPlugin;

impl Plugin for RoadNetworkPlugin {
    fn build(&self, app: &mut App) {
        let params = app
            .world()
            .get_resource::<EngineParams>()
            .cloned()
            .unwrap_or_default();
        if !app.world().contains_resource::<RoadMap>() {
            app.insert_resource(RoadMap::new(params.clone()));
        }
        app.insert_resource(params)
            .init_resource::<MapDiagnostics>()
            .add_event::<RoadCommand>()
            .add_event::<RoadMapChanged>()
            .add_systems(
                Update,
                (sync_engine_params, apply_road_commands, validate_changed_roads).chain(),
            );
    }
}
