//! The mutation boundary of the engine.
//!
//! [`RoadMap`] owns every road, junction, reference curve and link. Each
//! mutation runs to completion before returning, in a fixed order: link edits,
//! continuity propagation, junction re-derivation, then validation.

mod operations;
mod road_spec;


use std::collections::{BTreeMap, BTreeSet};

use bevy::prelude::*;

use crate::engine_params::EngineParams;
use crate::errors::{RoadError, ValidationError};
use crate::link_graph::{LinkGraph, LinkTarget, RoadEnd, RoadLink};
use crate::map_validator;
use crate::model::{ContactPoint, CurveId, Junction, JunctionId, Road, RoadId};
use crate::reference_curve::{CurveArena, ReferenceCurve};

pub use road_spec::{LaneLayout, RoadSpec};

#[derive(Resource, Debug, Clone, Default)]
pub struct RoadMap {
    pub(crate) roads: BTreeMap<RoadId, Road>,
    pub(crate) junctions: BTreeMap<JunctionId, Junction>,
    pub(crate) curves: CurveArena,
    pub(crate) links: LinkGraph,
    pub(crate) params: EngineParams,
    /// Validation findings from the last mutations, drained by the plugin.
    pub(crate) diagnostics: Vec<ValidationError>,
    /// Roads touched since the last `take_changed`.
    pub(crate) changed: BTreeSet<RoadId>,
    next_road_id: u32,
    next_junction_id: u32,
}

impl RoadMap {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Assemble a map from loaded parts and rebuild the id counters.
    pub fn from_parts(
        roads: Vec<Road>,
        junctions: Vec<Junction>,
        curves: Vec<ReferenceCurve>,
        links: LinkGraph,
        params: EngineParams,
    ) -> Self {
        let mut map = Self {
            roads: roads.into_iter().map(|road| (road.id, road)).collect(),
            junctions: junctions.into_iter().map(|j| (j.id, j)).collect(),
            links,
            params,
            ..Default::default()
        };
        for curve in curves {
            map.curves.insert_curve(curve);
        }
        map.rebuild_counters();
        map
    }

    /// Rebuild internal id counters from loaded data.
    pub fn rebuild_counters(&mut self) {
        self.next_road_id = self.roads.keys().map(|id| id.0 + 1).max().unwrap_or(0);
        self.next_junction_id = self.junctions.keys().map(|id| id.0 + 1).max().unwrap_or(0);
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn contains_road(&self, id: RoadId) -> bool {
        self.roads.contains_key(&id)
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(&id)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    pub fn curves(&self) -> &CurveArena {
        &self.curves
    }

    pub fn curve(&self, id: CurveId) -> Option<&ReferenceCurve> {
        self.curves.get(id)
    }

    /// Mutable curve access for batched control-point edits. Call
    /// [`RoadMap::recompute_curve`] once the batch is done.
    pub fn curve_mut(&mut self, id: CurveId) -> Option<&mut ReferenceCurve> {
        self.curves.get_mut(id)
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn set_params(&mut self, params: EngineParams) {
        self.params = params;
    }

    pub fn predecessor(&self, road: RoadId) -> Option<RoadLink> {
        self.links.road_link(RoadEnd::new(road, ContactPoint::Start))
    }

    pub fn successor(&self, road: RoadId) -> Option<RoadLink> {
        self.links.road_link(RoadEnd::new(road, ContactPoint::End))
    }

    pub fn link_target(&self, end: RoadEnd) -> Option<LinkTarget> {
        self.links.target(end)
    }

    pub fn diagnostics(&self) -> &[ValidationError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn take_changed(&mut self) -> BTreeSet<RoadId> {
        std::mem::take(&mut self.changed)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate_road(&self, road: RoadId) -> Result<(), ValidationError> {
        map_validator::validate_road(self, &self.curves, road)
    }

    pub fn validate_all(&self) -> Vec<ValidationError> {
        map_validator::validate_map(self, &self.curves)
    }

    // -----------------------------------------------------------------------
    // Internal helpers shared by the engine modules
    // -----------------------------------------------------------------------

    pub(crate) fn road_mut(&mut self, id: RoadId) -> Option<&mut Road> {
        self.roads.get_mut(&id)
    }

    pub(crate) fn require_road(&self, id: RoadId) -> Result<&Road, RoadError> {
        self.roads.get(&id).ok_or(RoadError::RoadNotFound(id))
    }

    pub(crate) fn require_road_mut(&mut self, id: RoadId) -> Result<&mut Road, RoadError> {
        self.roads.get_mut(&id).ok_or(RoadError::RoadNotFound(id))
    }

    pub(crate) fn allocate_road_id(&mut self) -> RoadId {
        while self.roads.contains_key(&RoadId(self.next_road_id)) {
            self.next_road_id += 1;
        }
        let id = RoadId(self.next_road_id);
        self.next_road_id += 1;
        id
    }

    pub(crate) fn allocate_junction_id(&mut self) -> JunctionId {
        while self.junctions.contains_key(&JunctionId(self.next_junction_id)) {
            self.next_junction_id += 1;
        }
        let id = JunctionId(self.next_junction_id);
        self.next_junction_id += 1;
        id
    }

    /// Junctions an outer road end or a connecting road belongs to.
    pub(crate) fn junctions_touching(&self, road: RoadId) -> BTreeSet<JunctionId> {
        let mut found = BTreeSet::new();
        for contact in [ContactPoint::Start, ContactPoint::End] {
            if let Some(LinkTarget::Junction(id)) = self.links.target(RoadEnd::new(road, contact)) {
                found.insert(id);
            }
        }
        if let Some(id) = self.roads.get(&road).and_then(|r| r.junction) {
            found.insert(id);
        }
        for junction in self.junctions.values() {
            if junction.connections.values().any(|c| c.touches_road(road)) {
                found.insert(junction.id);
            }
        }
        found
    }
}
