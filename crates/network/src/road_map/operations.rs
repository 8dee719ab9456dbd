use std::collections::BTreeSet;

use bevy::prelude::*;

use super::{RoadMap, RoadSpec};
use crate::config::{MIN_CURVE_POINTS, MIN_ROAD_LENGTH};
use crate::continuity;
use crate::cubic_profile::CubicProfile;
use crate::errors::{JunctionError, RoadError};
use crate::junction_resolver::{self, ConnectionAttempt, JunctionGate};
use crate::link_graph::{LinkTarget, RoadEnd};
use crate::map_validator;
use crate::model::{
    ConnectionId, ContactPoint, CurveId, Junction, JunctionId, Lane, LaneSection, LaneSide,
    LaneType, Road, RoadId,
};
use crate::reference_curve::SegmentOwner;

impl RoadMap {
    // -----------------------------------------------------------------------
    // Roads
    // -----------------------------------------------------------------------

    /// Create a road on a fresh reference curve.
    ///
    /// An explicit id that is already taken fails before anything changes.
    /// Fewer than two control points (or a zero-length curve) returns
    /// `GeometryDegenerate` with the map untouched; callers treat it as a
    /// transient editing state.
    pub fn create_road(&mut self, spec: RoadSpec) -> Result<RoadId, RoadError> {
        if let Some(id) = spec.id {
            if self.roads.contains_key(&id) {
                return Err(RoadError::IdConflict {
                    kind: "road",
                    id: id.0,
                });
            }
        }
        for target in [spec.predecessor, spec.successor].into_iter().flatten() {
            self.require_target(target)?;
        }
        if spec.points.len() < MIN_CURVE_POINTS {
            debug!("road needs {MIN_CURVE_POINTS} control points, got {}", spec.points.len());
            return Err(RoadError::GeometryDegenerate {
                points: spec.points.len(),
            });
        }

        let point_count = spec.points.len();
        let curve = self.curves.insert(spec.points);
        let length = self.curves.get(curve).map_or(0.0, |c| c.length());
        if length < MIN_ROAD_LENGTH {
            self.curves.remove(curve);
            debug!("road curve is only {length} long, nothing created");
            return Err(RoadError::GeometryDegenerate {
                points: point_count,
            });
        }

        let id = match spec.id {
            Some(id) => id,
            None => self.allocate_road_id(),
        };
        if let Some(reference) = self.curves.get_mut(curve) {
            reference.assign(0.0, length, SegmentOwner::Road(id));
        }
        let mut road = Road::new(id, curve, length, spec.lanes.build_section(0.0));
        if let Some(name) = spec.name {
            road.name = name;
        }
        road.recompute_lane_widths()?;
        self.roads.insert(id, road);

        let neighbors = self.on_road_created(id, spec.predecessor, spec.successor);
        // Neighbors settle first so the new road inherits their boundary values.
        self.after_mutation(&[id], &neighbors)?;
        Ok(id)
    }

    /// Install the construction-time links of a new road. Returns the
    /// neighbor roads that were linked.
    pub(crate) fn on_road_created(
        &mut self,
        road: RoadId,
        predecessor: Option<LinkTarget>,
        successor: Option<LinkTarget>,
    ) -> Vec<RoadId> {
        let mut neighbors = Vec::new();
        for (end, target) in [
            (RoadEnd::start(road), predecessor),
            (RoadEnd::end(road), successor),
        ] {
            let Some(target) = target else {
                continue;
            };
            self.links.link(end, target);
            if let LinkTarget::Road(other) = target {
                neighbors.push(other.road);
            }
        }
        neighbors
    }

    /// Replace the control points of the road's reference curve. Every road
    /// sharing the curve is recomputed.
    pub fn update_road_curve(&mut self, road: RoadId, points: Vec<Vec2>) -> Result<(), RoadError> {
        let curve = self.require_road(road)?.curve;
        if points.len() < MIN_CURVE_POINTS {
            debug!("road {road}: {} control points, edit ignored", points.len());
            return Ok(());
        }
        self.curves
            .get_mut(curve)
            .ok_or(RoadError::CurveNotFound(curve))?
            .set_points(points);
        self.recompute_curve(curve)?;
        Ok(())
    }

    /// Batch entry point after direct control-point edits through
    /// [`RoadMap::curve_mut`].
    pub fn recompute_curve(&mut self, curve: CurveId) -> Result<Vec<RoadId>, RoadError> {
        let affected = continuity::recompute_curve(self, curve)?;
        let mut checked = affected.clone();
        for &road in &affected {
            checked.extend(self.linked_roads(road));
        }
        // Neighbors received new boundary values.
        self.changed.extend(checked.iter().copied());
        self.record_violations(&checked);
        Ok(affected)
    }

    /// Split `road` at `s`. The original keeps `[0, s)` and its id; the
    /// returned road takes `[s, length)` and the original's end link.
    pub fn split_road(&mut self, road: RoadId, s: f32) -> Result<RoadId, RoadError> {
        let current = self.require_road(road)?;
        if current.is_junction_road()
            || !s.is_finite()
            || s < MIN_ROAD_LENGTH
            || s > current.length - MIN_ROAD_LENGTH
        {
            return Err(RoadError::InvalidSplit { road, s });
        }
        let curve = current.curve;
        let (start, end) = self
            .curves
            .segment_range(curve, road)
            .ok_or(RoadError::CurveNotFound(curve))?;

        let new_id = self.allocate_road_id();
        let head = self.require_road_mut(road)?;
        let tail = head.split_tail(s);
        head.recompute_lane_widths()?;

        let mut tail_road = Road::new(new_id, curve, tail.length, LaneSection::new(0.0));
        tail_road.sections = tail.sections;
        tail_road.lane_offset = tail.lane_offset;
        tail_road.elevation = tail.elevation;
        tail_road.superelevation = tail.superelevation;
        tail_road.sync_section_lengths();
        tail_road.recompute_lane_widths()?;
        self.roads.insert(new_id, tail_road);

        if let Some(reference) = self.curves.get_mut(curve) {
            reference.assign(start + s, end, SegmentOwner::Road(new_id));
        }
        self.links.retarget(RoadEnd::end(road), RoadEnd::end(new_id));
        self.links
            .link(RoadEnd::end(road), LinkTarget::Road(RoadEnd::start(new_id)));
        for junction in self.junctions.values_mut() {
            for connection in junction.connections.values_mut() {
                if connection.incoming_road == road && connection.incoming_contact == ContactPoint::End {
                    connection.incoming_road = new_id;
                }
                if connection.outgoing_road == road && connection.outgoing_contact == ContactPoint::End {
                    connection.outgoing_road = new_id;
                }
            }
        }

        debug!("road {road} split at s={s}, tail is road {new_id}");
        self.after_mutation(&[road, new_id], &[])?;
        Ok(new_id)
    }

    /// Remove a road and repair everything that pointed at it.
    ///
    /// When the predecessor ends and the successor starts on the removed
    /// road's own curve, right next to its span, the predecessor absorbs the
    /// span and is linked straight to the successor. Otherwise every link
    /// to the road is cleared. Junction connections using the road are
    /// dropped with their connecting roads.
    pub fn remove_road(&mut self, road: RoadId) -> Result<(), RoadError> {
        let removed = self.require_road(road)?;
        let (curve, length) = (removed.curve, removed.length);
        if let Some(junction) = removed.junction {
            if let Some(j) = self.junctions.get_mut(&junction) {
                j.connections.retain(|_, c| c.connecting_road != road);
            }
            junction_resolver::remove_connecting_road(self, road);
            self.changed.remove(&road);
            return Ok(());
        }
        let neighbors = self.linked_roads(road);
        let splice = self.splice_partners(road, curve);

        for junction in self.junctions.values_mut() {
            let dropped: Vec<RoadId> = junction
                .connections
                .values()
                .filter(|c| c.incoming_road == road || c.outgoing_road == road)
                .map(|c| c.connecting_road)
                .collect();
            junction
                .connections
                .retain(|_, c| c.incoming_road != road && c.outgoing_road != road);
            for connecting in dropped {
                if let Some(gone) = self.roads.remove(&connecting) {
                    self.links.remove_road(connecting);
                    self.curves.release(gone.curve, connecting);
                    self.changed.remove(&connecting);
                }
            }
        }

        self.links.remove_road(road);
        self.roads.remove(&road);
        self.changed.remove(&road);

        match splice {
            Some((predecessor, successor)) => {
                if let Some(reference) = self.curves.get_mut(curve) {
                    reference.reassign(SegmentOwner::Road(road), SegmentOwner::Road(predecessor));
                }
                let absorbing = self.require_road_mut(predecessor)?;
                absorbing.extend_with(length);
                absorbing.recompute_lane_widths()?;
                self.links.link(
                    RoadEnd::end(predecessor),
                    LinkTarget::Road(RoadEnd::start(successor)),
                );
                info!("road {road} removed, road {predecessor} now continues into road {successor}");
            }
            None => {
                self.curves.release(curve, road);
                debug!("road {road} removed, {} neighbor link(s) cleared", neighbors.len());
            }
        }
        self.after_mutation(&[], &neighbors)
    }

    /// `(predecessor, successor)` when removing `road` can be bridged on
    /// its own curve.
    fn splice_partners(&self, road: RoadId, curve: CurveId) -> Option<(RoadId, RoadId)> {
        let Some(LinkTarget::Road(before)) = self.links.target(RoadEnd::start(road)) else {
            return None;
        };
        let Some(LinkTarget::Road(after)) = self.links.target(RoadEnd::end(road)) else {
            return None;
        };
        if before.contact != ContactPoint::End
            || after.contact != ContactPoint::Start
            || before.road == after.road
        {
            return None;
        }
        let same_curve = |id: RoadId| self.road(id).is_some_and(|r| r.curve == curve);
        if !same_curve(before.road) || !same_curve(after.road) {
            return None;
        }
        let reference = self.curves.get(curve)?;
        let adjacent = reference.neighbors_of(SegmentOwner::Road(road))
            == (
                Some(SegmentOwner::Road(before.road)),
                Some(SegmentOwner::Road(after.road)),
            );
        adjacent.then_some((before.road, after.road))
    }

    // -----------------------------------------------------------------------
    // Lanes and sections
    // -----------------------------------------------------------------------

    /// Append a lane on `side` of section `section`. Returns its id.
    pub fn create_lane(
        &mut self,
        road: RoadId,
        section: usize,
        side: LaneSide,
        lane_type: LaneType,
    ) -> Result<i32, RoadError> {
        let target = self.require_road_mut(road)?;
        let lanes = target
            .sections
            .get_mut(section)
            .ok_or(RoadError::SectionNotFound { road, index: section })?;
        let id = lanes.add_lane(side, lane_type);
        lanes.recompute_widths()?;
        self.after_mutation(&[road], &[])?;
        Ok(id)
    }

    pub fn update_lane_type(
        &mut self,
        road: RoadId,
        section: usize,
        lane: i32,
        lane_type: LaneType,
    ) -> Result<(), RoadError> {
        self.lane_mut(road, section, lane)?.lane_type = lane_type;
        self.after_mutation(&[road], &[])
    }

    /// Set a constant width for a lane; boundary widths of linked roads
    /// follow.
    pub fn update_lane_width(
        &mut self,
        road: RoadId,
        section: usize,
        lane: i32,
        width: f32,
    ) -> Result<(), RoadError> {
        if !width.is_finite() || width < 0.0 {
            return Err(RoadError::InvalidWidth(width));
        }
        self.lane_mut(road, section, lane)?.width = CubicProfile::constant(width);
        self.require_road_mut(road)?.recompute_lane_widths()?;
        self.after_mutation(&[road], &[])
    }

    /// Start a new lane section at `s`, copying the lane layout and the
    /// widths found there. Returns the section index.
    pub fn add_lane_section(&mut self, road: RoadId, s: f32) -> Result<usize, RoadError> {
        let target = self.require_road_mut(road)?;
        if !s.is_finite() || s < MIN_ROAD_LENGTH || s > target.length - MIN_ROAD_LENGTH {
            return Err(RoadError::InvalidSplit { road, s });
        }
        let index = target
            .section_index_at(s)
            .ok_or(RoadError::SectionNotFound { road, index: 0 })?;
        let source = &target.sections[index];
        if (source.s - s).abs() < MIN_ROAD_LENGTH {
            return Err(RoadError::InvalidSplit { road, s });
        }
        let local = s - source.s;
        let mut section = source.clone();
        section.s = s;
        for lane in section.lanes.values_mut().filter(|lane| !lane.is_center()) {
            lane.width = CubicProfile::constant(lane.width_at(local));
        }
        section.clear_lane_links();
        target.sections.insert(index + 1, section);
        target.sync_section_lengths();
        target.recompute_lane_widths()?;
        self.after_mutation(&[road], &[])?;
        Ok(index + 1)
    }

    fn lane_mut(
        &mut self,
        road: RoadId,
        section: usize,
        lane: i32,
    ) -> Result<&mut Lane, RoadError> {
        self.require_road_mut(road)?
            .sections
            .get_mut(section)
            .ok_or(RoadError::SectionNotFound { road, index: section })?
            .lane_mut(lane)
            .ok_or(RoadError::LaneNotFound { road, lane })
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    pub fn link_predecessor(&mut self, road: RoadId, target: LinkTarget) -> Result<(), RoadError> {
        self.link_end(RoadEnd::start(road), target)
    }

    pub fn link_successor(&mut self, road: RoadId, target: LinkTarget) -> Result<(), RoadError> {
        self.link_end(RoadEnd::end(road), target)
    }

    fn link_end(&mut self, end: RoadEnd, target: LinkTarget) -> Result<(), RoadError> {
        self.require_road(end.road)?;
        self.require_target(target)?;
        let mut neighbors: Vec<RoadId> = self.linked_roads(end.road);
        if let Some(LinkTarget::Road(other)) = target.road_end().and_then(|e| self.links.target(e)) {
            neighbors.push(other.road);
        }
        self.links.link(end, target);
        if let LinkTarget::Road(other) = target {
            neighbors.push(other.road);
        }
        self.after_mutation(&[end.road], &neighbors)
    }

    /// Clear the link at one end of `road`. Returns what it pointed at.
    pub fn unlink(
        &mut self,
        road: RoadId,
        contact: ContactPoint,
    ) -> Result<Option<LinkTarget>, RoadError> {
        self.require_road(road)?;
        let end = RoadEnd::new(road, contact);
        let previous = self.links.target(end);
        self.links.unlink(end);
        let neighbors: Vec<RoadId> = match previous {
            Some(LinkTarget::Road(other)) => vec![other.road],
            _ => Vec::new(),
        };
        self.after_mutation(&[road], &neighbors)?;
        Ok(previous)
    }

    // -----------------------------------------------------------------------
    // Junctions
    // -----------------------------------------------------------------------

    /// An empty, user-authored junction.
    pub fn create_junction(&mut self, name: impl Into<String>) -> JunctionId {
        let id = self.allocate_junction_id();
        let mut junction = Junction::new(id, false);
        junction.name = name.into();
        self.junctions.insert(id, junction);
        debug!("junction {id} created");
        id
    }

    /// Run a full connection attempt from `entry` to `exit` and commit it.
    pub fn create_junction_connection(
        &mut self,
        junction: JunctionId,
        entry: JunctionGate,
        exit: JunctionGate,
    ) -> Result<ConnectionId, RoadError> {
        if !self.junctions.contains_key(&junction) {
            return Err(RoadError::JunctionNotFound(junction));
        }
        let mut attempt = ConnectionAttempt::new(junction);
        attempt.select_gate(self, entry)?;
        attempt.select_gate(self, exit)?;
        let connection = attempt.commit(self)?;

        for road in [entry.road, exit.road] {
            continuity::propagate_road(self, road)?;
            self.changed.insert(road);
        }
        let mut checked = vec![entry.road, exit.road];
        checked.extend(
            self.junction(junction)
                .and_then(|j| j.connections.get(&connection))
                .map(|c| c.connecting_road),
        );
        self.record_violations(&checked);
        Ok(connection)
    }

    /// Automatic junction over the given road ends.
    pub fn build_junction(&mut self, ends: &[RoadEnd]) -> Result<JunctionId, RoadError> {
        let junction = junction_resolver::build_junction(self, ends)?;
        let roads: Vec<RoadId> = ends.iter().map(|end| end.road).collect();
        for &road in &roads {
            continuity::propagate_road(self, road)?;
            self.changed.insert(road);
        }
        let mut checked = roads;
        checked.extend(self.junction(junction).map(Junction::connecting_roads).unwrap_or_default());
        self.record_violations(&checked);
        Ok(junction)
    }

    /// Turn the crossing of two roads into a 4-way junction, keeping the
    /// configured clearance around the crossing point.
    pub fn create_crossing_junction(&mut self, a: RoadId, b: RoadId) -> Result<JunctionId, RoadError> {
        if a == b {
            return Err(JunctionError::SameRoad(a).into());
        }
        let clearance = self.params.connections.crossing_clearance;
        let junction = junction_resolver::create_crossing_junction(self, a, b, clearance)?;
        let mut checked: Vec<RoadId> = self
            .links
            .ends_linked_to_junction(junction)
            .into_iter()
            .map(|end| end.road)
            .collect();
        checked.extend(self.junction(junction).map(Junction::connecting_roads).unwrap_or_default());
        self.record_violations(&checked);
        Ok(junction)
    }

    /// Remove a junction with its connecting roads. Outer roads lose their
    /// junction links and any curve span the junction held becomes unused.
    pub fn remove_junction(&mut self, junction: JunctionId) -> Result<(), RoadError> {
        let removed = self
            .junctions
            .remove(&junction)
            .ok_or(RoadError::JunctionNotFound(junction))?;
        for road in removed.connecting_roads() {
            junction_resolver::remove_connecting_road(self, road);
            self.changed.remove(&road);
        }
        let outer: Vec<RoadId> = self
            .links
            .remove_junction(junction)
            .into_iter()
            .map(|edge| edge.a.road)
            .collect();
        let spans: Vec<CurveId> = self
            .curves
            .iter()
            .filter(|c| c.segments().iter().any(|seg| seg.owner == SegmentOwner::Junction(junction)))
            .map(|c| c.id)
            .collect();
        for curve in spans {
            if let Some(reference) = self.curves.get_mut(curve) {
                reference.release(SegmentOwner::Junction(junction));
            }
        }
        info!("junction {junction} removed with {} connections", removed.connections.len());
        self.after_mutation(&[], &outer)
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Continuity, junction re-derivation and validation after an edit.
    ///
    /// `primary` roads are the ones the caller edited; a propagation failure
    /// there fails the operation. `neighbors` were only touched through a
    /// link, so their failures are logged and skipped. Primary roads
    /// propagate last and win at shared boundaries.
    fn after_mutation(&mut self, primary: &[RoadId], neighbors: &[RoadId]) -> Result<(), RoadError> {
        let mut seen = BTreeSet::new();
        let primary: Vec<RoadId> = primary
            .iter()
            .copied()
            .filter(|road| self.roads.contains_key(road) && seen.insert(*road))
            .collect();
        let neighbors: Vec<RoadId> = neighbors
            .iter()
            .copied()
            .filter(|road| self.roads.contains_key(road) && seen.insert(*road))
            .collect();

        for &road in &neighbors {
            if let Err(err) = continuity::propagate_road(self, road) {
                warn!("propagation into road {road} skipped: {err}");
            }
        }
        for &road in &primary {
            continuity::propagate_road(self, road)?;
        }

        let roads: Vec<RoadId> = neighbors.iter().chain(&primary).copied().collect();
        let mut junctions = BTreeSet::new();
        for &road in &roads {
            junctions.extend(self.junctions_touching(road));
        }
        for junction in junctions {
            if self.junctions.contains_key(&junction) {
                junction_resolver::rebuild_junction(self, junction)?;
            }
        }
        let mut checked = roads.clone();
        for &road in &roads {
            checked.extend(self.linked_roads(road));
        }
        self.changed.extend(checked.iter().copied());
        self.record_violations(&checked);
        Ok(())
    }

    /// Validate `roads` and keep what fails as diagnostics.
    fn record_violations(&mut self, roads: &[RoadId]) {
        if !self.params.validate_after_mutation {
            return;
        }
        let unique: BTreeSet<RoadId> = roads.iter().copied().collect();
        for road in unique {
            if !self.roads.contains_key(&road) {
                continue;
            }
            for violation in map_validator::road_violations(self, &self.curves, road) {
                warn!("{violation}");
                self.diagnostics.push(violation);
            }
        }
    }

    /// Roads linked at either end of `road`, including connecting roads
    /// attached through a junction.
    pub(crate) fn linked_roads(&self, road: RoadId) -> Vec<RoadId> {
        let mut found = Vec::new();
        for contact in [ContactPoint::Start, ContactPoint::End] {
            let end = RoadEnd::new(road, contact);
            match self.links.target(end) {
                Some(LinkTarget::Road(other)) if other.road != road => found.push(other.road),
                Some(LinkTarget::Junction(_)) => {
                    found.extend(self.links.incoming_one_way(end).into_iter().map(|e| e.road));
                }
                _ => {}
            }
        }
        found
    }

    fn require_target(&self, target: LinkTarget) -> Result<(), RoadError> {
        match target {
            LinkTarget::Road(end) => self.require_road(end.road).map(|_| ()),
            LinkTarget::Junction(id) if self.junctions.contains_key(&id) => Ok(()),
            LinkTarget::Junction(id) => Err(RoadError::JunctionNotFound(id)),
        }
    }
}
