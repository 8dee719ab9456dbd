use std::collections::BTreeMap;

use bevy::prelude::*;

use super::curve::{ReferenceCurve, SegmentOwner};
use crate::model::{CurveId, RoadId};

/// Arena of shared reference curves. Roads hold a [`CurveId`] and own a
/// sub-range of the curve through its segment map.
#[derive(Debug, Clone, Default)]
pub struct CurveArena {
    curves: BTreeMap<CurveId, ReferenceCurve>,
    next_id: u32,
}

impl CurveArena {
    pub fn insert(&mut self, points: Vec<Vec2>) -> CurveId {
        let id = CurveId(self.next_id);
        self.next_id += 1;
        self.curves.insert(id, ReferenceCurve::new(id, points));
        id
    }

    /// Insert a curve carrying its own id (loading). Replaces any curve with
    /// the same id.
    pub fn insert_curve(&mut self, curve: ReferenceCurve) {
        self.next_id = self.next_id.max(curve.id.0 + 1);
        self.curves.insert(curve.id, curve);
    }

    pub fn get(&self, id: CurveId) -> Option<&ReferenceCurve> {
        self.curves.get(&id)
    }

    pub fn get_mut(&mut self, id: CurveId) -> Option<&mut ReferenceCurve> {
        self.curves.get_mut(&id)
    }

    pub fn remove(&mut self, id: CurveId) -> Option<ReferenceCurve> {
        self.curves.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceCurve> {
        self.curves.values()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn segment_range(&self, curve: CurveId, road: RoadId) -> Option<(f32, f32)> {
        self.get(curve)?.range_of(SegmentOwner::Road(road))
    }

    pub fn roads_on(&self, curve: CurveId) -> Vec<RoadId> {
        self.get(curve).map(|c| c.roads()).unwrap_or_default()
    }

    /// Mark the road's span unused; drop the curve once no road uses it.
    /// Returns true when the curve was removed.
    pub fn release(&mut self, curve: CurveId, road: RoadId) -> bool {
        let Some(c) = self.curves.get_mut(&curve) else {
            return false;
        };
        c.release(SegmentOwner::Road(road));
        if c.roads().is_empty() {
            self.curves.remove(&curve);
            return true;
        }
        false
    }
}
