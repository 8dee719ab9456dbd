use bevy::prelude::*;

use super::arena::CurveArena;
use super::curve::SegmentOwner;
use crate::model::{ContactPoint, Road};

/// Road-local coordinate: `s` along the reference line, `t` to its left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadCoord {
    pub s: f32,
    pub t: f32,
}

/// Coordinate queries the engine needs from the geometry layer.
pub trait RoadGeometry {
    /// World position of `(s, t)` on `road`; `z` is the road elevation.
    fn world_position_at(&self, road: &Road, s: f32, t: f32) -> Option<Vec3>;

    /// Heading of the reference line at `s`, radians CCW from +X.
    fn heading_at(&self, road: &Road, s: f32) -> Option<f32>;

    fn road_coord_at(&self, road: &Road, position: Vec2) -> Option<RoadCoord>;

    /// Length of the reference-line range the road occupies.
    fn reference_length(&self, road: &Road) -> Option<f32>;

    /// Planar position of a road boundary on its reference line.
    fn boundary_point(&self, road: &Road, contact: ContactPoint) -> Option<Vec2> {
        self.world_position_at(road, contact.boundary_s(road.length), 0.0)
            .map(|p| p.truncate())
    }

    /// Heading of travel *out of* the road through `contact`.
    fn outward_heading(&self, road: &Road, contact: ContactPoint) -> Option<f32> {
        let heading = self.heading_at(road, contact.boundary_s(road.length))?;
        Some(match contact {
            ContactPoint::End => heading,
            ContactPoint::Start => wrap_angle(heading + std::f32::consts::PI),
        })
    }
}

/// Wrap an angle to `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

impl RoadGeometry for CurveArena {
    fn world_position_at(&self, road: &Road, s: f32, t: f32) -> Option<Vec3> {
        let curve = self.get(road.curve)?;
        let (start, _) = curve.range_of(SegmentOwner::Road(road.id))?;
        let s = s.clamp(0.0, road.length);
        let point = curve.position_at(start + s)?;
        let dir = curve.direction_at(start + s)?;
        let planar = point + dir.perp() * t;
        Some(planar.extend(road.elevation.evaluate(s)))
    }

    fn heading_at(&self, road: &Road, s: f32) -> Option<f32> {
        let curve = self.get(road.curve)?;
        let (start, _) = curve.range_of(SegmentOwner::Road(road.id))?;
        curve.heading_at(start + s.clamp(0.0, road.length))
    }

    fn road_coord_at(&self, road: &Road, position: Vec2) -> Option<RoadCoord> {
        let curve = self.get(road.curve)?;
        let (start, end) = curve.range_of(SegmentOwner::Road(road.id))?;
        let (s, t) = curve.project(position, start, end)?;
        Some(RoadCoord { s: s - start, t })
    }

    fn reference_length(&self, road: &Road) -> Option<f32> {
        let curve = self.get(road.curve)?;
        if curve.is_degenerate() {
            return None;
        }
        curve
            .range_of(SegmentOwner::Road(road.id))
            .map(|(start, end)| end - start)
    }
}
