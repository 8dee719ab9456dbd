use bevy::prelude::*;

use super::*;
use crate::model::{CurveId, JunctionId, LaneSection, LaneType, Road, RoadId};

fn straight(length: f32) -> ReferenceCurve {
    ReferenceCurve::new(CurveId(0), vec![Vec2::ZERO, Vec2::new(length, 0.0)])
}

#[test]
fn test_straight_curve_length_and_positions() {
    let curve = straight(100.0);
    assert!((curve.length() - 100.0).abs() < 1e-3);
    let mid = curve.position_at(40.0).unwrap();
    assert!((mid - Vec2::new(40.0, 0.0)).length() < 1e-3);
    assert!(curve.heading_at(10.0).unwrap().abs() < 1e-5);
}

#[test]
fn test_catmull_rom_passes_through_control_points() {
    let points = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(50.0, 10.0),
        Vec2::new(100.0, 0.0),
    ];
    let curve = ReferenceCurve::new(CurveId(1), points.clone());
    let start = curve.position_at(0.0).unwrap();
    let end = curve.position_at(curve.length()).unwrap();
    assert!((start - points[0]).length() < 1e-3);
    assert!((end - points[2]).length() < 1e-2);
    // Longer than the straight chord.
    assert!(curve.length() > 100.0);
}

#[test]
fn test_degenerate_curve_has_no_positions() {
    let curve = ReferenceCurve::new(CurveId(0), vec![Vec2::ZERO]);
    assert!(curve.is_degenerate());
    assert_eq!(curve.length(), 0.0);
    assert!(curve.position_at(0.0).is_none());
}

#[test]
fn test_assign_splits_segment_map() {
    let mut curve = straight(100.0);
    curve.assign(0.0, 100.0, SegmentOwner::Road(RoadId(1)));
    assert_eq!(curve.segments().len(), 1);

    curve.assign(40.0, 60.0, SegmentOwner::Junction(JunctionId(0)));
    curve.assign(60.0, 100.0, SegmentOwner::Road(RoadId(2)));
    assert_eq!(curve.range_of(SegmentOwner::Road(RoadId(1))), Some((0.0, 40.0)));
    assert_eq!(
        curve.range_of(SegmentOwner::Junction(JunctionId(0))),
        Some((40.0, 60.0))
    );
    let (_, end) = curve.range_of(SegmentOwner::Road(RoadId(2))).unwrap();
    assert!((end - 100.0).abs() < 1e-3);
    assert_eq!(curve.roads(), vec![RoadId(1), RoadId(2)]);
}

#[test]
fn test_reassign_merges_adjacent_ranges() {
    let mut curve = straight(100.0);
    curve.assign(0.0, 50.0, SegmentOwner::Road(RoadId(1)));
    curve.assign(50.0, 100.0, SegmentOwner::Road(RoadId(2)));
    curve.reassign(SegmentOwner::Road(RoadId(2)), SegmentOwner::Road(RoadId(1)));
    assert_eq!(curve.segments().len(), 1);
    let (start, end) = curve.range_of(SegmentOwner::Road(RoadId(1))).unwrap();
    assert_eq!(start, 0.0);
    assert!((end - 100.0).abs() < 1e-3);
}

#[test]
fn test_neighbors_follow_curve_order() {
    let mut curve = straight(90.0);
    curve.assign(0.0, 30.0, SegmentOwner::Road(RoadId(1)));
    curve.assign(30.0, 60.0, SegmentOwner::Road(RoadId(2)));
    curve.assign(60.0, 90.0, SegmentOwner::Road(RoadId(3)));
    let (before, after) = curve.neighbors_of(SegmentOwner::Road(RoadId(2)));
    assert_eq!(before, Some(SegmentOwner::Road(RoadId(1))));
    assert_eq!(after, Some(SegmentOwner::Road(RoadId(3))));
}

#[test]
fn test_segments_stretch_with_control_point_edit() {
    let mut curve = straight(100.0);
    curve.assign(0.0, 50.0, SegmentOwner::Road(RoadId(1)));
    curve.assign(50.0, 100.0, SegmentOwner::Road(RoadId(2)));
    assert!(curve.move_control_point(1, Vec2::new(200.0, 0.0)));
    let (start, end) = curve.range_of(SegmentOwner::Road(RoadId(2))).unwrap();
    assert!((start - 100.0).abs() < 1e-2, "start {start}");
    assert!((end - 200.0).abs() < 1e-2, "end {end}");
    assert!(!curve.move_control_point(7, Vec2::ZERO));
}

#[test]
fn test_project_signed_offset() {
    let curve = straight(100.0);
    let (s, t) = curve.project(Vec2::new(30.0, 2.0), 0.0, 100.0).unwrap();
    assert!((s - 30.0).abs() < 1e-2);
    assert!((t - 2.0).abs() < 1e-3);
    let (_, t) = curve.project(Vec2::new(30.0, -3.0), 0.0, 100.0).unwrap();
    assert!((t + 3.0).abs() < 1e-3);
}

#[test]
fn test_arena_release_removes_unused_curve() {
    let mut arena = CurveArena::default();
    let id = arena.insert(vec![Vec2::ZERO, Vec2::new(10.0, 0.0)]);
    let curve = arena.get_mut(id).unwrap();
    curve.assign(0.0, 5.0, SegmentOwner::Road(RoadId(1)));
    curve.assign(5.0, 10.0, SegmentOwner::Road(RoadId(2)));

    assert!(!arena.release(id, RoadId(1)));
    assert_eq!(arena.roads_on(id), vec![RoadId(2)]);
    assert!(arena.release(id, RoadId(2)));
    assert!(arena.get(id).is_none());
}

#[test]
fn test_geometry_queries_use_road_sub_range() {
    let mut arena = CurveArena::default();
    let id = arena.insert(vec![Vec2::ZERO, Vec2::new(100.0, 0.0)]);
    let curve = arena.get_mut(id).unwrap();
    curve.assign(0.0, 60.0, SegmentOwner::Road(RoadId(1)));
    curve.assign(60.0, 100.0, SegmentOwner::Road(RoadId(2)));

    let section = LaneSection::symmetric(0.0, &[LaneType::Driving]);
    let road = Road::new(RoadId(2), id, 40.0, section);
    let p = arena.world_position_at(&road, 10.0, 1.5).unwrap();
    assert!((p - Vec3::new(70.0, 1.5, 0.0)).length() < 1e-3);

    let coord = arena.road_coord_at(&road, Vec2::new(80.0, -1.0)).unwrap();
    assert!((coord.s - 20.0).abs() < 1e-2);
    assert!((coord.t + 1.0).abs() < 1e-3);

    let start = arena.boundary_point(&road, crate::model::ContactPoint::Start).unwrap();
    assert!((start - Vec2::new(60.0, 0.0)).length() < 1e-3);
}

#[test]
fn test_wrap_angle_range() {
    use std::f32::consts::PI;
    assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
    assert!((wrap_angle(-PI) - PI).abs() < 1e-5);
    assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
}
