use bevy::prelude::*;

use super::*;
use crate::cubic_profile::CubicProfile;
use crate::engine_params::EngineParams;
use crate::road_map::RoadSpec;

fn quiet_map() -> RoadMap {
    RoadMap::new(EngineParams {
        validate_after_mutation: false,
        ..Default::default()
    })
}

/// A -> B -> C along +X, 50 m each.
fn chain() -> (RoadMap, RoadId, RoadId, RoadId) {
    let mut map = quiet_map();
    let a = map
        .create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(50.0, 0.0)))
        .expect("a");
    let b = map
        .create_road(
            RoadSpec::straight(Vec2::new(50.0, 0.0), Vec2::new(100.0, 0.0))
                .with_predecessor(LinkTarget::Road(RoadEnd::end(a))),
        )
        .expect("b");
    let c = map
        .create_road(
            RoadSpec::straight(Vec2::new(100.0, 0.0), Vec2::new(150.0, 0.0))
                .with_predecessor(LinkTarget::Road(RoadEnd::end(b))),
        )
        .expect("c");
    (map, a, b, c)
}

fn set_profile(map: &mut RoadMap, road: RoadId, kind: ProfileKind, value: f32) {
    if let Some(target) = map.road_mut(road) {
        *target.profile_mut(kind) = CubicProfile::constant(value);
    }
}

fn profile_at(map: &RoadMap, road: RoadId, kind: ProfileKind, s: f32) -> f32 {
    map.road(road).expect("road").profile(kind).evaluate(s)
}

// ---------------------------------------------------------------------------
// Profile propagation
// ---------------------------------------------------------------------------

#[test]
fn test_profile_propagation_is_one_hop() {
    let (mut map, a, b, c) = chain();
    set_profile(&mut map, a, ProfileKind::Elevation, 4.0);

    propagate_profile(&mut map, a, ProfileKind::Elevation).expect("propagate");

    assert!((profile_at(&map, a, ProfileKind::Elevation, 50.0) - 4.0).abs() < 1e-4);
    assert!((profile_at(&map, b, ProfileKind::Elevation, 0.0) - 4.0).abs() < 1e-4);
    // B's far end keeps its own value, so C sees nothing.
    assert!(profile_at(&map, b, ProfileKind::Elevation, 50.0).abs() < 1e-4);
    assert!(profile_at(&map, c, ProfileKind::Elevation, 0.0).abs() < 1e-4);
}

#[test]
fn test_propagated_profile_is_smooth_at_the_boundary() {
    let (mut map, a, b, _) = chain();
    set_profile(&mut map, a, ProfileKind::Elevation, 2.0);
    propagate_profile(&mut map, a, ProfileKind::Elevation).expect("propagate");

    let road_b = map.road(b).expect("b");
    assert!(road_b.elevation.slope(0.0).abs() < 1e-4);
    assert!(road_b.elevation.slope(road_b.length).abs() < 1e-4);
    let mid = road_b.elevation.evaluate(25.0);
    assert!(mid > 0.0 && mid < 2.0, "mid value {mid}");
}

#[test]
fn test_facing_roads_flip_superelevation_only() {
    let mut map = quiet_map();
    let a = map
        .create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(50.0, 0.0)))
        .expect("a");
    let b = map
        .create_road(
            RoadSpec::straight(Vec2::new(100.0, 0.0), Vec2::new(50.0, 0.0))
                .with_successor(LinkTarget::Road(RoadEnd::end(a))),
        )
        .expect("b");
    set_profile(&mut map, a, ProfileKind::SuperElevation, 0.05);
    set_profile(&mut map, a, ProfileKind::Elevation, 3.0);

    propagate_road(&mut map, a).expect("propagate");

    let length = map.road(b).expect("b").length;
    assert!((profile_at(&map, b, ProfileKind::SuperElevation, length) + 0.05).abs() < 1e-5);
    assert!((profile_at(&map, b, ProfileKind::Elevation, length) - 3.0).abs() < 1e-4);
}

#[test]
fn test_failing_neighbor_keeps_its_state() {
    let (mut map, a, b, _) = chain();
    let before = map.road(b).expect("b").elevation.clone();
    if let Some(road) = map.road_mut(b) {
        road.length = 0.0;
    }
    set_profile(&mut map, a, ProfileKind::Elevation, 7.0);

    propagate_profile(&mut map, a, ProfileKind::Elevation)
        .expect("the edited road itself still succeeds");

    assert_eq!(map.road(b).expect("b").elevation, before);
    assert!((profile_at(&map, a, ProfileKind::Elevation, 0.0) - 7.0).abs() < 1e-4);
}

#[test]
fn test_unlinked_road_only_reanchors_itself() {
    let mut map = quiet_map();
    let a = map
        .create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(30.0, 0.0)))
        .expect("a");
    set_profile(&mut map, a, ProfileKind::LaneOffset, 1.5);
    propagate_profile(&mut map, a, ProfileKind::LaneOffset).expect("propagate");

    let road = map.road(a).expect("a");
    assert_eq!(road.lane_offset.len(), 2);
    assert!((road.lane_offset.evaluate(30.0) - 1.5).abs() < 1e-4);
}

// ---------------------------------------------------------------------------
// Lanes
// ---------------------------------------------------------------------------

#[test]
fn test_unlinked_end_clears_lane_links() {
    let (mut map, a, b, _) = chain();
    assert_eq!(
        map.road(a).and_then(|r| r.sections[0].lane(-1)).and_then(|l| l.successor),
        Some(-1)
    );
    map.links.unlink(RoadEnd::end(a));
    propagate_lanes(&mut map, a).expect("lanes");

    let road = map.road(a).expect("a");
    assert!(road.sections[0]
        .non_center_lanes()
        .all(|lane| lane.successor.is_none()));
    // The other side is only cleared once it is propagated itself.
    assert_eq!(
        map.road(b).and_then(|r| r.sections[0].lane(-1)).and_then(|l| l.predecessor),
        Some(-1)
    );
}

#[test]
fn test_lane_widths_follow_across_link() {
    let (mut map, a, b, _) = chain();
    if let Some(lane) = map
        .road_mut(a)
        .and_then(|r| r.sections[0].lane_mut(2))
    {
        lane.width = CubicProfile::constant(4.25);
    }
    propagate_lanes(&mut map, a).expect("lanes");
    let lane = map.road(b).and_then(|r| r.sections[0].lane(2)).expect("lane");
    assert!((lane.width_at(0.0) - 4.25).abs() < 1e-4);
}

// ---------------------------------------------------------------------------
// Curve batch recompute
// ---------------------------------------------------------------------------

#[test]
fn test_recompute_unknown_curve() {
    let mut map = quiet_map();
    assert_eq!(
        recompute_curve(&mut map, CurveId(3)),
        Err(RoadError::CurveNotFound(CurveId(3)))
    );
}

#[test]
fn test_recompute_degenerate_curve_is_a_no_op() {
    let mut map = quiet_map();
    let a = map
        .create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(40.0, 0.0)))
        .expect("a");
    let curve = map.road(a).expect("a").curve;
    if let Some(reference) = map.curve_mut(curve) {
        reference.set_points(vec![Vec2::ZERO]);
    }
    let affected = recompute_curve(&mut map, curve).expect("no error");
    assert!(affected.is_empty());
    assert!((map.road(a).expect("a").length - 40.0).abs() < 1e-3);
}

#[test]
fn test_recompute_resizes_roads_on_curve() {
    let mut map = quiet_map();
    let a = map
        .create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(40.0, 0.0)))
        .expect("a");
    let curve = map.road(a).expect("a").curve;
    if let Some(reference) = map.curve_mut(curve) {
        reference.move_control_point(1, Vec2::new(80.0, 0.0));
    }
    let affected = recompute_curve(&mut map, curve).expect("recompute");
    assert_eq!(affected, vec![a]);
    let road = map.road(a).expect("a");
    assert!((road.length - 80.0).abs() < 1e-2);
    assert!((road.sections_span() - road.length).abs() < 1e-3);
    assert!(map.take_changed().contains(&a));
}
