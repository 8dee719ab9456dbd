use bevy::prelude::*;
use network::link_graph::{LinkTarget, RoadEnd};
use network::model::{
    ContactPoint, JunctionId, LaneSide, LaneType, Road, RoadId, TravelDirection,
};
use network::reference_curve::SegmentOwner;
use network::{EngineParams, RoadMap, RoadSpec};

use super::*;
use crate::save_error::SaveError;

fn sample_map() -> RoadMap {
    let mut map = RoadMap::new(EngineParams {
        validate_after_mutation: true,
        ..Default::default()
    });
    let a = map
        .create_road(
            RoadSpec::straight(Vec2::ZERO, Vec2::new(50.0, 0.0)).with_name("Harbour & Main"),
        )
        .expect("a");
    map.create_road(
        RoadSpec::new(vec![
            Vec2::new(50.0, 0.0),
            Vec2::new(70.0, 5.0),
            Vec2::new(85.0, 30.0),
        ])
        .with_predecessor(LinkTarget::Road(RoadEnd::end(a))),
    )
    .expect("b");
    map.create_lane(a, 0, LaneSide::Left, LaneType::Parking)
        .expect("parking");
    map.add_lane_section(a, 20.0).expect("section");

    let x = map
        .create_road(RoadSpec::straight(
            Vec2::new(-60.0, 150.0),
            Vec2::new(60.0, 150.0),
        ))
        .expect("x");
    let y = map
        .create_road(RoadSpec::straight(
            Vec2::new(0.0, 90.0),
            Vec2::new(0.0, 210.0),
        ))
        .expect("y");
    map.create_crossing_junction(x, y).expect("crossing");
    map.take_changed();
    map
}

fn assert_roads_match(expected: &Road, actual: &Road) {
    assert_eq!(actual.name, expected.name);
    assert_eq!(actual.length, expected.length, "road {}", expected.id);
    assert_eq!(actual.junction, expected.junction);
    assert_eq!(actual.curve, expected.curve);
    assert_eq!(actual.elevation.records(), expected.elevation.records());
    assert_eq!(actual.superelevation.records(), expected.superelevation.records());
    assert_eq!(actual.lane_offset.records(), expected.lane_offset.records());
    assert_eq!(actual.sections.len(), expected.sections.len());
    for (want, got) in expected.sections.iter().zip(&actual.sections) {
        assert_eq!(got.s, want.s);
        assert_eq!(got.length, want.length);
        let want_ids: Vec<i32> = want.lanes.keys().copied().collect();
        let got_ids: Vec<i32> = got.lanes.keys().copied().collect();
        assert_eq!(got_ids, want_ids, "road {} section {}", expected.id, want.s);
        for (id, lane) in &want.lanes {
            let other = &got.lanes[id];
            assert_eq!(other.lane_type, lane.lane_type);
            assert_eq!(other.direction, lane.direction);
            assert_eq!(other.predecessor, lane.predecessor);
            assert_eq!(other.successor, lane.successor);
            assert_eq!(other.width.records(), lane.width.records());
            assert_eq!(other.road_marks, lane.road_marks);
            assert_eq!(other.heights, lane.heights);
        }
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn test_export_uses_opendrive_vocabulary() {
    let map = sample_map();
    let xml = export_xodr(&map);

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<OpenDRIVE>"));
    assert!(xml.contains("<header revMajor=\"1\" revMinor=\"6\""));
    assert!(xml.contains("elementType=\"road\" elementId=\"0\" contactPoint=\"end\""));
    assert!(xml.contains("elementType=\"junction\""));
    assert!(xml.contains("<laneSection s=\"20\">"));
    assert!(xml.contains("<width sOffset=\"0\""));
    assert!(xml.contains("type=\"parking\""));
    assert!(xml.contains("<connection id=\"0\""));
    assert!(xml.contains("<laneLink from="));
    assert!(xml.contains("<line/>"));
    assert_eq!(
        xml.matches("<road ").count(),
        map.road_count(),
        "one <road> per road"
    );
}

#[test]
fn test_export_escapes_names() {
    let xml = export_xodr(&sample_map());
    assert!(xml.contains("name=\"Harbour &amp; Main\""), "{xml}");
    assert!(!xml.contains("Harbour & Main"));
}

#[test]
fn test_left_lanes_are_written_outermost_first() {
    let mut map = RoadMap::new(EngineParams::default());
    map.create_road(RoadSpec::straight(Vec2::ZERO, Vec2::new(30.0, 0.0)))
        .expect("road");
    let xml = export_xodr(&map);
    let three = xml.find("<lane id=\"3\"").expect("lane 3");
    let one = xml.find("<lane id=\"1\"").expect("lane 1");
    let minus_one = xml.find("<lane id=\"-1\"").expect("lane -1");
    let minus_three = xml.find("<lane id=\"-3\"").expect("lane -3");
    assert!(three < one);
    assert!(one < minus_one);
    assert!(minus_one < minus_three);
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn test_export_import_roundtrip() {
    let map = sample_map();
    let imported = import_xodr(&export_xodr(&map)).expect("import");

    assert_eq!(imported.road_count(), map.road_count());
    for road in map.roads() {
        let other = imported.road(road.id).expect("road survives");
        assert_roads_match(road, other);
        for contact in [ContactPoint::Start, ContactPoint::End] {
            let end = RoadEnd::new(road.id, contact);
            assert_eq!(imported.link_target(end), map.link_target(end), "{end:?}");
        }
    }
    for junction in map.junctions() {
        assert_eq!(imported.junction(junction.id), Some(junction));
    }
    for curve in map.curves().iter() {
        let other = imported.curve(curve.id).expect("curve survives");
        assert_eq!(other.points(), curve.points());
        assert_eq!(other.segments(), curve.segments());
    }
    assert_eq!(imported.params(), map.params());
    assert_eq!(imported.validate_all(), map.validate_all());
}

#[test]
fn test_imported_map_accepts_edits() {
    let map = sample_map();
    let mut imported = import_xodr(&export_xodr(&map)).expect("import");
    let next = imported
        .create_road(RoadSpec::straight(
            Vec2::new(0.0, -40.0),
            Vec2::new(30.0, -40.0),
        ))
        .expect("create");
    assert!(map.road(next).is_none());
    imported.split_road(RoadId(0), 10.0).expect("split");
    let head = imported.road(RoadId(0)).expect("head");
    assert!((head.length - 10.0).abs() < 1e-3, "{}", head.length);
}

// ---------------------------------------------------------------------------
// Files written by other tools
// ---------------------------------------------------------------------------

const FOREIGN: &str = r#"<?xml version="1.0" standalone="yes"?>
<OpenDRIVE>
  <header revMajor="1" revMinor="4" name="two roads"/>
  <road name="West" length="100" id="1" junction="-1">
    <link>
      <successor elementType="road" elementId="2" contactPoint="start"/>
    </link>
    <planView>
      <geometry s="0" x="0" y="0" hdg="0" length="100"><line/></geometry>
    </planView>
    <lanes>
      <laneSection s="0">
        <left>
          <lane id="1" type="driving" level="false">
            <link><successor id="1"/></link>
            <width sOffset="0" a="3.5" b="0" c="0" d="0"/>
          </lane>
        </left>
        <center><lane id="0" type="none" level="false"/></center>
        <right>
          <lane id="-1" type="driving" level="false">
            <link><successor id="-1"/></link>
            <width sOffset="0" a="3.5" b="0" c="0" d="0"/>
          </lane>
          <lane id="-2" type="sidewalk" level="false">
            <width sOffset="0" a="2" b="0" c="0" d="0"/>
            <roadMark sOffset="0" type="solid" width="0.12"/>
          </lane>
        </right>
      </laneSection>
    </lanes>
  </road>
  <road name="East" length="50" id="2" junction="-1">
    <link>
      <predecessor elementType="road" elementId="1" contactPoint="end"/>
    </link>
    <planView>
      <geometry s="0" x="100" y="0" hdg="0" length="50"><line/></geometry>
    </planView>
    <elevationProfile>
      <elevation s="0" a="1.5" b="0" c="0" d="0"/>
    </elevationProfile>
    <lanes>
      <laneSection s="0">
        <left>
          <lane id="1" type="driving" level="false">
            <link><predecessor id="1"/></link>
            <width sOffset="0" a="3.5" b="0" c="0" d="0"/>
          </lane>
        </left>
        <right>
          <lane id="-1" type="driving" level="false">
            <link><predecessor id="-1"/></link>
            <width sOffset="0" a="3.5" b="0" c="0" d="0"/>
          </lane>
        </right>
      </laneSection>
    </lanes>
  </road>
</OpenDRIVE>
"#;

#[test]
fn test_foreign_file_builds_curves_from_plan_view() {
    let map = import_xodr(FOREIGN).expect("import");
    assert_eq!(map.road_count(), 2);
    assert_eq!(map.curves().len(), 2);

    let west = map.road(RoadId(1)).expect("west");
    let east = map.road(RoadId(2)).expect("east");
    assert_eq!(west.name, "West");
    assert_ne!(west.curve, east.curve);
    assert_eq!(
        map.link_target(RoadEnd::end(RoadId(1))),
        Some(LinkTarget::Road(RoadEnd::start(RoadId(2))))
    );
    assert_eq!(
        map.link_target(RoadEnd::start(RoadId(2))),
        Some(LinkTarget::Road(RoadEnd::end(RoadId(1))))
    );

    let sidewalk = west.sections[0].lane(-2).expect("sidewalk");
    assert_eq!(sidewalk.lane_type, LaneType::Sidewalk);
    assert_eq!(sidewalk.direction, TravelDirection::Forward);
    assert_eq!(sidewalk.road_marks.len(), 1);
    assert!((sidewalk.width_at(0.0) - 2.0).abs() < 1e-6);
    assert_eq!(
        west.sections[0].lane(1).map(|l| l.direction),
        Some(TravelDirection::Backward)
    );
    // A missing <center> still yields the reference lane.
    assert!(east.sections[0].lane(0).is_some());
    assert!((east.elevation.evaluate(0.0) - 1.5).abs() < 1e-6);

    assert!(map.validate_all().is_empty(), "{:?}", map.validate_all());
}

#[test]
fn test_foreign_file_uses_default_params() {
    let map = import_xodr(FOREIGN).expect("import");
    assert_eq!(map.params(), &EngineParams::default());
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_malformed_xml_is_an_xml_error() {
    assert!(matches!(
        import_xodr("<OpenDRIVE><road>"),
        Err(SaveError::Xml(_))
    ));
}

#[test]
fn test_wrong_root_is_rejected() {
    let err = import_xodr("<osm version=\"0.6\"/>").map(|m| m.road_count()).unwrap_err();
    assert!(matches!(err, SaveError::OpenDrive(_)));
    assert!(format!("{err}").contains("osm"), "{err}");
}

#[test]
fn test_non_numeric_road_id_is_rejected() {
    let xml = r#"<OpenDRIVE><road id="west" length="10"/></OpenDRIVE>"#;
    let err = import_xodr(xml).map(|m| m.road_count()).unwrap_err();
    assert!(format!("{err}").contains("invalid id"), "{err}");
}

#[test]
fn test_road_without_geometry_is_rejected() {
    let xml = r#"<OpenDRIVE><road id="4" length="10"/></OpenDRIVE>"#;
    let err = import_xodr(xml).map(|m| m.road_count()).unwrap_err();
    assert!(format!("{err}").contains("road 4"), "{err}");
}

#[test]
fn test_duplicate_road_ids_are_rejected() {
    let xml = r#"<OpenDRIVE>
        <road id="4" length="10"><planView><geometry x="0" y="0" hdg="0" length="10"><line/></geometry></planView></road>
        <road id="4" length="10"><planView><geometry x="0" y="5" hdg="0" length="10"><line/></geometry></planView></road>
    </OpenDRIVE>"#;
    let err = import_xodr(xml).map(|m| m.road_count()).unwrap_err();
    assert!(format!("{err}").contains("used twice"), "{err}");
}

#[test]
fn test_segment_owner_vocabulary() {
    for owner in [
        SegmentOwner::Road(RoadId(7)),
        SegmentOwner::Junction(JunctionId(2)),
        SegmentOwner::Unused,
    ] {
        assert_eq!(parse_owner(&owner_str(owner)), Some(owner));
    }
    assert_eq!(parse_owner("lane:3"), None);
    assert_eq!(parse_owner("road:x"), None);
}
