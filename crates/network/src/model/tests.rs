use super::*;

fn driving_section(lanes_per_side: usize) -> LaneSection {
    LaneSection::symmetric(0.0, &vec![LaneType::Driving; lanes_per_side])
}

#[test]
fn test_symmetric_section_ids() {
    let section = driving_section(3);
    let ids: Vec<i32> = section.lanes.keys().copied().collect();
    assert_eq!(ids, vec![-3, -2, -1, 0, 1, 2, 3]);
    assert_eq!(section.lane_count(LaneSide::Left), 3);
    assert_eq!(section.lane_count(LaneSide::Right), 3);
    assert_eq!(section.lane_count(LaneSide::Center), 1);
}

#[test]
fn test_lanes_ordered_center_outward() {
    let section = driving_section(2);
    let left: Vec<i32> = section.left_lanes().iter().map(|l| l.id).collect();
    let right: Vec<i32> = section.right_lanes().iter().map(|l| l.id).collect();
    assert_eq!(left, vec![1, 2]);
    assert_eq!(right, vec![-1, -2]);
}

#[test]
fn test_default_travel_direction_follows_side() {
    let section = driving_section(1);
    assert_eq!(section.lane(-1).unwrap().direction, TravelDirection::Forward);
    assert_eq!(section.lane(1).unwrap().direction, TravelDirection::Backward);
    assert_eq!(section.lane(0).unwrap().direction, TravelDirection::Undirected);
}

#[test]
fn test_lane_order_detects_tampered_ids() {
    let mut section = driving_section(2);
    assert!(section.are_left_lanes_in_order());
    assert!(section.are_right_lanes_in_order());

    section.lane_mut(2).unwrap().id = 1;
    assert!(!section.are_left_lanes_in_order());
    assert!(section.are_right_lanes_in_order());
}

#[test]
fn test_remove_lane_closes_gap() {
    let mut section = driving_section(3);
    let removed = section.remove_lane(-2).expect("lane exists");
    assert_eq!(removed.id, -2);
    let right: Vec<i32> = section.right_lanes().iter().map(|l| l.id).collect();
    assert_eq!(right, vec![-1, -2]);
    assert!(section.are_right_lanes_in_order());
    assert!(section.remove_lane(0).is_none());
}

#[test]
fn test_default_width_table() {
    assert_eq!(LaneType::Driving.default_width(), 3.6);
    assert_eq!(LaneType::Parking.default_width(), 5.5);
    assert_eq!(LaneType::Sidewalk.default_width(), 2.0);
    assert_eq!(LaneType::Biking.default_width(), 2.0);
    assert_eq!(LaneType::Stop.default_width(), 2.0);
    assert_eq!(LaneType::Shoulder.default_width(), 0.5);
    assert_eq!(LaneType::Border.default_width(), 0.5);
    assert_eq!(LaneType::Median.default_width(), 1.0);
    assert_eq!(LaneType::Curb.default_width(), 1.0);
}

#[test]
fn test_lane_type_names_roundtrip() {
    for lane_type in LaneType::ALL {
        assert_eq!(LaneType::parse(lane_type.as_str()), Some(lane_type));
    }
    assert_eq!(LaneType::parse("hovercraft"), None);
}

#[test]
fn test_road_section_lengths_follow_road_length() {
    let mut road = Road::new(RoadId(1), CurveId(0), 100.0, driving_section(1));
    road.sections.push(LaneSection::symmetric(40.0, &[LaneType::Driving]));
    road.sync_section_lengths();
    assert_eq!(road.sections[0].length, 40.0);
    assert_eq!(road.sections[1].length, 60.0);
    assert!((road.sections_span() - road.length).abs() < 1e-4);

    road.resize(30.0).unwrap();
    assert_eq!(road.sections.len(), 1, "section past the end is dropped");
    assert_eq!(road.sections[0].length, 30.0);
}

#[test]
fn test_boundary_section_selection() {
    let mut road = Road::new(RoadId(1), CurveId(0), 50.0, driving_section(1));
    road.sections.push(LaneSection::symmetric(25.0, &[LaneType::Driving; 2]));
    road.sync_section_lengths();
    assert_eq!(road.boundary_section(ContactPoint::Start).unwrap().s, 0.0);
    assert_eq!(road.boundary_section(ContactPoint::End).unwrap().s, 25.0);
    assert_eq!(road.section_index_at(10.0), Some(0));
    assert_eq!(road.section_index_at(25.0), Some(1));
}

#[test]
fn test_split_tail_preserves_total_length() {
    let mut road = Road::new(RoadId(1), CurveId(0), 80.0, driving_section(2));
    road.sections.push(LaneSection::symmetric(50.0, &[LaneType::Driving]));
    road.sync_section_lengths();

    let tail = road.split_tail(30.0);
    assert_eq!(road.length, 30.0);
    assert_eq!(tail.length, 50.0);
    assert_eq!(tail.sections.len(), 2);
    assert_eq!(tail.sections[0].s, 0.0);
    assert_eq!(tail.sections[1].s, 20.0);
    assert_eq!(road.sections.len(), 1);
}

#[test]
fn test_next_connection_id_fills_gaps() {
    let mut junction = Junction::new(JunctionId(0), true);
    assert_eq!(junction.next_connection_id(), ConnectionId(0));
    for id in [0, 1, 3] {
        junction.connections.insert(
            ConnectionId(id),
            JunctionConnection {
                id: ConnectionId(id),
                incoming_road: RoadId(1),
                incoming_contact: ContactPoint::End,
                connecting_road: RoadId(10 + id),
                outgoing_road: RoadId(2),
                outgoing_contact: ContactPoint::Start,
                lane_links: Vec::new(),
                turn: TurnType::Straight,
                is_corner_connection: false,
            },
        );
    }
    assert_eq!(junction.next_connection_id(), ConnectionId(2));
}

#[test]
fn test_contact_point_helpers() {
    assert_eq!(ContactPoint::Start.opposite(), ContactPoint::End);
    assert_eq!(ContactPoint::End.boundary_s(12.0), 12.0);
    assert_eq!(ContactPoint::Start.boundary_s(12.0), 0.0);
    assert!(is_facing(ContactPoint::End, ContactPoint::End));
    assert!(!is_facing(ContactPoint::End, ContactPoint::Start));
}
