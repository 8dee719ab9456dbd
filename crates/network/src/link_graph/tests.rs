use super::*;
use crate::model::{ContactPoint, JunctionId, RoadId};

#[test]
fn test_link_is_visible_from_both_ends() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));

    assert_eq!(
        graph.successor(RoadId(1)),
        Some(LinkTarget::Road(RoadEnd::start(RoadId(2))))
    );
    assert_eq!(
        graph.predecessor(RoadId(2)),
        Some(LinkTarget::Road(RoadEnd::end(RoadId(1))))
    );
    assert!(graph.is_symmetric());
}

#[test]
fn test_unlink_clears_both_sides() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));
    let removed = graph.unlink(RoadEnd::start(RoadId(2)));
    assert!(removed.is_some());
    assert!(graph.successor(RoadId(1)).is_none());
    assert!(graph.predecessor(RoadId(2)).is_none());
    assert!(graph.is_empty());
}

#[test]
fn test_relinking_replaces_previous_edge() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(3))));

    assert!(graph.predecessor(RoadId(2)).is_none(), "old partner cleared");
    assert_eq!(graph.len(), 1);
    assert!(graph.is_symmetric());
}

#[test]
fn test_one_way_edge_only_visible_from_source() {
    let mut graph = LinkGraph::default();
    let junction = JunctionId(0);
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Junction(junction));
    graph.link_one_way(
        RoadEnd::start(RoadId(10)),
        LinkTarget::Road(RoadEnd::end(RoadId(1))),
    );

    assert_eq!(
        graph.successor(RoadId(1)),
        Some(LinkTarget::Junction(junction)),
        "outer road still links to the junction"
    );
    assert_eq!(
        graph.predecessor(RoadId(10)),
        Some(LinkTarget::Road(RoadEnd::end(RoadId(1))))
    );
    assert_eq!(
        graph.incoming_one_way(RoadEnd::end(RoadId(1))),
        vec![RoadEnd::start(RoadId(10))]
    );
    assert_eq!(graph.ends_linked_to_junction(junction), vec![RoadEnd::end(RoadId(1))]);
    assert!(graph.is_symmetric());
}

#[test]
fn test_remove_road_leaves_no_reference() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));
    graph.link(RoadEnd::end(RoadId(2)), LinkTarget::Road(RoadEnd::start(RoadId(3))));
    graph.link_one_way(
        RoadEnd::start(RoadId(9)),
        LinkTarget::Road(RoadEnd::end(RoadId(2))),
    );

    let removed = graph.remove_road(RoadId(2));
    assert_eq!(removed.len(), 3);
    assert!(graph.edges().all(|(_, edge)| !edge.touches_road(RoadId(2))));
    assert!(graph.successor(RoadId(1)).is_none());
    assert!(graph.predecessor(RoadId(3)).is_none());
    assert!(graph.predecessor(RoadId(9)).is_none());
}

#[test]
fn test_retarget_moves_endpoint() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));
    graph.retarget(RoadEnd::end(RoadId(1)), RoadEnd::end(RoadId(5)));

    assert!(graph.successor(RoadId(1)).is_none());
    assert_eq!(
        graph.successor(RoadId(5)),
        Some(LinkTarget::Road(RoadEnd::start(RoadId(2))))
    );
    assert_eq!(
        graph.predecessor(RoadId(2)),
        Some(LinkTarget::Road(RoadEnd::end(RoadId(5))))
    );
    assert!(graph.is_symmetric());
}

#[test]
fn test_facing_link_reports_contact_points() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::end(RoadId(2))));
    let link = graph.road_link(RoadEnd::end(RoadId(2))).unwrap();
    assert_eq!(link.element, LinkElement::Road(RoadId(1)));
    assert_eq!(link.contact_point, Some(ContactPoint::End));
    assert_eq!(format!("{link}"), "road 1 (end)");
}

#[test]
fn test_from_edges_rebuilds_index() {
    let mut graph = LinkGraph::default();
    graph.link(RoadEnd::end(RoadId(1)), LinkTarget::Road(RoadEnd::start(RoadId(2))));
    graph.link(RoadEnd::start(RoadId(1)), LinkTarget::Junction(JunctionId(4)));
    let edges: Vec<LinkEdge> = graph.edges().map(|(_, e)| *e).collect();

    let rebuilt = LinkGraph::from_edges(edges);
    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt.predecessor(RoadId(1)), Some(LinkTarget::Junction(JunctionId(4))));
    assert!(rebuilt.is_symmetric());
}
