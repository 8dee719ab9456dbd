use std::collections::BTreeMap;
use std::str::FromStr;

use bevy::prelude::*;
use network::cubic_profile::{CubicProfile, CubicRecord};
use network::link_graph::{LinkGraph, LinkTarget, RoadEnd};
use network::model::{
    ConnectionId, ContactPoint, CurveId, Junction, JunctionConnection, JunctionId, Lane,
    LaneHeight, LaneLinkEntry, LaneSection, LaneSide, LaneType, Road, RoadId, RoadMark,
    TravelDirection, TurnType,
};
use network::reference_curve::{CurveSegment, ReferenceCurve, SegmentOwner};
use network::{EngineParams, RoadMap};
use roxmltree::Node;

use super::{codes, parse_direction, parse_owner, parse_turn};
use crate::save_error::SaveError;

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.tag_name().name() == tag)
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &'static str) -> Option<Node<'a, 'input>> {
    children(node, tag).next()
}

fn user_data<'a>(node: Node<'a, '_>, code: &str) -> Option<&'a str> {
    children(node, "userData")
        .find(|n| n.attribute("code") == Some(code))
        .and_then(|n| n.attribute("value"))
}

fn required<T: FromStr>(node: Node, name: &str) -> Result<T, SaveError> {
    let raw = node.attribute(name).ok_or_else(|| {
        SaveError::OpenDrive(format!(
            "<{}> is missing attribute '{name}'",
            node.tag_name().name()
        ))
    })?;
    raw.parse().map_err(|_| {
        SaveError::OpenDrive(format!(
            "<{}> has invalid {name}=\"{raw}\"",
            node.tag_name().name()
        ))
    })
}

fn optional<T: FromStr>(node: Node, name: &str, default: T) -> T {
    node.attribute(name)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn records(node: Node, tag: &'static str, s_name: &str) -> Vec<CubicRecord> {
    children(node, tag)
        .map(|n| CubicRecord {
            s: optional(n, s_name, 0.0),
            a: optional(n, "a", 0.0),
            b: optional(n, "b", 0.0),
            c: optional(n, "c", 0.0),
            d: optional(n, "d", 0.0),
        })
        .collect()
}

fn contact_attr(node: Node) -> ContactPoint {
    node.attribute("contactPoint")
        .and_then(ContactPoint::parse)
        .unwrap_or(ContactPoint::Start)
}

// ---------------------------------------------------------------------------
// Parsed intermediate form
// ---------------------------------------------------------------------------

struct ParsedRoad {
    road: Road,
    predecessor: Option<LinkTarget>,
    successor: Option<LinkTarget>,
    /// Start points of the `planView` pieces plus the final end point.
    plan_points: Vec<Vec2>,
    curve: Option<CurveId>,
}

impl ParsedRoad {
    fn link_at(&self, contact: ContactPoint) -> Option<LinkTarget> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }
}

/// Read an OpenDRIVE document into a new map.
///
/// # Errors
///
/// [`SaveError::Xml`] for malformed XML, [`SaveError::OpenDrive`] when the
/// root is not `<OpenDRIVE>`, an id is not numeric or a road has no geometry.
pub fn import_xodr(content: &str) -> Result<RoadMap, SaveError> {
    let doc = roxmltree::Document::parse(content)?;
    let root = doc.root_element();
    if root.tag_name().name() != "OpenDRIVE" {
        return Err(SaveError::OpenDrive(format!(
            "root element is <{}>, expected <OpenDRIVE>",
            root.tag_name().name()
        )));
    }

    let params = match user_data(root, codes::ENGINE_PARAMS) {
        Some(json) => serde_json::from_str(json).map_err(|e| {
            SaveError::OpenDrive(format!("invalid engine parameters: {e}"))
        })?,
        None => EngineParams::default(),
    };

    let mut curves: BTreeMap<CurveId, ReferenceCurve> = BTreeMap::new();
    for node in children(root, "userData")
        .filter(|n| n.attribute("code") == Some(codes::REFERENCE_CURVE))
    {
        let curve = parse_curve(node)?;
        curves.insert(curve.id, curve);
    }

    let mut parsed: BTreeMap<RoadId, ParsedRoad> = BTreeMap::new();
    for node in children(root, "road") {
        let road = parse_road(node)?;
        if parsed.contains_key(&road.road.id) {
            return Err(SaveError::OpenDrive(format!(
                "road id {} is used twice",
                road.road.id
            )));
        }
        parsed.insert(road.road.id, road);
    }

    let links = build_links(&parsed);
    attach_curves(&mut parsed, &mut curves)?;

    let mut junctions = Vec::new();
    for node in children(root, "junction") {
        junctions.push(parse_junction(node, &parsed)?);
    }

    let roads: Vec<Road> = parsed.into_values().map(|p| p.road).collect();
    info!(
        "Imported OpenDRIVE map: {} roads, {} junctions, {} reference curves",
        roads.len(),
        junctions.len(),
        curves.len()
    );
    Ok(RoadMap::from_parts(
        roads,
        junctions,
        curves.into_values().collect(),
        links,
        params,
    ))
}

fn parse_curve(node: Node) -> Result<ReferenceCurve, SaveError> {
    let id = CurveId(required(node, "value")?);
    let points = children(node, "point")
        .map(|p| Ok(Vec2::new(required(p, "x")?, required(p, "y")?)))
        .collect::<Result<Vec<_>, SaveError>>()?;
    let mut segments = Vec::new();
    for seg in children(node, "segment") {
        let raw = seg.attribute("owner").unwrap_or("unused");
        let owner = parse_owner(raw).ok_or_else(|| {
            SaveError::OpenDrive(format!("curve {id} has invalid segment owner '{raw}'"))
        })?;
        segments.push(CurveSegment {
            start: required(seg, "start")?,
            owner,
        });
    }
    Ok(ReferenceCurve::from_parts(id, points, segments))
}

// ---------------------------------------------------------------------------
// Roads
// ---------------------------------------------------------------------------

fn parse_road(node: Node) -> Result<ParsedRoad, SaveError> {
    let id = RoadId(required(node, "id")?);
    let length: f32 = required(node, "length")?;
    let junction = match optional::<i64>(node, "junction", -1) {
        j if j < 0 => None,
        j => Some(JunctionId(j as u32)),
    };

    let (predecessor, successor) = match child(node, "link") {
        Some(link) => (
            child(link, "predecessor").map(parse_link_target).transpose()?,
            child(link, "successor").map(parse_link_target).transpose()?,
        ),
        None => (None, None),
    };

    let mut sections = Vec::new();
    let mut lane_offset = Vec::new();
    if let Some(lanes) = child(node, "lanes") {
        lane_offset = records(lanes, "laneOffset", "s");
        let starts: Vec<f32> = children(lanes, "laneSection")
            .map(|n| optional(n, "s", 0.0))
            .collect();
        for (i, section_node) in children(lanes, "laneSection").enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(length);
            sections.push(parse_section(section_node, (end - starts[i]).max(0.0))?);
        }
    }
    if sections.is_empty() {
        sections.push(LaneSection::new(0.0));
    }

    let elevation = child(node, "elevationProfile")
        .map(|n| records(n, "elevation", "s"))
        .unwrap_or_default();
    let superelevation = child(node, "lateralProfile")
        .map(|n| records(n, "superelevation", "s"))
        .unwrap_or_default();

    let mut road = Road {
        id,
        name: node
            .attribute("name")
            .map_or_else(|| format!("Road {id}"), str::to_string),
        length,
        sections,
        lane_offset: CubicProfile::from_records(lane_offset, length),
        elevation: CubicProfile::from_records(elevation, length),
        superelevation: CubicProfile::from_records(superelevation, length),
        junction,
        // Replaced by `attach_curves`.
        curve: CurveId(u32::MAX),
    };
    road.sync_section_lengths();

    let curve = user_data(node, codes::REFERENCE_CURVE)
        .map(|raw| {
            raw.parse().map(CurveId).map_err(|_| {
                SaveError::OpenDrive(format!("road {id} has invalid reference curve '{raw}'"))
            })
        })
        .transpose()?;

    Ok(ParsedRoad {
        road,
        predecessor,
        successor,
        plan_points: child(node, "planView").map(plan_points).unwrap_or_default(),
        curve,
    })
}

fn parse_link_target(node: Node) -> Result<LinkTarget, SaveError> {
    let id: u32 = required(node, "elementId")?;
    match node.attribute("elementType") {
        Some("junction") => Ok(LinkTarget::Junction(JunctionId(id))),
        Some("road") | None => Ok(LinkTarget::Road(RoadEnd::new(
            RoadId(id),
            contact_attr(node),
        ))),
        Some(other) => Err(SaveError::OpenDrive(format!(
            "unsupported link elementType '{other}'"
        ))),
    }
}

fn plan_points(plan_view: Node) -> Vec<Vec2> {
    let mut points = Vec::new();
    let mut last_end = None;
    for geometry in children(plan_view, "geometry") {
        let start = Vec2::new(optional(geometry, "x", 0.0), optional(geometry, "y", 0.0));
        let heading: f32 = optional(geometry, "hdg", 0.0);
        let length: f32 = optional(geometry, "length", 0.0);
        points.push(start);
        last_end = Some(start + Vec2::from_angle(heading) * length);
    }
    points.extend(last_end);
    points
}

fn parse_section(node: Node, length: f32) -> Result<LaneSection, SaveError> {
    let mut section = LaneSection {
        s: optional(node, "s", 0.0),
        length,
        lanes: BTreeMap::new(),
    };
    for side in ["left", "center", "right"] {
        let Some(group) = child(node, side) else {
            continue;
        };
        for lane_node in children(group, "lane") {
            let lane = parse_lane(lane_node, length)?;
            section.lanes.insert(lane.id, lane);
        }
    }
    section.lanes.entry(0).or_insert_with(Lane::center);
    Ok(section)
}

fn parse_lane(node: Node, section_length: f32) -> Result<Lane, SaveError> {
    let id: i32 = required(node, "id")?;
    let lane_type = node
        .attribute("type")
        .and_then(LaneType::parse)
        .unwrap_or(LaneType::Driving);
    let direction = user_data(node, codes::TRAVEL_DIRECTION)
        .and_then(parse_direction)
        .unwrap_or_else(|| TravelDirection::default_for(LaneSide::of(id)));

    let (predecessor, successor): (Option<i32>, Option<i32>) = match child(node, "link") {
        Some(link) => (
            child(link, "predecessor").and_then(|n| n.attribute("id")?.parse().ok()),
            child(link, "successor").and_then(|n| n.attribute("id")?.parse().ok()),
        ),
        None => (None, None),
    };

    Ok(Lane {
        id,
        lane_type,
        direction,
        width: CubicProfile::from_records(records(node, "width", "sOffset"), section_length),
        predecessor,
        successor,
        road_marks: children(node, "roadMark")
            .map(|n| RoadMark {
                s_offset: optional(n, "sOffset", 0.0),
                kind: n.attribute("type").unwrap_or("none").to_string(),
                width: optional(n, "width", 0.0),
            })
            .collect(),
        heights: children(node, "height")
            .map(|n| LaneHeight {
                s_offset: optional(n, "sOffset", 0.0),
                inner: optional(n, "inner", 0.0),
                outer: optional(n, "outer", 0.0),
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Links and curves
// ---------------------------------------------------------------------------

/// A road-to-road link is mutual when the far end links back, one-way
/// otherwise (connecting roads pointing at outer roads).
fn build_links(parsed: &BTreeMap<RoadId, ParsedRoad>) -> LinkGraph {
    let mut graph = LinkGraph::default();
    for (&id, road) in parsed {
        for contact in [ContactPoint::Start, ContactPoint::End] {
            let end = RoadEnd::new(id, contact);
            match road.link_at(contact) {
                None => {}
                Some(LinkTarget::Junction(junction)) => {
                    graph.link(end, LinkTarget::Junction(junction));
                }
                Some(LinkTarget::Road(other)) => {
                    let back = parsed
                        .get(&other.road)
                        .and_then(|p| p.link_at(other.contact));
                    if back == Some(LinkTarget::Road(end)) {
                        if end < other {
                            graph.link(end, LinkTarget::Road(other));
                        }
                    } else {
                        graph.link_one_way(end, LinkTarget::Road(other));
                    }
                }
            }
        }
    }
    graph
}

/// Point every road at its reference curve, building one from the
/// `planView` for roads whose file carried no curve.
fn attach_curves(
    parsed: &mut BTreeMap<RoadId, ParsedRoad>,
    curves: &mut BTreeMap<CurveId, ReferenceCurve>,
) -> Result<(), SaveError> {
    let mut next_curve = curves.keys().map(|id| id.0 + 1).max().unwrap_or(0);
    for (&id, entry) in parsed.iter_mut() {
        if let Some(curve) = entry.curve.filter(|curve| curves.contains_key(curve)) {
            entry.road.curve = curve;
            continue;
        }
        if entry.plan_points.len() < 2 {
            return Err(SaveError::OpenDrive(format!(
                "road {id} has neither a reference curve nor a planView"
            )));
        }
        let curve_id = CurveId(next_curve);
        next_curve += 1;
        let mut curve = ReferenceCurve::new(curve_id, std::mem::take(&mut entry.plan_points));
        curve.assign(0.0, curve.length(), SegmentOwner::Road(id));
        debug!("road {id}: built reference curve {curve_id} from planView");
        curves.insert(curve_id, curve);
        entry.road.curve = curve_id;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Junctions
// ---------------------------------------------------------------------------

fn parse_junction(
    node: Node,
    parsed: &BTreeMap<RoadId, ParsedRoad>,
) -> Result<Junction, SaveError> {
    let id = JunctionId(required(node, "id")?);
    let mut junction = Junction::new(id, user_data(node, codes::AUTO) == Some("true"));
    if let Some(name) = node.attribute("name") {
        junction.name = name.to_string();
    }

    for (index, conn) in children(node, "connection").enumerate() {
        let connection_id = ConnectionId(optional(conn, "id", index as u32));
        let incoming_road = RoadId(required(conn, "incomingRoad")?);
        let connecting_road = RoadId(required(conn, "connectingRoad")?);
        let contact = contact_attr(conn);

        // The connecting road's own links name the exact ends it joins.
        let Some(connecting) = parsed.get(&connecting_road) else {
            warn!("junction {id} connection {connection_id}: connecting road {connecting_road} is missing, skipped");
            continue;
        };
        let entry = connecting.link_at(contact).and_then(LinkTarget::road_end);
        let exit = connecting
            .link_at(contact.opposite())
            .and_then(LinkTarget::road_end);
        let (Some(entry), Some(exit)) = (entry, exit) else {
            warn!("junction {id} connection {connection_id}: connecting road {connecting_road} is not linked at both ends, skipped");
            continue;
        };
        if entry.road != incoming_road {
            warn!(
                "junction {id} connection {connection_id}: incomingRoad {incoming_road} \
                 disagrees with connecting road link to {}",
                entry.road
            );
        }

        // Lane successors are recorded on the section at the exit side.
        let boundary = connecting.road.boundary_section(contact.opposite());
        let lane_links = children(conn, "laneLink")
            .map(|link| {
                let incoming: i32 = required(link, "from")?;
                let connecting_lane: i32 = required(link, "to")?;
                let outgoing = boundary
                    .and_then(|section| section.lane(connecting_lane))
                    .and_then(|lane| match contact {
                        ContactPoint::Start => lane.successor,
                        ContactPoint::End => lane.predecessor,
                    })
                    .unwrap_or(connecting_lane);
                Ok(LaneLinkEntry {
                    incoming,
                    connecting: connecting_lane,
                    outgoing,
                })
            })
            .collect::<Result<Vec<_>, SaveError>>()?;

        junction.connections.insert(
            connection_id,
            JunctionConnection {
                id: connection_id,
                incoming_road: entry.road,
                incoming_contact: entry.contact,
                connecting_road,
                outgoing_road: exit.road,
                outgoing_contact: exit.contact,
                lane_links,
                turn: user_data(conn, codes::TURN)
                    .and_then(parse_turn)
                    .unwrap_or(TurnType::Straight),
                is_corner_connection: user_data(conn, codes::CORNER) == Some("true"),
            },
        );
    }
    Ok(junction)
}
