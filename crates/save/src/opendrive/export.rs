use bevy::prelude::*;
use network::cubic_profile::CubicProfile;
use network::link_graph::{LinkTarget, RoadEnd};
use network::model::{ContactPoint, Junction, Lane, LaneSection, Road};
use network::reference_curve::{ReferenceCurve, RoadGeometry};
use network::RoadMap;

use super::{codes, direction_str, owner_str, turn_str};

/// Planar step between exported `planView` line pieces.
const PLAN_VIEW_STEP: f32 = 5.0;

type Attrs<'a> = [(&'a str, String)];

/// Indented XML text builder. Writing into a `String` cannot fail.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn start(&mut self, tag: &str, attrs: &Attrs) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_into(&mut self.out, value);
            self.out.push('"');
        }
    }

    fn open(&mut self, tag: &str, attrs: &Attrs) {
        self.start(tag, attrs);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn empty(&mut self, tag: &str, attrs: &Attrs) {
        self.start(tag, attrs);
        self.out.push_str("/>\n");
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn user_data(&mut self, code: &str, value: String) {
        self.empty("userData", &[("code", code.to_string()), ("value", value)]);
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn num(value: f32) -> String {
    value.to_string()
}

/// Serialize the whole map as an OpenDRIVE document.
pub fn export_xodr(map: &RoadMap) -> String {
    let mut xml = XmlWriter::new();
    xml.open("OpenDRIVE", &[]);
    xml.empty(
        "header",
        &[
            ("revMajor", "1".to_string()),
            ("revMinor", "6".to_string()),
            ("name", "roadforge".to_string()),
            ("version", crate::map_codec::CURRENT_SAVE_VERSION.to_string()),
        ],
    );

    for road in map.roads() {
        write_road(&mut xml, map, road);
    }
    for junction in map.junctions() {
        write_junction(&mut xml, junction);
    }
    for curve in map.curves().iter() {
        write_curve(&mut xml, curve);
    }
    match serde_json::to_string(map.params()) {
        Ok(json) => xml.user_data(codes::ENGINE_PARAMS, json),
        Err(e) => warn!("Engine parameters left out of OpenDRIVE export: {e}"),
    }

    xml.close("OpenDRIVE");
    info!(
        "Exported OpenDRIVE map: {} roads, {} junctions",
        map.road_count(),
        map.junctions().count()
    );
    xml.out
}

fn write_road(xml: &mut XmlWriter, map: &RoadMap, road: &Road) {
    let junction = road.junction.map_or(-1, |id| i64::from(id.0));
    xml.open(
        "road",
        &[
            ("name", road.name.clone()),
            ("length", num(road.length)),
            ("id", road.id.0.to_string()),
            ("junction", junction.to_string()),
        ],
    );

    let predecessor = map.link_target(RoadEnd::start(road.id));
    let successor = map.link_target(RoadEnd::end(road.id));
    if predecessor.is_some() || successor.is_some() {
        xml.open("link", &[]);
        if let Some(target) = predecessor {
            write_link_target(xml, "predecessor", target);
        }
        if let Some(target) = successor {
            write_link_target(xml, "successor", target);
        }
        xml.close("link");
    }

    write_plan_view(xml, map, road);

    xml.open("elevationProfile", &[]);
    write_records(xml, "elevation", "s", &road.elevation);
    xml.close("elevationProfile");
    xml.open("lateralProfile", &[]);
    write_records(xml, "superelevation", "s", &road.superelevation);
    xml.close("lateralProfile");

    xml.open("lanes", &[]);
    write_records(xml, "laneOffset", "s", &road.lane_offset);
    for section in &road.sections {
        write_section(xml, section);
    }
    xml.close("lanes");

    xml.user_data(codes::REFERENCE_CURVE, road.curve.0.to_string());
    xml.close("road");
}

fn write_link_target(xml: &mut XmlWriter, tag: &str, target: LinkTarget) {
    match target {
        LinkTarget::Road(end) => xml.empty(
            tag,
            &[
                ("elementType", "road".to_string()),
                ("elementId", end.road.0.to_string()),
                ("contactPoint", end.contact.as_str().to_string()),
            ],
        ),
        LinkTarget::Junction(id) => xml.empty(
            tag,
            &[
                ("elementType", "junction".to_string()),
                ("elementId", id.0.to_string()),
            ],
        ),
    }
}

/// Line pieces sampled from the reference curve, for readers that ignore
/// the curve `userData`.
fn write_plan_view(xml: &mut XmlWriter, map: &RoadMap, road: &Road) {
    let geometry = map.curves();
    let pieces = (road.length / PLAN_VIEW_STEP).ceil().max(1.0) as usize;
    let samples: Option<Vec<Vec2>> = (0..=pieces)
        .map(|i| {
            let s = road.length * i as f32 / pieces as f32;
            geometry.world_position_at(road, s, 0.0).map(|p| p.truncate())
        })
        .collect();
    let Some(samples) = samples else {
        debug!("road {} has no evaluable geometry, planView left empty", road.id);
        return;
    };

    xml.open("planView", &[]);
    let mut s = 0.0;
    for pair in samples.windows(2) {
        let delta = pair[1] - pair[0];
        let length = delta.length();
        xml.open(
            "geometry",
            &[
                ("s", num(s)),
                ("x", num(pair[0].x)),
                ("y", num(pair[0].y)),
                ("hdg", num(delta.y.atan2(delta.x))),
                ("length", num(length)),
            ],
        );
        xml.empty("line", &[]);
        xml.close("geometry");
        s += length;
    }
    xml.close("planView");
}

fn write_records(xml: &mut XmlWriter, tag: &str, s_name: &str, profile: &CubicProfile) {
    for record in profile.records() {
        xml.empty(
            tag,
            &[
                (s_name, num(record.s)),
                ("a", num(record.a)),
                ("b", num(record.b)),
                ("c", num(record.c)),
                ("d", num(record.d)),
            ],
        );
    }
}

fn write_section(xml: &mut XmlWriter, section: &LaneSection) {
    xml.open("laneSection", &[("s", num(section.s))]);

    let left: Vec<&Lane> = section.lanes.range(1..).rev().map(|(_, lane)| lane).collect();
    if !left.is_empty() {
        xml.open("left", &[]);
        for lane in left {
            write_lane(xml, lane);
        }
        xml.close("left");
    }
    xml.open("center", &[]);
    match section.lane(0) {
        Some(center) => write_lane(xml, center),
        None => write_lane(xml, &Lane::center()),
    }
    xml.close("center");
    let right: Vec<&Lane> = section.lanes.range(..0).rev().map(|(_, lane)| lane).collect();
    if !right.is_empty() {
        xml.open("right", &[]);
        for lane in right {
            write_lane(xml, lane);
        }
        xml.close("right");
    }

    xml.close("laneSection");
}

fn write_lane(xml: &mut XmlWriter, lane: &Lane) {
    xml.open(
        "lane",
        &[
            ("id", lane.id.to_string()),
            ("type", lane.lane_type.as_str().to_string()),
            ("level", "false".to_string()),
        ],
    );
    if lane.predecessor.is_some() || lane.successor.is_some() {
        xml.open("link", &[]);
        if let Some(id) = lane.predecessor {
            xml.empty("predecessor", &[("id", id.to_string())]);
        }
        if let Some(id) = lane.successor {
            xml.empty("successor", &[("id", id.to_string())]);
        }
        xml.close("link");
    }
    write_records(xml, "width", "sOffset", &lane.width);
    for mark in &lane.road_marks {
        xml.empty(
            "roadMark",
            &[
                ("sOffset", num(mark.s_offset)),
                ("type", mark.kind.clone()),
                ("width", num(mark.width)),
            ],
        );
    }
    for height in &lane.heights {
        xml.empty(
            "height",
            &[
                ("sOffset", num(height.s_offset)),
                ("inner", num(height.inner)),
                ("outer", num(height.outer)),
            ],
        );
    }
    xml.user_data(codes::TRAVEL_DIRECTION, direction_str(lane.direction).to_string());
    xml.close("lane");
}

fn write_junction(xml: &mut XmlWriter, junction: &Junction) {
    xml.open(
        "junction",
        &[
            ("id", junction.id.0.to_string()),
            ("name", junction.name.clone()),
        ],
    );
    for connection in junction.connections.values() {
        // Connecting roads always run from the incoming road to the outgoing one.
        xml.open(
            "connection",
            &[
                ("id", connection.id.0.to_string()),
                ("incomingRoad", connection.incoming_road.0.to_string()),
                ("connectingRoad", connection.connecting_road.0.to_string()),
                ("contactPoint", ContactPoint::Start.as_str().to_string()),
            ],
        );
        for link in &connection.lane_links {
            xml.empty(
                "laneLink",
                &[
                    ("from", link.incoming.to_string()),
                    ("to", link.connecting.to_string()),
                ],
            );
        }
        xml.user_data(codes::TURN, turn_str(connection.turn).to_string());
        xml.user_data(codes::CORNER, connection.is_corner_connection.to_string());
        xml.close("connection");
    }
    xml.user_data(codes::AUTO, junction.auto.to_string());
    xml.close("junction");
}

/// Curves sit at document level because several roads can share one.
fn write_curve(xml: &mut XmlWriter, curve: &ReferenceCurve) {
    xml.open(
        "userData",
        &[
            ("code", codes::REFERENCE_CURVE.to_string()),
            ("value", curve.id.0.to_string()),
        ],
    );
    for point in curve.points() {
        xml.empty("point", &[("x", num(point.x)), ("y", num(point.y))]);
    }
    for segment in curve.segments() {
        xml.empty(
            "segment",
            &[("start", num(segment.start)), ("owner", owner_str(segment.owner))],
        );
    }
    xml.close("userData");
}
