//! Read-only consistency checks over a [`RoadMap`].

use crate::config::{LENGTH_TOLERANCE, LINK_DISTANCE_TOLERANCE, S_EPSILON};
use crate::errors::ValidationError;
use crate::link_graph::{LinkElement, LinkTarget, RoadEnd, RoadLink};
use crate::model::{ContactPoint, LaneSide, Road, RoadId};
use crate::reference_curve::RoadGeometry;
use crate::road_map::RoadMap;

/// First violation found on `road`.
pub fn validate_road(
    map: &RoadMap,
    geometry: &impl RoadGeometry,
    road: RoadId,
) -> Result<(), ValidationError> {
    match road_violations(map, geometry, road).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every violation on every road, in road id order.
pub fn validate_map(map: &RoadMap, geometry: &impl RoadGeometry) -> Vec<ValidationError> {
    map.roads()
        .flat_map(|road| road_violations(map, geometry, road.id))
        .collect()
}

pub fn road_violations(
    map: &RoadMap,
    geometry: &impl RoadGeometry,
    road: RoadId,
) -> Vec<ValidationError> {
    let Some(current) = map.road(road) else {
        return vec![ValidationError::MissingGeometry { road }];
    };
    let mut found = Vec::new();
    if !current.is_junction_road() {
        check_links(map, geometry, current, &mut found);
    }
    check_structure(geometry, current, &mut found);
    found
}

fn check_links(
    map: &RoadMap,
    geometry: &impl RoadGeometry,
    road: &Road,
    found: &mut Vec<ValidationError>,
) {
    for contact in [ContactPoint::Start, ContactPoint::End] {
        let end = RoadEnd::new(road.id, contact);
        let Some(target) = map.link_target(end) else {
            continue;
        };
        let link = RoadLink::from(target);
        match target {
            LinkTarget::Road(other) => match map.road(other.road) {
                None => found.push(ValidationError::LinkedElementMissing { road: road.id, link }),
                Some(neighbor) => {
                    check_distance(geometry, road, contact, neighbor, other.contact, link, found)
                }
            },
            LinkTarget::Junction(junction) => {
                if map.junction(junction).is_none() {
                    found.push(ValidationError::LinkedElementMissing { road: road.id, link });
                    continue;
                }
                for connecting in map.links().incoming_one_way(end) {
                    let link = RoadLink {
                        element: LinkElement::Road(connecting.road),
                        contact_point: Some(connecting.contact),
                    };
                    match map.road(connecting.road) {
                        None => {
                            found.push(ValidationError::LinkedElementMissing { road: road.id, link })
                        }
                        Some(neighbor) => check_distance(
                            geometry,
                            road,
                            contact,
                            neighbor,
                            connecting.contact,
                            link,
                            found,
                        ),
                    }
                }
            }
        }
    }
}

fn check_distance(
    geometry: &impl RoadGeometry,
    road: &Road,
    contact: ContactPoint,
    neighbor: &Road,
    neighbor_contact: ContactPoint,
    link: RoadLink,
    found: &mut Vec<ValidationError>,
) {
    let here = geometry.boundary_point(road, contact);
    let there = geometry.boundary_point(neighbor, neighbor_contact);
    let (Some(here), Some(there)) = (here, there) else {
        found.push(ValidationError::MissingGeometry { road: road.id });
        return;
    };
    let distance = here.distance(there);
    if distance > LINK_DISTANCE_TOLERANCE {
        found.push(ValidationError::LinkedElementDistanceShouldBeZero {
            road: road.id,
            link,
            distance,
        });
    }
}

fn check_structure(geometry: &impl RoadGeometry, road: &Road, found: &mut Vec<ValidationError>) {
    let ascending = road.sections.windows(2).all(|w| w[0].s < w[1].s);
    let starts_at_zero = road
        .sections
        .first()
        .is_some_and(|section| section.s.abs() <= S_EPSILON);
    if !ascending || !starts_at_zero {
        found.push(ValidationError::SectionsOutOfOrder { road: road.id });
    }

    for section in &road.sections {
        if !section.are_left_lanes_in_order() {
            found.push(ValidationError::LanesOutOfOrder {
                road: road.id,
                section_s: section.s,
                side: LaneSide::Left,
            });
        }
        if !section.are_right_lanes_in_order() {
            found.push(ValidationError::LanesOutOfOrder {
                road: road.id,
                section_s: section.s,
                side: LaneSide::Right,
            });
        }
        for lane in section.non_center_lanes() {
            let starts_at_origin = lane
                .width
                .records()
                .first()
                .is_some_and(|record| record.s.abs() <= S_EPSILON);
            if !starts_at_origin {
                found.push(ValidationError::WidthGap {
                    road: road.id,
                    section_s: section.s,
                    lane: lane.id,
                });
            }
        }
    }

    match geometry.reference_length(road) {
        None => found.push(ValidationError::MissingGeometry { road: road.id }),
        Some(expected) => {
            let span = road.sections_span();
            if (road.length - expected).abs() > LENGTH_TOLERANCE {
                found.push(ValidationError::LengthMismatch {
                    road: road.id,
                    length: road.length,
                    expected,
                });
            } else if (span - road.length).abs() > LENGTH_TOLERANCE {
                found.push(ValidationError::LengthMismatch {
                    road: road.id,
                    length: span,
                    expected: road.length,
                });
            }
        }
    }
}
