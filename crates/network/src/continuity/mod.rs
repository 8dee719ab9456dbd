//! Profile and lane continuity across road links.
//!
//! Propagation is one hop: an edited road pushes its boundary values into its
//! direct neighbors and never further. Neighbors are edited on a copy and only
//! written back when the edit succeeds, so a failing neighbor keeps its last
//! good state.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::config::MIN_ROAD_LENGTH;
use crate::errors::{PropagationError, ProfileError, RoadError};
use crate::junction_resolver;
use crate::lane_continuation::{
    continue_lanes, link_inner_sections, sync_boundary_widths, write_lane_links, BoundarySection,
};
use crate::link_graph::{LinkTarget, RoadEnd};
use crate::model::{is_facing, ContactPoint, CurveId, ProfileKind, RoadId};
use crate::reference_curve::SegmentOwner;
use crate::road_map::RoadMap;

/// Re-anchor one profile of `road` and push its boundary values one hop into
/// linked roads.
pub fn propagate_profile(map: &mut RoadMap, road: RoadId, kind: ProfileKind) -> Result<(), RoadError> {
    let current = map.require_road(road)?;
    let length = current.length;
    let is_junction_road = current.is_junction_road();

    let mut profile = current.profile(kind).clone();
    profile.ensure_endpoints(length, 0.0);
    profile.anchor(length);

    if !is_junction_road {
        for contact in [ContactPoint::End, ContactPoint::Start] {
            let Some(LinkTarget::Road(neighbor)) = map.links.target(RoadEnd::new(road, contact))
            else {
                continue;
            };
            let value = match contact {
                ContactPoint::End => profile.last_value(),
                ContactPoint::Start => profile.first_value(),
            }
            .unwrap_or(0.0);
            let value = if kind.flips_when_facing() && is_facing(contact, neighbor.contact) {
                -value
            } else {
                value
            };
            if let Err(err) = push_boundary_value(map, neighbor, kind, value) {
                warn!("{kind:?} propagation from road {road} skipped: {err}");
            }
        }
    }

    profile.prune_outside(length);
    profile.compute_coefficients(length)?;
    *map.require_road_mut(road)?.profile_mut(kind) = profile;
    Ok(())
}

/// Write `value` into the boundary record of `end`'s profile and recompute.
fn push_boundary_value(
    map: &mut RoadMap,
    end: RoadEnd,
    kind: ProfileKind,
    value: f32,
) -> Result<(), PropagationError> {
    let neighbor = map
        .road(end.road)
        .ok_or(PropagationError::MissingNeighbor(end.road))?;
    if neighbor.is_junction_road() {
        return Ok(());
    }
    let length = neighbor.length;
    if !length.is_finite() || length < MIN_ROAD_LENGTH {
        return Err(PropagationError::DegenerateLength {
            road: end.road,
            length,
        });
    }
    if !value.is_finite() {
        return Err(PropagationError::Profile {
            road: end.road,
            source: ProfileError::NonFinite {
                s: end.contact.boundary_s(length),
            },
        });
    }

    let mut profile = neighbor.profile(kind).clone();
    profile.ensure_endpoints(length, 0.0);
    profile.anchor(length);
    match end.contact {
        ContactPoint::Start => profile.set_first_value(value),
        ContactPoint::End => profile.set_last_value(value),
    }
    profile.prune_outside(length);
    profile
        .compute_coefficients(length)
        .map_err(|source| PropagationError::Profile {
            road: end.road,
            source,
        })?;

    if let Some(neighbor) = map.road_mut(end.road) {
        *neighbor.profile_mut(kind) = profile;
    }
    Ok(())
}

/// Lane links and boundary widths across both ends of `road`, one hop.
pub fn propagate_lanes(map: &mut RoadMap, road: RoadId) -> Result<(), RoadError> {
    let current = map.require_road_mut(road)?;
    link_inner_sections(&mut current.sections);
    if current.is_junction_road() {
        // Connecting roads get their lane links from the junction resolver.
        return Ok(());
    }

    for contact in [ContactPoint::End, ContactPoint::Start] {
        let target = map.links.target(RoadEnd::new(road, contact));
        let neighbor_end = match target {
            Some(LinkTarget::Road(end)) if end.road != road => end,
            _ => {
                if let Some(section) = map.require_road_mut(road)?.boundary_section_mut(contact) {
                    write_lane_links(section, contact, &Default::default());
                }
                continue;
            }
        };
        let Some(neighbor) = map.road(neighbor_end.road) else {
            warn!("road {road} links to missing road {}", neighbor_end.road);
            continue;
        };
        if neighbor.is_junction_road() {
            continue;
        }

        let own = map.require_road(road)?;
        let (Some(own_section), Some(their_section)) = (
            own.boundary_section(contact),
            neighbor.boundary_section(neighbor_end.contact),
        ) else {
            continue;
        };
        let from = BoundarySection::new(own_section, contact);
        let mapping = continue_lanes(from, BoundarySection::new(their_section, neighbor_end.contact));
        if !mapping.empty_sides.is_empty() {
            warn!(
                "road {road} -> road {}: no lanes on {:?} side(s) of either boundary",
                neighbor_end.road, mapping.empty_sides
            );
        }

        let mut updated = their_section.clone();
        write_lane_links(&mut updated, neighbor_end.contact, &mapping.backward);
        let synced = sync_boundary_widths(from, &mut updated, neighbor_end.contact, &mapping);

        if let Some(section) = map.require_road_mut(road)?.boundary_section_mut(contact) {
            write_lane_links(section, contact, &mapping.forward);
        }
        match synced {
            Ok(()) => {
                if let Some(slot) = map
                    .road_mut(neighbor_end.road)
                    .and_then(|n| n.boundary_section_mut(neighbor_end.contact))
                {
                    *slot = updated;
                }
            }
            Err(err) => warn!(
                "lane width sync from road {road} into road {} skipped: {err}",
                neighbor_end.road
            ),
        }
    }
    Ok(())
}

/// All profiles plus lane continuity for one road.
pub fn propagate_road(map: &mut RoadMap, road: RoadId) -> Result<(), RoadError> {
    for kind in ProfileKind::ALL {
        propagate_profile(map, road, kind)?;
    }
    propagate_lanes(map, road)
}

/// Batch entry point after control-point edits on `curve`.
///
/// Resizes every road on the curve to its new sub-range, propagates each of
/// them once, then re-derives every junction touching them. Returns the roads
/// that were recomputed. A road that fails to resize or propagate is logged
/// and skipped. A curve with fewer than two control points is left alone.
pub fn recompute_curve(map: &mut RoadMap, curve: CurveId) -> Result<Vec<RoadId>, RoadError> {
    let reference = map.curves.get(curve).ok_or(RoadError::CurveNotFound(curve))?;
    if reference.is_degenerate() {
        debug!("curve {curve} has {} control points, skipping", reference.points().len());
        return Ok(Vec::new());
    }

    let mut resized = Vec::new();
    for road in reference.roads() {
        if let Some((start, end)) = reference.range_of(SegmentOwner::Road(road)) {
            resized.push((road, end - start));
        }
    }
    let junction_spans: BTreeSet<_> = reference
        .segments()
        .iter()
        .filter_map(|seg| match seg.owner {
            SegmentOwner::Junction(id) => Some(id),
            _ => None,
        })
        .collect();

    for &(road, length) in &resized {
        if let Err(err) = map.require_road_mut(road)?.resize(length) {
            warn!("road {road} resized on curve {curve} but lane widths failed: {err}");
        }
    }
    let affected: Vec<RoadId> = resized.iter().map(|(road, _)| *road).collect();
    for &road in &affected {
        if let Err(err) = propagate_road(map, road) {
            warn!("propagation from road {road} skipped: {err}");
        }
    }

    let mut junctions = junction_spans;
    for &road in &affected {
        junctions.extend(map.junctions_touching(road));
    }
    for junction in junctions {
        junction_resolver::rebuild_junction(map, junction)?;
    }
    map.changed.extend(affected.iter().copied());
    Ok(affected)
}
