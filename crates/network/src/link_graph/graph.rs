use std::collections::{BTreeMap, HashMap};

use super::types::{EdgeId, LinkEdge, LinkTarget, RoadEnd, RoadLink};
use crate::model::{ContactPoint, JunctionId, RoadId};

/// Predecessor/successor relation between road ends and junctions.
///
/// Every link is stored once as an edge; `by_end` indexes the road ends that
/// can see each edge, so the two sides of a mutual link cannot disagree.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    edges: BTreeMap<EdgeId, LinkEdge>,
    by_end: HashMap<RoadEnd, EdgeId>,
    next_id: u32,
}

impl LinkGraph {
    /// Rebuild a graph from stored edges, later edges winning on conflicts.
    pub fn from_edges(edges: impl IntoIterator<Item = LinkEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            if edge.mutual {
                graph.link(edge.a, edge.b);
            } else {
                graph.link_one_way(edge.a, edge.b);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &LinkEdge)> {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }

    /// Link `end` to `target` in both directions. Existing links at `end`
    /// (and at `target` when it is a road end) are replaced.
    pub fn link(&mut self, end: RoadEnd, target: LinkTarget) -> EdgeId {
        self.unlink(end);
        if let LinkTarget::Road(other) = target {
            self.unlink(other);
        }
        let id = self.allocate();
        self.edges.insert(
            id,
            LinkEdge {
                a: end,
                b: target,
                mutual: true,
            },
        );
        self.by_end.insert(end, id);
        if let LinkTarget::Road(other) = target {
            self.by_end.insert(other, id);
        }
        id
    }

    /// Link visible from `end` only. Used by connecting roads inside a
    /// junction, whose outer roads link to the junction instead.
    pub fn link_one_way(&mut self, end: RoadEnd, target: LinkTarget) -> EdgeId {
        self.unlink(end);
        let id = self.allocate();
        self.edges.insert(
            id,
            LinkEdge {
                a: end,
                b: target,
                mutual: false,
            },
        );
        self.by_end.insert(end, id);
        id
    }

    /// Remove the link visible from `end`, clearing it on both sides.
    pub fn unlink(&mut self, end: RoadEnd) -> Option<LinkEdge> {
        let id = self.by_end.get(&end).copied()?;
        self.remove_edge(id)
    }

    fn remove_edge(&mut self, id: EdgeId) -> Option<LinkEdge> {
        let edge = self.edges.remove(&id)?;
        if self.by_end.get(&edge.a) == Some(&id) {
            self.by_end.remove(&edge.a);
        }
        if let LinkTarget::Road(other) = edge.b {
            if self.by_end.get(&other) == Some(&id) {
                self.by_end.remove(&other);
            }
        }
        Some(edge)
    }

    fn allocate(&mut self) -> EdgeId {
        let id = EdgeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn target(&self, end: RoadEnd) -> Option<LinkTarget> {
        let id = self.by_end.get(&end)?;
        self.edges.get(id)?.seen_from(end)
    }

    pub fn road_link(&self, end: RoadEnd) -> Option<RoadLink> {
        self.target(end).map(RoadLink::from)
    }

    /// Predecessor link (at the road start).
    pub fn predecessor(&self, road: RoadId) -> Option<LinkTarget> {
        self.target(RoadEnd::new(road, ContactPoint::Start))
    }

    /// Successor link (at the road end).
    pub fn successor(&self, road: RoadId) -> Option<LinkTarget> {
        self.target(RoadEnd::new(road, ContactPoint::End))
    }

    pub fn edge_at(&self, end: RoadEnd) -> Option<&LinkEdge> {
        self.by_end.get(&end).and_then(|id| self.edges.get(id))
    }

    pub fn edges_touching_road(&self, road: RoadId) -> Vec<(EdgeId, LinkEdge)> {
        self.edges
            .iter()
            .filter(|(_, edge)| edge.touches_road(road))
            .map(|(id, edge)| (*id, *edge))
            .collect()
    }

    /// Road ends whose own link targets `junction`.
    pub fn ends_linked_to_junction(&self, junction: JunctionId) -> Vec<RoadEnd> {
        let mut ends: Vec<RoadEnd> = self
            .edges
            .values()
            .filter(|edge| edge.b == LinkTarget::Junction(junction))
            .map(|edge| edge.a)
            .collect();
        ends.sort();
        ends
    }

    /// One-way edges from connecting roads that point at `end`.
    pub fn incoming_one_way(&self, end: RoadEnd) -> Vec<RoadEnd> {
        self.edges
            .values()
            .filter(|edge| !edge.mutual && edge.b == LinkTarget::Road(end))
            .map(|edge| edge.a)
            .collect()
    }

    /// Drop every edge touching `road`. Returns the removed edges.
    pub fn remove_road(&mut self, road: RoadId) -> Vec<LinkEdge> {
        let ids: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, edge)| edge.touches_road(road))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove_edge(id)).collect()
    }

    pub fn remove_junction(&mut self, junction: JunctionId) -> Vec<LinkEdge> {
        let ids: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, edge)| edge.b == LinkTarget::Junction(junction))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove_edge(id)).collect()
    }

    /// Move every edge endpoint at `from` onto `to` (used when a road is split
    /// and its far end now belongs to the new tail road).
    pub fn retarget(&mut self, from: RoadEnd, to: RoadEnd) {
        let ids: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, edge)| edge.a == from || edge.b == LinkTarget::Road(from))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let Some(edge) = self.edges.get_mut(&id) else {
                continue;
            };
            if edge.a == from {
                edge.a = to;
            }
            if edge.b == LinkTarget::Road(from) {
                edge.b = LinkTarget::Road(to);
            }
            let visible_from_b = edge.mutual;
            let (a, b) = (edge.a, edge.b);
            if self.by_end.get(&from) == Some(&id) {
                self.by_end.remove(&from);
            }
            if a == to || (visible_from_b && b == LinkTarget::Road(to)) {
                self.by_end.insert(to, id);
            }
        }
    }

    /// Every index entry points at an edge that sees it, and every mutual
    /// road-to-road edge is indexed from both ends.
    pub fn is_symmetric(&self) -> bool {
        let index_ok = self.by_end.iter().all(|(end, id)| {
            self.edges
                .get(id)
                .is_some_and(|edge| edge.seen_from(*end).is_some())
        });
        let edges_ok = self.edges.iter().all(|(id, edge)| {
            let a_ok = self.by_end.get(&edge.a) == Some(id);
            let b_ok = match edge.b {
                LinkTarget::Road(other) if edge.mutual => self.by_end.get(&other) == Some(id),
                _ => true,
            };
            a_ok && b_ok
        });
        index_ok && edges_ok
    }
}
