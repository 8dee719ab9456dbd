use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{CURVE_SAMPLES_PER_SPAN, MIN_CURVE_POINTS, S_EPSILON};
use crate::model::{CurveId, JunctionId, RoadId};

/// What consumes a contiguous sub-range of a reference curve.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub enum SegmentOwner {
    Road(RoadId),
    Junction(JunctionId),
    Unused,
}

/// One entry of the segment map. Runs from `start` to the next entry's
/// `start` (or the curve length for the last entry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct CurveSegment {
    pub start: f32,
    pub owner: SegmentOwner,
}

/// Arc-length lookup sample: cumulative length at parameter `u` of `span`.
#[derive(Debug, Clone, Copy)]
struct ArcSample {
    s: f32,
    span: usize,
    u: f32,
}

/// Interpolating Catmull-Rom spline through its control points, parameterized
/// by arc length, plus the segment map of roads living on it.
#[derive(Debug, Clone)]
pub struct ReferenceCurve {
    pub id: CurveId,
    points: Vec<Vec2>,
    segments: Vec<CurveSegment>,
    lut: Vec<ArcSample>,
    length: f32,
}

impl ReferenceCurve {
    /// A new curve whose whole length is unused.
    pub fn new(id: CurveId, points: Vec<Vec2>) -> Self {
        let mut curve = Self {
            id,
            points,
            segments: vec![CurveSegment {
                start: 0.0,
                owner: SegmentOwner::Unused,
            }],
            lut: Vec::new(),
            length: 0.0,
        };
        curve.rebuild_lut();
        curve
    }

    /// Rebuild from persisted parts. Segments are kept as given.
    pub fn from_parts(id: CurveId, points: Vec<Vec2>, segments: Vec<CurveSegment>) -> Self {
        let mut curve = Self::new(id, points);
        if !segments.is_empty() {
            curve.segments = segments;
            curve.normalize_segments();
        }
        curve
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn is_degenerate(&self) -> bool {
        self.points.len() < MIN_CURVE_POINTS
    }

    // -----------------------------------------------------------------------
    // Control point edits. Segment starts stretch with the curve length.
    // -----------------------------------------------------------------------

    pub fn set_points(&mut self, points: Vec<Vec2>) {
        self.points = points;
        self.refit();
    }

    pub fn add_control_point(&mut self, index: usize, point: Vec2) {
        let index = index.min(self.points.len());
        self.points.insert(index, point);
        self.refit();
    }

    pub fn move_control_point(&mut self, index: usize, point: Vec2) -> bool {
        let Some(slot) = self.points.get_mut(index) else {
            return false;
        };
        *slot = point;
        self.refit();
        true
    }

    pub fn remove_control_point(&mut self, index: usize) -> Option<Vec2> {
        if index >= self.points.len() {
            return None;
        }
        let removed = self.points.remove(index);
        self.refit();
        Some(removed)
    }

    fn refit(&mut self) {
        let old_length = self.length;
        self.rebuild_lut();
        if old_length > S_EPSILON && self.length > S_EPSILON {
            let factor = self.length / old_length;
            for segment in &mut self.segments {
                segment.start *= factor;
            }
        }
        self.normalize_segments();
    }

    fn rebuild_lut(&mut self) {
        self.lut.clear();
        self.length = 0.0;
        let spans = self.points.len().saturating_sub(1);
        if spans == 0 {
            return;
        }
        let mut prev = self.points[0];
        self.lut.push(ArcSample {
            s: 0.0,
            span: 0,
            u: 0.0,
        });
        for span in 0..spans {
            for i in 1..=CURVE_SAMPLES_PER_SPAN {
                let u = i as f32 / CURVE_SAMPLES_PER_SPAN as f32;
                let pt = self.span_point(span, u);
                self.length += (pt - prev).length();
                self.lut.push(ArcSample {
                    s: self.length,
                    span,
                    u,
                });
                prev = pt;
            }
        }
    }

    /// Control points of a span, duplicating the curve ends.
    fn span_controls(&self, span: usize) -> [Vec2; 4] {
        let last = self.points.len() - 1;
        let p1 = self.points[span];
        let p2 = self.points[(span + 1).min(last)];
        let p0 = if span == 0 { p1 } else { self.points[span - 1] };
        let p3 = self.points[(span + 2).min(last)];
        [p0, p1, p2, p3]
    }

    fn span_point(&self, span: usize, u: f32) -> Vec2 {
        if self.points.len() == 2 {
            return self.points[0].lerp(self.points[1], u);
        }
        let [p0, p1, p2, p3] = self.span_controls(span);
        let u2 = u * u;
        let u3 = u2 * u;
        0.5 * (2.0 * p1
            + (p2 - p0) * u
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
            + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * u3)
    }

    fn span_tangent(&self, span: usize, u: f32) -> Vec2 {
        if self.points.len() == 2 {
            return self.points[1] - self.points[0];
        }
        let [p0, p1, p2, p3] = self.span_controls(span);
        0.5 * ((p2 - p0)
            + 2.0 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u
            + 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * u * u)
    }

    /// Span and local parameter at arc length `s` (clamped to the curve).
    fn locate(&self, s: f32) -> Option<(usize, f32)> {
        if self.lut.len() < 2 {
            return None;
        }
        let s = s.clamp(0.0, self.length);
        let idx = self
            .lut
            .partition_point(|sample| sample.s < s)
            .clamp(1, self.lut.len() - 1);
        let a = self.lut[idx - 1];
        let b = self.lut[idx];
        let frac = if (b.s - a.s).abs() < 1e-6 {
            0.0
        } else {
            (s - a.s) / (b.s - a.s)
        };
        // Samples straddling a span boundary: `a` ends the previous span.
        let u_start = if a.span == b.span { a.u } else { 0.0 };
        Some((b.span, u_start + frac * (b.u - u_start)))
    }

    pub fn position_at(&self, s: f32) -> Option<Vec2> {
        self.locate(s).map(|(span, u)| self.span_point(span, u))
    }

    /// Unit tangent at `s`.
    pub fn direction_at(&self, s: f32) -> Option<Vec2> {
        let (span, u) = self.locate(s)?;
        self.span_tangent(span, u).try_normalize()
    }

    /// Heading in radians, counter-clockwise from +X.
    pub fn heading_at(&self, s: f32) -> Option<f32> {
        self.direction_at(s).map(|d| d.y.atan2(d.x))
    }

    /// Closest arc length to `pos` within `[lo, hi]`, with the signed lateral
    /// offset (positive on the left of the curve direction).
    pub fn project(&self, pos: Vec2, lo: f32, hi: f32) -> Option<(f32, f32)> {
        if self.lut.len() < 2 {
            return None;
        }
        let lo = lo.clamp(0.0, self.length);
        let hi = hi.clamp(lo, self.length);
        let steps = ((hi - lo) / 0.5).ceil().max(1.0) as usize;
        let mut best_s = lo;
        let mut best_dist = f32::MAX;
        for i in 0..=steps {
            let s = lo + (hi - lo) * i as f32 / steps as f32;
            if let Some(p) = self.position_at(s) {
                let dist = p.distance_squared(pos);
                if dist < best_dist {
                    best_dist = dist;
                    best_s = s;
                }
            }
        }
        // Refine on the chord between the neighboring samples.
        let step = (hi - lo) / steps as f32;
        let a = (best_s - step).max(lo);
        let b = (best_s + step).min(hi);
        let pa = self.position_at(a)?;
        let pb = self.position_at(b)?;
        let chord = pb - pa;
        if chord.length_squared() > 1e-8 {
            let f = ((pos - pa).dot(chord) / chord.length_squared()).clamp(0.0, 1.0);
            best_s = a + (b - a) * f;
        }
        let point = self.position_at(best_s)?;
        let dir = self.direction_at(best_s)?;
        let offset = pos - point;
        let t = dir.perp_dot(offset).signum() * offset.length();
        Some((best_s, t))
    }

    // -----------------------------------------------------------------------
    // Segment map
    // -----------------------------------------------------------------------

    /// End of the segment at `index`.
    fn segment_end(&self, index: usize) -> f32 {
        self.segments
            .get(index + 1)
            .map(|next| next.start)
            .unwrap_or(self.length)
    }

    /// `(start, end)` of the range owned by `owner`, if any.
    pub fn range_of(&self, owner: SegmentOwner) -> Option<(f32, f32)> {
        let index = self.segments.iter().position(|seg| seg.owner == owner)?;
        Some((self.segments[index].start, self.segment_end(index)))
    }

    /// Owner of the range immediately before / after `owner`'s range.
    pub fn neighbors_of(&self, owner: SegmentOwner) -> (Option<SegmentOwner>, Option<SegmentOwner>) {
        let Some(index) = self.segments.iter().position(|seg| seg.owner == owner) else {
            return (None, None);
        };
        let before = index
            .checked_sub(1)
            .and_then(|i| self.segments.get(i))
            .map(|seg| seg.owner);
        let after = self.segments.get(index + 1).map(|seg| seg.owner);
        (before, after)
    }

    /// Assign `[start, end)` to `owner`, cutting whatever was there.
    pub fn assign(&mut self, start: f32, end: f32, owner: SegmentOwner) {
        let start = start.clamp(0.0, self.length);
        let end = end.clamp(start, self.length);
        let mut ranges: Vec<(f32, f32, SegmentOwner)> = Vec::with_capacity(self.segments.len() + 2);
        for (i, seg) in self.segments.iter().enumerate() {
            let seg_end = self.segment_end(i);
            let owner_here = if seg.owner == owner {
                SegmentOwner::Unused
            } else {
                seg.owner
            };
            if seg.start < start {
                ranges.push((seg.start, seg_end.min(start), owner_here));
            }
            if seg_end > end {
                ranges.push((seg.start.max(end), seg_end, owner_here));
            }
        }
        ranges.push((start, end, owner));
        ranges.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.segments = ranges
            .into_iter()
            .filter(|(s, e, _)| e - s > S_EPSILON)
            .map(|(s, _, owner)| CurveSegment { start: s, owner })
            .collect();
        self.normalize_segments();
    }

    /// Replace every range owned by `from` with `to`.
    pub fn reassign(&mut self, from: SegmentOwner, to: SegmentOwner) {
        for seg in &mut self.segments {
            if seg.owner == from {
                seg.owner = to;
            }
        }
        self.normalize_segments();
    }

    pub fn release(&mut self, owner: SegmentOwner) {
        self.reassign(owner, SegmentOwner::Unused);
    }

    pub fn roads(&self) -> Vec<RoadId> {
        self.segments
            .iter()
            .filter_map(|seg| match seg.owner {
                SegmentOwner::Road(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Sort, pin the first start to 0, merge neighbors with equal owners.
    fn normalize_segments(&mut self) {
        self.segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.segments.dedup_by(|b, a| a.owner == b.owner);
        match self.segments.first_mut() {
            Some(first) => first.start = 0.0,
            None => self.segments.push(CurveSegment {
                start: 0.0,
                owner: SegmentOwner::Unused,
            }),
        }
    }
}
