//! Piecewise-cubic functions of arc length.
//!
//! Lane width, lane offset, elevation and super-elevation are all stored as a
//! list of `(s, a, b, c, d)` records. Editing code only ever writes the anchor
//! value `a` at a given `s`; [`CubicProfile::compute_coefficients`] then
//! derives `b`, `c` and `d` so the function passes through every anchor with
//! zero slope, which keeps it continuous (and C1) across segment boundaries.

use serde::{Deserialize, Serialize};

use crate::config::S_EPSILON;
use crate::errors::ProfileError;

/// One cubic segment: `value(ds) = a + b*ds + c*ds^2 + d*ds^3`, `ds = s - self.s`.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct CubicRecord {
    pub s: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl CubicRecord {
    /// A record carrying only an anchor value (a discrete tap).
    pub fn anchor(s: f32, a: f32) -> Self {
        Self {
            s,
            a,
            b: 0.0,
            c: 0.0,
            d: 0.0,
        }
    }

    pub fn value(&self, ds: f32) -> f32 {
        self.a + ds * (self.b + ds * (self.c + ds * self.d))
    }

    /// First derivative at `ds`.
    pub fn slope(&self, ds: f32) -> f32 {
        self.b + ds * (2.0 * self.c + ds * 3.0 * self.d)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct CubicProfile {
    records: Vec<CubicRecord>,
    /// Total length the coefficients were last computed for. Zero until the
    /// first `compute_coefficients` call.
    length: f32,
}

impl CubicProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-record constant profile.
    pub fn constant(value: f32) -> Self {
        Self {
            records: vec![CubicRecord::anchor(0.0, value)],
            length: 0.0,
        }
    }

    /// Build from raw records (e.g. loaded from a file) without touching
    /// their coefficients.
    pub fn from_records(mut records: Vec<CubicRecord>, length: f32) -> Self {
        records.sort_by(|a, b| a.s.total_cmp(&b.s));
        Self { records, length }
    }

    pub fn records(&self) -> &[CubicRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn first_value(&self) -> Option<f32> {
        self.records.first().map(|r| r.a)
    }

    pub fn last_value(&self) -> Option<f32> {
        self.records.last().map(|r| r.a)
    }

    /// Derive `b`, `c`, `d` for every record from the anchor values.
    ///
    /// Records must lie inside `[0, total_length]`; callers prune invalid
    /// records first (see [`CubicProfile::prune_outside`]).
    pub fn compute_coefficients(&mut self, total_length: f32) -> Result<(), ProfileError> {
        if !total_length.is_finite() || total_length < 0.0 {
            return Err(ProfileError::InvalidLength(total_length));
        }
        for record in &self.records {
            if !record.s.is_finite() || !record.a.is_finite() {
                return Err(ProfileError::NonFinite { s: record.s });
            }
            if record.s < -S_EPSILON || record.s > total_length + S_EPSILON {
                return Err(ProfileError::RecordOutOfRange {
                    s: record.s,
                    length: total_length,
                });
            }
        }

        self.length = total_length;
        if self.records.is_empty() {
            return Ok(());
        }

        self.records.sort_by(|a, b| a.s.total_cmp(&b.s));

        let count = self.records.len();
        for i in 0..count {
            let next = (i + 1 < count).then(|| self.records[i + 1]);
            let record = &mut self.records[i];
            record.b = 0.0;
            match next {
                Some(next) if next.s - record.s > S_EPSILON => {
                    let span = next.s - record.s;
                    let delta = next.a - record.a;
                    record.c = 3.0 * delta / (span * span);
                    record.d = -2.0 * delta / (span * span * span);
                }
                _ => {
                    // Last segment (or a zero-length one) holds its value.
                    record.c = 0.0;
                    record.d = 0.0;
                }
            }
        }
        Ok(())
    }

    /// Index of the segment whose `[s, next_s)` interval contains `s`.
    fn segment_index(&self, s: f32) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let idx = self.records.partition_point(|r| r.s <= s);
        Some(idx.saturating_sub(1))
    }

    /// The segment whose interval contains `s`. Values before the first
    /// record resolve to the first segment.
    pub fn lookup(&self, s: f32) -> Option<&CubicRecord> {
        self.segment_index(s).map(|i| &self.records[i])
    }

    /// Evaluate the profile at `s`, clamping to `[0, length]`.
    pub fn evaluate(&self, s: f32) -> f32 {
        let s = if self.length > 0.0 {
            s.clamp(0.0, self.length)
        } else {
            s.max(0.0)
        };
        match self.lookup(s) {
            Some(record) => record.value((s - record.s).max(0.0)),
            None => 0.0,
        }
    }

    /// Slope of the profile at `s` (same clamping rules as `evaluate`).
    pub fn slope(&self, s: f32) -> f32 {
        let s = if self.length > 0.0 {
            s.clamp(0.0, self.length)
        } else {
            s.max(0.0)
        };
        match self.lookup(s) {
            Some(record) => record.slope((s - record.s).max(0.0)),
            None => 0.0,
        }
    }

    /// Remove any record sitting exactly at `s`. Returns how many were removed.
    pub fn remove_at(&mut self, s: f32) -> usize {
        let before = self.records.len();
        self.records.retain(|r| (r.s - s).abs() > S_EPSILON);
        before - self.records.len()
    }

    /// Replace whatever record sits at `s` with an anchor of value `a`.
    pub fn set_value_at(&mut self, s: f32, a: f32) {
        self.remove_at(s);
        let idx = self.records.partition_point(|r| r.s < s);
        self.records.insert(idx, CubicRecord::anchor(s, a));
    }

    /// Overwrite the anchor value of the first record.
    pub fn set_first_value(&mut self, a: f32) {
        if let Some(first) = self.records.first_mut() {
            first.a = a;
        }
    }

    /// Overwrite the anchor value of the last record.
    pub fn set_last_value(&mut self, a: f32) {
        if let Some(last) = self.records.last_mut() {
            last.a = a;
        }
    }

    /// Drop records outside `[0, length]`. Returns how many were dropped.
    pub fn prune_outside(&mut self, length: f32) -> usize {
        let before = self.records.len();
        self.records
            .retain(|r| r.s >= -S_EPSILON && r.s <= length + S_EPSILON);
        before - self.records.len()
    }

    /// Make sure at least two records exist, synthesizing `default` taps at
    /// `0` and `length` where needed.
    pub fn ensure_endpoints(&mut self, length: f32, default: f32) {
        match self.records.len() {
            0 => {
                self.records.push(CubicRecord::anchor(0.0, default));
                self.records.push(CubicRecord::anchor(length, default));
            }
            1 => {
                let value = self.records[0].a;
                self.records[0].s = 0.0;
                self.records.push(CubicRecord::anchor(length, value));
            }
            _ => {}
        }
    }

    /// Pin the first record to `s = 0` and the last record to `s = length`.
    pub fn anchor(&mut self, length: f32) {
        let count = self.records.len();
        if count == 0 {
            return;
        }
        self.records[0].s = 0.0;
        if count > 1 {
            self.records[count - 1].s = length;
        }
    }

    /// Scale every record position by `factor` (used when a road is resized
    /// and its profile should stretch with it).
    pub fn rescale(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        for record in &mut self.records {
            record.s *= factor;
        }
    }

    /// Remove records at or beyond `s` and shift the remaining ones so `s`
    /// becomes the new origin. Returns the tail as a new profile.
    ///
    /// Both halves get an anchor holding the value at `s`: the head ends on
    /// it and the tail starts on it.
    pub fn split_off(&mut self, s: f32) -> CubicProfile {
        if self.records.is_empty() {
            return CubicProfile::default();
        }
        let value_at_split = self.evaluate(s);
        let tail_length = (self.length - s).max(0.0);
        let idx = self.records.partition_point(|r| r.s < s - S_EPSILON);
        let mut tail: Vec<CubicRecord> = self.records.split_off(idx);
        for record in &mut tail {
            record.s -= s;
        }
        if tail.first().is_none_or(|r| r.s > S_EPSILON) {
            tail.insert(0, CubicRecord::anchor(0.0, value_at_split));
        }
        self.records.push(CubicRecord::anchor(s.max(0.0), value_at_split));
        if self.length > 0.0 {
            self.length = s.max(0.0);
        }
        CubicProfile {
            records: tail,
            length: tail_length,
        }
    }

    /// Append another profile's records after `offset`.
    pub fn append(&mut self, other: &CubicProfile, offset: f32) {
        for record in &other.records {
            let mut shifted = *record;
            shifted.s += offset;
            self.remove_at(shifted.s);
            let idx = self.records.partition_point(|r| r.s < shifted.s);
            self.records.insert(idx, shifted);
        }
    }

    pub fn all_finite(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.s.is_finite() && r.a.is_finite() && r.b.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(points: &[(f32, f32)], length: f32) -> CubicProfile {
        let mut p = CubicProfile::from_records(
            points.iter().map(|&(s, a)| CubicRecord::anchor(s, a)).collect(),
            0.0,
        );
        p.compute_coefficients(length).expect("valid records");
        p
    }

    #[test]
    fn test_empty_profile_is_noop() {
        let mut p = CubicProfile::new();
        assert!(p.compute_coefficients(10.0).is_ok());
        assert!(p.is_empty());
        assert_eq!(p.evaluate(5.0), 0.0);
    }

    #[test]
    fn test_single_record_is_constant() {
        let p = profile(&[(0.0, 3.5)], 20.0);
        assert_eq!(p.evaluate(0.0), 3.5);
        assert_eq!(p.evaluate(7.0), 3.5);
        assert_eq!(p.evaluate(20.0), 3.5);
    }

    #[test]
    fn test_endpoints_match_anchor_values() {
        let p = profile(&[(0.0, 1.0), (4.0, 5.0), (10.0, -2.0)], 10.0);
        assert!((p.evaluate(0.0) - 1.0).abs() < 1e-5);
        assert!((p.evaluate(4.0) - 5.0).abs() < 1e-4);
        assert!((p.evaluate(10.0) + 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_continuity_at_interior_boundary() {
        let p = profile(&[(0.0, 2.0), (5.0, 4.0), (9.0, 1.0)], 12.0);
        let before = p.evaluate(5.0 - 1e-3);
        let after = p.evaluate(5.0 + 1e-3);
        assert!((before - after).abs() < 1e-2, "{before} vs {after}");
        // Zero-slope anchors keep the derivative continuous too.
        assert!(p.slope(5.0).abs() < 1e-4);
    }

    #[test]
    fn test_taper_is_monotonic_between_anchors() {
        let p = profile(&[(0.0, 0.0), (10.0, 3.6)], 10.0);
        let mut prev = p.evaluate(0.0);
        for i in 1..=20 {
            let v = p.evaluate(i as f32 * 0.5);
            assert!(v >= prev - 1e-5, "not monotonic at step {i}");
            prev = v;
        }
    }

    #[test]
    fn test_out_of_range_record_rejected() {
        let mut p = CubicProfile::from_records(
            vec![CubicRecord::anchor(0.0, 1.0), CubicRecord::anchor(12.0, 1.0)],
            0.0,
        );
        let err = p.compute_coefficients(10.0).unwrap_err();
        assert!(matches!(err, ProfileError::RecordOutOfRange { .. }));

        let mut negative = CubicProfile::from_records(vec![CubicRecord::anchor(-1.0, 1.0)], 0.0);
        assert!(negative.compute_coefficients(10.0).is_err());
    }

    #[test]
    fn test_evaluate_clamps_outside_range() {
        let p = profile(&[(0.0, 1.0), (10.0, 2.0)], 10.0);
        assert_eq!(p.evaluate(-5.0), p.evaluate(0.0));
        assert_eq!(p.evaluate(50.0), p.evaluate(10.0));
    }

    #[test]
    fn test_lookup_finds_enclosing_segment() {
        let p = profile(&[(0.0, 1.0), (3.0, 2.0), (6.0, 3.0)], 9.0);
        assert_eq!(p.lookup(0.0).map(|r| r.s), Some(0.0));
        assert_eq!(p.lookup(2.999).map(|r| r.s), Some(0.0));
        assert_eq!(p.lookup(3.0).map(|r| r.s), Some(3.0));
        assert_eq!(p.lookup(8.0).map(|r| r.s), Some(6.0));
    }

    #[test]
    fn test_set_value_at_replaces_existing_record() {
        let mut p = profile(&[(0.0, 1.0), (10.0, 2.0)], 10.0);
        p.set_value_at(10.0, 5.0);
        assert_eq!(p.len(), 2);
        p.compute_coefficients(10.0).unwrap();
        assert!((p.evaluate(10.0) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_ensure_endpoints_and_anchor() {
        let mut p = CubicProfile::new();
        p.ensure_endpoints(30.0, 0.0);
        assert_eq!(p.len(), 2);
        assert_eq!(p.records()[1].s, 30.0);

        p.anchor(40.0);
        assert_eq!(p.records()[0].s, 0.0);
        assert_eq!(p.records()[1].s, 40.0);
    }

    #[test]
    fn test_prune_outside_drops_invalid_records() {
        let mut p = CubicProfile::from_records(
            vec![
                CubicRecord::anchor(0.0, 1.0),
                CubicRecord::anchor(8.0, 1.0),
                CubicRecord::anchor(15.0, 1.0),
            ],
            0.0,
        );
        assert_eq!(p.prune_outside(10.0), 1);
        assert!(p.compute_coefficients(10.0).is_ok());
    }

    #[test]
    fn test_split_off_keeps_values_continuous() {
        let mut p = profile(&[(0.0, 0.0), (20.0, 10.0)], 20.0);
        let at_split = p.evaluate(8.0);
        let mut tail = p.split_off(8.0);
        tail.compute_coefficients(12.0).unwrap();
        assert!((tail.evaluate(0.0) - at_split).abs() < 1e-4);
        assert!((tail.evaluate(12.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_split_off_head_ends_on_split_value() {
        let mut p = profile(&[(0.0, 0.0), (20.0, 5.0), (100.0, 10.0)], 100.0);
        let at_split = p.evaluate(30.0);
        let _tail = p.split_off(30.0);

        assert_eq!(p.records().len(), 3);
        assert_eq!(p.last_value(), Some(at_split));
        p.anchor(30.0);
        p.compute_coefficients(30.0).unwrap();
        assert!((p.evaluate(20.0) - 5.0).abs() < 1e-4);
        assert!((p.evaluate(30.0) - at_split).abs() < 1e-4);
    }

    #[test]
    fn test_split_off_at_origin_keeps_a_head_record() {
        let mut p = profile(&[(0.0, 2.0), (10.0, 4.0)], 10.0);
        let tail = p.split_off(0.0);
        assert_eq!(p.first_value(), Some(2.0));
        assert_eq!(tail.first_value(), Some(2.0));
        assert_eq!(tail.records().len(), 2);
    }
}
