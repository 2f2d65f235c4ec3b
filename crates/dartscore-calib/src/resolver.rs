//! Assignment of calibration markers to the six board slots.
//!
//! The resolver never fails: every slot ends up either holding exactly one
//! marker or carrying the reason it does not.

use dartscore_core::{board_center, CalibrationSlot, SLOT_COUNT};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::detection::{class_to_slot, RawDetection};
use crate::params::CalibrationParams;

/// Radius of the circle the geometric strategy expects markers on.
pub const EXPECTED_MARKER_RADIUS: f64 = 0.35;

/// Angular distance outside the window at which the geometric score reaches zero.
const ANGLE_FALLOFF_DEG: f64 = 45.0;

const WEIGHT_DISTANCE: f64 = 0.5;
const WEIGHT_CONFIDENCE: f64 = 0.3;
const WEIGHT_GEOMETRY: f64 = 0.2;

/// Why a slot has no point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Missing,
    Duplicate,
}

/// A marker accepted for a slot, in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub slot: CalibrationSlot,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl CalibrationPoint {
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Both coordinates inside the unit square.
    pub fn in_frame(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationEntry {
    Valid(CalibrationPoint),
    Invalid {
        slot: CalibrationSlot,
        reason: InvalidReason,
    },
}

impl CalibrationEntry {
    pub fn slot(&self) -> CalibrationSlot {
        match self {
            CalibrationEntry::Valid(p) => p.slot,
            CalibrationEntry::Invalid { slot, .. } => *slot,
        }
    }

    pub fn point(&self) -> Option<&CalibrationPoint> {
        match self {
            CalibrationEntry::Valid(p) => Some(p),
            CalibrationEntry::Invalid { .. } => None,
        }
    }
}

/// Exactly one entry per slot, ordered by slot index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationPoints {
    entries: [CalibrationEntry; SLOT_COUNT],
}

impl CalibrationPoints {
    /// Every slot marked missing.
    pub fn all_missing() -> Self {
        Self {
            entries: CalibrationSlot::ALL.map(|slot| CalibrationEntry::Invalid {
                slot,
                reason: InvalidReason::Missing,
            }),
        }
    }

    pub fn entries(&self) -> &[CalibrationEntry; SLOT_COUNT] {
        &self.entries
    }

    pub fn get(&self, slot: CalibrationSlot) -> &CalibrationEntry {
        &self.entries[slot.index()]
    }

    pub fn set(&mut self, entry: CalibrationEntry) {
        self.entries[entry.slot().index()] = entry;
    }

    pub fn valid_points(&self) -> impl Iterator<Item = &CalibrationPoint> + '_ {
        self.entries.iter().filter_map(CalibrationEntry::point)
    }

    pub fn valid_count(&self) -> usize {
        self.valid_points().count()
    }

    /// Replace pinned slots with the override's points.
    pub fn apply_override(&mut self, pins: &CalibrationOverride) {
        for pin in &pins.points {
            log::debug!("slot {} pinned to ({:.4}, {:.4})", pin.slot.label(), pin.x, pin.y);
            self.set(CalibrationEntry::Valid(CalibrationPoint {
                slot: pin.slot,
                x: pin.x,
                y: pin.y,
                confidence: 1.0,
            }));
        }
    }
}

impl Default for CalibrationPoints {
    fn default() -> Self {
        Self::all_missing()
    }
}

/// A slot fixed to a user-supplied image position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinnedPoint {
    pub slot: CalibrationSlot,
    pub x: f64,
    pub y: f64,
}

/// Manually placed calibration points that take precedence over detections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOverride {
    pub points: Vec<PinnedPoint>,
}

impl CalibrationOverride {
    /// Pin `slot`, replacing any previous pin for it.
    pub fn pin(&mut self, slot: CalibrationSlot, x: f64, y: f64) -> &mut Self {
        self.points.retain(|p| p.slot != slot);
        self.points.push(PinnedPoint { slot, x, y });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Picks one marker out of several competing for the same slot.
pub trait DuplicateResolver: std::fmt::Debug + Send + Sync {
    /// Index into `candidates` of the chosen marker, or `None` to leave the
    /// slot unresolved. `candidates` is never empty.
    fn select(&self, slot: CalibrationSlot, candidates: &[RawDetection]) -> Option<usize>;
}

/// Keep the most confident marker; the earliest wins ties.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighestConfidence;

impl DuplicateResolver for HighestConfidence {
    fn select(&self, _slot: CalibrationSlot, candidates: &[RawDetection]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            if best.is_none_or(|(_, conf)| c.confidence > conf) {
                best = Some((i, c.confidence));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Leave the slot unresolved whenever there is more than one marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectDuplicates;

impl DuplicateResolver for RejectDuplicates {
    fn select(&self, _slot: CalibrationSlot, candidates: &[RawDetection]) -> Option<usize> {
        (candidates.len() == 1).then_some(0)
    }
}

/// Weighted blend of distance to the expected slot position, detector
/// confidence, and agreement with the slot's angular window.
#[derive(Clone, Copy, Debug)]
pub struct GeometricScoring {
    pub position_tolerance: f64,
}

impl Default for GeometricScoring {
    fn default() -> Self {
        Self {
            position_tolerance: 0.15,
        }
    }
}

/// Unsigned angular difference in degrees, in `[0, 180]`.
fn circular_distance_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn in_window(angle: f64, (lo, hi): (f64, f64)) -> bool {
    if lo <= hi {
        (lo..=hi).contains(&angle)
    } else {
        angle >= lo || angle <= hi
    }
}

/// Angle of `p` around the board center in `[0, 360)`.
fn angle_from_center_deg(p: Point2<f64>) -> f64 {
    let v = p - board_center();
    v.y.atan2(v.x).to_degrees().rem_euclid(360.0)
}

impl GeometricScoring {
    /// 1 inside the slot's window, falling linearly to 0 at 45° outside it.
    pub fn angle_score(slot: CalibrationSlot, p: Point2<f64>) -> f64 {
        let angle = angle_from_center_deg(p);
        let window = slot.angular_window();
        if in_window(angle, window) {
            return 1.0;
        }
        let outside = circular_distance_deg(angle, window.0).min(circular_distance_deg(angle, window.1));
        (1.0 - outside / ANGLE_FALLOFF_DEG).max(0.0)
    }

    pub fn score(&self, slot: CalibrationSlot, candidate: &RawDetection) -> f64 {
        let p = candidate.position();
        let expected = slot.expected_position(EXPECTED_MARKER_RADIUS);
        let distance = (p - expected).norm();
        let distance_score = if self.position_tolerance > 0.0 {
            (1.0 - distance / self.position_tolerance).max(0.0)
        } else {
            0.0
        };
        WEIGHT_DISTANCE * distance_score
            + WEIGHT_CONFIDENCE * candidate.confidence
            + WEIGHT_GEOMETRY * Self::angle_score(slot, p)
    }
}

impl DuplicateResolver for GeometricScoring {
    fn select(&self, slot: CalibrationSlot, candidates: &[RawDetection]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            let s = self.score(slot, c);
            log::debug!(
                "slot {} candidate ({:.3}, {:.3}) conf {:.2} -> score {:.3}",
                slot.label(),
                c.center_x,
                c.center_y,
                c.confidence,
                s
            );
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((i, s));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Configurable choice among the built-in [`DuplicateResolver`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    #[default]
    HighestConfidence,
    GeometricScoring,
    RejectDuplicates,
}

impl DuplicateStrategy {
    pub fn build(self, position_tolerance: f64) -> Box<dyn DuplicateResolver> {
        match self {
            DuplicateStrategy::HighestConfidence => Box::new(HighestConfidence),
            DuplicateStrategy::GeometricScoring => Box::new(GeometricScoring { position_tolerance }),
            DuplicateStrategy::RejectDuplicates => Box::new(RejectDuplicates),
        }
    }
}

/// Groups markers by slot and resolves each slot to one point.
#[derive(Debug)]
pub struct CalibrationResolver {
    dart_class_id: u32,
    strategy: Box<dyn DuplicateResolver>,
}

impl CalibrationResolver {
    pub fn new(dart_class_id: u32, strategy: Box<dyn DuplicateResolver>) -> Self {
        Self {
            dart_class_id,
            strategy,
        }
    }

    pub fn from_params(dart_class_id: u32, params: &CalibrationParams) -> Self {
        Self::new(
            dart_class_id,
            params.strategy.build(params.position_tolerance),
        )
    }

    pub fn resolve(&self, markers: &[RawDetection]) -> CalibrationPoints {
        let mut groups: [Vec<RawDetection>; SLOT_COUNT] = Default::default();
        for m in markers {
            match class_to_slot(m.class_id, self.dart_class_id) {
                Some(slot) => groups[slot.index()].push(*m),
                None => log::debug!("class {} has no calibration slot", m.class_id),
            }
        }

        let mut points = CalibrationPoints::all_missing();
        for (slot, candidates) in CalibrationSlot::ALL.into_iter().zip(groups.iter()) {
            let chosen = match candidates.len() {
                0 => continue,
                1 => Some(0),
                n => {
                    let pick = self.strategy.select(slot, candidates);
                    log::debug!(
                        "slot {}: {} candidates, picked {:?}",
                        slot.label(),
                        n,
                        pick
                    );
                    pick
                }
            };
            let entry = match chosen.and_then(|i| candidates.get(i)) {
                Some(c) => CalibrationEntry::Valid(CalibrationPoint {
                    slot,
                    x: c.center_x,
                    y: c.center_y,
                    confidence: c.confidence,
                }),
                None => CalibrationEntry::Invalid {
                    slot,
                    reason: InvalidReason::Duplicate,
                },
            };
            points.set(entry);
        }
        points
    }
}

impl Default for CalibrationResolver {
    fn default() -> Self {
        Self::new(4, Box::new(HighestConfidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f64, x: f64, y: f64) -> RawDetection {
        RawDetection::new(class_id, confidence, x, y)
    }

    #[test]
    fn empty_input_gives_six_missing_slots() {
        let points = CalibrationResolver::default().resolve(&[]);
        assert_eq!(points.entries().len(), SLOT_COUNT);
        assert_eq!(points.valid_count(), 0);
        for (entry, slot) in points.entries().iter().zip(CalibrationSlot::ALL) {
            assert_eq!(
                *entry,
                CalibrationEntry::Invalid {
                    slot,
                    reason: InvalidReason::Missing
                }
            );
        }
    }

    #[test]
    fn single_candidates_fill_their_slots_in_slot_order() {
        let points = CalibrationResolver::default().resolve(&[
            det(6, 0.9, 0.8, 0.7),
            det(0, 0.8, 0.5, 0.1),
            det(5, 0.7, 0.2, 0.3),
        ]);
        assert_eq!(points.valid_count(), 3);
        assert_eq!(
            points.get(CalibrationSlot::Top20).point().map(|p| p.x),
            Some(0.5)
        );
        assert_eq!(
            points.get(CalibrationSlot::UpperLeft9).point().map(|p| p.x),
            Some(0.2)
        );
        assert_eq!(
            points.get(CalibrationSlot::LowerRight15).point().map(|p| p.x),
            Some(0.8)
        );
    }

    #[test]
    fn highest_confidence_picks_the_stronger_duplicate() {
        let r = CalibrationResolver::new(4, Box::new(HighestConfidence));
        let points = r.resolve(&[det(1, 0.7, 0.5, 0.9), det(1, 0.95, 0.52, 0.88)]);
        let p = points.get(CalibrationSlot::Bottom3).point().copied().expect("valid");
        assert_eq!(p.confidence, 0.95);
        assert_eq!(p.x, 0.52);
    }

    #[test]
    fn reject_on_duplicate_marks_the_slot() {
        let r = CalibrationResolver::new(4, Box::new(RejectDuplicates));
        let points = r.resolve(&[
            det(1, 0.7, 0.5, 0.9),
            det(1, 0.95, 0.52, 0.88),
            det(2, 0.9, 0.1, 0.5),
        ]);
        assert_eq!(
            *points.get(CalibrationSlot::Bottom3),
            CalibrationEntry::Invalid {
                slot: CalibrationSlot::Bottom3,
                reason: InvalidReason::Duplicate
            }
        );
        assert!(points.get(CalibrationSlot::Left11).point().is_some());
    }

    #[test]
    fn geometric_scoring_prefers_the_expected_position() {
        // Bottom3 is expected at 90°, i.e. straight below the center.
        let expected = CalibrationSlot::Bottom3.expected_position(EXPECTED_MARKER_RADIUS);
        let near = det(1, 0.7, expected.x + 0.01, expected.y);
        let far = det(1, 0.9, 0.15, 0.5);
        let strat = GeometricScoring::default();
        assert_eq!(strat.select(CalibrationSlot::Bottom3, &[far, near]), Some(1));
    }

    #[test]
    fn angle_score_wraps_through_zero() {
        let at = |deg: f64| {
            let a = f64::to_radians(deg);
            Point2::new(0.5 + 0.3 * a.cos(), 0.5 + 0.3 * a.sin())
        };
        // Top20 window is [350°, 10°].
        assert_eq!(GeometricScoring::angle_score(CalibrationSlot::Top20, at(355.0)), 1.0);
        assert_eq!(GeometricScoring::angle_score(CalibrationSlot::Top20, at(5.0)), 1.0);
        let s = GeometricScoring::angle_score(CalibrationSlot::Top20, at(32.5));
        assert!((s - 0.5).abs() < 1e-9, "s = {s}");
        let s = GeometricScoring::angle_score(CalibrationSlot::Top20, at(327.5));
        assert!((s - 0.5).abs() < 1e-9, "s = {s}");
        assert_eq!(GeometricScoring::angle_score(CalibrationSlot::Top20, at(180.0)), 0.0);
    }

    #[test]
    fn geometric_windows_follow_upright_layout_not_reference_points() {
        // The true Top20 marker sits on the reference wire near 261°, outside
        // its [350°, 10°] window; a candidate at the nominal 0° spot wins.
        let reference = dartscore_core::BoardGeometry::default().reference_points()
            [CalibrationSlot::Top20.index()];
        let nominal = CalibrationSlot::Top20.expected_position(EXPECTED_MARKER_RADIUS);
        let candidates = [
            det(0, 0.9, reference.x, reference.y),
            det(0, 0.7, nominal.x, nominal.y),
        ];

        let strategy = DuplicateStrategy::GeometricScoring.build(0.15);
        assert_eq!(strategy.select(CalibrationSlot::Top20, &candidates), Some(1));
        assert_eq!(
            GeometricScoring::angle_score(CalibrationSlot::Top20, reference),
            0.0
        );
    }

    #[test]
    fn override_replaces_detected_and_missing_slots() {
        let mut points = CalibrationResolver::default().resolve(&[det(0, 0.9, 0.5, 0.1)]);
        let mut pins = CalibrationOverride::default();
        pins.pin(CalibrationSlot::Top20, 0.49, 0.11)
            .pin(CalibrationSlot::Right6, 0.9, 0.45)
            .pin(CalibrationSlot::Right6, 0.91, 0.46);
        assert_eq!(pins.points.len(), 2);

        points.apply_override(&pins);
        assert_eq!(points.valid_count(), 2);
        let top = points.get(CalibrationSlot::Top20).point().copied().expect("valid");
        assert_eq!((top.x, top.y, top.confidence), (0.49, 0.11, 1.0));
        let right = points.get(CalibrationSlot::Right6).point().copied().expect("valid");
        assert_eq!(right.x, 0.91);
    }

    #[test]
    fn resolution_is_stable_for_identical_input() {
        let input = [
            det(3, 0.8, 0.9, 0.5),
            det(3, 0.8, 0.88, 0.52),
            det(2, 0.7, 0.1, 0.5),
        ];
        let r = CalibrationResolver::from_params(4, &CalibrationParams::default());
        assert_eq!(r.resolve(&input), r.resolve(&input));
    }
}
