//! Promotion of recurring dart sightings into a stable visit.

use nalgebra::{Point2, Vector2};

use crate::params::{StabilizerParams, MAX_DARTS};
use crate::ring::FrameSlots;
use crate::state::{FrameDart, StableDart, VisitPhase, VisitState};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What one call to [`PredictionStabilizer::update`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StabilizerUpdate {
    /// Darts promoted by this frame.
    pub promoted: usize,
    /// The committed visit ended because the board was cleared.
    pub visit_reset: bool,
}

/// Sightings grouped around the first one that opened the group.
#[derive(Debug)]
struct Cluster {
    seed: Point2<f64>,
    board_sum: Vector2<f64>,
    image_sum: Vector2<f64>,
    confidence_sum: f64,
    count: usize,
}

impl Cluster {
    fn new(d: &FrameDart) -> Self {
        Self {
            seed: d.board,
            board_sum: d.board.coords,
            image_sum: d.image.coords,
            confidence_sum: d.confidence,
            count: 1,
        }
    }

    fn add(&mut self, d: &FrameDart) {
        self.board_sum += d.board.coords;
        self.image_sum += d.image.coords;
        self.confidence_sum += d.confidence;
        self.count += 1;
    }

    fn to_stable(&self) -> StableDart {
        let n = self.count as f64;
        StableDart {
            position: Point2::from(self.board_sum / n),
            image_position: Some(Point2::from(self.image_sum / n)),
            confidence: self.confidence_sum / n,
            sightings: self.count,
        }
    }
}

/// Greedy grouping: each sighting joins the first cluster whose seed is
/// closer than `threshold`, otherwise it seeds a new one.
fn cluster<'a>(sightings: impl Iterator<Item = &'a FrameDart>, threshold: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for d in sightings {
        match clusters
            .iter_mut()
            .find(|c| (d.board - c.seed).norm() < threshold)
        {
            Some(c) => c.add(d),
            None => clusters.push(Cluster::new(d)),
        }
    }
    clusters
}

/// Turns per-frame dart sightings into a visit of at most three darts.
///
/// Holds only configuration; all per-session state lives in [`VisitState`].
#[derive(Clone, Debug, Default)]
pub struct PredictionStabilizer {
    params: StabilizerParams,
}

impl PredictionStabilizer {
    pub fn new(params: StabilizerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StabilizerParams {
        &self.params
    }

    /// A fresh visit sized for these params.
    pub fn new_visit(&self) -> VisitState {
        VisitState::new(&self.params)
    }

    /// Feed one frame of board-space sightings.
    ///
    /// Sightings with non-finite positions are ignored and at most
    /// [`MAX_DARTS`] are kept per frame. Never fails.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(sightings = frame.len()))
    )]
    pub fn update(&self, state: &mut VisitState, frame: &[FrameDart]) -> StabilizerUpdate {
        let mut slots: FrameSlots = [None; MAX_DARTS];
        let finite = frame
            .iter()
            .filter(|d| d.board.x.is_finite() && d.board.y.is_finite());
        for (slot, d) in slots.iter_mut().zip(finite) {
            *slot = Some(*d);
        }
        let frame_is_empty = slots.iter().all(Option::is_none);
        state.frames.push(slots);

        match state.phase {
            VisitPhase::AwaitingRemoval => self.watch_for_removal(state, frame_is_empty),
            VisitPhase::Accumulating => StabilizerUpdate {
                promoted: self.promote(state),
                visit_reset: false,
            },
        }
    }

    fn watch_for_removal(&self, state: &mut VisitState, frame_is_empty: bool) -> StabilizerUpdate {
        if frame_is_empty {
            state.empty_streak += 1;
        } else {
            state.empty_streak = 0;
        }
        log::debug!(
            "awaiting removal: {} empty frame(s) in a row",
            state.empty_streak
        );

        if state.empty_streak >= self.params.removal_empty_frames.max(1) {
            log::info!("darts removed, starting a new visit");
            state.reset();
            return StabilizerUpdate {
                promoted: 0,
                visit_reset: true,
            };
        }
        StabilizerUpdate::default()
    }

    fn promote(&self, state: &mut VisitState) -> usize {
        if state.is_full() {
            return 0;
        }
        let threshold = self.params.similarity_threshold;
        let repeat = self.params.repeat_threshold.max(1);

        let clusters = cluster(state.frames.sightings(), threshold);
        let mut promoted = 0;
        for c in clusters.iter().filter(|c| c.count >= repeat) {
            if state.is_full() {
                break;
            }
            let candidate = c.to_stable();
            let known = state
                .stable_darts
                .iter()
                .any(|s| (s.position - candidate.position).norm() < threshold);
            if known {
                continue;
            }
            log::info!(
                "dart {} stable at ({:.4}, {:.4}) after {} sightings",
                state.stable_darts.len() + 1,
                candidate.position.x,
                candidate.position.y,
                candidate.sightings
            );
            state.stable_darts.push(candidate);
            promoted += 1;
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::StabilizerProfile;
    use approx::assert_relative_eq;

    fn at(x: f64, y: f64) -> FrameDart {
        FrameDart::new(Point2::new(x, y), Point2::new(x + 0.1, y - 0.1), 0.8)
    }

    fn live() -> PredictionStabilizer {
        PredictionStabilizer::new(StabilizerParams::for_profile(StabilizerProfile::LiveVideo))
    }

    #[test]
    fn dart_becomes_stable_after_repeat_threshold_frames() {
        let s = live();
        let mut v = s.new_visit();
        assert_eq!(s.update(&mut v, &[at(0.4, 0.3)]).promoted, 0);
        assert_eq!(s.update(&mut v, &[at(0.401, 0.3)]).promoted, 0);
        assert_eq!(s.update(&mut v, &[at(0.402, 0.3)]).promoted, 1);
        assert_eq!(v.stable_darts().len(), 1);

        let d = v.stable_darts()[0];
        assert_relative_eq!(d.position.x, 0.401, epsilon = 1e-12);
        assert_relative_eq!(d.position.y, 0.3, epsilon = 1e-12);
        let img = d.image_position.expect("detected dart");
        assert_relative_eq!(img.y, 0.2, epsilon = 1e-12);
        assert_eq!(d.sightings, 3);

        // Seeing it again adds nothing.
        assert_eq!(s.update(&mut v, &[at(0.4, 0.3)]).promoted, 0);
        assert_eq!(v.stable_darts().len(), 1);
    }

    #[test]
    fn static_profile_promotes_on_first_sighting() {
        let s = PredictionStabilizer::new(StabilizerParams::for_profile(
            StabilizerProfile::StaticImage,
        ));
        let mut v = s.new_visit();
        let up = s.update(&mut v, &[at(0.5, 0.5), at(0.5, 0.27), at(0.45, 0.63)]);
        assert_eq!(up.promoted, 3);
        assert!(v.is_full());
    }

    #[test]
    fn flicker_is_not_promoted() {
        let s = live();
        let mut v = s.new_visit();
        s.update(&mut v, &[at(0.2, 0.2)]);
        s.update(&mut v, &[at(0.6, 0.6)]);
        s.update(&mut v, &[at(0.2, 0.7)]);
        s.update(&mut v, &[]);
        assert!(v.stable_darts().is_empty());
    }

    #[test]
    fn sightings_outside_the_buffer_are_forgotten() {
        let s = live();
        let mut v = s.new_visit();
        s.update(&mut v, &[at(0.3, 0.3)]);
        s.update(&mut v, &[at(0.3, 0.3)]);
        for _ in 0..5 {
            s.update(&mut v, &[]);
        }
        s.update(&mut v, &[at(0.3, 0.3)]);
        assert!(v.stable_darts().is_empty());
    }

    #[test]
    fn visit_is_capped_at_three() {
        let s = PredictionStabilizer::new(StabilizerParams::for_profile(
            StabilizerProfile::StaticImage,
        ));
        let mut v = s.new_visit();
        s.update(&mut v, &[at(0.3, 0.3), at(0.6, 0.6)]);
        s.update(&mut v, &[at(0.7, 0.2), at(0.2, 0.7)]);
        assert_eq!(v.stable_darts().len(), 3);
        assert_eq!(v.stable_darts()[2].position, Point2::new(0.7, 0.2));
    }

    #[test]
    fn cleared_board_ends_a_committed_visit() {
        let s = live();
        let mut v = s.new_visit();
        let three = [at(0.3, 0.3), at(0.6, 0.6), at(0.7, 0.2)];
        for _ in 0..3 {
            s.update(&mut v, &three);
        }
        assert!(v.is_full());
        assert!(v.commit());

        assert!(!s.update(&mut v, &[]).visit_reset);
        // A dart reappearing interrupts the streak.
        assert!(!s.update(&mut v, &[at(0.3, 0.3)]).visit_reset);
        assert!(!s.update(&mut v, &[]).visit_reset);
        assert!(!s.update(&mut v, &[]).visit_reset);
        let up = s.update(&mut v, &[]);
        assert!(up.visit_reset);
        assert!(v.stable_darts().is_empty());
        assert!(v.frames().is_empty());
        assert_eq!(v.phase(), VisitPhase::Accumulating);
    }

    #[test]
    fn uncommitted_full_visit_is_not_reset_by_empty_frames() {
        let s = PredictionStabilizer::new(StabilizerParams::for_profile(
            StabilizerProfile::StaticImage,
        ));
        let mut v = s.new_visit();
        s.update(&mut v, &[at(0.3, 0.3), at(0.6, 0.6), at(0.7, 0.2)]);
        for _ in 0..4 {
            assert!(!s.update(&mut v, &[]).visit_reset);
        }
        assert_eq!(v.stable_darts().len(), 3);
    }

    #[test]
    fn non_finite_sightings_are_ignored() {
        let s = PredictionStabilizer::new(StabilizerParams::for_profile(
            StabilizerProfile::StaticImage,
        ));
        let mut v = s.new_visit();
        let up = s.update(&mut v, &[at(f64::NAN, 0.3), at(0.4, 0.4)]);
        assert_eq!(up.promoted, 1);
        assert_eq!(v.stable_darts()[0].position, Point2::new(0.4, 0.4));
    }

    #[test]
    fn manual_dart_counts_toward_the_visit() {
        let s = PredictionStabilizer::new(StabilizerParams::for_profile(
            StabilizerProfile::StaticImage,
        ));
        let mut v = s.new_visit();
        assert!(v.add_manual_dart());
        s.update(&mut v, &[at(0.3, 0.3), at(0.6, 0.6), at(0.7, 0.2)]);
        assert_eq!(v.stable_darts().len(), 3);
        assert!(v.stable_darts()[0].is_manual());
    }
}
