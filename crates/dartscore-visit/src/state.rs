use dartscore_core::board_center;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::params::StabilizerParams;
use crate::ring::FrameRing;

/// One dart sighting in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameDart {
    /// Normalized board-space position.
    pub board: Point2<f64>,
    /// Normalized image position it was detected at.
    pub image: Point2<f64>,
    pub confidence: f64,
}

impl FrameDart {
    pub fn new(board: Point2<f64>, image: Point2<f64>, confidence: f64) -> Self {
        Self {
            board,
            image,
            confidence,
        }
    }

    /// A sighting with no image information, e.g. from a replayed board log.
    pub fn board_only(board: Point2<f64>) -> Self {
        Self::new(board, board, 1.0)
    }
}

/// A dart accepted into the current visit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StableDart {
    /// Centroid of the sightings, board space.
    pub position: Point2<f64>,
    /// Mean image position of the sightings; `None` for manual darts.
    pub image_position: Option<Point2<f64>>,
    /// Mean detector confidence of the sightings.
    pub confidence: f64,
    /// Sightings that backed the promotion.
    pub sightings: usize,
}

impl StableDart {
    pub fn is_manual(&self) -> bool {
        self.image_position.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitPhase {
    /// Collecting darts; fewer than the visit's capacity are stable.
    #[default]
    Accumulating,
    /// The visit was committed and waits for the board to be cleared.
    AwaitingRemoval,
}

/// State of one camera session's current visit.
///
/// Owned by the session and handed to [`crate::PredictionStabilizer::update`]
/// for every frame, one frame at a time.
#[derive(Clone, Debug)]
pub struct VisitState {
    pub(crate) stable_darts: Vec<StableDart>,
    pub(crate) frames: FrameRing,
    pub(crate) phase: VisitPhase,
    pub(crate) empty_streak: usize,
    capacity: usize,
}

impl VisitState {
    pub fn new(params: &StabilizerParams) -> Self {
        let capacity = params.dart_capacity();
        Self {
            stable_darts: Vec::with_capacity(capacity),
            frames: FrameRing::new(params.buffer_size),
            phase: VisitPhase::Accumulating,
            empty_streak: 0,
            capacity,
        }
    }

    pub fn stable_darts(&self) -> &[StableDart] {
        &self.stable_darts
    }

    pub fn phase(&self) -> VisitPhase {
        self.phase
    }

    pub fn frames(&self) -> &FrameRing {
        &self.frames
    }

    /// Darts this visit can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.stable_darts.len() >= self.capacity
    }

    /// Consecutive all-empty frames seen while awaiting removal.
    pub fn empty_streak(&self) -> usize {
        self.empty_streak
    }

    /// Close the visit once it is full. Returns `false` and changes nothing otherwise.
    pub fn commit(&mut self) -> bool {
        if !self.is_full() || self.phase == VisitPhase::AwaitingRemoval {
            return false;
        }
        log::info!("visit committed with {} darts", self.stable_darts.len());
        self.phase = VisitPhase::AwaitingRemoval;
        self.empty_streak = 0;
        true
    }

    /// Add a dart at the bull for one the camera missed.
    ///
    /// Returns `false` if the visit is already full.
    pub fn add_manual_dart(&mut self) -> bool {
        if self.is_full() {
            log::warn!("visit already holds {} darts", self.stable_darts.len());
            return false;
        }
        self.stable_darts.push(StableDart {
            position: board_center(),
            image_position: None,
            confidence: 1.0,
            sightings: 0,
        });
        log::info!("manual dart added ({} in visit)", self.stable_darts.len());
        true
    }

    /// Drop all darts and buffered frames and start a new visit.
    pub fn reset(&mut self) {
        self.stable_darts.clear();
        self.frames.clear();
        self.phase = VisitPhase::Accumulating;
        self.empty_streak = 0;
    }
}

impl Default for VisitState {
    fn default() -> Self {
        Self::new(&StabilizerParams::default())
    }
}
