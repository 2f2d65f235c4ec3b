//! Core geometry for dartboard scoring.
//!
//! This crate is small and purely geometric: board dimensions and the six
//! calibration slots, planar homographies with a deterministic consensus
//! fit, the image-to-board coordinate mapping, and segment scoring. It knows
//! nothing about detectors, sessions, or visits.

mod board;
mod consensus;
mod homography;
mod logger;
mod scoring;
mod transform;

pub use board::{board_center, BoardGeometry, CalibrationSlot, BOARD_CENTER, SLOT_COUNT};
pub use consensus::{estimate_homography_consensus, ConsensusHomography, ConsensusParams};
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use scoring::{
    score_position, BoardScorer, ScoreRegion, ScoreResult, ANGLE_EPSILON, BULL_VALUE,
};
pub use transform::{transform_points, CoordinateTransformer, DEFAULT_WORKING_SIZE_PX};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
