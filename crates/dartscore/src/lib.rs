//! Facade crate for the `dartscore-*` workspace.
//!
//! Turns the detections of an upstream object detector (darts plus six rim
//! calibration markers, in normalized image coordinates) into calibrated
//! board positions and dart scores, and keeps a per-session visit of up to
//! three stable darts across video frames.
//!
//! ## Quickstart
//!
//! ```
//! use dartscore::{PipelineConfig, RawDetection, ResultCode, ScoringPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ScoringPipeline::new(PipelineConfig::default())?;
//!
//! // No calibration markers: the frame cannot be mapped onto the board.
//! let result = pipeline.score_frame(&[RawDetection::new(4, 0.9, 0.5, 0.5)]);
//! assert_eq!(result.code, ResultCode::MissingCalibrationPoints);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dartscore::core`: board geometry, scoring, homographies.
//! - `dartscore::calib`: detection classification, slot resolution, calibration.
//! - `dartscore::visit`: multi-frame dart stabilization and visit state.
//! - [`ScoringPipeline`]: the end-to-end orchestration over all three.

pub use dartscore_calib as calib;
pub use dartscore_core as core;
pub use dartscore_visit as visit;

pub use dartscore_calib::{
    CalibrationOverride, CalibrationPoints, DuplicateStrategy, HomographyMatrix, RawDetection,
};
pub use dartscore_core::{BoardGeometry, CalibrationSlot, ScoreRegion, ScoreResult};
pub use dartscore_visit::{StabilizerProfile, VisitPhase, VisitState};

pub mod config;
pub mod io;
mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{
    BoxError, CalibrationReport, DartDetection, DetectionResult, PipelineError, ReplayDetector,
    ResultCode, ScoringPipeline, UpstreamDetector,
};

/// Install a `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    dartscore_core::init_tracing(json);
    // No-op when the subscriber already bridged `log`.
    let _ = tracing_log::LogTracer::init();
}
