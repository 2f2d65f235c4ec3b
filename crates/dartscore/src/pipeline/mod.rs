//! Frame-level orchestration: classify, calibrate, stabilize, score.

mod detector;
mod error;
mod orchestrator;
mod result;

pub use detector::{ReplayDetector, UpstreamDetector};
pub use error::{BoxError, PipelineError, ResultCode};
pub use orchestrator::ScoringPipeline;
pub use result::{CalibrationReport, DartDetection, DetectionResult};
