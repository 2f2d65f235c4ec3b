use dartscore_calib::RawDetection;

use super::error::BoxError;

/// Object detector that runs ahead of the pipeline.
///
/// Implementations own image decoding, resizing, and model inference; the
/// pipeline only sees the normalized detections they return.
pub trait UpstreamDetector {
    type Frame: ?Sized;

    fn detect(&self, frame: &Self::Frame) -> Result<Vec<RawDetection>, BoxError>;
}

/// Passes through detections recorded earlier, e.g. from a frame log.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplayDetector;

impl UpstreamDetector for ReplayDetector {
    type Frame = [RawDetection];

    fn detect(&self, frame: &[RawDetection]) -> Result<Vec<RawDetection>, BoxError> {
        Ok(frame.to_vec())
    }
}
