use serde::{Deserialize, Serialize};

use crate::resolver::DuplicateStrategy;

/// Configuration for splitting raw detections into darts and markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Detector class reserved for darts. Marker classes above it are shifted
    /// down by one when mapped to calibration slots.
    pub dart_class_id: u32,
    /// Calibration markers below this confidence are dropped.
    pub calibration_confidence_threshold: f64,
    /// Darts beyond this count (in detection order) are dropped with a warning.
    pub max_allowed_darts: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            dart_class_id: 4,
            calibration_confidence_threshold: 0.6,
            max_allowed_darts: 3,
        }
    }
}

/// Configuration for slot resolution and homography estimation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Fewer valid slots than this fails the frame.
    pub min_calibration_points: usize,
    /// How to pick one marker when a slot has several candidates.
    pub strategy: DuplicateStrategy,
    /// Distance (normalized image units) at which the geometric strategy's
    /// position score drops to zero.
    pub position_tolerance: f64,
    /// Side of the square pixel frame the homography is estimated in.
    pub working_size_px: f64,
    /// Max transfer error in pixels for a marker to count as an inlier.
    pub reprojection_threshold_px: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            min_calibration_points: 4,
            strategy: DuplicateStrategy::HighestConfidence,
            position_tolerance: 0.15,
            working_size_px: 800.0,
            reprojection_threshold_px: 3.0,
        }
    }
}
