//! Raw detector output and the dart / marker split.

use dartscore_core::CalibrationSlot;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::params::ClassifierParams;

/// One object reported by the upstream detector, in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl RawDetection {
    pub fn new(class_id: u32, confidence: f64, center_x: f64, center_y: f64) -> Self {
        Self {
            class_id,
            confidence,
            center_x,
            center_y,
        }
    }

    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.center_x, self.center_y)
    }

    /// All fields finite and confidence in `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Calibration slot for a detector class, skipping the dart class.
///
/// Returns `None` for the dart class itself and for classes past the last slot.
pub fn class_to_slot(class_id: u32, dart_class_id: u32) -> Option<CalibrationSlot> {
    if class_id == dart_class_id {
        return None;
    }
    let index = if class_id > dart_class_id {
        class_id - 1
    } else {
        class_id
    };
    CalibrationSlot::from_index(index as usize)
}

/// Detections split by role.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassifiedDetections {
    /// Dart candidates in detection order, capped at the configured maximum.
    pub darts: Vec<RawDetection>,
    /// Calibration markers that passed the confidence threshold.
    pub calibration: Vec<RawDetection>,
    /// Darts dropped by the cap.
    pub dropped_darts: usize,
}

/// Splits detections into darts and calibration markers.
#[derive(Clone, Debug, Default)]
pub struct DetectionClassifier {
    params: ClassifierParams,
}

impl DetectionClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn classify(&self, detections: &[RawDetection]) -> ClassifiedDetections {
        let mut out = ClassifiedDetections::default();
        for det in detections {
            if det.class_id == self.params.dart_class_id {
                out.darts.push(*det);
            } else if det.confidence >= self.params.calibration_confidence_threshold {
                out.calibration.push(*det);
            }
        }

        let max = self.params.max_allowed_darts;
        if out.darts.len() > max {
            log::warn!(
                "{} darts detected, keeping the first {}",
                out.darts.len(),
                max
            );
            out.dropped_darts = out.darts.len() - max;
            out.darts.truncate(max);
        }
        out
    }
}
