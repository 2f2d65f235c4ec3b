use dartscore_calib::{CalibrationPoints, HomographyMatrix};
use dartscore_core::ScoreResult;
use dartscore_visit::VisitPhase;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::error::{PipelineError, ResultCode};

/// A stable dart with its score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DartDetection {
    /// Mean image position it was seen at; `None` for manually added darts.
    pub original_position: Option<Point2<f64>>,
    /// Board-space position.
    pub transformed_position: Point2<f64>,
    pub confidence: f64,
    pub score: ScoreResult,
}

/// Result of one scoring request.
///
/// On failure every field except `code`, `message`, the calibration points
/// (when they were resolved), the timing, and the visit phase keeps its
/// zero value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub code: ResultCode,
    pub message: String,
    pub calibration_points: CalibrationPoints,
    pub homography_point_count: usize,
    /// Row-major image-to-board matrix in working-frame pixels.
    pub homography: Option<[[f64; 3]; 3]>,
    pub darts: Vec<DartDetection>,
    pub total_score: u32,
    pub processing_time_ms: f64,
    pub visit_phase: VisitPhase,
}

impl DetectionResult {
    pub(crate) fn empty() -> Self {
        Self {
            code: ResultCode::Success,
            message: String::new(),
            calibration_points: CalibrationPoints::all_missing(),
            homography_point_count: 0,
            homography: None,
            darts: Vec::new(),
            total_score: 0,
            processing_time_ms: 0.0,
            visit_phase: VisitPhase::Accumulating,
        }
    }

    pub(crate) fn set_calibration(&mut self, matrix: &HomographyMatrix) {
        self.homography_point_count = matrix.point_count;
        self.homography = Some(matrix.to_array());
    }

    pub(crate) fn set_darts(&mut self, darts: Vec<DartDetection>) {
        self.total_score = darts.iter().map(|d| d.score.score_value).sum();
        self.message = format!("Successfully detected {} darts", darts.len());
        self.darts = darts;
    }

    /// Replace the outcome with `err`, clearing everything it invalidates.
    pub(crate) fn fail(&mut self, err: &PipelineError) {
        let code = ResultCode::from(err);
        self.code = code;
        self.message = format!("{}: {}", code.message(), err);
        self.homography_point_count = 0;
        self.homography = None;
        self.darts.clear();
        self.total_score = 0;
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Result of a calibration-only request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub code: ResultCode,
    pub message: String,
    pub calibration_points: CalibrationPoints,
    pub point_count: usize,
    pub homography: Option<[[f64; 3]; 3]>,
    /// RMS transfer error of the fit in working-frame pixels.
    pub rms_px: Option<f64>,
    pub processing_time_ms: f64,
}

impl CalibrationReport {
    pub(crate) fn empty() -> Self {
        Self {
            code: ResultCode::Success,
            message: String::new(),
            calibration_points: CalibrationPoints::all_missing(),
            point_count: 0,
            homography: None,
            rms_px: None,
            processing_time_ms: 0.0,
        }
    }

    pub(crate) fn set_calibration(&mut self, matrix: &HomographyMatrix) {
        self.point_count = matrix.point_count;
        self.homography = Some(matrix.to_array());
        self.rms_px = Some(matrix.rms_px);
        self.message = format!("Calibrated from {} points", matrix.point_count);
    }

    pub(crate) fn fail(&mut self, err: &PipelineError) {
        let code = ResultCode::from(err);
        self.code = code;
        self.message = format!("{}: {}", code.message(), err);
        self.point_count = 0;
        self.homography = None;
        self.rms_px = None;
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
