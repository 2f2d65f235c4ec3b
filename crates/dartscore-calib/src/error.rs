/// Errors returned while estimating the image-to-board transform.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("not enough calibration points (found {found}, need {required})")]
    MissingCalibrationPoints { found: usize, required: usize },
    #[error("homography estimation failed: {reason}")]
    Homography { reason: String },
}
