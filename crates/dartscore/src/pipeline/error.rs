use dartscore_calib::CalibrationError;
use serde::{Deserialize, Serialize};

/// Boxed error returned by an upstream detector.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can stop a frame from being scored.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("upstream detector failed: {0}")]
    UpstreamDetection(#[source] BoxError),
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

/// Outcome code carried by every result, stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResultCode {
    Success,
    UpstreamDetection,
    Homography,
    MissingCalibrationPoints,
    InvalidInput,
    Unknown,
}

impl ResultCode {
    pub fn value(self) -> u16 {
        match self {
            ResultCode::Success => 0,
            ResultCode::UpstreamDetection => 1,
            ResultCode::Homography => 2,
            ResultCode::MissingCalibrationPoints => 3,
            ResultCode::InvalidInput => 4,
            ResultCode::Unknown => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ResultCode::Success => "Successful dart detection",
            ResultCode::UpstreamDetection => "Upstream detector inference failed",
            ResultCode::Homography => "Homography matrix calculation failed",
            ResultCode::MissingCalibrationPoints => "Not enough calibration points detected",
            ResultCode::InvalidInput => "Invalid input data provided",
            ResultCode::Unknown => "Unknown error",
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<ResultCode> for u16 {
    fn from(code: ResultCode) -> Self {
        code.value()
    }
}

impl TryFrom<u16> for ResultCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ResultCode::Success,
            1 => ResultCode::UpstreamDetection,
            2 => ResultCode::Homography,
            3 => ResultCode::MissingCalibrationPoints,
            4 => ResultCode::InvalidInput,
            100 => ResultCode::Unknown,
            other => return Err(format!("unknown result code {other}")),
        })
    }
}

impl From<&PipelineError> for ResultCode {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(_) => ResultCode::InvalidInput,
            PipelineError::Calibration(CalibrationError::MissingCalibrationPoints { .. }) => {
                ResultCode::MissingCalibrationPoints
            }
            PipelineError::Calibration(CalibrationError::Homography { .. }) => {
                ResultCode::Homography
            }
            PipelineError::UpstreamDetection(_) => ResultCode::UpstreamDetection,
            PipelineError::Unknown(_) => ResultCode::Unknown,
        }
    }
}
