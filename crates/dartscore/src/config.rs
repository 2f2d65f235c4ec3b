//! Pipeline configuration and its JSON form.

use std::fs;
use std::path::Path;

use dartscore_calib::{CalibrationParams, ClassifierParams};
use dartscore_core::{BoardGeometry, SLOT_COUNT};
use dartscore_visit::{StabilizerParams, StabilizerProfile, MAX_DARTS};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the scoring pipeline can be tuned with.
///
/// Missing JSON fields fall back to their defaults, so a config file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub board: BoardGeometry,
    pub classifier: ClassifierParams,
    pub calibration: CalibrationParams,
    pub stabilizer: StabilizerParams,
    /// Darts below this confidence are ignored; `0.0` keeps all of them.
    pub dart_confidence_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            board: BoardGeometry::default(),
            classifier: ClassifierParams::default(),
            calibration: CalibrationParams::default(),
            stabilizer: StabilizerParams::default(),
            dart_confidence_threshold: 0.1,
        }
    }
}

fn unit_interval(name: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {v}")))
    }
}

fn positive(name: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
    }
}

impl PipelineConfig {
    /// Defaults with the stabilizer tuned for `profile`.
    pub fn for_profile(profile: StabilizerProfile) -> Self {
        Self {
            stabilizer: StabilizerParams::for_profile(profile),
            ..Self::default()
        }
    }

    /// Load a JSON config from disk and validate it.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.board.is_valid() {
            return Err(ConfigError::Invalid(
                "board dimensions must be finite and strictly nested".into(),
            ));
        }

        unit_interval(
            "classifier.calibration_confidence_threshold",
            self.classifier.calibration_confidence_threshold,
        )?;
        unit_interval("dart_confidence_threshold", self.dart_confidence_threshold)?;
        if self.classifier.max_allowed_darts == 0 {
            return Err(ConfigError::Invalid(
                "classifier.max_allowed_darts must be at least 1".into(),
            ));
        }

        let cal = &self.calibration;
        if !(4..=SLOT_COUNT).contains(&cal.min_calibration_points) {
            return Err(ConfigError::Invalid(format!(
                "calibration.min_calibration_points must be in 4..={SLOT_COUNT}, got {}",
                cal.min_calibration_points
            )));
        }
        positive("calibration.position_tolerance", cal.position_tolerance)?;
        positive("calibration.working_size_px", cal.working_size_px)?;
        positive(
            "calibration.reprojection_threshold_px",
            cal.reprojection_threshold_px,
        )?;

        let st = &self.stabilizer;
        positive("stabilizer.similarity_threshold", st.similarity_threshold)?;
        if st.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "stabilizer.buffer_size must be at least 1".into(),
            ));
        }
        if st.repeat_threshold == 0 || st.repeat_threshold > st.buffer_size * MAX_DARTS {
            return Err(ConfigError::Invalid(format!(
                "stabilizer.repeat_threshold must be in 1..={}, got {}",
                st.buffer_size * MAX_DARTS,
                st.repeat_threshold
            )));
        }
        if st.removal_empty_frames == 0 {
            return Err(ConfigError::Invalid(
                "stabilizer.removal_empty_frames must be at least 1".into(),
            ));
        }
        if !(1..=MAX_DARTS).contains(&st.max_darts) {
            return Err(ConfigError::Invalid(format!(
                "stabilizer.max_darts must be in 1..={MAX_DARTS}, got {}",
                st.max_darts
            )));
        }
        Ok(())
    }
}
