//! JSON frame logs replayed by the command line tool.

use std::fs;
use std::path::Path;

use dartscore_calib::{CalibrationOverride, RawDetection};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Detections recorded for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub detections: Vec<RawDetection>,
}

/// A recorded session: frames in capture order plus optional pinned markers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLog {
    #[serde(default)]
    pub calibration_override: CalibrationOverride,
    pub frames: Vec<Frame>,
}

impl FrameLog {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
