use serde::{Deserialize, Serialize};

/// Upper bound on darts in one visit and on darts kept per frame.
pub const MAX_DARTS: usize = 3;

/// Preset thresholds for the two ways frames arrive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizerProfile {
    /// A single still image per visit: one sighting promotes a dart.
    StaticImage,
    /// A camera stream: a dart must be seen in three buffered frames.
    #[default]
    LiveVideo,
}

impl StabilizerProfile {
    pub fn repeat_threshold(self) -> usize {
        match self {
            StabilizerProfile::StaticImage => 1,
            StabilizerProfile::LiveVideo => 3,
        }
    }
}

/// Configuration for [`crate::PredictionStabilizer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// Board-space distance below which two sightings are the same dart.
    pub similarity_threshold: f64,
    /// Number of frames kept in the ring buffer.
    pub buffer_size: usize,
    /// Sightings within the buffer needed before a dart becomes stable.
    pub repeat_threshold: usize,
    /// Consecutive all-empty frames that end a committed visit.
    pub removal_empty_frames: usize,
    /// Darts per visit, at most [`MAX_DARTS`].
    pub max_darts: usize,
}

impl StabilizerParams {
    pub fn for_profile(profile: StabilizerProfile) -> Self {
        Self {
            similarity_threshold: 0.01,
            buffer_size: 5,
            repeat_threshold: profile.repeat_threshold(),
            removal_empty_frames: 3,
            max_darts: MAX_DARTS,
        }
    }

    /// `max_darts` clamped to `1..=MAX_DARTS`.
    pub fn dart_capacity(&self) -> usize {
        self.max_darts.clamp(1, MAX_DARTS)
    }
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self::for_profile(StabilizerProfile::default())
    }
}
