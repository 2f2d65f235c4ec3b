//! Calibration of a dartboard camera from detected rim markers.
//!
//! Raw detections are split into darts and markers ([`DetectionClassifier`]),
//! markers are assigned to the six board slots ([`CalibrationResolver`]),
//! and the slots are fitted to their canonical board positions
//! ([`HomographyEstimator`]).
//!
//! ```
//! use dartscore_calib::{CalibrationResolver, DetectionClassifier, RawDetection};
//!
//! let frame = [
//!     RawDetection::new(0, 0.92, 0.44, 0.13),
//!     RawDetection::new(4, 0.81, 0.52, 0.40),
//! ];
//! let split = DetectionClassifier::default().classify(&frame);
//! let points = CalibrationResolver::default().resolve(&split.calibration);
//! assert_eq!(split.darts.len(), 1);
//! assert_eq!(points.valid_count(), 1);
//! ```

mod detection;
mod error;
mod estimator;
mod params;
mod resolver;

pub use detection::{class_to_slot, ClassifiedDetections, DetectionClassifier, RawDetection};
pub use error::CalibrationError;
pub use estimator::{HomographyEstimator, HomographyMatrix};
pub use params::{CalibrationParams, ClassifierParams};
pub use resolver::{
    CalibrationEntry, CalibrationOverride, CalibrationPoint, CalibrationPoints,
    CalibrationResolver, DuplicateResolver, DuplicateStrategy, GeometricScoring,
    HighestConfidence, InvalidReason, PinnedPoint, RejectDuplicates, EXPECTED_MARKER_RADIUS,
};
