//! Image-to-board homography from resolved calibration slots.

use dartscore_core::{
    estimate_homography_consensus, BoardGeometry, CalibrationSlot, ConsensusParams,
    CoordinateTransformer, Homography, SLOT_COUNT,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::params::CalibrationParams;
use crate::resolver::CalibrationPoints;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Estimated transform from working-frame image pixels to board pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomographyMatrix {
    pub homography: Homography,
    /// Calibration points the final fit agrees with.
    pub point_count: usize,
    /// Slots whose markers are inliers of the fit.
    pub inlier_slots: Vec<CalibrationSlot>,
    /// RMS transfer error over the inliers, in working-frame pixels.
    pub rms_px: f64,
    pub working_size_px: f64,
}

impl HomographyMatrix {
    pub fn transformer(&self) -> CoordinateTransformer {
        CoordinateTransformer::new(self.homography, self.working_size_px)
    }

    /// Row-major 3x3 matrix.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        self.homography.to_array()
    }
}

/// Fits the homography between resolved slots and their canonical board positions.
#[derive(Clone, Debug)]
pub struct HomographyEstimator {
    min_points: usize,
    working_size_px: f64,
    consensus: ConsensusParams,
    /// Canonical slot positions in working-frame pixels.
    references_px: [Point2<f64>; SLOT_COUNT],
}

impl HomographyEstimator {
    pub fn new(geometry: &BoardGeometry, params: &CalibrationParams) -> Self {
        let s = params.working_size_px;
        Self {
            min_points: params.min_calibration_points.max(4),
            working_size_px: s,
            consensus: ConsensusParams {
                inlier_threshold: params.reprojection_threshold_px,
                refit_on_inliers: true,
            },
            references_px: geometry.reference_points().map(|p| Point2::new(p.x * s, p.y * s)),
        }
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Slots usable for estimation: resolved and inside the frame.
    pub fn validity_mask(points: &CalibrationPoints) -> [bool; SLOT_COUNT] {
        points
            .entries()
            .each_ref()
            .map(|e| e.point().is_some_and(|p| p.in_frame()))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(valid = points.valid_count()))
    )]
    pub fn estimate(&self, points: &CalibrationPoints) -> Result<HomographyMatrix, CalibrationError> {
        let mask = Self::validity_mask(points);
        let found = mask.iter().filter(|&&v| v).count();
        if found < self.min_points {
            log::info!(
                "only {} usable calibration points, need {}",
                found,
                self.min_points
            );
            return Err(CalibrationError::MissingCalibrationPoints {
                found,
                required: self.min_points,
            });
        }

        let s = self.working_size_px;
        let mut slots = Vec::with_capacity(found);
        let mut src = Vec::with_capacity(found);
        let mut dst = Vec::with_capacity(found);
        for (entry, &valid) in points.entries().iter().zip(mask.iter()) {
            let Some(p) = entry.point().filter(|_| valid) else {
                continue;
            };
            slots.push(p.slot);
            src.push(Point2::new(p.x * s, p.y * s));
            dst.push(self.references_px[p.slot.index()]);
        }

        let Some(fit) = estimate_homography_consensus(&src, &dst, &self.consensus) else {
            log::warn!("no non-degenerate homography from {} calibration points", found);
            return Err(CalibrationError::Homography {
                reason: format!("no consistent model from {found} points"),
            });
        };

        if fit.inliers.len() < self.min_points {
            log::warn!(
                "homography supported by {} of {} points, need {}",
                fit.inliers.len(),
                found,
                self.min_points
            );
            return Err(CalibrationError::Homography {
                reason: format!(
                    "only {} of {} points agree within {:.1} px",
                    fit.inliers.len(),
                    found,
                    self.consensus.inlier_threshold
                ),
            });
        }

        let inlier_slots: Vec<_> = fit.inliers.iter().map(|&i| slots[i]).collect();
        if inlier_slots.len() < found {
            log::debug!(
                "rejected {} calibration outlier(s)",
                found - inlier_slots.len()
            );
        }

        Ok(HomographyMatrix {
            homography: fit.homography,
            point_count: inlier_slots.len(),
            inlier_slots,
            rms_px: fit.inlier_rms,
            working_size_px: s,
        })
    }
}

impl Default for HomographyEstimator {
    fn default() -> Self {
        Self::new(&BoardGeometry::default(), &CalibrationParams::default())
    }
}
