//! Image-to-board mapping of normalized points.
//!
//! Homographies are estimated in a square pixel frame of side
//! `working_size_px` on both sides, so points are scaled up before applying
//! the matrix and scaled back down afterwards.

use nalgebra::Point2;

use crate::homography::Homography;

/// Side length of the square pixel frame the calibration homography lives in.
pub const DEFAULT_WORKING_SIZE_PX: f64 = 800.0;

/// Maps normalized image coordinates to normalized board coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransformer {
    homography: Homography,
    working_size_px: f64,
}

impl CoordinateTransformer {
    pub fn new(homography: Homography, working_size_px: f64) -> Self {
        Self {
            homography,
            working_size_px,
        }
    }

    pub fn homography(&self) -> &Homography {
        &self.homography
    }

    pub fn working_size_px(&self) -> f64 {
        self.working_size_px
    }

    /// Map one image point into board space.
    #[inline]
    pub fn to_board(&self, image: Point2<f64>) -> Point2<f64> {
        let s = self.working_size_px;
        let mapped = self.homography.apply(Point2::new(image.x * s, image.y * s));
        Point2::new(mapped.x / s, mapped.y / s)
    }

    /// Map every point; empty input gives empty output.
    pub fn to_board_all(&self, image: &[Point2<f64>]) -> Vec<Point2<f64>> {
        image.iter().map(|&p| self.to_board(p)).collect()
    }

    /// Inverse mapping, `None` if the homography is singular.
    pub fn to_image(&self, board: Point2<f64>) -> Option<Point2<f64>> {
        let inv = self.homography.inverse()?;
        let s = self.working_size_px;
        let mapped = inv.apply(Point2::new(board.x * s, board.y * s));
        Some(Point2::new(mapped.x / s, mapped.y / s))
    }
}

/// Convenience wrapper over [`CoordinateTransformer::to_board_all`].
pub fn transform_points(
    homography: &Homography,
    points: &[Point2<f64>],
    working_size_px: f64,
) -> Vec<Point2<f64>> {
    CoordinateTransformer::new(*homography, working_size_px).to_board_all(points)
}
