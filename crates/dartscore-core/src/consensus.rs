//! Outlier-tolerant homography fitting for small correspondence sets.
//!
//! Calibration targets on a dartboard give at most a handful of
//! correspondences, so instead of random sampling every 4-point subset is
//! tried. The result is deterministic for identical input.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::homography::{estimate_homography, homography_from_4pt, Homography};

/// Settings for [`estimate_homography_consensus`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Maximum transfer error (in destination units) for a correspondence to count as inlier.
    pub inlier_threshold: f64,
    /// Refit the best minimal model on all of its inliers.
    pub refit_on_inliers: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            inlier_threshold: 3.0,
            refit_on_inliers: true,
        }
    }
}

/// Best consensus model.
#[derive(Clone, Debug)]
pub struct ConsensusHomography {
    pub homography: Homography,
    /// Indices of inlier correspondences, ascending.
    pub inliers: Vec<usize>,
    /// Root-mean-square transfer error over the inliers.
    pub inlier_rms: f64,
    /// Number of minimal subsets that produced a model.
    pub models_tried: usize,
}

fn rms(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = vals.iter().map(|&v| v * v).sum();
    (ss / vals.len() as f64).sqrt()
}

fn score_model(
    h: &Homography,
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    threshold: f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::with_capacity(src.len());
    let mut residuals = Vec::with_capacity(src.len());
    for (i, (&s, &d)) in src.iter().zip(dst).enumerate() {
        let r = h.transfer_error(s, d);
        if r <= threshold {
            inliers.push(i);
            residuals.push(r);
        }
    }
    let err = rms(&residuals);
    (inliers, err)
}

fn is_better(inliers: usize, err: f64, best: Option<&ConsensusHomography>) -> bool {
    match best {
        None => true,
        Some(b) => inliers > b.inliers.len() || (inliers == b.inliers.len() && err < b.inlier_rms),
    }
}

/// Estimate `dst ~ H * src`, tolerating outlier correspondences.
///
/// Returns `None` with fewer than 4 correspondences, mismatched lengths, or
/// when every minimal subset is degenerate.
pub fn estimate_homography_consensus(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    params: &ConsensusParams,
) -> Option<ConsensusHomography> {
    let n = src.len();
    if n != dst.len() || n < 4 {
        return None;
    }

    let mut best: Option<ConsensusHomography> = None;
    let mut models_tried = 0usize;

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                for l in (k + 1)..n {
                    let s = [src[i], src[j], src[k], src[l]];
                    let d = [dst[i], dst[j], dst[k], dst[l]];
                    let Some(h) = homography_from_4pt(&s, &d) else {
                        continue;
                    };
                    models_tried += 1;

                    let (inliers, err) = score_model(&h, src, dst, params.inlier_threshold);
                    if inliers.len() < 4 {
                        continue;
                    }
                    if is_better(inliers.len(), err, best.as_ref()) {
                        best = Some(ConsensusHomography {
                            homography: h,
                            inliers,
                            inlier_rms: err,
                            models_tried: 0,
                        });
                    }
                }
            }
        }
    }

    let mut best = best?;
    best.models_tried = models_tried;

    if params.refit_on_inliers && best.inliers.len() > 4 {
        let s: Vec<Point2<f64>> = best.inliers.iter().map(|&i| src[i]).collect();
        let d: Vec<Point2<f64>> = best.inliers.iter().map(|&i| dst[i]).collect();
        if let Some(refit) = estimate_homography(&s, &d) {
            let (inliers, err) = score_model(&refit, src, dst, params.inlier_threshold);
            if inliers.len() >= best.inliers.len() {
                best.homography = refit;
                best.inliers = inliers;
                best.inlier_rms = err;
            }
        }
    }

    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            1.05, 0.04, -30.0, //
            0.02, 0.95, 12.0, //
            0.00015, -0.0001, 1.0,
        ))
    }

    fn ring(n: usize, radius: f64) -> Vec<Point2<f64>> {
        (0..n)
            .map(|k| {
                let a = k as f64 * std::f64::consts::TAU / n as f64 + 0.3;
                Point2::new(400.0 + radius * a.cos(), 400.0 + radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn exact_data_keeps_every_point() {
        let h = ground_truth();
        let src = ring(6, 300.0);
        let dst: Vec<_> = src.iter().map(|&p| h.apply(p)).collect();

        let res = estimate_homography_consensus(&src, &dst, &ConsensusParams::default())
            .expect("consensus");
        assert_eq!(res.inliers, vec![0, 1, 2, 3, 4, 5]);
        assert!(res.inlier_rms < 1e-6);
        assert_eq!(res.models_tried, 15);
    }

    #[test]
    fn single_outlier_is_rejected() {
        let h = ground_truth();
        let src = ring(6, 300.0);
        let mut dst: Vec<_> = src.iter().map(|&p| h.apply(p)).collect();
        dst[2].x += 80.0;
        dst[2].y -= 45.0;

        let res = estimate_homography_consensus(&src, &dst, &ConsensusParams::default())
            .expect("consensus");
        assert_eq!(res.inliers, vec![0, 1, 3, 4, 5]);

        let probe = Point2::new(410.0, 370.0);
        let err = (res.homography.apply(probe) - h.apply(probe)).norm();
        assert!(err < 1e-6, "err = {err}");
    }

    #[test]
    fn too_few_points_yield_none() {
        let src = ring(3, 100.0);
        assert!(estimate_homography_consensus(&src, &src, &ConsensusParams::default()).is_none());
    }

    #[test]
    fn all_degenerate_subsets_yield_none() {
        let src: Vec<_> = (0..5).map(|k| Point2::new(k as f64, 2.0 * k as f64)).collect();
        assert!(estimate_homography_consensus(&src, &src, &ConsensusParams::default()).is_none());
    }
}
