use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use dartscore_calib::{
    CalibrationOverride, CalibrationPoints, CalibrationResolver, DetectionClassifier,
    HomographyEstimator, HomographyMatrix, RawDetection,
};
use dartscore_core::BoardScorer;
use dartscore_visit::{
    FrameDart, PredictionStabilizer, StabilizerParams, StabilizerProfile, VisitState,
};

use super::detector::UpstreamDetector;
use super::error::{PipelineError, ResultCode};
use super::result::{CalibrationReport, DartDetection, DetectionResult};
use crate::config::{ConfigError, PipelineConfig};

#[cfg(feature = "tracing")]
use tracing::instrument;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run `f`, turning a panic into [`PipelineError::Unknown`].
fn guarded<T>(f: impl FnOnce() -> Result<T, PipelineError>) -> Result<T, PipelineError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(PipelineError::Unknown(panic_message(payload.as_ref()))),
    }
}

/// Like [`guarded`], but a panic also rolls `visit` back to its state
/// before `f` ran.
fn guarded_visit<T>(
    visit: &mut VisitState,
    f: impl FnOnce(&mut VisitState) -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let before = visit.clone();
    match catch_unwind(AssertUnwindSafe(|| f(&mut *visit))) {
        Ok(res) => res,
        Err(payload) => {
            *visit = before;
            log::error!("frame aborted, visit restored ({:?})", visit.phase());
            Err(PipelineError::Unknown(panic_message(payload.as_ref())))
        }
    }
}

fn log_failure(err: &PipelineError) {
    match ResultCode::from(err) {
        // Already reported at info level by the estimator.
        ResultCode::MissingCalibrationPoints => {}
        ResultCode::Homography | ResultCode::InvalidInput => log::warn!("{err}"),
        _ => log::error!("{err:?}"),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// End-to-end scoring: detections in, calibrated and scored darts out.
///
/// The pipeline itself is immutable and can be shared between sessions;
/// each session passes its own [`VisitState`] to [`Self::process_frame`].
#[derive(Debug)]
pub struct ScoringPipeline {
    config: PipelineConfig,
    classifier: DetectionClassifier,
    resolver: CalibrationResolver,
    estimator: HomographyEstimator,
    stabilizer: PredictionStabilizer,
    single_frame: PredictionStabilizer,
    scorer: BoardScorer,
    calibration_override: CalibrationOverride,
}

impl ScoringPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let single_frame = StabilizerParams {
            repeat_threshold: StabilizerProfile::StaticImage.repeat_threshold(),
            ..config.stabilizer.clone()
        };
        Ok(Self {
            classifier: DetectionClassifier::new(config.classifier.clone()),
            resolver: CalibrationResolver::from_params(
                config.classifier.dart_class_id,
                &config.calibration,
            ),
            estimator: HomographyEstimator::new(&config.board, &config.calibration),
            stabilizer: PredictionStabilizer::new(config.stabilizer.clone()),
            single_frame: PredictionStabilizer::new(single_frame),
            scorer: BoardScorer::new(&config.board),
            calibration_override: CalibrationOverride::default(),
            config,
        })
    }

    /// Pin calibration slots to fixed image positions for every later frame.
    pub fn with_calibration_override(mut self, pins: CalibrationOverride) -> Self {
        self.calibration_override = pins;
        self
    }

    pub fn set_calibration_override(&mut self, pins: CalibrationOverride) {
        self.calibration_override = pins;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A fresh visit for a new session.
    pub fn new_visit(&self) -> VisitState {
        self.stabilizer.new_visit()
    }

    /// Resolve slots and fit the homography without touching any visit.
    pub fn calibrate(&self, detections: &[RawDetection]) -> CalibrationReport {
        let started = Instant::now();
        let mut report = CalibrationReport::empty();
        let outcome = guarded(|| {
            validate_input(detections)?;
            let split = self.classifier.classify(detections);
            report.calibration_points = self.resolve(&split.calibration);
            Ok(self.estimator.estimate(&report.calibration_points)?)
        });
        match outcome {
            Ok(matrix) => report.set_calibration(&matrix),
            Err(err) => {
                log_failure(&err);
                report.fail(&err);
            }
        }
        report.processing_time_ms = elapsed_ms(started);
        report
    }

    /// Score a single still image: its darts are promoted on first sight.
    pub fn score_frame(&self, detections: &[RawDetection]) -> DetectionResult {
        let mut visit = self.single_frame.new_visit();
        self.run(&self.single_frame, &mut visit, || Ok(detections.to_vec()))
    }

    /// Feed one frame of a live session.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(detections = detections.len()))
    )]
    pub fn process_frame(
        &self,
        visit: &mut VisitState,
        detections: &[RawDetection],
    ) -> DetectionResult {
        self.run(&self.stabilizer, visit, || Ok(detections.to_vec()))
    }

    /// Run `detector` on `frame`, then process its output like [`Self::process_frame`].
    pub fn process_with_detector<D: UpstreamDetector>(
        &self,
        detector: &D,
        frame: &D::Frame,
        visit: &mut VisitState,
    ) -> DetectionResult {
        self.run(&self.stabilizer, visit, || {
            detector
                .detect(frame)
                .map_err(PipelineError::UpstreamDetection)
        })
    }

    /// Score the darts currently held by `visit`.
    pub fn score_visit(&self, visit: &VisitState) -> Vec<DartDetection> {
        visit
            .stable_darts()
            .iter()
            .map(|d| DartDetection {
                original_position: d.image_position,
                transformed_position: d.position,
                confidence: d.confidence,
                score: self.scorer.score(d.position),
            })
            .collect()
    }

    fn resolve(&self, markers: &[RawDetection]) -> CalibrationPoints {
        let mut points = self.resolver.resolve(markers);
        if !self.calibration_override.is_empty() {
            points.apply_override(&self.calibration_override);
        }
        points
    }

    fn run(
        &self,
        stabilizer: &PredictionStabilizer,
        visit: &mut VisitState,
        detect: impl FnOnce() -> Result<Vec<RawDetection>, PipelineError>,
    ) -> DetectionResult {
        let started = Instant::now();
        let mut result = DetectionResult::empty();
        let outcome = guarded_visit(visit, |visit| {
            let detections = detect()?;
            self.run_frame(stabilizer, visit, &detections, &mut result)
        });
        match outcome {
            Ok(()) => {
                result.set_darts(self.score_visit(visit));
                log::debug!("{} (total {})", result.message, result.total_score);
            }
            Err(err) => {
                log_failure(&err);
                result.fail(&err);
            }
        }
        result.visit_phase = visit.phase();
        result.processing_time_ms = elapsed_ms(started);
        result
    }

    fn run_frame(
        &self,
        stabilizer: &PredictionStabilizer,
        visit: &mut VisitState,
        detections: &[RawDetection],
        result: &mut DetectionResult,
    ) -> Result<(), PipelineError> {
        validate_input(detections)?;

        let mut split = self.classifier.classify(detections);
        let threshold = self.config.dart_confidence_threshold;
        if threshold > 0.0 {
            let before = split.darts.len();
            split.darts.retain(|d| d.confidence >= threshold);
            if split.darts.len() < before {
                log::info!(
                    "dropped {} dart(s) below confidence {:.2}",
                    before - split.darts.len(),
                    threshold
                );
            }
        }

        result.calibration_points = self.resolve(&split.calibration);
        let matrix: HomographyMatrix = self.estimator.estimate(&result.calibration_points)?;
        result.set_calibration(&matrix);

        let transformer = matrix.transformer();
        let sightings: Vec<FrameDart> = split
            .darts
            .iter()
            .map(|d| {
                let image = d.position();
                FrameDart::new(transformer.to_board(image), image, d.confidence)
            })
            .collect();
        let update = stabilizer.update(visit, &sightings);
        if update.visit_reset {
            log::info!("visit reset after board was cleared");
        }
        Ok(())
    }
}

fn validate_input(detections: &[RawDetection]) -> Result<(), PipelineError> {
    match detections.iter().position(|d| !d.is_well_formed()) {
        Some(i) => Err(PipelineError::InvalidInput(format!(
            "detection {i} has non-finite values or confidence outside [0, 1]"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_become_unknown_errors() {
        let err = guarded::<()>(|| panic!("boom")).unwrap_err();
        assert!(matches!(err, PipelineError::Unknown(ref m) if m == "boom"));
    }

    #[test]
    fn panic_mid_frame_restores_the_visit() {
        let mut visit = VisitState::default();
        assert!(visit.add_manual_dart());

        let err = guarded_visit::<()>(&mut visit, |v| {
            v.add_manual_dart();
            v.commit();
            panic!("stabilizer blew up");
        })
        .unwrap_err();

        assert!(matches!(err, PipelineError::Unknown(ref m) if m == "stabilizer blew up"));
        assert_eq!(visit.stable_darts().len(), 1);
        assert_eq!(visit.phase(), dartscore_visit::VisitPhase::Accumulating);
    }

    #[test]
    fn malformed_detections_are_invalid_input() {
        let pipeline = ScoringPipeline::new(PipelineConfig::default()).expect("pipeline");
        let res = pipeline.score_frame(&[RawDetection::new(4, 2.0, 0.5, 0.5)]);
        assert_eq!(res.code, ResultCode::InvalidInput);
        assert!(res.darts.is_empty());
        assert_eq!(res.total_score, 0);
    }

    #[test]
    fn empty_frame_reports_missing_calibration() {
        let pipeline = ScoringPipeline::new(PipelineConfig::default()).expect("pipeline");
        let res = pipeline.score_frame(&[]);
        assert_eq!(res.code, ResultCode::MissingCalibrationPoints);
        assert!(res.message.starts_with("Not enough calibration points detected"));
        assert_eq!(res.homography, None);
        assert_eq!(res.calibration_points.valid_count(), 0);
    }
}
