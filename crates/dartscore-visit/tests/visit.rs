use approx::assert_relative_eq;
use dartscore_visit::{
    FrameDart, PredictionStabilizer, StabilizerParams, StabilizerProfile, VisitPhase,
};
use nalgebra::Point2;

fn sighting(x: f64, y: f64) -> FrameDart {
    FrameDart::board_only(Point2::new(x, y))
}

fn live() -> PredictionStabilizer {
    PredictionStabilizer::new(StabilizerParams::for_profile(StabilizerProfile::LiveVideo))
}

#[test]
fn jittery_sightings_settle_on_their_centroid() {
    let s = live();
    let mut visit = s.new_visit();
    s.update(&mut visit, &[sighting(0.300, 0.400)]);
    s.update(&mut visit, &[sighting(0.302, 0.400)]);
    let up = s.update(&mut visit, &[sighting(0.304, 0.403)]);

    assert_eq!(up.promoted, 1);
    let dart = visit.stable_darts()[0];
    assert_relative_eq!(dart.position.x, 0.302, epsilon = 1e-12);
    assert_relative_eq!(dart.position.y, 0.401, epsilon = 1e-12);
    assert_eq!(dart.sightings, 3);
}

#[test]
fn darts_arrive_one_at_a_time_through_a_full_visit() {
    let s = live();
    let mut visit = s.new_visit();
    let a = sighting(0.2, 0.2);
    let b = sighting(0.7, 0.3);
    let c = sighting(0.5, 0.8);

    for _ in 0..3 {
        s.update(&mut visit, &[a]);
    }
    assert_eq!(visit.stable_darts().len(), 1);
    for _ in 0..3 {
        s.update(&mut visit, &[a, b]);
    }
    assert_eq!(visit.stable_darts().len(), 2);
    for _ in 0..3 {
        s.update(&mut visit, &[a, b, c]);
    }
    assert!(visit.is_full());
    assert!(visit.commit());

    // A hand in front of the camera breaks the empty streak.
    s.update(&mut visit, &[]);
    s.update(&mut visit, &[sighting(0.4, 0.4)]);
    s.update(&mut visit, &[]);
    s.update(&mut visit, &[]);
    assert_eq!(visit.phase(), VisitPhase::AwaitingRemoval);
    let up = s.update(&mut visit, &[]);
    assert!(up.visit_reset);
    assert_eq!(visit.phase(), VisitPhase::Accumulating);
    assert!(visit.frames().is_empty());
}
