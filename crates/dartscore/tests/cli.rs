use assert_cmd::Command;
use dartscore::io::{Frame, FrameLog};
use dartscore::{BoardGeometry, PipelineConfig, RawDetection};
use predicates::prelude::*;
use std::path::Path;

fn dartscore() -> Command {
    Command::cargo_bin("dartscore").expect("binary built")
}

/// Markers seen by a camera looking straight at the board, plus one dart in the bull.
fn write_frames(path: &Path, frames: usize) {
    let classes = [0u32, 1, 2, 3, 5, 6];
    let mut detections: Vec<_> = BoardGeometry::default()
        .reference_points()
        .iter()
        .zip(classes)
        .map(|(p, c)| RawDetection::new(c, 0.95, p.x, p.y))
        .collect();
    detections.push(RawDetection::new(4, 0.9, 0.5, 0.5));

    let log = FrameLog {
        frames: (0..frames)
            .map(|i| Frame {
                id: Some(format!("f{i}")),
                detections: detections.clone(),
            })
            .collect(),
        ..FrameLog::default()
    };
    log.write_json(path).expect("write frames");
}

#[test]
fn help_lists_subcommands() {
    dartscore()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("score"))
        .stdout(predicate::str::contains("calibrate"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn static_profile_scores_first_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames.json");
    write_frames(&frames, 1);

    dartscore()
        .args(["score", "--profile", "static", "--frames"])
        .arg(&frames)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total_score":50"#))
        .stdout(predicate::str::contains(r#""label":"DB""#));
}

#[test]
fn live_profile_prints_one_result_per_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames.json");
    write_frames(&frames, 3);

    let out = dartscore()
        .args(["score", "--frames"])
        .arg(&frames)
        .output()
        .expect("run");
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).expect("utf8");
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(r#""total_score":0"#));
    assert!(lines[2].contains(r#""total_score":50"#));
}

#[test]
fn calibrate_reports_each_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames.json");
    write_frames(&frames, 2);

    dartscore()
        .args(["calibrate", "--frames"])
        .arg(&frames)
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibrated from 6 points").count(2));
}

#[test]
fn init_config_writes_loadable_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");

    dartscore()
        .args(["init-config", "--profile", "static"])
        .arg(&path)
        .assert()
        .success();

    let cfg = PipelineConfig::load_json(&path).expect("load");
    assert_eq!(cfg.stabilizer.repeat_threshold, 1);
}

#[test]
fn missing_frame_log_fails() {
    dartscore()
        .args(["score", "--frames", "does-not-exist.json"])
        .assert()
        .failure();
}

#[test]
fn unknown_log_level_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames.json");
    write_frames(&frames, 1);

    dartscore()
        .args(["--log-level", "loud", "score", "--frames"])
        .arg(&frames)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level"));
}
