use std::path::Path;
use std::process::Command;

use lane_signal::detect::{DetectorSettings, SIMULATED_VOCABULARY};
use lane_signal::{
    select_backend, Annotator, FileConfig, FileSource, LabelStyle, LanePipeline, LaneReport,
    Phase, SuppressParams, TextStyle, MAX_SAMPLES,
};

fn run_lane(input: &str, output: &Path, seed: u64) -> LaneReport {
    let settings = DetectorSettings {
        seed: Some(seed),
        ..DetectorSettings::default()
    };
    let backend = select_backend(&settings).expect("simulated backend");
    let annotator = Annotator::new(LabelStyle::Decimal, TextStyle::default());
    let mut pipeline = LanePipeline::new(backend, annotator, SuppressParams::default());
    let mut source = FileSource::new(FileConfig::new(input)).expect("open stub input");
    let summary = pipeline.run(&mut source, output).expect("run pipeline");
    LaneReport::new("north", &summary.output, summary.aggregate, None)
}

#[test]
fn synthetic_run_produces_consistent_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("north_annotated.rgb");

    let report = run_lane("stub://north?frames=30&width=320&height=240", &output, 11);

    assert_eq!(report.lane, "north");
    assert_eq!(report.processed_video, "north_annotated.rgb");
    assert_eq!(report.vehicle_counts.values().sum::<u64>(), report.total_vehicles);
    assert_eq!(report.load_score, report.total_vehicles);
    assert!(report.total_vehicles >= 30, "every frame yields at least one box");
    assert_eq!(report.phase, Phase::Green);
    assert_eq!(report.sample_detections.len(), MAX_SAMPLES);
    for sample in &report.sample_detections {
        assert!(sample.confidence >= 0.5);
        assert!(sample.bbox.left + sample.bbox.width <= 100.01);
        assert!(sample.bbox.top + sample.bbox.height <= 100.01);
    }
    for label in SIMULATED_VOCABULARY {
        assert!(report.vehicle_counts.contains_key(label));
    }

    let written = std::fs::metadata(&output).unwrap().len();
    assert_eq!(written, 30 * 320 * 240 * 3);
}

#[test]
fn same_seed_gives_same_report() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_lane("stub://east?frames=10", &dir.path().join("a.rgb"), 5);
    let second = run_lane("stub://east?frames=10", &dir.path().join("a.rgb"), 5);
    assert_eq!(first.vehicle_counts, second.vehicle_counts);
    assert_eq!(first.sample_detections, second.sample_detections);
}

#[test]
fn empty_video_reports_red_with_zero_counts() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("empty.rgb");

    let report = run_lane("stub://south?frames=0", &output, 1);

    assert_eq!(report.total_vehicles, 0);
    assert_eq!(report.load_score, 0);
    assert_eq!(report.phase, Phase::Red);
    assert!(report.sample_detections.is_empty());
    assert!(report.vehicle_counts.values().all(|count| *count == 0));
    assert!(output.exists());
}

#[test]
fn missing_input_is_rejected_before_output_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no_such_video.mp4");
    let err = FileSource::new(FileConfig::new(missing.to_string_lossy())).err();
    assert!(matches!(
        err.as_ref().and_then(|err| err.downcast_ref::<lane_signal::LaneError>()),
        Some(lane_signal::LaneError::SourceOpen { .. })
    ));
}

fn process_video() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_process_video"));
    for key in ["LANE_CONFIG", "LANE_MODEL_PATH", "LANE_SEED", "LANE_FONT_PATH"] {
        cmd.env_remove(key);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn binary_prints_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out").join("west.rgb");

    let result = process_video()
        .args(["--input", "stub://west?frames=4&width=64&height=48"])
        .arg("--output")
        .arg(&output)
        .args(["--lane", "west", "--seed", "9", "--ui", "plain", "--no-timestamp"])
        .output()
        .expect("spawn process_video");

    assert!(result.status.success());
    let report: serde_json::Value = serde_json::from_slice(&result.stdout).expect("report json");
    assert_eq!(report["lane"], "west");
    assert_eq!(report["processed_video"], "west.rgb");
    assert_eq!(report["load_score"], report["total_vehicles"]);
    assert!(report.get("processed_at").is_none());
    assert!(output.exists());
}

#[test]
fn binary_reports_missing_input_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.rgb");

    let result = process_video()
        .arg("--input")
        .arg(dir.path().join("missing.mp4"))
        .arg("--output")
        .arg(&output)
        .args(["--lane", "north", "--ui", "plain"])
        .output()
        .expect("spawn process_video");

    assert_eq!(result.status.code(), Some(1));
    assert!(result.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&result.stderr);
    let error_line = stderr
        .lines()
        .find(|line| line.starts_with("{\"error\""))
        .expect("json error line");
    let parsed: serde_json::Value = serde_json::from_str(error_line).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("missing.mp4"));
    assert!(!output.exists());
}
