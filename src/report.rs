//! Lane report, the JSON document written to stdout.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::aggregate::{Aggregate, SampleDetection};
use crate::phase::{classify, Phase};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaneReport {
    pub lane: String,
    pub processed_video: String,
    pub vehicle_counts: BTreeMap<String, u64>,
    pub total_vehicles: u64,
    pub load_score: u64,
    pub phase: Phase,
    pub sample_detections: Vec<SampleDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl LaneReport {
    /// Build the report from a finished aggregate.
    ///
    /// `total_vehicles` is the running total; `load_score` is recomputed from
    /// the per-label counts.
    pub fn new(
        lane: &str,
        output_path: &Path,
        aggregate: Aggregate,
        processed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let processed_video = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let load_score = aggregate.load_score();
        Self {
            lane: lane.to_string(),
            processed_video,
            phase: classify(aggregate.total),
            total_vehicles: aggregate.total,
            load_score,
            vehicle_counts: aggregate.counts,
            sample_detections: aggregate.samples,
            processed_at: processed_at.map(|at| at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_aggregate_reports_red() {
        let report = LaneReport::new(
            "north",
            Path::new("/tmp/out/north_processed.mp4"),
            Aggregate::default(),
            None,
        );
        assert_eq!(report.processed_video, "north_processed.mp4");
        assert_eq!(report.total_vehicles, 0);
        assert_eq!(report.load_score, 0);
        assert_eq!(report.phase, Phase::Red);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["vehicle_counts"], serde_json::json!({}));
        assert_eq!(json["sample_detections"], serde_json::json!([]));
        assert_eq!(json["phase"], "red");
        assert!(json.get("processed_at").is_none());
    }

    #[test]
    fn timestamp_is_utc_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let report = LaneReport::new("east", Path::new("east.mp4"), Aggregate::default(), Some(at));
        assert_eq!(
            report.processed_at.as_deref(),
            Some("2024-05-01T12:30:00.000000Z")
        );
    }

    #[test]
    fn load_score_matches_total() {
        let mut counts = BTreeMap::new();
        counts.insert("car".to_string(), 9);
        counts.insert("bus".to_string(), 6);
        let aggregate = Aggregate {
            counts,
            total: 15,
            samples: Vec::new(),
        };
        let report = LaneReport::new("west", Path::new("west.mp4"), aggregate, None);
        assert_eq!(report.load_score, report.total_vehicles);
        assert_eq!(report.phase, Phase::Green);
    }
}
