//! The test-summary JSON document.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall status of a summarized run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Passed,
    Failed,
}

/// Status of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    /// Whether the phase has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

/// One phase of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub status: PhaseStatus,
    /// Seconds, rounded to two decimals.
    pub duration: Option<f64>,
}

/// Aggregate phase counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Summary document polled by external monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub repo: String,
    pub started: DateTime<Utc>,
    pub status: RunStatus,
    pub current_phase: Option<String>,
    pub phases: Vec<Phase>,
    pub summary: PhaseCounts,
    pub ended: Option<DateTime<Utc>>,
    /// Total seconds, rounded to two decimals.
    pub duration: Option<f64>,
}

impl TestSummary {
    /// A running summary with every phase pending, started now.
    pub fn new<S: AsRef<str>>(repo: &str, phases: &[S]) -> Self {
        Self::started_at(repo, phases, Utc::now())
    }

    pub fn started_at<S: AsRef<str>>(repo: &str, phases: &[S], started: DateTime<Utc>) -> Self {
        Self {
            repo: repo.to_string(),
            started,
            status: RunStatus::Running,
            current_phase: None,
            phases: phases
                .iter()
                .map(|name| Phase {
                    name: name.as_ref().to_string(),
                    status: PhaseStatus::Pending,
                    duration: None,
                })
                .collect(),
            summary: PhaseCounts {
                total: phases.len(),
                ..Default::default()
            },
            ended: None,
            duration: None,
        }
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Move a phase to `status`, updating counts and the current phase.
    ///
    /// Unknown phase names and phases that already finished are ignored, so
    /// each phase is counted at most once.
    pub fn update_phase(&mut self, name: &str, status: PhaseStatus, duration: Option<Duration>) {
        let Some(phase) = self.phases.iter_mut().find(|p| p.name == name) else {
            return;
        };
        if phase.status.is_terminal() {
            return;
        }

        phase.status = status;
        if let Some(d) = duration {
            phase.duration = Some(round2(d.as_secs_f64()));
        }

        match status {
            PhaseStatus::Running => self.current_phase = Some(name.to_string()),
            PhaseStatus::Passed => self.summary.passed += 1,
            PhaseStatus::Skipped => self.summary.skipped += 1,
            PhaseStatus::Failed => {
                self.summary.failed += 1;
                self.current_phase = Some(format!("{} (failed)", name));
            }
            PhaseStatus::Pending => {}
        }
    }

    /// Record the end of the run.
    pub fn finalize(&mut self, status: RunStatus, ended: DateTime<Utc>) {
        let elapsed = (ended - self.started).num_milliseconds().max(0) as f64 / 1000.0;
        self.status = status;
        self.ended = Some(ended);
        self.duration = Some(round2(elapsed));
        self.current_phase = None;
    }
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_summary_is_running_with_pending_phases() {
        let summary = TestSummary::started_at("suiftly-co", &["typescript-e2e"], start());

        assert_eq!(summary.status, RunStatus::Running);
        assert_eq!(summary.summary.total, 1);
        assert_eq!(
            summary.phase("typescript-e2e").unwrap().status,
            PhaseStatus::Pending
        );
    }

    #[test]
    fn running_phase_becomes_current() {
        let mut summary = TestSummary::started_at("r", &["a", "b"], start());
        summary.update_phase("a", PhaseStatus::Running, None);
        assert_eq!(summary.current_phase.as_deref(), Some("a"));
    }

    #[test]
    fn failed_phase_is_marked_in_current_phase() {
        let mut summary = TestSummary::started_at("r", &["a"], start());
        summary.update_phase("a", PhaseStatus::Failed, Some(Duration::from_millis(1234)));

        assert_eq!(summary.current_phase.as_deref(), Some("a (failed)"));
        assert_eq!(summary.summary.failed, 1);
        assert_eq!(summary.phase("a").unwrap().duration, Some(1.23));
    }

    #[test]
    fn finished_phase_is_counted_once() {
        let mut summary = TestSummary::started_at("r", &["a"], start());
        summary.update_phase("a", PhaseStatus::Passed, Some(Duration::from_secs(3)));
        summary.update_phase("a", PhaseStatus::Passed, None);
        summary.update_phase("a", PhaseStatus::Failed, Some(Duration::from_secs(9)));

        assert_eq!(summary.summary.passed, 1);
        assert_eq!(summary.summary.failed, 0);
        assert_eq!(summary.phase("a").unwrap().status, PhaseStatus::Passed);
        assert_eq!(summary.phase("a").unwrap().duration, Some(3.0));
    }

    #[test]
    fn unknown_phase_changes_nothing() {
        let mut summary = TestSummary::started_at("r", &["a"], start());
        let before = summary.clone();
        summary.update_phase("b", PhaseStatus::Running, None);
        summary.update_phase("b", PhaseStatus::Failed, None);

        assert_eq!(summary, before);
    }

    #[test]
    fn finalize_sets_duration_and_clears_current() {
        let mut summary = TestSummary::started_at("r", &["a"], start());
        summary.update_phase("a", PhaseStatus::Passed, None);
        summary.finalize(
            RunStatus::Passed,
            start() + chrono::Duration::milliseconds(90_456),
        );

        assert_eq!(summary.status, RunStatus::Passed);
        assert_eq!(summary.duration, Some(90.46));
        assert!(summary.current_phase.is_none());
        assert_eq!(summary.summary.passed, 1);
    }

    #[test]
    fn serializes_protocol_field_names() {
        let mut summary = TestSummary::started_at("suiftly-co", &["typescript-e2e"], start());
        summary.update_phase("typescript-e2e", PhaseStatus::Skipped, None);

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["repo"], "suiftly-co");
        assert_eq!(json["status"], "running");
        assert_eq!(json["phases"][0]["status"], "skipped");
        assert!(json["phases"][0]["duration"].is_null());
        assert_eq!(json["summary"]["skipped"], 1);
        assert_eq!(json["summary"]["total"], 1);
        assert!(json["started"].as_str().unwrap().starts_with("2026-03-01T12:00:00"));
        assert!(json["ended"].is_null());
    }
}
