//! Maps provisioning progress onto summary phases.

use std::path::PathBuf;

use tracing::warn;

use crate::steps::{RunProgress, StepOutcome};

use super::document::{PhaseStatus, RunStatus, TestSummary};
use super::writer::SummaryWriter;

/// Phase status for a finished step.
pub fn phase_status(outcome: StepOutcome) -> PhaseStatus {
    match outcome {
        StepOutcome::Skipped => PhaseStatus::Skipped,
        StepOutcome::Remediated => PhaseStatus::Passed,
        StepOutcome::Warned | StepOutcome::FatalFailed => PhaseStatus::Failed,
    }
}

/// Overall status for a process exit code.
pub fn run_status(exit_code: i32) -> RunStatus {
    if exit_code == 0 {
        RunStatus::Passed
    } else {
        RunStatus::Failed
    }
}

/// Writes one phase per step while a run progresses.
///
/// The summary is a side channel: write failures are logged and the run
/// carries on. After the first failure the recorder stops writing.
pub struct PhaseRecorder {
    writer: Option<SummaryWriter>,
}

impl PhaseRecorder {
    /// Create the summary file with every step pending.
    pub fn create(path: impl Into<PathBuf>, repo: &str, step_names: &[String]) -> Self {
        let path = path.into();
        let writer = match SummaryWriter::create(&path, TestSummary::new(repo, step_names)) {
            Ok(writer) => Some(writer),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        Self { writer }
    }

    /// A recorder that writes nothing.
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    pub fn summary(&self) -> Option<&TestSummary> {
        self.writer.as_ref().map(SummaryWriter::summary)
    }

    /// Feed one executor event.
    pub fn observe(&mut self, event: &RunProgress<'_>) {
        let result = match (self.writer.as_mut(), event) {
            (Some(writer), RunProgress::StepStarting { name, .. }) => {
                writer.update_phase(name, PhaseStatus::Running, None)
            }
            (Some(writer), RunProgress::StepFinished(record)) => writer.update_phase(
                &record.name,
                phase_status(record.outcome),
                Some(record.duration),
            ),
            _ => return,
        };
        self.check(result);
    }

    /// Write the final status.
    pub fn finish(&mut self, exit_code: i32) {
        if let Some(writer) = self.writer.as_mut() {
            let result = writer.finalize(run_status(exit_code));
            self.check(result);
        }
    }

    fn check(&mut self, result: crate::Result<()>) {
        if let Err(e) = result {
            warn!("{}", e);
            self.writer = None;
        }
    }
}
