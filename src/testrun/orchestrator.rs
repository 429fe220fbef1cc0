//! Runs the repository's test phases and publishes progress through the
//! summary file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::report::{EXIT_FAILURE, EXIT_OK, EXIT_REFUSED};
use crate::shell::{CommandRunner, CommandSpec};
use crate::summary::{PhaseStatus, RunStatus, SummaryWriter, TestSummary, REPO_NAME};
use crate::ui::UserInterface;

use super::guard::ProductionGuard;

/// Wall-clock limit for a single phase.
pub const PHASE_TIMEOUT: Duration = Duration::from_secs(3600);

/// One test phase: a command run in the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPhase {
    pub name: &'static str,
    pub title: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// The phase is skipped when this file is missing from the project root.
    pub requires: &'static str,
}

impl TestPhase {
    fn command(&self, project_root: &Path) -> CommandSpec {
        CommandSpec::new(self.program)
            .args(self.args.iter().copied())
            .cwd(project_root)
            .timeout(PHASE_TIMEOUT)
            .stream_output()
    }
}

/// Vitest API tests and the Playwright suites, all driven by one npm script.
pub const DEFAULT_PHASES: &[TestPhase] = &[TestPhase {
    name: "typescript-e2e",
    title: "TypeScript + E2E Tests",
    program: "npm",
    args: &["run", "test:all"],
    requires: "package.json",
}];

/// The `test` subcommand.
pub struct TestOrchestrator<'a> {
    runner: &'a dyn CommandRunner,
    project_root: PathBuf,
    summary_path: PathBuf,
    guard: ProductionGuard,
    phases: &'a [TestPhase],
}

impl<'a> TestOrchestrator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        project_root: impl Into<PathBuf>,
        summary_path: impl Into<PathBuf>,
        guard: ProductionGuard,
    ) -> Self {
        Self {
            runner,
            project_root: project_root.into(),
            summary_path: summary_path.into(),
            guard,
            phases: DEFAULT_PHASES,
        }
    }

    pub fn with_phases(mut self, phases: &'a [TestPhase]) -> Self {
        self.phases = phases;
        self
    }

    /// Run every phase and return the process exit code.
    pub fn run(&self, ui: &mut dyn UserInterface) -> Result<i32> {
        ui.show_header(&format!("{} test runner", REPO_NAME));
        ui.message(&format!("Repository: {}", self.project_root.display()));
        ui.message(&format!("Summary file: {}", self.summary_path.display()));

        let verdict = self.guard.evaluate();
        if verdict.production {
            ui.error("Cannot run tests in a production environment");
            ui.show_hint(&format!(
                "Detected: {}\nTests only run on development hosts. \
                 To run them, ~/mhaxbe/system.conf must contain:\n  ENVIRONMENT=development",
                verdict
            ));
            return Ok(EXIT_REFUSED);
        }
        ui.message(&format!("Environment: {}", verdict));

        let names: Vec<&str> = self.phases.iter().map(|p| p.name).collect();
        let mut writer =
            SummaryWriter::create(&self.summary_path, TestSummary::new(REPO_NAME, &names))?;

        let mut all_passed = true;
        for (index, phase) in self.phases.iter().enumerate() {
            ui.message(&format!("\n>>> Phase {}: {}", index + 1, phase.title));
            writer.update_phase(phase.name, PhaseStatus::Running, None)?;

            if !self.project_root.join(phase.requires).exists() {
                ui.message(&format!("SKIP: No {} found", phase.requires));
                writer.update_phase(phase.name, PhaseStatus::Skipped, None)?;
                continue;
            }

            let result = self.runner.run(&phase.command(&self.project_root));
            let secs = result.duration.as_secs_f64();
            if result.success() {
                ui.success(&format!("PASS: {} ({:.1}s)", phase.name, secs));
                writer.update_phase(phase.name, PhaseStatus::Passed, Some(result.duration))?;
            } else {
                if result.timed_out {
                    ui.error(&format!(
                        "{} timed out after {} minutes",
                        phase.name,
                        PHASE_TIMEOUT.as_secs() / 60
                    ));
                }
                ui.error(&format!(
                    "FAIL: {} (exit code {}, {:.1}s)",
                    phase.name, result.exit_code, secs
                ));
                writer.update_phase(phase.name, PhaseStatus::Failed, Some(result.duration))?;
                all_passed = false;
            }
        }

        let status = if all_passed {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        writer.finalize(status)?;
        info!("Test run {:?}", status);

        print_summary(ui, writer.summary());

        Ok(if all_passed { EXIT_OK } else { EXIT_FAILURE })
    }
}

fn print_summary(ui: &mut dyn UserInterface, summary: &TestSummary) {
    ui.show_header("Test summary");
    for phase in &summary.phases {
        let label = match phase.status {
            PhaseStatus::Passed => "PASS",
            PhaseStatus::Failed => "FAIL",
            PhaseStatus::Skipped => "SKIP",
            PhaseStatus::Pending | PhaseStatus::Running => "----",
        };
        let duration = phase
            .duration
            .map(|d| format!("{:.1}s", d))
            .unwrap_or_else(|| "---".to_string());
        ui.message(&format!("  [{}] {:<20} {}", label, phase.name, duration));
    }

    let counts = summary.summary;
    ui.message(&format!(
        "\n  Total duration: {:.1}s",
        summary.duration.unwrap_or_default()
    ));
    ui.message(&format!(
        "  Passed: {}, Failed: {}, Skipped: {}",
        counts.passed, counts.failed, counts.skipped
    ));

    if counts.failed == 0 {
        ui.success("All tests passed");
    } else {
        ui.error("Some tests failed");
    }
}
