//! Live status lines and the final summary block.

use std::time::Duration;

use crate::steps::{CheckReport, Probe, RunProgress, RunResult, StepOutcome, StepRecord};
use crate::ui::{format_counter, format_duration, SpinnerHandle, UserInterface};

use super::exit::{check_exit_code, exit_code};

/// Renders executor progress through a [`UserInterface`].
///
/// One spinner per step: it starts on `StepStarting` and ends with the
/// outcome icon on `StepFinished` (or `Probed` in check mode).
pub struct Reporter<'a> {
    ui: &'a mut dyn UserInterface,
    spinner: Option<Box<dyn SpinnerHandle>>,
    current: String,
}

impl<'a> Reporter<'a> {
    pub fn new(ui: &'a mut dyn UserInterface) -> Self {
        Self {
            ui,
            spinner: None,
            current: String::new(),
        }
    }

    /// Feed one executor event.
    pub fn observe(&mut self, event: &RunProgress<'_>) {
        match *event {
            RunProgress::StepStarting {
                index,
                total,
                name,
                description,
            } => {
                self.current = format!("{} {}", format_counter(index, total), name);
                let message = format!("{} - {}", self.current, description);
                self.spinner = Some(self.ui.start_spinner(&message));
            }
            RunProgress::Remediating { name, reason } => {
                if let Some(spinner) = self.spinner.as_mut() {
                    spinner.set_message(&format!("{} - fixing: {}", self.current, reason));
                }
                tracing::info!("Remediating {}: {}", name, reason);
            }
            RunProgress::StepFinished(record) => self.finish_step(record),
            RunProgress::Probed { probe, .. } => self.finish_probe(probe),
        }
    }

    fn finish_step(&mut self, record: &StepRecord) {
        let Some(mut spinner) = self.spinner.take() else {
            return;
        };
        let line = status_line(&self.current, &record.detail, Some(record.duration));
        match record.outcome {
            StepOutcome::Skipped => {
                let line = if self.ui.output_mode().is_verbose() {
                    status_line(&self.current, &record.detail, None)
                } else {
                    self.current.clone()
                };
                spinner.finish_skipped(&line);
            }
            StepOutcome::Remediated => spinner.finish_success(&line),
            StepOutcome::Warned => spinner.finish_warning(&line),
            StepOutcome::FatalFailed => spinner.finish_error(&line),
        }
    }

    fn finish_probe(&mut self, probe: &Probe) {
        let Some(mut spinner) = self.spinner.take() else {
            return;
        };
        let line = status_line(&self.current, probe.detail(), None);
        match probe {
            Probe::Satisfied(_) => spinner.finish_success(&line),
            Probe::Unsatisfied(_) => spinner.finish_warning(&line),
            Probe::Misconfigured(_) => spinner.finish_error(&line),
        }
    }

    /// Print the final block of a provisioning run and return the exit code.
    pub fn finish_run(&mut self, result: &RunResult) -> i32 {
        if result.interrupted {
            self.ui.warning("Interrupted; re-run to continue from current state");
        }

        if !result.failures.is_empty() {
            self.ui
                .error(&format!("Setup failed: {}", result.failures.join(", ")));
            for name in &result.failures {
                if let Some(record) = result.record(name).filter(|r| !r.detail.is_empty()) {
                    self.ui.error(&format!("{}: {}", name, record.detail));
                }
            }
            for warning in &result.warnings {
                self.ui.warning(warning);
            }
            self.ui.show_hint("Fix the failure above and re-run; completed steps are skipped");
        } else if !result.interrupted {
            if result.warnings.is_empty() {
                self.ui.success(&format!(
                    "Setup complete ({} remediated, {} already satisfied, {})",
                    result.count(StepOutcome::Remediated),
                    result.count(StepOutcome::Skipped),
                    format_duration(result.total_duration())
                ));
            } else {
                self.ui.message(&format!(
                    "Setup complete with {} warning(s):",
                    result.warnings.len()
                ));
                for warning in &result.warnings {
                    self.ui.warning(warning);
                }
            }
        }

        exit_code(result)
    }

    /// Print the final block of a probe-only pass and return the exit code.
    pub fn finish_check(&mut self, report: &CheckReport) -> i32 {
        if report.interrupted {
            self.ui.warning("Interrupted");
        } else if report.is_converged() {
            self.ui
                .success(&format!("All {} steps satisfied", report.entries.len()));
        } else {
            let drift: Vec<&str> = report.drift().map(|e| e.name.as_str()).collect();
            self.ui.error(&format!(
                "{} of {} steps need attention: {}",
                drift.len(),
                report.entries.len(),
                drift.join(", ")
            ));
            self.ui.show_hint("Run `sudo netops-setup` to remediate");
        }

        check_exit_code(report)
    }
}

fn status_line(label: &str, detail: &str, duration: Option<Duration>) -> String {
    let mut line = label.to_string();
    if !detail.is_empty() {
        line.push_str(": ");
        line.push_str(detail);
    }
    if let Some(d) = duration {
        line.push_str(&format!(" ({})", format_duration(d)));
    }
    line
}
