//! The `setup` command: probe and remediate every step.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::provision::default_steps;
use crate::report::{Reporter, EXIT_FAILURE};
use crate::shell::{CommandRunner, Host};
use crate::steps::{ExecutorOptions, RunProgress, Step, StepExecutor};
use crate::summary::{PhaseRecorder, REPO_NAME};
use crate::ui::UserInterface;

use super::context::{describe, prepare, report_precondition};
use super::dispatcher::{Command, CommandResult, RunSettings};

/// The setup command implementation.
pub struct SetupCommand<'a> {
    settings: &'a RunSettings,
    runner: &'a dyn CommandRunner,
    interrupt: Arc<AtomicBool>,
    steps: Vec<Box<dyn Step>>,
}

impl<'a> SetupCommand<'a> {
    pub fn new(
        settings: &'a RunSettings,
        runner: &'a dyn CommandRunner,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            runner,
            interrupt,
            steps: default_steps(),
        }
    }

    /// Replace the step catalogue.
    pub fn with_steps(mut self, steps: Vec<Box<dyn Step>>) -> Self {
        self.steps = steps;
        self
    }
}

impl Command for SetupCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let host = Host::with_root(self.runner, &self.settings.host_root);
        let mut ctx = match prepare(&host, self.settings) {
            Ok(ctx) => ctx,
            Err(e) => {
                report_precondition(ui, &e);
                return Ok(CommandResult::failure(EXIT_FAILURE));
            }
        };

        ui.show_header(&format!("Provisioning {} host", ctx.mode()));
        ui.message(&describe(&ctx));

        let names: Vec<String> = self.steps.iter().map(|s| s.name().to_string()).collect();
        let mut recorder = match &self.settings.summary_file {
            Some(path) => PhaseRecorder::create(path, REPO_NAME, &names),
            None => PhaseRecorder::disabled(),
        };

        let executor = StepExecutor::new(&host)
            .with_options(ExecutorOptions {
                verify: self.settings.verify,
            })
            .with_interrupt(Arc::clone(&self.interrupt));

        let mut reporter = Reporter::new(ui);
        let result = executor.run(&self.steps, &mut ctx, &mut |event: RunProgress<'_>| {
            reporter.observe(&event);
            recorder.observe(&event);
        });

        let exit_code = reporter.finish_run(&result);
        recorder.finish(exit_code);
        info!(
            "Run finished with exit code {} ({} steps executed)",
            exit_code,
            result.records.len()
        );

        Ok(CommandResult::from_exit_code(exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::dispatcher::EnvSource;
    use crate::config::DeploymentMode;
    use crate::shell::MockRunner;
    use crate::steps::{ExecutionContext, Fatality, Probe, Remediation, StepScope};
    use crate::summary::{PhaseStatus, RunStatus, TestSummary};
    use crate::ui::MockUI;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct ModeStep;

    impl Step for ModeStep {
        fn name(&self) -> &str {
            "mode_probe"
        }

        fn description(&self) -> &str {
            "Probe that requires production"
        }

        fn fatality(&self) -> Fatality {
            Fatality::Warn
        }

        fn probe(&self, _host: &Host<'_>, ctx: &ExecutionContext) -> Result<Probe> {
            Ok(if ctx.mode() == DeploymentMode::Production {
                Probe::Satisfied("production".into())
            } else {
                Probe::Unsatisfied("development".into())
            })
        }

        fn remediate(&self, _host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
            Ok(Remediation::Failure("cannot change mode".into()))
        }
    }

    fn host_root(mode: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let etc = temp.path().join("etc");
        fs::create_dir_all(etc.join("walrus")).unwrap();
        fs::write(etc.join("os-release"), "ID=ubuntu\nVERSION_ID=\"24.04\"\n").unwrap();
        fs::write(
            etc.join("walrus/system.conf"),
            format!("DEPLOYMENT_TYPE={}\n", mode),
        )
        .unwrap();
        fs::write(etc.join("passwd"), "alice:x:1000:1000::/home/alice:/bin/bash\n").unwrap();
        temp
    }

    fn settings(root: &Path) -> RunSettings {
        RunSettings {
            system_conf: root.join("etc/walrus/system.conf"),
            project: None,
            summary_file: Some(root.join("summary.json")),
            verify: false,
            host_root: root.to_path_buf(),
            elevated: true,
            home: None,
            env: EnvSource::fixed(&[("SUDO_USER", "alice")]),
        }
    }

    #[test]
    fn warned_step_exits_zero_and_records_phase() {
        let temp = host_root("development");
        let s = settings(temp.path());
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = SetupCommand::new(&s, &runner, Arc::new(AtomicBool::new(false)))
            .with_steps(vec![Box::new(ModeStep)])
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(ui.has_warning("mode_probe: cannot change mode"));
        assert!(ui.headers()[0].contains("development"));
        assert!(ui.has_message("User: alice (from SUDO_USER"));

        let summary: TestSummary =
            serde_json::from_str(&fs::read_to_string(temp.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary.status, RunStatus::Passed);
        assert_eq!(
            summary.phase("mode_probe").unwrap().status,
            PhaseStatus::Failed
        );
    }

    #[test]
    fn satisfied_step_is_skipped_in_production() {
        let temp = host_root("production");
        let s = settings(temp.path());
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = SetupCommand::new(&s, &runner, Arc::new(AtomicBool::new(false)))
            .with_steps(vec![Box::new(ModeStep)])
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert!(ui.has_success("Setup complete (0 remediated, 1 already satisfied"));
    }

    #[test]
    fn interrupt_before_start_exits_130() {
        let temp = host_root("production");
        let s = settings(temp.path());
        let runner = MockRunner::new();
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::SeqCst);
        let mut ui = MockUI::new();

        let result = SetupCommand::new(&s, &runner, flag)
            .with_steps(vec![Box::new(ModeStep)])
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 130);
        let summary: TestSummary =
            serde_json::from_str(&fs::read_to_string(temp.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(
            summary.phase("mode_probe").unwrap().status,
            PhaseStatus::Pending
        );
    }

    #[test]
    fn invalid_mode_stops_before_any_command() {
        let temp = host_root("staging");
        let s = settings(temp.path());
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = SetupCommand::new(&s, &runner, Arc::new(AtomicBool::new(false)))
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("Invalid deployment mode 'staging'"));
        assert!(ui.has_hint("sudo vim"));
        assert!(runner.calls().is_empty());
        assert!(!temp.path().join("summary.json").exists());
    }

    #[test]
    fn missing_config_stops_before_any_command() {
        let temp = host_root("production");
        fs::remove_file(temp.path().join("etc/walrus/system.conf")).unwrap();
        let s = settings(temp.path());
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = SetupCommand::new(&s, &runner, Arc::new(AtomicBool::new(false)))
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("Configuration file not found"));
        assert!(runner.calls().is_empty());
        assert!(ui.spinners().is_empty());
        assert!(!temp.path().join("summary.json").exists());
    }
}
