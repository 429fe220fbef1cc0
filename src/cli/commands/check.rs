//! The `check` command: run every probe, change nothing.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::Result;
use crate::provision::default_steps;
use crate::report::{Reporter, EXIT_FAILURE};
use crate::shell::{CommandRunner, Host};
use crate::steps::{RunProgress, Step, StepExecutor};
use crate::ui::UserInterface;

use super::context::{describe, prepare, report_precondition};
use super::dispatcher::{Command, CommandResult, RunSettings};

/// The check command implementation.
pub struct CheckCommand<'a> {
    settings: &'a RunSettings,
    runner: &'a dyn CommandRunner,
    interrupt: Arc<AtomicBool>,
    steps: Vec<Box<dyn Step>>,
}

impl<'a> CheckCommand<'a> {
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

    pub fn with_steps(mut self, steps: Vec<Box<dyn Step>>) -> Self {
        self.steps = steps;
        self
    }
}

impl Command for CheckCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let host = Host::with_root(self.runner, &self.settings.host_root);
        let ctx = match prepare(&host, self.settings) {
            Ok(ctx) => ctx,
            Err(e) => {
                report_precondition(ui, &e);
                return Ok(CommandResult::failure(EXIT_FAILURE));
            }
        };

        ui.show_header(&format!("Checking {} host", ctx.mode()));
        ui.message(&describe(&ctx));

        let executor = StepExecutor::new(&host).with_interrupt(Arc::clone(&self.interrupt));
        let mut reporter = Reporter::new(ui);
        let report = executor.check(&self.steps, &ctx, &mut |event: RunProgress<'_>| {
            reporter.observe(&event)
        });

        Ok(CommandResult::from_exit_code(reporter.finish_check(&report)))
    }
}
