//! The `test` command: the repository test runner.

use crate::error::Result;
use crate::shell::CommandRunner;
use crate::summary::{default_summary_path, REPO_NAME};
use crate::testrun::{ProductionGuard, TestOrchestrator};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, RunSettings};

/// The test command implementation.
pub struct TestCommand<'a> {
    settings: &'a RunSettings,
    runner: &'a dyn CommandRunner,
}

impl<'a> TestCommand<'a> {
    pub fn new(settings: &'a RunSettings, runner: &'a dyn CommandRunner) -> Self {
        Self { settings, runner }
    }

    fn guard(&self) -> ProductionGuard {
        match &self.settings.home {
            Some(home) => ProductionGuard::new(home),
            None => ProductionGuard::system_only(),
        }
    }
}

impl Command for TestCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let summary_path = self
            .settings
            .summary_file
            .clone()
            .unwrap_or_else(|| default_summary_path(REPO_NAME));

        let code = TestOrchestrator::new(
            self.runner,
            self.settings.project_root(),
            summary_path,
            self.guard(),
        )
        .run(ui)?;

        Ok(CommandResult::from_exit_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::dispatcher::EnvSource;
    use crate::shell::MockRunner;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn settings(temp: &TempDir) -> RunSettings {
        RunSettings {
            system_conf: temp.path().join("system.conf"),
            project: Some(temp.path().join("project")),
            summary_file: Some(temp.path().join("summary.json")),
            verify: false,
            host_root: temp.path().to_path_buf(),
            elevated: false,
            home: Some(temp.path().join("home")),
            env: EnvSource::fixed(&[]),
        }
    }

    #[test]
    fn refuses_when_home_config_says_production() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("home/mhaxbe")).unwrap();
        fs::write(
            temp.path().join("home/mhaxbe/system.conf"),
            "ENVIRONMENT=production\n",
        )
        .unwrap();
        let s = settings(&temp);
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = TestCommand::new(&s, &runner).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, 2);
        assert!(!result.success);
    }

    #[test]
    fn does_not_need_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("home/mhaxbe")).unwrap();
        fs::write(
            temp.path().join("home/mhaxbe/system.conf"),
            "ENVIRONMENT=development\n",
        )
        .unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        let s = settings(&temp);
        let runner = MockRunner::new();
        let mut ui = MockUI::new();

        let result = TestCommand::new(&s, &runner).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(temp.path().join("summary.json").exists());
    }
}
