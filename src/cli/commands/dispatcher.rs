//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`RunSettings`] for the global flags every command shares
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::shell::{is_elevated, CommandRunner};
use crate::ui::UserInterface;

use super::check::CheckCommand;
use super::completions::CompletionsCommand;
use super::setup::SetupCommand;
use super::test::TestCommand;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command.
    ///
    /// Expected failures (a failed step, a violated precondition) are
    /// reported through `ui` and come back as a non-zero exit code; `Err`
    /// is left for faults outside the run itself.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// A result carrying `exit_code`, successful when it is zero.
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
        }
    }
}

/// Where the invoking user's `SUDO_USER`/`USER`/`HOME` are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment.
    #[default]
    Process,
    /// A fixed set of variables; everything else is unset.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed(pairs: &[(&str, &str)]) -> Self {
        Self::Fixed(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn var(&self, key: &str) -> std::result::Result<String, VarError> {
        match self {
            Self::Process => std::env::var(key),
            Self::Fixed(vars) => vars.get(key).cloned().ok_or(VarError::NotPresent),
        }
    }
}

/// Settings shared by every command, taken from global flags and the
/// process environment.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Deployment config file.
    pub system_conf: PathBuf,
    /// Application checkout.
    pub project: Option<PathBuf>,
    /// Test-summary file for provisioning runs.
    pub summary_file: Option<PathBuf>,
    /// Re-probe after remediation.
    pub verify: bool,
    /// Directory treated as `/` for file probes and writes.
    pub host_root: PathBuf,
    /// Whether the process runs as root.
    pub elevated: bool,
    /// Home directory of the caller, for the test guard.
    pub home: Option<PathBuf>,
    /// Source of the user-resolution variables.
    pub env: EnvSource,
}

impl RunSettings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            system_conf: cli.system_conf.clone(),
            project: cli.project.clone(),
            summary_file: cli.summary_file.clone(),
            verify: cli.verify,
            host_root: PathBuf::from("/"),
            elevated: is_elevated(),
            home: std::env::var_os("HOME")
                .filter(|h| !h.is_empty())
                .map(PathBuf::from),
            env: EnvSource::Process,
        }
    }

    /// Project root: `--project`, else the current directory.
    pub fn project_root(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher<'a> {
    settings: RunSettings,
    runner: &'a dyn CommandRunner,
    interrupt: Arc<AtomicBool>,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(settings: RunSettings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            settings,
            runner,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share the flag set by the Ctrl-C handler.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Dispatch and execute a command. No subcommand means `setup`.
    pub fn dispatch(
        &self,
        command: Option<&Commands>,
        ui: &mut dyn UserInterface,
    ) -> Result<CommandResult> {
        match command {
            None | Some(Commands::Setup) => {
                SetupCommand::new(&self.settings, self.runner, Arc::clone(&self.interrupt))
                    .execute(ui)
            }
            Some(Commands::Check) => {
                CheckCommand::new(&self.settings, self.runner, Arc::clone(&self.interrupt))
                    .execute(ui)
            }
            Some(Commands::Test) => TestCommand::new(&self.settings, self.runner).execute(ui),
            Some(Commands::Completions(args)) => CompletionsCommand::new(args.clone()).execute(ui),
        }
    }
}
