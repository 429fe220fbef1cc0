//! The host being provisioned.

use std::fmt;
use std::path::{Path, PathBuf};

use super::command::{CommandResult, CommandRunner, CommandSpec};

/// Command runner plus filesystem root for the host being provisioned.
///
/// Steps resolve absolute host paths through [`Host::path`], so a test can
/// point the whole catalogue at a temporary directory.
pub struct Host<'a> {
    runner: &'a dyn CommandRunner,
    root: PathBuf,
}

impl<'a> Host<'a> {
    /// A host rooted at `/`.
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self::with_root(runner, "/")
    }

    /// A host whose filesystem lives under `root`.
    pub fn with_root(runner: &'a dyn CommandRunner, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
        }
    }

    /// Map an absolute host path (e.g. `/etc/passwd`) under the root.
    pub fn path(&self, host_path: impl AsRef<Path>) -> PathBuf {
        let host_path = host_path.as_ref();
        let relative = host_path.strip_prefix("/").unwrap_or(host_path);
        self.root.join(relative)
    }

    /// Run a command.
    pub fn run(&self, spec: &CommandSpec) -> CommandResult {
        self.runner.run(spec)
    }

    /// Run a command and report whether it exited 0.
    pub fn check(&self, spec: &CommandSpec) -> bool {
        self.run(spec).success()
    }
}

impl fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("root", &self.root).finish()
    }
}
