//! Per-run execution context.

use std::path::{Path, PathBuf};

use crate::config::{DeploymentContext, DeploymentMode, InvokingUser};

/// State threaded through every step of one run.
///
/// Warnings and failures can only be appended; there is no way to remove or
/// rewrite an entry once recorded.
#[derive(Debug)]
pub struct ExecutionContext {
    mode: DeploymentMode,
    user: InvokingUser,
    project_root: Option<PathBuf>,
    warnings: Vec<String>,
    failures: Vec<String>,
}

impl ExecutionContext {
    /// Create a context for a resolved deployment.
    pub fn new(deployment: DeploymentContext) -> Self {
        Self {
            mode: deployment.mode,
            user: deployment.user,
            project_root: None,
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Set the project checkout used by user-owned steps.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn user(&self) -> &InvokingUser {
        &self.user
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Record a warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Record the name of a step that failed fatally.
    pub fn record_failure(&mut self, step: impl Into<String>) {
        self.failures.push(step.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Borrow the handle passed to [`Step::remediate`](super::Step::remediate).
    pub fn scope(&mut self) -> StepScope<'_> {
        StepScope { ctx: self }
    }
}

/// What a step sees of the context while remediating: read access plus
/// appending warnings. It cannot replace the context or record failures.
#[derive(Debug)]
pub struct StepScope<'a> {
    ctx: &'a mut ExecutionContext,
}

impl StepScope<'_> {
    pub fn mode(&self) -> DeploymentMode {
        self.ctx.mode()
    }

    pub fn user(&self) -> &InvokingUser {
        self.ctx.user()
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.ctx.project_root()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.ctx.add_warning(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserSource;

    fn context() -> ExecutionContext {
        ExecutionContext::new(DeploymentContext {
            mode: DeploymentMode::Development,
            user: InvokingUser {
                name: "alice".into(),
                uid: Some(1000),
                home: PathBuf::from("/home/alice"),
                source: UserSource::SudoUser,
            },
            config_path: PathBuf::from("/etc/walrus/system.conf"),
        })
    }

    #[test]
    fn starts_empty() {
        let ctx = context();
        assert!(ctx.warnings().is_empty());
        assert!(ctx.failures().is_empty());
        assert!(ctx.project_root().is_none());
        assert_eq!(ctx.user().name, "alice");
    }

    #[test]
    fn warnings_and_failures_only_grow() {
        let mut ctx = context();
        ctx.add_warning("first");
        ctx.add_warning("second");
        ctx.record_failure("nodejs");

        assert_eq!(ctx.warnings(), ["first", "second"]);
        assert_eq!(ctx.failures(), ["nodejs"]);
    }

    #[test]
    fn scope_appends_warnings_to_context() {
        let mut ctx = context().with_project_root("/srv/app");
        ctx.add_warning("earlier");
        {
            let mut scope = ctx.scope();
            assert_eq!(scope.user().name, "alice");
            assert_eq!(scope.mode(), DeploymentMode::Development);
            assert_eq!(scope.project_root(), Some(Path::new("/srv/app")));
            scope.add_warning("later");
        }
        assert_eq!(ctx.warnings(), ["earlier", "later"]);
        assert!(ctx.failures().is_empty());
    }

    #[test]
    fn project_root_is_optional() {
        let ctx = context().with_project_root("/home/alice/suiftly-co");
        assert_eq!(
            ctx.project_root(),
            Some(Path::new("/home/alice/suiftly-co"))
        );
    }
}
