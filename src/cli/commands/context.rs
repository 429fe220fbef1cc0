//! Preconditions shared by `setup` and `check`.

use tracing::debug;

use crate::config::{config_hint, DeploymentContext};
use crate::error::{Result, SetupError};
use crate::preflight::{check_os, require_elevated};
use crate::shell::Host;
use crate::steps::ExecutionContext;
use crate::ui::UserInterface;

use super::dispatcher::RunSettings;

/// Root check, OS check, then deployment context. Nothing on the host is
/// touched before all three pass.
pub fn prepare(host: &Host<'_>, settings: &RunSettings) -> Result<ExecutionContext> {
    require_elevated(settings.elevated)?;
    let release = check_os(host)?;
    debug!("Host release {} ({:?})", release.version_id, release.codename);

    let deployment = DeploymentContext::resolve_with_env(
        &settings.system_conf,
        &host.path("/etc/passwd"),
        |key: &str| settings.env.var(key),
    )?;
    let mut ctx = ExecutionContext::new(deployment);
    if let Some(project) = &settings.project {
        ctx = ctx.with_project_root(project);
    }
    Ok(ctx)
}

/// Print a precondition failure with its fix-it hint.
pub fn report_precondition(ui: &mut dyn UserInterface, err: &SetupError) {
    ui.error(&err.to_string());
    if let Some(hint) = config_hint(err) {
        ui.show_hint(&hint);
    }
}

/// One line naming the mode and user a run resolved.
pub fn describe(ctx: &ExecutionContext) -> String {
    let user = ctx.user();
    format!(
        "Deployment: {} · User: {} (from {}, home {})",
        ctx.mode(),
        user.name,
        user.source,
        user.home.display()
    )
}
