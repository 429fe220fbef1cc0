//! The deploy account and the application directory tree.

use std::fs;
use std::path::Path;

use crate::config::{lookup_user, PasswdEntry};
use crate::error::Result;
use crate::shell::{CommandSpec, Host};
use crate::steps::{ExecutionContext, Probe, Remediation, Step, StepScope};

/// System account that owns deployed code.
pub const DEPLOY_USER: &str = "deploy";

/// Directories created for the applications and their logs.
pub const APP_DIRECTORIES: &[&str] = &[
    "/var/www/api",
    "/var/www/webapp",
    "/var/www/global-manager",
    "/var/log/suiftly",
];

/// Roots whose whole tree is owned by the deploy user.
pub const OWNED_ROOTS: &[&str] = &["/var/www", "/var/log/suiftly"];

fn deploy_entry(host: &Host<'_>) -> Option<PasswdEntry> {
    lookup_user(&host.path("/etc/passwd"), DEPLOY_USER)
}

/// The `deploy` system user.
#[derive(Debug, Default)]
pub struct DeployUser;

impl Step for DeployUser {
    fn name(&self) -> &str {
        "deploy_user"
    }

    fn description(&self) -> &str {
        "Create the deploy system user"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        Ok(match deploy_entry(host) {
            Some(entry) => Probe::Satisfied(format!("uid {}", entry.uid)),
            None => Probe::Unsatisfied(format!("user '{}' does not exist", DEPLOY_USER)),
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let result = host.run(
            &CommandSpec::new("useradd").args(["-m", "-s", "/bin/bash", DEPLOY_USER]),
        );
        Ok(if result.success() {
            Remediation::done()
        } else {
            Remediation::Failure(format!("useradd failed ({})", result.failure_summary()))
        })
    }
}

#[cfg(unix)]
fn owned_by(path: &Path, uid: u32) -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).map(|m| m.uid() == uid).unwrap_or(false)
}

#[cfg(not(unix))]
fn owned_by(path: &Path, _uid: u32) -> bool {
    path.exists()
}

/// Application directories owned by the deploy user.
///
/// Ownership problems are recorded as a warning; the directories themselves
/// must exist for the step to succeed.
#[derive(Debug, Default)]
pub struct DirectoryStructure;

impl Step for DirectoryStructure {
    fn name(&self) -> &str {
        "directory_structure"
    }

    fn description(&self) -> &str {
        "Create application directories"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let missing: Vec<&str> = APP_DIRECTORIES
            .iter()
            .copied()
            .filter(|d| !host.path(d).is_dir())
            .collect();
        if !missing.is_empty() {
            return Ok(Probe::Unsatisfied(format!("missing {}", missing.join(", "))));
        }

        let Some(deploy) = deploy_entry(host) else {
            return Ok(Probe::Unsatisfied(format!(
                "user '{}' does not exist",
                DEPLOY_USER
            )));
        };

        Ok(
            match OWNED_ROOTS.iter().find(|d| !owned_by(&host.path(d), deploy.uid)) {
                Some(dir) => Probe::Unsatisfied(format!("{} not owned by {}", dir, DEPLOY_USER)),
                None => Probe::Satisfied(format!("{} directories", APP_DIRECTORIES.len())),
            },
        )
    }

    fn remediate(&self, host: &Host<'_>, ctx: &mut StepScope<'_>) -> Result<Remediation> {
        for dir in APP_DIRECTORIES {
            fs::create_dir_all(host.path(dir))?;
        }

        let owner = format!("{0}:{0}", DEPLOY_USER);
        for root in OWNED_ROOTS {
            let target = host.path(root);
            let result = host.run(
                &CommandSpec::new("chown")
                    .args(["-R", owner.as_str()])
                    .arg(target.to_string_lossy()),
            );
            if !result.success() {
                ctx.add_warning(format!(
                    "Ownership of {} may need manual adjustment ({})",
                    root,
                    result.failure_summary()
                ));
            }
        }

        Ok(Remediation::done())
    }
}
