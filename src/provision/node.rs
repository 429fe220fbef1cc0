//! Node.js runtime, PM2 and project dependencies.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::shell::{CommandSpec, Host};
use crate::steps::{probe_major, ExecutionContext, Fatality, Probe, Remediation, Step, StepScope};

use super::apt;

/// Required Node.js major version.
pub const NODE_MAJOR: u32 = 22;

const NODESOURCE_SETUP_URL: &str = "https://deb.nodesource.com/setup_22.x";

static NODE_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v(\d+)\.").unwrap());

/// System-wide Node.js from NodeSource.
#[derive(Debug, Default)]
pub struct NodeJs;

impl Step for NodeJs {
    fn name(&self) -> &str {
        "nodejs"
    }

    fn description(&self) -> &str {
        "Install Node.js 22.x (system-wide)"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let result = host.run(&CommandSpec::new("node").arg("--version"));
        Ok(match probe_major("node", &result, &NODE_VERSION, NODE_MAJOR) {
            Probe::Misconfigured(reason) => Probe::Misconfigured(format!(
                "{}; fix: sudo apt purge nodejs npm, then re-run",
                reason
            )),
            probe => probe,
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let script = host.run(&CommandSpec::new("curl").args(["-fsSL", NODESOURCE_SETUP_URL]));
        if !script.success() {
            return Ok(Remediation::Failure(format!(
                "failed to download NodeSource setup ({})",
                script.failure_summary()
            )));
        }

        let setup = host.run(&CommandSpec::new("bash").arg("-").stdin(script.stdout));
        if !setup.success() {
            return Ok(Remediation::Failure(format!(
                "NodeSource setup failed ({})",
                setup.failure_summary()
            )));
        }

        Ok(apt::install_or_fail(host, &["nodejs"]))
    }
}

/// PM2 process manager, installed globally through npm.
#[derive(Debug, Default)]
pub struct Pm2;

impl Step for Pm2 {
    fn name(&self) -> &str {
        "pm2"
    }

    fn description(&self) -> &str {
        "Install PM2 process manager"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let result = host.run(&CommandSpec::new("pm2").arg("--version"));
        Ok(if result.success() {
            Probe::Satisfied(format!("PM2 {}", result.output_text()))
        } else {
            Probe::Unsatisfied("pm2 not installed".into())
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let result = host.run(&CommandSpec::new("npm").args(["install", "-g", "pm2"]));
        Ok(if result.success() {
            Remediation::done()
        } else {
            Remediation::Failure(format!("npm install -g pm2 failed ({})", result.failure_summary()))
        })
    }
}

/// The project's npm dependencies, installed as the invoking user.
#[derive(Debug, Default)]
pub struct ProjectDependencies;

impl Step for ProjectDependencies {
    fn name(&self) -> &str {
        "project_dependencies"
    }

    fn description(&self) -> &str {
        "Install project npm dependencies as the invoking user"
    }

    fn fatality(&self) -> Fatality {
        Fatality::Warn
    }

    fn probe(&self, host: &Host<'_>, ctx: &ExecutionContext) -> Result<Probe> {
        let Some(root) = ctx.project_root() else {
            return Ok(Probe::Satisfied("no project configured".into()));
        };
        if !root.join("package.json").exists() {
            return Ok(Probe::Satisfied(format!(
                "no package.json in {}",
                root.display()
            )));
        }

        let result = host.run(
            &CommandSpec::new("npm")
                .args(["ls", "--depth=0"])
                .cwd(root)
                .as_user(&ctx.user().name),
        );
        Ok(if result.success() {
            Probe::Satisfied("dependencies installed".into())
        } else {
            Probe::Unsatisfied("npm ls reports missing dependencies".into())
        })
    }

    fn remediate(&self, host: &Host<'_>, ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let Some(root) = ctx.project_root() else {
            return Ok(Remediation::done());
        };

        let result = host.run(
            &CommandSpec::new("npm")
                .arg("install")
                .cwd(root)
                .as_user(&ctx.user().name),
        );
        Ok(if result.success() {
            Remediation::Success(format!("npm install in {}", root.display()))
        } else {
            Remediation::Failure(format!("npm install failed ({})", result.failure_summary()))
        })
    }
}
