//! System, Python, web-server and certificate packages.

use crate::error::Result;
use crate::shell::{CommandSpec, Host};
use crate::steps::{CandidateSet, ExecutionContext, Probe, Remediation, Step, StepScope};

use super::apt;

/// Base system packages.
pub const BASE_PACKAGES: &[&str] = &[
    "git",
    "curl",
    "build-essential",
    "python3-pip",
    "software-properties-common",
    "apt-transport-https",
    "ca-certificates",
    "gnupg",
    "lsb-release",
];

/// Libraries needed by headless Playwright browsers.
pub const PLAYWRIGHT_PACKAGES: &[&str] = &["libnspr4", "libnss3"];

/// Audio library, renamed in Ubuntu 24.04.
pub fn audio_library() -> CandidateSet {
    CandidateSet::new("audio library", ["libasound2t64", "libasound2"])
}

/// Base, Playwright and audio packages.
pub struct SystemPackages {
    packages: Vec<&'static str>,
    audio: CandidateSet,
}

impl SystemPackages {
    pub fn new() -> Self {
        Self {
            packages: BASE_PACKAGES
                .iter()
                .chain(PLAYWRIGHT_PACKAGES)
                .copied()
                .collect(),
            audio: audio_library(),
        }
    }
}

impl Default for SystemPackages {
    fn default() -> Self {
        Self::new()
    }
}

impl Step for SystemPackages {
    fn name(&self) -> &str {
        "system_packages"
    }

    fn description(&self) -> &str {
        "Install base system packages"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let missing = apt::missing(host, &self.packages);
        let audio = self.audio.probe(|p| apt::is_installed(host, p));

        Ok(match (missing.is_empty(), audio) {
            (true, Probe::Satisfied(_)) => {
                Probe::Satisfied(format!("all {} packages present", self.packages.len() + 1))
            }
            (_, Probe::Satisfied(_)) => Probe::Unsatisfied(format!("missing {}", missing.join(" "))),
            (true, audio) => audio,
            (false, audio) => Probe::Unsatisfied(format!(
                "missing {}; {}",
                missing.join(" "),
                audio.detail()
            )),
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let updated = apt::update(host);
        if !updated.success() {
            return Ok(Remediation::Failure(format!(
                "apt-get update failed ({}); try: sudo apt update && sudo apt --fix-broken install",
                updated.failure_summary()
            )));
        }

        let missing = apt::missing(host, &self.packages);
        if !missing.is_empty() {
            if let failure @ Remediation::Failure(_) = apt::install_or_fail(host, &missing) {
                return Ok(failure);
            }
        }

        Ok(
            match self.audio.remediate(
                |p| apt::is_installed(host, p),
                |p| apt::install(host, &[p]).success(),
            ) {
                Remediation::Success(audio) => Remediation::Success(format!(
                    "installed {} package(s), {} present",
                    missing.len(),
                    audio
                )),
                failure => failure,
            },
        )
    }
}

/// Python modules used by the database migration scripts, with the apt
/// package providing each.
pub const PYTHON_MODULES: &[(&str, &str)] = &[
    ("python3-psycopg2", "psycopg2"),
    ("python3-dotenv", "dotenv"),
    ("python3-click", "click"),
];

/// System Python modules, installed through apt.
#[derive(Debug, Default)]
pub struct PythonPackages;

impl PythonPackages {
    fn missing(host: &Host<'_>) -> Vec<&'static str> {
        PYTHON_MODULES
            .iter()
            .filter(|(_, module)| {
                !host.check(
                    &CommandSpec::new("python3")
                        .arg("-c")
                        .arg(format!("import {}", module)),
                )
            })
            .map(|(package, _)| *package)
            .collect()
    }
}

impl Step for PythonPackages {
    fn name(&self) -> &str {
        "python_packages"
    }

    fn description(&self) -> &str {
        "Install Python packages for migration scripts"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let missing = Self::missing(host);
        Ok(if missing.is_empty() {
            Probe::Satisfied("all modules importable".into())
        } else {
            Probe::Unsatisfied(format!("missing {}", missing.join(" ")))
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let missing = Self::missing(host);
        if missing.is_empty() {
            return Ok(Remediation::done());
        }
        Ok(apt::install_or_fail(host, &missing))
    }
}

/// Nginx, installed but left unconfigured.
#[derive(Debug, Default)]
pub struct Nginx;

impl Step for Nginx {
    fn name(&self) -> &str {
        "nginx"
    }

    fn description(&self) -> &str {
        "Install Nginx"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        // nginx prints its version on stderr.
        let result = host.run(&CommandSpec::new("nginx").arg("-v"));
        Ok(if result.success() {
            Probe::Satisfied(result.output_text().to_string())
        } else {
            Probe::Unsatisfied("nginx not installed".into())
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        Ok(apt::install_or_fail(host, &["nginx"]))
    }
}

/// Certbot with the Nginx plugin. Production only.
#[derive(Debug, Default)]
pub struct Certbot;

impl Step for Certbot {
    fn name(&self) -> &str {
        "certbot"
    }

    fn description(&self) -> &str {
        "Install Certbot (production only)"
    }

    fn probe(&self, host: &Host<'_>, ctx: &ExecutionContext) -> Result<Probe> {
        if !ctx.mode().is_production() {
            return Ok(Probe::Satisfied(format!("not required in {}", ctx.mode())));
        }

        let result = host.run(&CommandSpec::new("certbot").arg("--version"));
        Ok(if result.success() {
            Probe::Satisfied(result.output_text().to_string())
        } else {
            Probe::Unsatisfied("certbot not installed".into())
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        Ok(apt::install_or_fail(host, &["certbot", "python3-certbot-nginx"]))
    }
}
