//! Platform detection: privilege and OS release.

use std::collections::HashMap;
use std::path::Path;

use crate::config::EnvFileParser;

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Check if running in a CI environment.
///
/// Checks common CI environment variables: `CI`, `GITHUB_ACTIONS`,
/// `GITLAB_CI`, `CIRCLECI`, `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS", "JENKINS_URL"]
        .iter()
        .any(|var| std::env::var(var).is_ok())
}

/// Parsed `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Distribution id (`ubuntu`, `debian`, ...).
    pub id: String,
    /// Release version (`24.04`).
    pub version_id: String,
    /// Release codename (`noble`), if present.
    pub codename: Option<String>,
}

impl OsRelease {
    /// Build from `KEY=VALUE` pairs.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            id: vars.get("ID").cloned().unwrap_or_else(|| "unknown".to_string()),
            version_id: vars.get("VERSION_ID").cloned().unwrap_or_default(),
            codename: vars
                .get("VERSION_CODENAME")
                .or_else(|| vars.get("UBUNTU_CODENAME"))
                .filter(|c| !c.is_empty())
                .cloned(),
        }
    }

    /// Read an os-release file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let vars = EnvFileParser::load(path)?;
        Ok(Self::from_vars(&vars))
    }
}
