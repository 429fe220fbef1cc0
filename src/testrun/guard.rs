//! Refuses test runs on production hosts.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::EnvFileParser;

/// Per-user host config, relative to the home directory.
pub const USER_HOST_CONF: &str = "mhaxbe/system.conf";
/// System-wide host config.
pub const SYSTEM_HOST_CONF: &str = "/etc/mhaxbe/system.conf";

/// Outcome of the production check, with the marker that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVerdict {
    pub production: bool,
    pub reason: String,
}

impl fmt::Display for EnvironmentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Where to look for production markers.
#[derive(Debug, Clone)]
pub struct ProductionGuard {
    user_conf: Option<PathBuf>,
    system_conf: PathBuf,
}

impl ProductionGuard {
    /// Markers under `home` and the system-wide config.
    pub fn new(home: &Path) -> Self {
        Self::with_paths(home.join(USER_HOST_CONF), SYSTEM_HOST_CONF)
    }

    pub fn with_paths(user_conf: impl Into<PathBuf>, system_conf: impl Into<PathBuf>) -> Self {
        Self {
            user_conf: Some(user_conf.into()),
            system_conf: system_conf.into(),
        }
    }

    /// Only the system-wide config, for when there is no home directory.
    pub fn system_only() -> Self {
        Self {
            user_conf: None,
            system_conf: PathBuf::from(SYSTEM_HOST_CONF),
        }
    }

    /// Check both files in order.
    ///
    /// `ENVIRONMENT` in the user config decides on its own when it is
    /// `production` or `development`. Otherwise `DEPLOYMENT_TYPE=production`
    /// in the system config marks production. Unreadable files are logged
    /// and treated as absent.
    pub fn evaluate(&self) -> EnvironmentVerdict {
        if let Some(user_conf) = &self.user_conf {
            match read_key(user_conf, "ENVIRONMENT").as_deref() {
                Some("production") => return verdict(true, "ENVIRONMENT=production", user_conf),
                Some("development") => {
                    return verdict(false, "ENVIRONMENT=development", user_conf)
                }
                _ => {}
            }
        }

        if read_key(&self.system_conf, "DEPLOYMENT_TYPE").as_deref() == Some("production") {
            return verdict(true, "DEPLOYMENT_TYPE=production", &self.system_conf);
        }

        EnvironmentVerdict {
            production: false,
            reason: "No production markers found".to_string(),
        }
    }
}

fn verdict(production: bool, marker: &str, path: &Path) -> EnvironmentVerdict {
    EnvironmentVerdict {
        production,
        reason: format!("{} in {}", marker, path.display()),
    }
}

/// Lowercased value of `key`, if the file exists and sets it.
fn read_key(path: &Path, key: &str) -> Option<String> {
    match EnvFileParser::load_optional(path) {
        Ok(vars) => vars.get(key).map(|v| v.to_lowercase()),
        Err(e) => {
            warn!("{:#}", e);
            None
        }
    }
}
