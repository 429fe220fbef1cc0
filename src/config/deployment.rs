//! Deployment context resolution.
//!
//! The deployment mode comes from exactly one externally managed file and is
//! never defaulted. The invoking user comes from the privilege-escalation
//! environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::env_file::EnvFileParser;
use super::passwd;
use crate::error::{Result, SetupError};

/// Default location of the deployment config file.
pub const DEFAULT_SYSTEM_CONF: &str = "/etc/walrus/system.conf";

/// Key holding the deployment mode.
pub const DEPLOYMENT_KEY: &str = "DEPLOYMENT_TYPE";

/// Deployment mode of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl DeploymentMode {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown deployment mode: {}", other)),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Read the deployment mode from the config file at `path`.
///
/// Fails if the file is missing or unreadable, or if the key is absent,
/// empty, or not a known mode.
pub fn read_deployment_mode(path: &Path) -> Result<DeploymentMode> {
    if !path.exists() {
        return Err(SetupError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    // The first assignment wins; later duplicates are ignored.
    let value = EnvFileParser::load_first(path, DEPLOYMENT_KEY)?
        .ok_or_else(|| SetupError::ConfigKeyMissing {
            path: path.to_path_buf(),
            key: DEPLOYMENT_KEY.to_string(),
        })?;

    if value.trim().is_empty() {
        return Err(SetupError::ConfigValueEmpty {
            path: path.to_path_buf(),
            key: DEPLOYMENT_KEY.to_string(),
        });
    }

    let mode = value
        .parse()
        .map_err(|_| SetupError::InvalidDeploymentMode {
            path: path.to_path_buf(),
            value: value.clone(),
        })?;

    debug!("Read {}={} from {}", DEPLOYMENT_KEY, mode, path.display());
    Ok(mode)
}

/// Operator guidance for a deployment config error, if `err` is one.
pub fn config_hint(err: &SetupError) -> Option<String> {
    let path = match err {
        SetupError::ConfigNotFound { path }
        | SetupError::ConfigKeyMissing { path, .. }
        | SetupError::ConfigValueEmpty { path, .. }
        | SetupError::InvalidDeploymentMode { path, .. } => path,
        _ => return None,
    };

    Some(format!(
        "Set {key} in {path}, one of:\n  {key}=development\n  {key}=production\n\
         Create it with:\n  sudo mkdir -p {dir}\n  sudo vim {path}",
        key = DEPLOYMENT_KEY,
        path = path.display(),
        dir = path.parent().unwrap_or(Path::new("/")).display(),
    ))
}

/// Where the invoking user's name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSource {
    /// `SUDO_USER`, set by sudo.
    SudoUser,
    /// `USER`, the current session.
    SessionUser,
}

impl fmt::Display for UserSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SudoUser => write!(f, "SUDO_USER"),
            Self::SessionUser => write!(f, "USER"),
        }
    }
}

/// The non-privileged user who invoked the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokingUser {
    pub name: String,
    pub uid: Option<u32>,
    pub home: PathBuf,
    pub source: UserSource,
}

impl InvokingUser {
    /// Resolve from the process environment.
    pub fn resolve(passwd_path: &Path) -> Result<Self> {
        Self::resolve_with_env(passwd_path, |key: &str| std::env::var(key))
    }

    /// Resolve with a custom env var lookup function.
    pub fn resolve_with_env<F>(passwd_path: &Path, env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let non_empty = |key: &str| env_fn(key).ok().filter(|v| !v.trim().is_empty());

        let (name, source) = if let Some(name) = non_empty("SUDO_USER") {
            (name, UserSource::SudoUser)
        } else if let Some(name) = non_empty("USER") {
            (name, UserSource::SessionUser)
        } else {
            return Err(SetupError::UserUnresolved {
                message: "neither SUDO_USER nor USER is set".to_string(),
            });
        };

        if let Some(entry) = passwd::lookup_user(passwd_path, &name) {
            return Ok(Self {
                name,
                uid: Some(entry.uid),
                home: entry.home,
                source,
            });
        }

        match (source, non_empty("HOME")) {
            (UserSource::SessionUser, Some(home)) => Ok(Self {
                name,
                uid: None,
                home: PathBuf::from(home),
                source,
            }),
            _ => Err(SetupError::UserUnresolved {
                message: format!(
                    "user '{}' (from {}) has no entry in {}",
                    name,
                    source,
                    passwd_path.display()
                ),
            }),
        }
    }
}

/// Everything resolved from outside the process before any step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    pub mode: DeploymentMode,
    pub user: InvokingUser,
    pub config_path: PathBuf,
}

impl DeploymentContext {
    /// Resolve mode from `config_path` and the invoking user from the environment.
    pub fn resolve(config_path: &Path, passwd_path: &Path) -> Result<Self> {
        Self::resolve_with_env(config_path, passwd_path, |key: &str| std::env::var(key))
    }

    /// Resolve with a custom env var lookup function.
    pub fn resolve_with_env<F>(config_path: &Path, passwd_path: &Path, env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let mode = read_deployment_mode(config_path)?;
        let user = InvokingUser::resolve_with_env(passwd_path, env_fn)?;
        Ok(Self {
            mode,
            user,
            config_path: config_path.to_path_buf(),
        })
    }
}
