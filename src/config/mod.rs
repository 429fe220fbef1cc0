//! Configuration sources.
//!
//! The tool keeps no configuration of its own. It reads:
//! - the deployment config file (`KEY=VALUE`, see [`deployment`])
//! - the privilege-escalation environment for the invoking user
//! - the passwd database (see [`passwd`])

pub mod deployment;
pub mod env_file;
pub mod passwd;

pub use deployment::{
    config_hint, read_deployment_mode, DeploymentContext, DeploymentMode, InvokingUser,
    UserSource, DEFAULT_SYSTEM_CONF, DEPLOYMENT_KEY,
};
pub use env_file::EnvFileParser;
pub use passwd::{find_user, lookup_user, PasswdEntry};
