//! netops-setup - idempotent host provisioning for the suiftly network stack.
//!
//! The provisioner walks an ordered list of steps. Each step probes the host
//! first and only remediates when the probe reports drift, so a re-run on a
//! converged host changes nothing.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Deployment mode, env files and invoking-user resolution
//! - [`error`] - Error types and result aliases
//! - [`preflight`] - Privilege and operating-system checks
//! - [`provision`] - The concrete provisioning steps
//! - [`report`] - Live status output, the final block and exit codes
//! - [`shell`] - External command execution and host filesystem access
//! - [`steps`] - The probe/remediate engine
//! - [`summary`] - The JSON run-summary file
//! - [`testrun`] - Repository test runner with production guard
//! - [`ui`] - Spinners, themes and terminal output

pub mod cli;
pub mod config;
pub mod error;
pub mod preflight;
pub mod provision;
pub mod report;
pub mod shell;
pub mod steps;
pub mod summary;
pub mod testrun;
pub mod ui;

pub use error::{Result, SetupError};
