//! Error types for provisioning operations.
//!
//! This module defines [`SetupError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - External commands never produce a `SetupError`; a non-zero exit is a
//!   [`CommandResult`](crate::shell::CommandResult) the caller branches on
//! - Precondition variants abort the run before any step executes
//! - Anything a step returns as `Err` is an unexpected fault, caught once by
//!   the step executor and attributed to that step

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The process is not running with root privileges.
    #[error("This command must be run with sudo (effective uid is not 0)")]
    NotElevated,

    /// The host OS or release is not supported.
    #[error("Unsupported operating system: {message}")]
    UnsupportedOs { message: String },

    /// The deployment configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// A required key is absent from the deployment configuration file.
    #[error("{key} not found in {path}")]
    ConfigKeyMissing { path: PathBuf, key: String },

    /// A required key is present but has no value.
    #[error("{key} is empty in {path}")]
    ConfigValueEmpty { path: PathBuf, key: String },

    /// The deployment mode value is not one of the known modes.
    #[error("Invalid deployment mode '{value}' in {path} (expected development or production)")]
    InvalidDeploymentMode { path: PathBuf, value: String },

    /// The invoking (non-root) user could not be determined.
    #[error("Cannot determine invoking user: {message}")]
    UserUnresolved { message: String },

    /// Step execution failed unexpectedly.
    #[error("Step '{step}' failed: {message}")]
    StepExecutionError { step: String, message: String },

    /// The test-summary file could not be written.
    #[error("Failed to write summary to {path}: {message}")]
    SummaryWrite { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, SetupError>;
