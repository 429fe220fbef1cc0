//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_SYSTEM_CONF;

/// netops-setup - Idempotent provisioning for NetOps application servers.
#[derive(Debug, Parser)]
#[command(name = "netops-setup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Deployment config file holding DEPLOYMENT_TYPE
    #[arg(long, global = true, env = "NETOPS_SYSTEM_CONF", default_value = DEFAULT_SYSTEM_CONF)]
    pub system_conf: PathBuf,

    /// Application checkout (project dependencies, test runs)
    #[arg(short, long, global = true, env = "NETOPS_PROJECT")]
    pub project: Option<PathBuf>,

    /// Write step progress to this test-summary file
    #[arg(long, global = true, env = "NETOPS_SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,

    /// Re-probe each step after remediating it
    #[arg(long, global = true)]
    pub verify: bool,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Provision this host (default if no command specified)
    Setup,

    /// Probe every step and report drift without changing anything
    Check,

    /// Run the repository test suite (refused on production hosts)
    Test,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
