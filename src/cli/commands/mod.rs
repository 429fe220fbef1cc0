//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations and hands each one the shared
//! [`RunSettings`], command runner and interrupt flag.

pub mod check;
pub mod completions;
pub mod context;
pub mod dispatcher;
pub mod setup;
pub mod test;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, EnvSource, RunSettings};
