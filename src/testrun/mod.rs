//! The repository test runner behind `netops-setup test`.
//!
//! Refuses to run on production hosts, then runs each phase with a
//! wall-clock limit and keeps the summary file current.

pub mod guard;
pub mod orchestrator;

pub use guard::{EnvironmentVerdict, ProductionGuard, SYSTEM_HOST_CONF, USER_HOST_CONF};
pub use orchestrator::{TestOrchestrator, TestPhase, DEFAULT_PHASES, PHASE_TIMEOUT};
