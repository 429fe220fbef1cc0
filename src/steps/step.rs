//! The probe/remediate contract.

use std::fmt;

use crate::error::Result;
use crate::shell::Host;

use super::context::{ExecutionContext, StepScope};

/// What happens to the run when a step's remediation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fatality {
    /// Record the failure and halt the run.
    #[default]
    Fatal,
    /// Record a warning and continue with the next step.
    Warn,
}

impl fmt::Display for Fatality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// Outcome of a read-only probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The host already satisfies the goal. Remediation is skipped.
    Satisfied(String),
    /// The goal is not met and remediation should run.
    Unsatisfied(String),
    /// The host is in a state remediation must not touch, such as a
    /// wrong major version of a pinned dependency.
    Misconfigured(String),
}

impl Probe {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }

    /// The detail or reason carried by the probe.
    pub fn detail(&self) -> &str {
        match self {
            Self::Satisfied(d) | Self::Unsatisfied(d) | Self::Misconfigured(d) => d,
        }
    }
}

/// Outcome of a remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    Success(String),
    Failure(String),
}

impl Remediation {
    /// A success with no detail.
    pub fn done() -> Self {
        Self::Success(String::new())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One idempotent unit of host convergence.
///
/// `probe` must not mutate the host. It takes the context by shared
/// reference and so cannot record warnings either. `remediate` performs
/// the minimal mutating action and may record warnings for partial results
/// that do not fail the step.
///
/// Expected failures are `Ok(Remediation::Failure(..))`. An `Err` is an
/// unexpected fault; the executor converts it into a fatal failure
/// attributed to this step.
pub trait Step {
    /// Unique step name.
    fn name(&self) -> &str;

    /// One-line human description.
    fn description(&self) -> &str;

    fn fatality(&self) -> Fatality {
        Fatality::Fatal
    }

    /// Inspect live host state.
    fn probe(&self, host: &Host<'_>, ctx: &ExecutionContext) -> Result<Probe>;

    /// Converge the host toward the goal.
    fn remediate(&self, host: &Host<'_>, ctx: &mut StepScope<'_>) -> Result<Remediation>;
}
