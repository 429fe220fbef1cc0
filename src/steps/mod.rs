//! The step engine.
//!
//! - [`Step`] - the probe/remediate contract
//! - [`ExecutionContext`] - per-run mode, user and accumulated warnings/failures
//!   ([`StepScope`] is the append-only view a remediating step gets)
//! - [`StepExecutor`] - ordered, fail-fast execution producing a [`RunResult`]
//! - [`probe_major`] - exact-major version probes
//! - [`CandidateSet`] - capabilities satisfied by any one of several packages
//!
//! # Example
//!
//! ```
//! use netops_setup::config::{DeploymentContext, DeploymentMode, InvokingUser, UserSource};
//! use netops_setup::shell::{CommandSpec, Host, MockRunner, CommandResult};
//! use netops_setup::steps::{
//!     ExecutionContext, Probe, Remediation, Step, StepExecutor, StepOutcome, StepScope,
//! };
//! use netops_setup::Result;
//!
//! struct Nginx;
//!
//! impl Step for Nginx {
//!     fn name(&self) -> &str { "nginx" }
//!     fn description(&self) -> &str { "Install Nginx" }
//!
//!     fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
//!         let result = host.run(&CommandSpec::new("nginx").arg("-v"));
//!         Ok(if result.success() {
//!             Probe::Satisfied(result.output_text().to_string())
//!         } else {
//!             Probe::Unsatisfied("nginx not installed".into())
//!         })
//!     }
//!
//!     fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
//!         let result = host.run(&CommandSpec::new("apt-get").args(["install", "-y", "nginx"]));
//!         Ok(if result.success() {
//!             Remediation::done()
//!         } else {
//!             Remediation::Failure(result.failure_summary())
//!         })
//!     }
//! }
//!
//! let runner = MockRunner::new();
//! runner.respond("apt-get install -y nginx", CommandResult::ok(""));
//! let host = Host::new(&runner);
//!
//! let mut ctx = ExecutionContext::new(DeploymentContext {
//!     mode: DeploymentMode::Development,
//!     user: InvokingUser {
//!         name: "alice".into(),
//!         uid: Some(1000),
//!         home: "/home/alice".into(),
//!         source: UserSource::SudoUser,
//!     },
//!     config_path: "/etc/walrus/system.conf".into(),
//! });
//!
//! let steps: Vec<Box<dyn Step>> = vec![Box::new(Nginx)];
//! let result = StepExecutor::new(&host).run(&steps, &mut ctx, &mut |_| {});
//! assert_eq!(result.records[0].outcome, StepOutcome::Remediated);
//! ```

pub mod candidates;
pub mod context;
pub mod executor;
pub mod step;
pub mod version;

pub use candidates::CandidateSet;
pub use context::{ExecutionContext, StepScope};
pub use executor::{
    CheckEntry, CheckReport, ExecutorOptions, RunProgress, RunResult, StepExecutor, StepOutcome,
    StepRecord,
};
pub use step::{Fatality, Probe, Remediation, Step};
pub use version::{parse_major, probe_major};
