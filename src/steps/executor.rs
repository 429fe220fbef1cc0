//! Step execution engine.
//!
//! Runs the ordered step list against one [`ExecutionContext`]. List order is
//! dependency order: a fatal failure halts the run, since later steps may
//! assume the earlier ones succeeded.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, SetupError};
use crate::shell::Host;

use super::context::ExecutionContext;
use super::step::{Fatality, Probe, Remediation, Step};

/// Terminal outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Probe reported the goal already satisfied.
    Skipped,
    /// Remediation ran and succeeded.
    Remediated,
    /// Remediation failed on a non-fatal step.
    Warned,
    /// Remediation failed on a fatal step, the probe found a misconfiguration,
    /// or the step faulted.
    FatalFailed,
}

impl StepOutcome {
    /// Get a display character for this outcome.
    pub fn display_char(&self) -> char {
        match self {
            StepOutcome::Skipped => '○',
            StepOutcome::Remediated => '✓',
            StepOutcome::Warned => '⚠',
            StepOutcome::FatalFailed => '✗',
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepOutcome::Skipped => "skipped",
            StepOutcome::Remediated => "remediated",
            StepOutcome::Warned => "warned",
            StepOutcome::FatalFailed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    /// Probe detail, remediation detail, or failure reason.
    pub detail: String,
    pub duration: Duration,
}

/// Aggregate result of one run.
///
/// Steps after a fail-fast halt or an interrupt have no record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub records: Vec<StepRecord>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
    pub interrupted: bool,
}

impl RunResult {
    /// No fatal failures and not interrupted. Warnings are allowed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    /// Number of records with the given outcome.
    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    /// The record for `name`, if that step executed.
    pub fn record(&self, name: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(|r| r.duration).sum()
    }
}

/// One entry of a probe-only pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEntry {
    pub name: String,
    pub probe: Probe,
}

/// Result of a probe-only pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub entries: Vec<CheckEntry>,
    pub interrupted: bool,
}

impl CheckReport {
    /// Every step probed and every probe satisfied.
    pub fn is_converged(&self) -> bool {
        !self.interrupted && self.entries.iter().all(|e| e.probe.is_satisfied())
    }

    /// Entries whose probe was not satisfied.
    pub fn drift(&self) -> impl Iterator<Item = &CheckEntry> {
        self.entries.iter().filter(|e| !e.probe.is_satisfied())
    }
}

/// Progress events emitted while running.
#[derive(Debug, Clone, Copy)]
pub enum RunProgress<'a> {
    /// A step is about to be probed. `index` is zero-based.
    StepStarting {
        index: usize,
        total: usize,
        name: &'a str,
        description: &'a str,
    },
    /// The probe was unsatisfied and remediation is starting.
    Remediating { name: &'a str, reason: &'a str },
    /// A step reached a terminal outcome.
    StepFinished(&'a StepRecord),
    /// A probe completed in check mode.
    Probed { name: &'a str, probe: &'a Probe },
}

/// Options for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Re-probe after a successful remediation and treat anything but
    /// `Satisfied` as a remediation failure.
    pub verify: bool,
}

/// Executes steps in order against a host.
pub struct StepExecutor<'a> {
    host: &'a Host<'a>,
    options: ExecutorOptions,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<'a> StepExecutor<'a> {
    pub fn new(host: &'a Host<'a>) -> Self {
        Self {
            host,
            options: ExecutorOptions::default(),
            interrupt: None,
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop before the next step once `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Probe and, where needed, remediate every step in order.
    pub fn run(
        &self,
        steps: &[Box<dyn Step>],
        ctx: &mut ExecutionContext,
        on_progress: &mut dyn FnMut(RunProgress<'_>),
    ) -> RunResult {
        let mut records = Vec::with_capacity(steps.len());
        let mut interrupted = false;

        for (index, step) in steps.iter().enumerate() {
            if self.interrupted() {
                warn!("Interrupted before step {}", step.name());
                interrupted = true;
                break;
            }

            on_progress(RunProgress::StepStarting {
                index,
                total: steps.len(),
                name: step.name(),
                description: step.description(),
            });

            let record = self.run_step(step.as_ref(), ctx, on_progress);
            let halt = record.outcome == StepOutcome::FatalFailed;
            on_progress(RunProgress::StepFinished(&record));
            records.push(record);

            if halt {
                debug!("Halting run after fatal failure in {}", step.name());
                break;
            }
        }

        // Ctrl-C usually lands inside a remediation command, which then fails
        // before the loop looks at the flag again.
        let interrupted = interrupted || self.interrupted();
        if interrupted {
            debug!("Run stopped by interrupt after {} steps", records.len());
        }

        RunResult {
            records,
            warnings: ctx.warnings().to_vec(),
            failures: ctx.failures().to_vec(),
            interrupted,
        }
    }

    fn run_step(
        &self,
        step: &dyn Step,
        ctx: &mut ExecutionContext,
        on_progress: &mut dyn FnMut(RunProgress<'_>),
    ) -> StepRecord {
        let start = Instant::now();
        let name = step.name();

        let (outcome, detail) = match guarded(name, || step.probe(self.host, ctx)) {
            Err(fault) => fatal(ctx, name, fault),
            Ok(Probe::Satisfied(detail)) => {
                debug!("{} already satisfied: {}", name, detail);
                (StepOutcome::Skipped, detail)
            }
            Ok(Probe::Misconfigured(reason)) => fatal(ctx, name, reason),
            Ok(Probe::Unsatisfied(reason)) => {
                debug!("{} unsatisfied: {}", name, reason);
                on_progress(RunProgress::Remediating {
                    name,
                    reason: &reason,
                });
                self.remediate(step, ctx)
            }
        };

        StepRecord {
            name: name.to_string(),
            outcome,
            detail,
            duration: start.elapsed(),
        }
    }

    fn remediate(&self, step: &dyn Step, ctx: &mut ExecutionContext) -> (StepOutcome, String) {
        let name = step.name();

        let remediation = match guarded(name, || step.remediate(self.host, &mut ctx.scope())) {
            Ok(remediation) => remediation,
            Err(fault) => return fatal(ctx, name, fault),
        };

        let remediation = match remediation {
            Remediation::Success(detail) if self.options.verify => {
                match guarded(name, || step.probe(self.host, ctx)) {
                    Ok(Probe::Satisfied(_)) => Remediation::Success(detail),
                    Ok(probe) => Remediation::Failure(format!(
                        "remediation reported success but probe still unsatisfied: {}",
                        probe.detail()
                    )),
                    Err(fault) => return fatal(ctx, name, fault),
                }
            }
            other => other,
        };

        match remediation {
            Remediation::Success(detail) => (StepOutcome::Remediated, detail),
            Remediation::Failure(reason) => match step.fatality() {
                Fatality::Fatal => fatal(ctx, name, reason),
                Fatality::Warn => {
                    warn!("{} failed (non-fatal): {}", name, reason);
                    ctx.add_warning(format!("{}: {}", name, reason));
                    (StepOutcome::Warned, reason)
                }
            },
        }
    }

    /// Run every probe without remediating anything.
    pub fn check(
        &self,
        steps: &[Box<dyn Step>],
        ctx: &ExecutionContext,
        on_progress: &mut dyn FnMut(RunProgress<'_>),
    ) -> CheckReport {
        let mut report = CheckReport::default();

        for (index, step) in steps.iter().enumerate() {
            if self.interrupted() {
                report.interrupted = true;
                break;
            }

            on_progress(RunProgress::StepStarting {
                index,
                total: steps.len(),
                name: step.name(),
                description: step.description(),
            });

            let probe = guarded(step.name(), || step.probe(self.host, ctx))
                .unwrap_or_else(Probe::Misconfigured);
            on_progress(RunProgress::Probed {
                name: step.name(),
                probe: &probe,
            });
            report.entries.push(CheckEntry {
                name: step.name().to_string(),
                probe,
            });
        }

        report.interrupted |= self.interrupted();
        report
    }
}

fn fatal(ctx: &mut ExecutionContext, name: &str, reason: String) -> (StepOutcome, String) {
    ctx.record_failure(name);
    (StepOutcome::FatalFailed, reason)
}

/// Call into a step, converting `Err` and panics into an attributed message.
fn guarded<T>(step: &str, f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            let err = SetupError::StepExecutionError {
                step: step.to_string(),
                message: e.to_string(),
            };
            warn!("{}", err);
            Err(format!("unexpected error: {}", e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Step '{}' panicked: {}", step, message);
            Err(format!("step panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentContext, DeploymentMode, InvokingUser, UserSource};
    use crate::shell::MockRunner;
    use crate::steps::StepScope;
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// A step whose probe flips to satisfied once remediation runs.
    struct FakeStep {
        name: &'static str,
        fatality: Fatality,
        satisfied: Rc<Cell<bool>>,
        remediation: Remediation,
        sticks: bool,
        remediations: Rc<Cell<usize>>,
    }

    impl FakeStep {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                fatality: Fatality::Fatal,
                satisfied: Rc::new(Cell::new(false)),
                remediation: Remediation::done(),
                sticks: true,
                remediations: Rc::new(Cell::new(0)),
            }
        }

        fn satisfied(self) -> Self {
            self.satisfied.set(true);
            self
        }

        fn failing(mut self, fatality: Fatality) -> Self {
            self.fatality = fatality;
            self.remediation = Remediation::Failure("exit code 100".into());
            self
        }

        fn not_sticking(mut self) -> Self {
            self.sticks = false;
            self
        }
    }

    impl Step for FakeStep {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fake step"
        }

        fn fatality(&self) -> Fatality {
            self.fatality
        }

        fn probe(&self, _host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
            Ok(if self.satisfied.get() {
                Probe::Satisfied("present".into())
            } else {
                Probe::Unsatisfied("missing".into())
            })
        }

        fn remediate(&self, _host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
            self.remediations.set(self.remediations.get() + 1);
            if self.remediation.is_success() && self.sticks {
                self.satisfied.set(true);
            }
            Ok(self.remediation.clone())
        }
    }

    struct FaultyStep {
        panics: bool,
    }

    impl Step for FaultyStep {
        fn name(&self) -> &str {
            "faulty"
        }

        fn description(&self) -> &str {
            "faults during probe"
        }

        fn probe(&self, _host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
            if self.panics {
                panic!("probe exploded");
            }
            Err(SetupError::Io(std::io::Error::other("disk full")))
        }

        fn remediate(&self, _host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
            Ok(Remediation::done())
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(DeploymentContext {
            mode: DeploymentMode::Development,
            user: InvokingUser {
                name: "alice".into(),
                uid: Some(1000),
                home: PathBuf::from("/home/alice"),
                source: UserSource::SudoUser,
            },
            config_path: PathBuf::from("/etc/walrus/system.conf"),
        })
    }

    fn run(steps: &[Box<dyn Step>], options: ExecutorOptions) -> RunResult {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let mut ctx = context();
        StepExecutor::new(&host)
            .with_options(options)
            .run(steps, &mut ctx, &mut |_| {})
    }

    #[test]
    fn satisfied_step_is_skipped_without_remediation() {
        let step = FakeStep::new("nginx").satisfied();
        let remediations = step.remediations.clone();
        let result = run(&[Box::new(step)], ExecutorOptions::default());

        assert_eq!(result.records[0].outcome, StepOutcome::Skipped);
        assert_eq!(remediations.get(), 0);
        assert!(result.is_success());
    }

    #[test]
    fn unsatisfied_step_is_remediated() {
        let result = run(&[Box::new(FakeStep::new("nginx"))], ExecutorOptions::default());
        assert_eq!(result.records[0].outcome, StepOutcome::Remediated);
    }

    #[test]
    fn fatal_failure_halts_run() {
        let later = FakeStep::new("later");
        let later_runs = later.remediations.clone();
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FakeStep::new("first")),
            Box::new(FakeStep::new("broken").failing(Fatality::Fatal)),
            Box::new(later),
        ];
        let result = run(&steps, ExecutorOptions::default());

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.failures, vec!["broken"]);
        assert!(result.record("later").is_none());
        assert_eq!(later_runs.get(), 0);
        assert!(!result.is_success());
    }

    #[test]
    fn warn_failure_continues() {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FakeStep::new("tune").failing(Fatality::Warn)),
            Box::new(FakeStep::new("next")),
        ];
        let result = run(&steps, ExecutorOptions::default());

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].outcome, StepOutcome::Warned);
        assert_eq!(result.records[1].outcome, StepOutcome::Remediated);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("tune"));
        assert!(result.is_success());
    }

    #[test]
    fn step_error_is_attributed_and_fatal() {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FaultyStep { panics: false }),
            Box::new(FakeStep::new("after")),
        ];
        let result = run(&steps, ExecutorOptions::default());

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].outcome, StepOutcome::FatalFailed);
        assert!(result.records[0].detail.contains("disk full"));
        assert_eq!(result.failures, vec!["faulty"]);
    }

    #[test]
    fn step_panic_is_attributed_and_fatal() {
        let result = run(
            &[Box::new(FaultyStep { panics: true })],
            ExecutorOptions::default(),
        );

        assert_eq!(result.failures, vec!["faulty"]);
        assert!(result.records[0].detail.contains("probe exploded"));
    }

    #[test]
    fn verify_catches_remediation_that_did_not_stick() {
        let steps: Vec<Box<dyn Step>> = vec![Box::new(FakeStep::new("pm2").not_sticking())];

        let trusting = run(&steps, ExecutorOptions::default());
        assert_eq!(trusting.records[0].outcome, StepOutcome::Remediated);

        let verifying = run(&steps, ExecutorOptions { verify: true });
        assert_eq!(verifying.records[0].outcome, StepOutcome::FatalFailed);
        assert!(verifying.records[0].detail.contains("still unsatisfied"));
    }

    #[test]
    fn interrupt_stops_before_next_step() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let flag = Arc::new(AtomicBool::new(false));
        let executor = StepExecutor::new(&host).with_interrupt(flag.clone());
        let steps: Vec<Box<dyn Step>> =
            vec![Box::new(FakeStep::new("a")), Box::new(FakeStep::new("b"))];

        let mut ctx = context();
        let result = executor.run(&steps, &mut ctx, &mut |event| {
            if let RunProgress::StepFinished(_) = event {
                flag.store(true, Ordering::SeqCst);
            }
        });

        assert!(result.interrupted);
        assert_eq!(result.records.len(), 1);
        assert!(!result.is_success());
    }

    /// Ctrl-C reaches the child command, so the step fails with the flag set.
    struct KilledByInterrupt {
        flag: Arc<AtomicBool>,
    }

    impl Step for KilledByInterrupt {
        fn name(&self) -> &str {
            "postgresql"
        }

        fn description(&self) -> &str {
            "remediation killed by SIGINT"
        }

        fn probe(&self, _host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
            Ok(Probe::Unsatisfied("psql not found".into()))
        }

        fn remediate(&self, _host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
            self.flag.store(true, Ordering::SeqCst);
            Ok(Remediation::Failure("exit code 130".into()))
        }
    }

    #[test]
    fn interrupt_during_fatal_remediation_is_reported_as_interrupt() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let flag = Arc::new(AtomicBool::new(false));
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(KilledByInterrupt { flag: flag.clone() }),
            Box::new(FakeStep::new("later")),
        ];

        let mut ctx = context();
        let result = StepExecutor::new(&host)
            .with_interrupt(flag.clone())
            .run(&steps, &mut ctx, &mut |_| {});

        assert!(result.interrupted);
        assert_eq!(result.failures, vec!["postgresql".to_string()]);
        assert_eq!(result.records.len(), 1);
        assert_eq!(crate::report::exit_code(&result), 130);
    }

    #[test]
    fn interrupt_on_last_step_is_reported() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let flag = Arc::new(AtomicBool::new(false));
        let steps: Vec<Box<dyn Step>> = vec![Box::new(FakeStep::new("only"))];

        let mut ctx = context();
        let result = StepExecutor::new(&host)
            .with_interrupt(flag.clone())
            .run(&steps, &mut ctx, &mut |event| {
                if let RunProgress::Remediating { .. } = event {
                    flag.store(true, Ordering::SeqCst);
                }
            });

        assert_eq!(result.records.len(), 1);
        assert!(result.interrupted);
    }

    #[test]
    fn progress_events_are_ordered() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FakeStep::new("a").satisfied()),
            Box::new(FakeStep::new("b")),
        ];
        let mut events = Vec::new();
        let mut ctx = context();
        StepExecutor::new(&host).run(&steps, &mut ctx, &mut |event| {
            events.push(match event {
                RunProgress::StepStarting { index, .. } => format!("start {}", index),
                RunProgress::Remediating { name, .. } => format!("remediate {}", name),
                RunProgress::StepFinished(r) => format!("finish {} {}", r.name, r.outcome),
                RunProgress::Probed { name, .. } => format!("probed {}", name),
            });
        });

        assert_eq!(
            events,
            vec![
                "start 0",
                "finish a skipped",
                "start 1",
                "remediate b",
                "finish b remediated",
            ]
        );
    }

    #[test]
    fn check_never_remediates() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let step = FakeStep::new("nginx");
        let remediations = step.remediations.clone();
        let steps: Vec<Box<dyn Step>> =
            vec![Box::new(step), Box::new(FakeStep::new("ok").satisfied())];

        let report = StepExecutor::new(&host).check(&steps, &context(), &mut |_| {});

        assert_eq!(remediations.get(), 0);
        assert_eq!(report.entries.len(), 2);
        assert!(!report.is_converged());
        assert_eq!(report.drift().count(), 1);
    }

    #[test]
    fn check_converts_faults_to_misconfigured() {
        let runner = MockRunner::new();
        let host = Host::new(&runner);
        let steps: Vec<Box<dyn Step>> = vec![Box::new(FaultyStep { panics: false })];

        let report = StepExecutor::new(&host).check(&steps, &context(), &mut |_| {});
        assert!(matches!(report.entries[0].probe, Probe::Misconfigured(_)));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(StepOutcome::FatalFailed.to_string(), "failed");
        assert_eq!(StepOutcome::Skipped.display_char(), '○');
    }
}
