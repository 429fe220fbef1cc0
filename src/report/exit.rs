//! Process exit codes.

use crate::steps::{CheckReport, RunResult};

/// Converged, warnings allowed.
pub const EXIT_OK: i32 = 0;
/// A fatal step failure or a violated precondition.
pub const EXIT_FAILURE: i32 = 1;
/// A test run refused on a production host.
pub const EXIT_REFUSED: i32 = 2;
/// Stopped by Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit code for a provisioning run.
pub fn exit_code(result: &RunResult) -> i32 {
    if result.interrupted {
        EXIT_INTERRUPTED
    } else if !result.failures.is_empty() {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

/// Exit code for a probe-only pass. Any drift is a failure.
pub fn check_exit_code(report: &CheckReport) -> i32 {
    if report.interrupted {
        EXIT_INTERRUPTED
    } else if report.is_converged() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}
