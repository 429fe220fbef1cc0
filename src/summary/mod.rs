//! The external test-summary protocol.
//!
//! A single JSON document at `/tmp/<repo>-test-summary.json` that monitors
//! poll while a run is in progress. Every update replaces the file
//! atomically.

pub mod document;
pub mod recorder;
pub mod writer;

pub use document::{Phase, PhaseCounts, PhaseStatus, RunStatus, TestSummary};
pub use recorder::{phase_status, run_status, PhaseRecorder};
pub use writer::{default_summary_path, write_atomic, SummaryWriter, REPO_NAME};
