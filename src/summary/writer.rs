//! Atomic summary file writes.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::{Result, SetupError};

use super::document::{PhaseStatus, RunStatus, TestSummary};

/// Repository name used in the summary file name and document.
pub const REPO_NAME: &str = "suiftly-co";

/// `/tmp/<repo>-test-summary.json`
pub fn default_summary_path(repo: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/{}-test-summary.json", repo))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write `summary` to `path` through `<path>.tmp` and a rename, so readers
/// never observe a partial document.
pub fn write_atomic(path: &Path, summary: &TestSummary) -> Result<()> {
    let wrap = |message: String| SetupError::SummaryWrite {
        path: path.to_path_buf(),
        message,
    };

    let content = serde_json::to_string_pretty(summary).map_err(|e| wrap(e.to_string()))?;
    let tmp = temp_path(path);
    fs::write(&tmp, content).map_err(|e| wrap(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| wrap(e.to_string()))?;
    Ok(())
}

/// A summary document bound to its file. Every change is written through.
#[derive(Debug)]
pub struct SummaryWriter {
    path: PathBuf,
    summary: TestSummary,
}

impl SummaryWriter {
    /// Write the initial document.
    pub fn create(path: impl Into<PathBuf>, summary: TestSummary) -> Result<Self> {
        let writer = Self {
            path: path.into(),
            summary,
        };
        writer.flush()?;
        debug!("Summary file: {}", writer.path.display());
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn summary(&self) -> &TestSummary {
        &self.summary
    }

    pub fn update_phase(
        &mut self,
        name: &str,
        status: PhaseStatus,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.summary.update_phase(name, status, duration);
        self.flush()
    }

    pub fn finalize(&mut self, status: RunStatus) -> Result<()> {
        self.summary.finalize(status, Utc::now());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        write_atomic(&self.path, &self.summary)
    }
}
