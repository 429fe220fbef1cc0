//! Exact-major version probes.
//!
//! A missing tool is `Unsatisfied` and gets installed. A present tool with
//! the wrong major version, or output we cannot parse, is `Misconfigured`:
//! pinned environments are never upgraded or downgraded automatically.

use regex::Regex;

use crate::shell::CommandResult;

use super::step::Probe;

/// Extract the first capture group of `pattern` from `output` as a major version.
pub fn parse_major(output: &str, pattern: &Regex) -> Option<u32> {
    pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Classify the result of a `--version` command against a required major.
pub fn probe_major(tool: &str, result: &CommandResult, pattern: &Regex, required: u32) -> Probe {
    if !result.success() {
        return Probe::Unsatisfied(if result.is_not_found() {
            format!("{} not installed", tool)
        } else {
            format!("{} --version failed ({})", tool, result.failure_summary())
        });
    }

    let text = result.output_text();
    match parse_major(text, pattern) {
        Some(major) if major == required => Probe::Satisfied(text.to_string()),
        Some(major) => Probe::Misconfigured(format!(
            "{} {}.x found, but {}.x is required",
            tool, major, required
        )),
        None => Probe::Misconfigured(format!(
            "{} found but its version could not be parsed: {}",
            tool, text
        )),
    }
}
