//! Scripted command runner for testing.
//!
//! `MockRunner` implements [`CommandRunner`] without spawning processes.
//! Responses are keyed by the full command line. A response can also be
//! scheduled to change once another command runs, which models a host whose
//! state is mutated by remediation.
//!
//! # Example
//!
//! ```
//! use netops_setup::shell::{CommandResult, CommandRunner, CommandSpec, MockRunner};
//!
//! let runner = MockRunner::new();
//! runner.respond("nginx -v", CommandResult::not_found("nginx"));
//! runner.respond("apt-get install -y nginx", CommandResult::ok(""));
//! runner.after("apt-get install -y nginx", "nginx -v", CommandResult::ok("nginx/1.24"));
//!
//! assert!(runner.run(&CommandSpec::new("nginx").arg("-v")).is_not_found());
//! runner.run(&CommandSpec::new("apt-get").args(["install", "-y", "nginx"]));
//! assert!(runner.run(&CommandSpec::new("nginx").arg("-v")).success());
//! assert_eq!(runner.count("apt-get install"), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use super::command::{CommandResult, CommandRunner, CommandSpec};

/// Mock command runner for testing.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: RefCell<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, CommandResult>,
    prefix_responses: Vec<(String, CommandResult)>,
    effects: HashMap<String, Vec<(String, CommandResult)>>,
    fallback: Option<CommandResult>,
    calls: Vec<CommandSpec>,
}

impl MockRunner {
    /// Create a runner where every unknown command is "not found".
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for an exact command line.
    pub fn respond(&self, command_line: &str, result: CommandResult) {
        self.state
            .borrow_mut()
            .responses
            .insert(command_line.to_string(), result);
    }

    /// Set the response for any command line starting with `prefix`.
    ///
    /// Exact responses take precedence; among prefixes the first registered wins.
    pub fn respond_prefix(&self, prefix: &str, result: CommandResult) {
        self.state
            .borrow_mut()
            .prefix_responses
            .push((prefix.to_string(), result));
    }

    /// Once `trigger` runs successfully, `command_line` starts returning `result`.
    pub fn after(&self, trigger: &str, command_line: &str, result: CommandResult) {
        self.state
            .borrow_mut()
            .effects
            .entry(trigger.to_string())
            .or_default()
            .push((command_line.to_string(), result));
    }

    /// Response for commands that match nothing (default: not found).
    pub fn set_fallback(&self, result: CommandResult) {
        self.state.borrow_mut().fallback = Some(result);
    }

    /// All executed commands, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.state.borrow().calls.clone()
    }

    /// All executed command lines, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .map(CommandSpec::command_line)
            .collect()
    }

    /// Number of executed commands whose line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.command_line().starts_with(prefix))
            .count()
    }

    /// Whether any executed command line starts with `prefix`.
    pub fn was_called(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    /// Forget recorded calls, keeping responses.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> CommandResult {
        let line = spec.command_line();
        let mut state = self.state.borrow_mut();
        state.calls.push(spec.clone());

        let result = state
            .responses
            .get(&line)
            .or_else(|| {
                state
                    .prefix_responses
                    .iter()
                    .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                    .map(|(_, r)| r)
            })
            .cloned()
            .or_else(|| state.fallback.clone())
            .unwrap_or_else(|| CommandResult::not_found(&spec.program));

        if result.success() {
            if let Some(effects) = state.effects.remove(&line) {
                for (command_line, response) in effects {
                    state.responses.insert(command_line, response);
                }
            }
        }

        result
    }
}
