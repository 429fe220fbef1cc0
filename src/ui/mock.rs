//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. Spinners share the capture buffer, so
//! their final lines are visible after the spinner is dropped.
//!
//! # Example
//!
//! ```
//! use netops_setup::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Starting setup");
//! ui.start_spinner("nodejs").finish_success("nodejs: v22.3.0");
//!
//! assert!(ui.has_message("Starting setup"));
//! assert!(ui.has_spinner_end("nodejs: v22.3.0"));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use super::{OutputMode, SpinnerHandle, UserInterface};

/// How a spinner ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinnerEnd {
    Success(String),
    Warning(String),
    Error(String),
    Skipped(String),
}

impl SpinnerEnd {
    pub fn text(&self) -> &str {
        match self {
            Self::Success(s) | Self::Warning(s) | Self::Error(s) | Self::Skipped(s) => s,
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    hints: Vec<String>,
    spinners: Vec<String>,
    spinner_updates: Vec<String>,
    spinner_ends: Vec<SpinnerEnd>,
}

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    captured: Rc<RefCell<Captured>>,
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> Vec<String> {
        self.captured.borrow().messages.clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.captured.borrow().successes.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.captured.borrow().warnings.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.captured.borrow().errors.clone()
    }

    pub fn headers(&self) -> Vec<String> {
        self.captured.borrow().headers.clone()
    }

    pub fn hints(&self) -> Vec<String> {
        self.captured.borrow().hints.clone()
    }

    /// Messages spinners were started with, in order.
    pub fn spinners(&self) -> Vec<String> {
        self.captured.borrow().spinners.clone()
    }

    /// Messages set on running spinners.
    pub fn spinner_updates(&self) -> Vec<String> {
        self.captured.borrow().spinner_updates.clone()
    }

    /// How each spinner finished, in order.
    pub fn spinner_ends(&self) -> Vec<SpinnerEnd> {
        self.captured.borrow().spinner_ends.clone()
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.captured.borrow().messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.captured.borrow().successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.captured.borrow().warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.captured.borrow().errors.iter().any(|m| m.contains(msg))
    }

    pub fn has_hint(&self, msg: &str) -> bool {
        self.captured.borrow().hints.iter().any(|m| m.contains(msg))
    }

    pub fn has_spinner_end(&self, msg: &str) -> bool {
        self.captured
            .borrow()
            .spinner_ends
            .iter()
            .any(|e| e.text().contains(msg))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.captured.borrow_mut().messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.captured.borrow_mut().successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.captured.borrow_mut().warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.captured.borrow_mut().errors.push(msg.to_string());
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.captured.borrow_mut().spinners.push(message.to_string());
        Box::new(MockSpinner {
            captured: Rc::clone(&self.captured),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.captured.borrow_mut().headers.push(title.to_string());
    }

    fn show_hint(&mut self, hint: &str) {
        self.captured.borrow_mut().hints.push(hint.to_string());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Spinner handed out by [`MockUI`].
pub struct MockSpinner {
    captured: Rc<RefCell<Captured>>,
}

impl MockSpinner {
    fn end(&mut self, end: SpinnerEnd) {
        self.captured.borrow_mut().spinner_ends.push(end);
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.captured
            .borrow_mut()
            .spinner_updates
            .push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.end(SpinnerEnd::Success(msg.to_string()));
    }

    fn finish_warning(&mut self, msg: &str) {
        self.end(SpinnerEnd::Warning(msg.to_string()));
    }

    fn finish_error(&mut self, msg: &str) {
        self.end(SpinnerEnd::Error(msg.to_string()));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.end(SpinnerEnd::Skipped(msg.to_string()));
    }
}
