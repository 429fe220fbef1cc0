//! External command execution.
//!
//! Every probe and remediation is built on [`execute`]. It never fails
//! through the error channel: a non-zero exit, a missing executable and a
//! timeout are all encoded in the returned [`CommandResult`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

/// Exit code reported when the executable does not exist or cannot be run.
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

/// Exit code reported when a command is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of executing an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code (127 when not found, 124 on timeout, 128+N when killed by signal N).
    pub exit_code: i32,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command was killed for exceeding its timeout.
    pub timed_out: bool,
}

impl CommandResult {
    /// Create a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }

    /// Create a result with an explicit exit code and stderr.
    pub fn exit(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }

    /// Create a "command not found" result.
    pub fn not_found(program: &str) -> Self {
        Self::exit(NOT_FOUND_EXIT_CODE, format!("Command not found: {}", program))
    }

    /// Replace stderr, keeping everything else.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Whether the executable was missing or not executable.
    pub fn is_not_found(&self) -> bool {
        self.exit_code == NOT_FOUND_EXIT_CODE
    }

    /// Trimmed stdout, falling back to stderr when stdout is empty.
    ///
    /// Some tools (`nginx -v`) print their version on stderr.
    pub fn output_text(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() {
            self.stderr.trim()
        } else {
            out
        }
    }

    /// A short description of a failure, suitable for a failure reason.
    pub fn failure_summary(&self) -> String {
        if self.timed_out {
            return format!("timed out after {:.0}s", self.duration.as_secs_f64());
        }
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {}", self.exit_code, last_line(stderr))
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or(text)
}

/// A command to execute: program, arguments and execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with the inherited environment).
    pub env: BTreeMap<String, String>,

    /// Data written to the child's stdin; stdin is null when unset.
    pub stdin: Option<String>,

    /// Wall-clock timeout (None = wait forever).
    pub timeout: Option<Duration>,

    /// Pass stdout and stderr through to the terminal instead of capturing
    /// them. The result then carries empty output.
    pub stream_output: bool,
}

impl CommandSpec {
    /// Create a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Feed `input` to the child's stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stream the child's output to the terminal.
    pub fn stream_output(mut self) -> Self {
        self.stream_output = true;
        self
    }

    /// Run this command as another user via `sudo -u <user> -H --`.
    pub fn as_user(self, user: &str) -> Self {
        let mut args = vec![
            "-u".to_string(),
            user.to_string(),
            "-H".to_string(),
            "--".to_string(),
            self.program,
        ];
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            ..self
        }
    }

    /// The program and arguments joined by spaces.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Something that can execute commands.
///
/// Steps only ever run commands through this trait, so tests can substitute
/// a [`MockRunner`](crate::shell::MockRunner).
pub trait CommandRunner {
    /// Execute a command and return its result.
    fn run(&self, spec: &CommandSpec) -> CommandResult;
}

/// Runs commands on the real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> CommandResult {
        execute(spec)
    }
}

/// Execute a command synchronously, capturing stdout and stderr.
pub fn execute(spec: &CommandSpec) -> CommandResult {
    let start = Instant::now();
    debug!("Running: {}", spec);

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    cmd.envs(&spec.env);

    cmd.stdin(if spec.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    if spec.stream_output {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    }

    // A timed command gets its own process group so the whole tree can be
    // killed at the deadline. Streamed commands stay in the foreground group
    // so Ctrl-C reaches them.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if spec.timeout.is_some() && !spec.stream_output {
            cmd.process_group(0);
        }
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let mut result = CommandResult::not_found(&spec.program);
            if e.kind() != std::io::ErrorKind::NotFound {
                result = result.with_stderr(format!("Cannot execute {}: {}", spec.program, e));
            }
            result.duration = start.elapsed();
            debug!("{} could not be spawned: {}", spec.program, e);
            return result;
        }
    };

    let stdin_writer = match (spec.stdin.clone(), child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(thread::spawn(move || {
            // The child may exit without reading everything.
            let _ = pipe.write_all(input.as_bytes());
        })),
        _ => None,
    };

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let deadline = spec.timeout.map(|t| start + t);
    let (status, timed_out) = wait_with_deadline(&mut child, deadline);

    if let Some(writer) = stdin_writer {
        let _ = writer.join();
    }
    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    let exit_code = if timed_out {
        TIMEOUT_EXIT_CODE
    } else {
        status.map(exit_code_of).unwrap_or(-1)
    };

    let result = CommandResult {
        exit_code,
        stdout,
        stderr,
        duration: start.elapsed(),
        timed_out,
    };
    debug!(
        "{} exited with {} in {:?}",
        spec.program, result.exit_code, result.duration
    );
    result
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> (Option<ExitStatus>, bool) {
    let Some(deadline) = deadline else {
        return (child.wait().ok(), false);
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return (Some(status), false),
            Ok(None) if Instant::now() >= deadline => {
                kill_tree(child);
                return (child.wait().ok(), true);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(_) => return (None, false),
        }
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // SAFETY: kill() with a negative pid signals the process group created
    // for this child; it has no memory-safety preconditions.
    unsafe {
        libc::kill(-(child.id() as i32), libc::SIGKILL);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
