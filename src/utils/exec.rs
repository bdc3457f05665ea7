//! External command execution utilities.
//!
//! Builder-based API for running a program with arguments and a working
//! directory. Stdin is closed; stdout and stderr are captured.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Fails on non-zero exit
//! let output = Cmd::new("git").args(["status", "-s"]).cwd(root).run()?;
//!
//! // Raw output, caller inspects the exit status
//! let output = Cmd::from_slice(&["esbuild", "a.js", "--bundle"]).output()?;
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::OnceLock,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["git"]` or `["npx", "esbuild"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Execute and fail on non-zero exit.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();
        let output = self.output()?;
        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }
        Ok(output)
    }

    /// Execute and return the raw output, whatever the exit status.
    ///
    /// Only spawn and I/O problems are errors.
    pub fn output(self) -> Result<Output> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"));
    re.replace_all(s, "")
}

/// The message a failed command leaves behind: stderr, or stdout when
/// stderr is empty. Trimmed, without color codes.
pub fn failure_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    strip_ansi(text.trim()).into_owned()
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output) -> String {
    let mut msg = format!("Command `{name}` failed with {}", output.status);
    let detail = failure_output(output);
    if !detail.is_empty() {
        msg.push('\n');
        msg.push_str(&detail);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================
