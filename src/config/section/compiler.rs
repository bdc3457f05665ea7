//! `[compiler]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compiler]
//! command = ["esbuild", "{entry}", "--bundle", "--format=iife"]
//! cwd = "."
//! failure_policy = "global"
//! ```
//!
//! `{entry}` is replaced by the absolute entry path. The command prints the
//! compiled artifact on stdout. Without a command, entries are served as-is.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the entry path in `command`.
pub const ENTRY_PLACEHOLDER: &str = "{entry}";

/// Compile command settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Program and arguments. Empty: passthrough compiler.
    pub command: Vec<String>,

    /// Working directory for the command (relative to project root).
    pub cwd: Option<PathBuf>,

    /// How a failed compilation affects lookups of other entries.
    pub failure_policy: FailurePolicy,
}

impl CompilerConfig {
    /// Whether an external command is configured.
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Failure isolation policy.
///
/// - `global`: a failed compilation poisons every lookup until any entry
///   compiles successfully again. The entry keeps its previous artifact.
/// - `entry`: only the failed entry is affected; its previous artifact is
///   dropped so it is never served stale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Global,
    Entry,
}
