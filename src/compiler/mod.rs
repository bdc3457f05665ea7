//! Entry compilation.
//!
//! The broker treats compilation as opaque: an entry path goes in, either an
//! artifact or a failure message comes out. Compilers are synchronous and run
//! on the blocking pool.
//!
//! - `command` - external bundler command, artifact on stdout
//! - `passthrough` - serves the entry's bytes unchanged

mod command;
mod passthrough;

#[cfg(test)]
pub mod testing;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

pub use command::CommandCompiler;
pub use passthrough::PassthroughCompiler;

use crate::config::HotspecConfig;

/// Compiled output of one entry.
pub type Artifact = Arc<[u8]>;

/// Compilation failed; `message` is shown to the requester verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileFailure {
    pub message: String,
}

impl CompileFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compiles one entry into an artifact.
pub trait Compiler: Send + Sync {
    fn compile(&self, entry: &Path) -> Result<Artifact, CompileFailure>;

    /// Short name for log lines.
    fn name(&self) -> &str;
}

/// Build the compiler selected by `[compiler]`.
pub fn from_config(config: &HotspecConfig) -> Result<Arc<dyn Compiler>> {
    let compiler = &config.compiler;
    if !compiler.has_command() {
        crate::debug!("compile"; "no command configured, serving entries as-is");
        return Ok(Arc::new(PassthroughCompiler));
    }

    let cwd = compiler
        .cwd
        .clone()
        .unwrap_or_else(|| config.get_root().to_path_buf());
    let command = CommandCompiler::new(compiler.command.clone(), cwd)?;
    Ok(Arc::new(command))
}
