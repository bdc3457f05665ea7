//! Scripted compiler for broker and requester tests.
//!
//! Output is `compiled:` followed by the entry's content. An entry whose
//! content contains `debugger` fails with [`PARSE_ERROR`].

use std::path::{Path, PathBuf};

use crossbeam::channel;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Artifact, CompileFailure, Compiler};
use crate::utils::path::normalize_path;

pub const PARSE_ERROR: &str = "Module parse failed: Unexpected token (1:1)";

#[derive(Default)]
pub struct ScriptedCompiler {
    calls: Mutex<Vec<PathBuf>>,
    /// Each compile waits for one token
    gate: Option<channel::Receiver<()>>,
    /// Told about every compile as it starts
    started: Option<mpsc::UnboundedSender<PathBuf>>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every compile until a token is sent. Dropping the sender
    /// releases all of them.
    pub fn gated(mut self) -> (Self, channel::Sender<()>) {
        let (tx, rx) = channel::unbounded();
        self.gate = Some(rx);
        (self, tx)
    }

    pub fn observed(mut self) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.started = Some(tx);
        (self, rx)
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Compiles of `entry`, matched by its canonical path.
    pub fn calls_for(&self, entry: &Path) -> usize {
        let entry = normalize_path(entry);
        self.calls.lock().iter().filter(|p| **p == entry).count()
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, entry: &Path) -> Result<Artifact, CompileFailure> {
        self.calls.lock().push(entry.to_path_buf());
        if let Some(started) = &self.started {
            let _ = started.send(entry.to_path_buf());
        }
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }

        let source = std::fs::read_to_string(entry)
            .map_err(|e| CompileFailure::new(format!("cannot read {}: {e}", entry.display())))?;
        if source.contains("debugger") {
            return Err(CompileFailure::new(PARSE_ERROR));
        }
        Ok(Artifact::from(format!("compiled:{source}").into_bytes()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
