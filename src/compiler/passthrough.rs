use std::path::Path;

use super::{Artifact, CompileFailure, Compiler};

/// Serves each entry's bytes as its artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(&self, entry: &Path) -> Result<Artifact, CompileFailure> {
        std::fs::read(entry)
            .map(Artifact::from)
            .map_err(|e| CompileFailure::new(format!("cannot read {}: {e}", entry.display())))
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
