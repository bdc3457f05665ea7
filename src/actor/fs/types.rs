use std::path::PathBuf;

use rustc_hash::FxHashMap;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// One debounce window worth of changes, one kind per path
pub(super) struct DebouncedEvents(pub(super) FxHashMap<PathBuf, ChangeKind>);

impl DebouncedEvents {
    /// Paths worth recompiling: created or modified, in stable order.
    /// Removed files have nothing left to compile.
    pub(super) fn into_recompile_paths(self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .0
            .into_iter()
            .filter(|(_, kind)| *kind != ChangeKind::Removed)
            .map(|(path, _)| path)
            .collect();
        paths.sort();
        paths
    }

    pub(super) fn log(&self) {
        for (path, kind) in &self.0 {
            crate::debug!("watch"; "{}: {}", kind.label(), path.display());
        }
    }
}
