use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Keeps every configured root under watch, including roots that did not
/// exist at startup or were deleted and recreated since.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for path in self.desired.iter().filter(|p| p.exists()) {
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }
        if self.attached.is_empty() {
            crate::log!("watch"; "no watch root exists yet, waiting for them to appear");
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "attached: {}", path.display());
            }
        }
    }

    pub(super) fn attached(&self) -> usize {
        self.attached.len()
    }
}
