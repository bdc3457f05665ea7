use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, DebouncedEvents};
use crate::utils::path::normalize_path;

/// Quiet period after the last event before a batch is released
pub(super) const DEBOUNCE_MS: u64 = 300;
/// Minimum gap between two released batches
pub(super) const RECOMPILE_COOLDOWN_MS: u64 = 800;

/// Collects raw notify events into one change per path and decides when a
/// batch is ready. Knows nothing about entries or the broker.
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_flush: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_flush: None,
        }
    }

    /// Merge a notify event into the pending batch.
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        use notify::event::ModifyKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // chmod/touch noise would recompile for nothing
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);

            let merged = match self.changes.get(&path).copied() {
                None => Some(kind),
                // deleted then written again: a fresh file
                Some(ChangeKind::Removed) if kind != ChangeKind::Removed => Some(kind),
                Some(ChangeKind::Modified) if kind == ChangeKind::Removed => Some(kind),
                // appeared and vanished inside one window
                Some(ChangeKind::Created) if kind == ChangeKind::Removed => None,
                Some(_) => continue,
            };

            crate::debug!("watch"; "{} {}", kind.label(), path.display());
            match merged {
                Some(kind) => self.changes.insert(path, kind),
                None => self.changes.remove(&path),
            };
            self.last_event = Some(Instant::now());
        }

        // Nothing left to flush: stop the quiet-period timer
        if self.changes.is_empty() {
            self.last_event = None;
        }
    }

    /// Hand out the batch once the quiet period and cooldown have passed.
    pub(super) fn take_if_ready(&mut self) -> Option<DebouncedEvents> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        self.last_flush = Some(Instant::now());
        Some(DebouncedEvents(changes))
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_flush) = self.last_flush
            && last_flush.elapsed() < Duration::from_millis(RECOMPILE_COOLDOWN_MS)
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// How long the actor may sleep before the batch can be ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self
            .last_flush
            .map(|t| Duration::from_millis(RECOMPILE_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce.max(cooldown).max(Duration::from_millis(1))
    }
}

/// Editor swap files, backups and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
