//! Quiet-window debouncing of raw notify events.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::utils::path::normalize_path;

/// Quiet period after the last event before a batch is released.
pub const DEBOUNCE_MS: u64 = 300;
/// Minimum distance between two released batches.
pub const REBUILD_COOLDOWN_MS: u64 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Created or removed: the set of files changed, not only contents.
    pub fn alters_set(self) -> bool {
        !matches!(self, Self::Modified)
    }

    fn from_event(kind: &notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        use notify::event::ModifyKind;

        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            // chmod/mtime noise
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}

/// Fold a new event into the pending one for the same path.
/// `None` means the two cancel out.
pub fn merge(pending: ChangeKind, incoming: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (pending, incoming) {
        // deleted, then restored
        (Removed, Created | Modified) => Some(incoming),
        (Modified, Removed) => Some(Removed),
        // appeared and vanished inside one window
        (Created, Removed) => None,
        _ => Some(pending),
    }
}

/// One released batch, sorted by path.
pub type Batch = Vec<(PathBuf, ChangeKind)>;

/// Collects events per path and releases them once the quiet window and
/// the rebuild cooldown have both elapsed.
pub struct Debouncer {
    pending: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_release: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            last_event: None,
            last_release: None,
        }
    }

    pub fn add_event(&mut self, event: &notify::Event) {
        let Some(kind) = ChangeKind::from_event(&event.kind) else {
            return;
        };
        for path in event.paths.iter().filter(|p| !is_temp_file(p)) {
            self.add(normalize_path(path), kind);
        }
    }

    pub fn add(&mut self, path: PathBuf, kind: ChangeKind) {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
        match self.pending.get(&path).copied() {
            None => {
                self.pending.insert(path, kind);
            }
            Some(pending) => match merge(pending, kind) {
                Some(merged) => {
                    self.pending.insert(path, merged);
                }
                None => {
                    self.pending.remove(&path);
                }
            },
        }
        self.last_event = Some(Instant::now());
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_release) = self.last_release
            && last_release.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }
        !self.pending.is_empty()
    }

    pub fn take_if_ready(&mut self) -> Option<Batch> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.last_release = Some(Instant::now());

        let mut batch: Batch = self.pending.drain().collect();
        batch.sort_by(|a, b| a.0.cmp(&b.0));
        Some(batch)
    }

    /// Time until the next batch could be released.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(3600);
        };
        let quiet = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self
            .last_release
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);
        quiet.max(cooldown).max(Duration::from_millis(1))
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// Editor swap and backup files.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
