//! File-system watcher: notify events in, debounced batches out.
//!
//! ```text
//! notify callback thread → bridge thread → debouncer → mpsc<Batch>
//! ```
//!
//! The watcher is attached when constructed, so events that happen while
//! the caller is still busy are buffered rather than lost.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use super::debouncer::{Batch, Debouncer};

pub struct FsWatcher {
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    watcher: RecommendedWatcher,
    roots: WatchRoots,
}

impl FsWatcher {
    pub fn new(roots: Vec<PathBuf>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut roots = WatchRoots::new(roots);
        roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            roots,
        })
    }

    /// Forward debounced batches until the receiver goes away.
    pub async fn run(self, batch_tx: mpsc::Sender<Batch>) {
        let Self {
            notify_rx,
            mut watcher,
            mut roots,
        } = self;
        let mut debouncer = Debouncer::new();

        // notify is synchronous; bridge it onto the runtime
        let (event_tx, mut event_rx) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if event_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = event_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    roots.maintain(&mut watcher);
                    if let Some(batch) = debouncer.take_if_ready()
                        && batch_tx.send(batch).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    }
}

/// Keeps the watched directories attached, including ones that are
/// created (or deleted and recreated) while watching.
struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: minimal_roots(paths),
            attached: FxHashSet::default(),
        }
    }

    fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for path in self.desired.iter().filter(|p| p.exists()) {
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "re-attached {}", path.display());
            }
        }
    }
}

/// Deduplicate roots and drop those nested inside another root.
/// File roots are replaced by their directory.
pub fn minimal_roots(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| if p.is_file() { p.parent().map(Path::to_path_buf).unwrap_or(p) } else { p })
        .collect();
    dirs.sort();
    dirs.dedup();

    let mut roots: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !roots.iter().any(|root| dir.starts_with(root)) {
            roots.push(dir);
        }
    }
    roots
}
