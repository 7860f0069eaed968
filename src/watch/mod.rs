//! Watch/reload loop.
//!
//! ```text
//! FsWatcher ──batches──▶ rebuild worker ──▶ ReloadServer ──▶ browsers
//!
//! Supervisor (own thread, own watcher) ──▶ lint + restart backing server
//! ```
//!
//! The rebuild worker is the only writer to the environment tree while
//! watching: batches are handled one at a time, in arrival order. A failed
//! rebuild is reported and leaves the previous output in place.

mod classify;
mod debouncer;
mod fs;
mod reload;
mod server;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use classify::{Classifier, WATCHED};
use debouncer::Batch;
use fs::FsWatcher;
use reload::ReloadServer;
use server::Supervisor;

use crate::assemble::{BuildContext, PipeId};
use crate::core::{Env, is_shutdown, register_shutdown_signal};
use crate::registry::Category;
use crate::utils::path::to_slash;
use crate::{log, logger};

pub const DEFAULT_LIVERELOAD_PORT: u16 = 35729;

const CHANNEL_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Building,
    Watching,
}

impl fmt::Display for WatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Watching => "watching",
        })
    }
}

/// Watch the sources of `env`, rebuild what changed and reload browsers.
/// Runs until Ctrl+C.
pub fn run(ctx: &BuildContext<'_>, env: Env) -> Result<()> {
    log!("watch"; "{env}: {}", WatchPhase::Idle);

    let reload = ReloadServer::start(ctx.config.serve.livereload_port)?;
    log!("reload"; "listening on ws://127.0.0.1:{}", reload.port());

    let classifier = Classifier::new(&ctx.registry, &WATCHED)?;
    let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(0);

    std::thread::scope(|scope| {
        if ctx.config.server.enable {
            let supervisor = Supervisor::new(*ctx, env);
            scope.spawn(move || {
                if let Err(e) = supervisor.run(stop_rx) {
                    log!("server"; "supervisor stopped: {e:#}");
                }
            });
        }

        log!("watch"; "{env}: {}", WatchPhase::Watching);
        let result = event_loop(&classifier, |batch| {
            let pipes = classifier.plan(batch);
            if pipes.is_empty() {
                return;
            }
            log!("watch"; "{env}: {}", WatchPhase::Building);
            if let Some((path, live_css)) = rebuild(ctx, env, &pipes) {
                reload.reload(&path, live_css);
            }
            log!("watch"; "{env}: {}", WatchPhase::Watching);
        });

        drop(stop_tx);
        result
    })
}

/// Call `handle` with every debounced batch touching `categories` until
/// Ctrl+C.
pub fn on_change(
    ctx: &BuildContext<'_>,
    categories: &[Category],
    mut handle: impl FnMut(Vec<(std::path::PathBuf, Category, bool)>),
) -> Result<()> {
    let classifier = Classifier::new(&ctx.registry, categories)?;
    event_loop(&classifier, |batch| {
        let changes = classifier.relevant(batch);
        if !changes.is_empty() {
            handle(changes);
        }
    })
}

/// Drive an [`FsWatcher`] over the classifier's roots on a private runtime;
/// batches are handled on this thread, one at a time.
fn event_loop(classifier: &Classifier, mut handle: impl FnMut(Batch)) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    register_shutdown_signal(shutdown_tx);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async {
        let watcher = FsWatcher::new(classifier.roots()).context("failed to start watcher")?;
        let (batch_tx, mut batch_rx) = mpsc::channel::<Batch>(CHANNEL_BUFFER);
        tokio::spawn(watcher.run(batch_tx));

        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            tokio::select! {
                Some(batch) = batch_rx.recv() => handle(batch),
                _ = ticker.tick() => {
                    if shutdown_rx.try_recv().is_ok() || is_shutdown() {
                        crate::debug!("watch"; "shutdown signal received");
                        break;
                    }
                }
            }
        }
        Ok(())
    })
}

/// Run `pipes` in order. On success returns what to tell the browsers:
/// the path to reload and whether stylesheets can be swapped in place.
fn rebuild(ctx: &BuildContext<'_>, env: Env, pipes: &[PipeId]) -> Option<(String, bool)> {
    let root = ctx.registry.env_root(env);
    let mut outputs = Vec::new();

    for &id in pipes {
        match ctx.run(id, env) {
            Ok(files) => outputs.extend(files.outputs().into_iter().map(Path::to_path_buf)),
            Err(e) => {
                logger::status_error(&format!("{} failed, keeping previous output", id.name()), &format!("{e:#}"));
                return None;
            }
        }
    }

    let names: Vec<_> = pipes.iter().map(|id| id.name()).collect();
    logger::status_success(&format!("rebuilt {}", names.join(", ")));

    let live_css = pipes == [PipeId::Styles];
    let path = if live_css {
        outputs
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "css"))
            .and_then(|p| p.strip_prefix(&root).ok())
            .map(to_slash)
            .unwrap_or_else(|| "index.html".to_string())
    } else {
        "index.html".to_string()
    };
    Some((path, live_css))
}
