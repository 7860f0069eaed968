//! Backing application server supervision.
//!
//! The server runs as a child process with the environment's mode in a
//! configured variable. Its sources have their own watcher; a change
//! lints the server scripts and, when they are clean, restarts the child.
//! Everything here runs on its own thread and channel, independent of the
//! asset rebuild loop.

use std::path::Path;
use std::process::Child;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam::channel::{self, Receiver};
use notify::{RecursiveMode, Watcher};

use super::debouncer::{DEBOUNCE_MS, is_temp_file};
use crate::assemble::{BuildContext, PipeId};
use crate::core::{Env, is_shutdown};
use crate::log;
use crate::logger;
use crate::pipeline::extension_of;
use crate::utils::exec::Cmd;

pub struct Supervisor<'a> {
    ctx: BuildContext<'a>,
    env: Env,
    child: Option<Child>,
}

impl<'a> Supervisor<'a> {
    pub fn new(ctx: BuildContext<'a>, env: Env) -> Self {
        Self {
            ctx,
            env,
            child: None,
        }
    }

    /// Start the server and restart it on source changes until `stop`
    /// disconnects or shutdown is requested.
    pub fn run(mut self, stop: Receiver<()>) -> Result<()> {
        let config = self.ctx.config;
        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })?;
        for dir in &config.server.watch {
            let dir = config.root_join(dir);
            if dir.exists() {
                watcher.watch(&dir, RecursiveMode::Recursive)?;
            }
        }

        self.start()?;

        let tick = Duration::from_millis(200);
        let mut pending_since: Option<Instant> = None;
        loop {
            channel::select! {
                recv(stop) -> _ => break,
                recv(event_rx) -> event => {
                    if let Ok(Ok(event)) = event
                        && event.paths.iter().any(|p| self.is_source(p))
                    {
                        pending_since = Some(Instant::now());
                    }
                }
                default(tick) => {}
            }

            if is_shutdown() {
                break;
            }
            if let Some(since) = pending_since
                && since.elapsed() >= Duration::from_millis(DEBOUNCE_MS)
            {
                pending_since = None;
                self.on_change();
            }
        }

        self.stop();
        Ok(())
    }

    fn is_source(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        !is_temp_file(path) && self.ctx.config.server.ext.iter().any(|e| *e == ext)
    }

    fn on_change(&mut self) {
        if let Err(e) = self.ctx.run(PipeId::LintServerScripts, self.env) {
            logger::status_error("server scripts have problems, not restarting", &format!("{e:#}"));
            return;
        }
        log!("server"; "restarting");
        self.stop();
        if let Err(e) = self.start() {
            logger::status_error("server failed to start", &format!("{e:#}"));
        }
    }

    fn start(&mut self) -> Result<()> {
        let server = &self.ctx.config.server;
        let child = Cmd::from_slice(&server.command)
            .cwd(self.ctx.registry.root())
            .envs([(server.env_var.as_str(), self.env.server_mode())])
            .spawn()?;
        log!("server"; "started `{}` (pid {}, {}={})",
            server.command.join(" "), child.id(), server.env_var, self.env.server_mode());
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for Supervisor<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}
