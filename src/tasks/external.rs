//! Tasks that hand off to external tools: the unit test runner and the
//! documentation generator.

use std::process::ExitStatus;

use anyhow::{Result, bail};

use crate::assemble::{BuildContext, PipeId};
use crate::config::ProjectConfig;
use crate::core::Env;
use crate::registry::Category;
use crate::utils::exec::Cmd;
use crate::{log, logger, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Run once and exit with the runner's status.
    Single,
    /// Keep the runner alive; it watches on its own.
    Continuous,
}

/// Runner command line for `mode`.
pub fn test_command(config: &ProjectConfig, mode: TestMode) -> Vec<String> {
    let test = &config.test;
    let extra = match mode {
        TestMode::Single => &test.single_run_args,
        TestMode::Continuous => &test.continuous_args,
    };
    test.command.iter().chain(extra).cloned().collect()
}

/// Run the unit test runner with the terminal attached.
pub fn run_tests(config: &ProjectConfig, mode: TestMode) -> Result<()> {
    let command = test_command(config, mode);
    log!("test"; "{}", command.join(" "));
    let status = Cmd::from_slice(&command)
        .cwd(config.get_root())
        .spawn()?
        .wait()?;
    check_status("test runner", status)
}

/// Rebuild the test environment and run the tests once, then again every
/// time an app script or a unit test changes.
pub fn watch_tests(ctx: &BuildContext<'_>) -> Result<()> {
    let cycle = || -> Result<()> {
        ctx.assemble(Env::Test)?;
        ctx.run(PipeId::LintTestScripts, Env::Test)?;
        run_tests(ctx.config, TestMode::Single)
    };
    let report = |result: Result<()>| match result {
        Ok(()) => logger::status_success("tests passed"),
        Err(e) => logger::status_error("tests failed", &format!("{e:#}")),
    };

    report(cycle());
    watch::on_change(ctx, &[Category::Scripts, Category::TestScripts], |changes| {
        crate::debug!("test"; "{} change(s), re-running", changes.len());
        report(cycle());
    })
}

/// Generate API docs from the app scripts.
pub fn doc(ctx: &BuildContext<'_>) -> Result<()> {
    let scripts: Vec<String> = ctx
        .registry
        .sources(Category::Scripts)?
        .into_iter()
        .map(|m| ctx.config.root_relative(&m.path).to_string_lossy().into_owned())
        .collect();
    if scripts.is_empty() {
        log!("doc"; "no scripts to document");
        return Ok(());
    }

    Cmd::from_slice(&ctx.config.doc.command)
        .args(&scripts)
        .cwd(ctx.registry.root())
        .pty(true)
        .run()?;
    log!("doc"; "documented {} script(s)", scripts.len());
    Ok(())
}

fn check_status(what: &str, status: ExitStatus) -> Result<()> {
    if !status.success() {
        match status.code() {
            Some(code) => bail!("{what} exited with status {code}"),
            None => bail!("{what} was terminated by a signal"),
        }
    }
    Ok(())
}
