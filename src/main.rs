//! Gantry - an asset pipeline and task runner for single-page web apps.

mod assemble;
mod cli;
mod config;
mod core;
mod logger;
mod mock;
mod pipeline;
mod registry;
mod tasks;
mod utils;
mod vendor;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::ProjectConfig;
use owo_colors::OwoColorize;

use assemble::{BuildContext, PipeTable};

fn main() {
    if let Err(e) = run() {
        logger::status_error("task failed", &format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let graph = tasks::catalog()?;

    if cli.list {
        let width = graph.tasks().map(|t| t.name.len()).max().unwrap_or(0);
        for task in graph.tasks() {
            let name = format!("{:width$}", task.name);
            println!("{}  {}", name.bold(), task.description.dimmed());
        }
        return Ok(());
    }

    let config = ProjectConfig::load(&cli)?;
    let table = PipeTable::new();
    let ctx = BuildContext::new(&config, &table);

    graph.run(&cli.task, &ctx)
}
