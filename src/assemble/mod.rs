//! Environment assemblers.
//!
//! Every buildable unit is a [`PipeId`]; the [`PipeTable`] maps ids to
//! chain constructors and is built once at startup. Tasks and the watch
//! loop reach pipes only through a [`BuildContext`], which bundles the
//! table with the loaded configuration.
//!
//! An environment tree is the index (which pulls in every script and
//! style pipe it references) joined with fonts and images.

mod assets;
mod index;
mod partials;
mod scripts;
mod styles;

#[cfg(test)]
mod tests;

use std::fs;

use anyhow::{Context, Result, anyhow};
use rustc_hash::FxHashMap;

use crate::config::ProjectConfig;
use crate::core::Env;
use crate::log;
use crate::pipeline::{Chain, FileSet};
use crate::registry::PathRegistry;

/// Identifier of a pipe family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeId {
    AppScripts,
    VendorScripts,
    Styles,
    VendorStyles,
    /// Raw partial copies.
    Partials,
    /// Partials as template-cache modules.
    ScriptedPartials,
    Fonts,
    Images,
    Index,
    LintAppScripts,
    LintPartials,
    LintIndex,
    LintServerScripts,
    LintTestScripts,
}

impl PipeId {
    pub const ALL: [Self; 14] = [
        Self::AppScripts,
        Self::VendorScripts,
        Self::Styles,
        Self::VendorStyles,
        Self::Partials,
        Self::ScriptedPartials,
        Self::Fonts,
        Self::Images,
        Self::Index,
        Self::LintAppScripts,
        Self::LintPartials,
        Self::LintIndex,
        Self::LintServerScripts,
        Self::LintTestScripts,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::AppScripts => "app-scripts",
            Self::VendorScripts => "vendor-scripts",
            Self::Styles => "styles",
            Self::VendorStyles => "vendor-styles",
            Self::Partials => "partials",
            Self::ScriptedPartials => "scripted-partials",
            Self::Fonts => "fonts",
            Self::Images => "images",
            Self::Index => "index",
            Self::LintAppScripts => "lint-app-scripts",
            Self::LintPartials => "lint-partials",
            Self::LintIndex => "lint-index",
            Self::LintServerScripts => "lint-server-scripts",
            Self::LintTestScripts => "lint-test-scripts",
        }
    }
}

/// Builds the chain of a pipe family for an environment.
pub type Constructor = fn(&BuildContext<'_>, Env) -> Result<Chain>;

/// Pipe id → constructor.
pub struct PipeTable {
    entries: FxHashMap<PipeId, Constructor>,
}

impl PipeTable {
    pub fn new() -> Self {
        let mut entries: FxHashMap<PipeId, Constructor> = FxHashMap::default();
        entries.insert(PipeId::AppScripts, scripts::app_scripts);
        entries.insert(PipeId::VendorScripts, scripts::vendor_scripts);
        entries.insert(PipeId::Styles, styles::app_styles);
        entries.insert(PipeId::VendorStyles, styles::vendor_styles);
        entries.insert(PipeId::Partials, partials::raw_partials);
        entries.insert(PipeId::ScriptedPartials, partials::scripted_partials);
        entries.insert(PipeId::Fonts, assets::fonts);
        entries.insert(PipeId::Images, assets::images);
        entries.insert(PipeId::Index, index::index);
        entries.insert(PipeId::LintAppScripts, scripts::lint_app_scripts);
        entries.insert(PipeId::LintPartials, partials::lint_partials);
        entries.insert(PipeId::LintIndex, index::lint_index);
        entries.insert(PipeId::LintServerScripts, scripts::lint_server_scripts);
        entries.insert(PipeId::LintTestScripts, scripts::lint_test_scripts);
        Self { entries }
    }

    pub fn get(&self, id: PipeId) -> Option<Constructor> {
        self.entries.get(&id).copied()
    }
}

impl Default for PipeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a pipe constructor may look at.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a ProjectConfig,
    pub registry: PathRegistry<'a>,
    pub table: &'a PipeTable,
}

impl<'a> BuildContext<'a> {
    pub fn new(config: &'a ProjectConfig, table: &'a PipeTable) -> Self {
        Self {
            config,
            registry: PathRegistry::new(config),
            table,
        }
    }

    /// Construct the chain for `id` in `env`.
    pub fn chain(&self, id: PipeId, env: Env) -> Result<Chain> {
        let constructor = self
            .table
            .get(id)
            .ok_or_else(|| anyhow!("no pipe registered for `{}`", id.name()))?;
        constructor(self, env)
    }

    /// Construct and run the chain for `id` in `env`.
    pub fn run(&self, id: PipeId, env: Env) -> Result<FileSet> {
        self.chain(id, env)?.build()
    }

    /// Remove an environment's output root.
    pub fn clean(&self, env: Env) -> Result<()> {
        let root = self.registry.env_root(env);
        if root.exists() {
            fs::remove_dir_all(&root)
                .with_context(|| format!("failed to remove {}", root.display()))?;
            log!("clean"; "removed {}", self.config.root_relative(&root).display());
        }
        Ok(())
    }

    /// Assemble a complete environment tree: index joined with fonts and
    /// images. Test and prod trees are cleared first.
    pub fn assemble(&self, env: Env) -> Result<()> {
        if env != Env::Dev {
            self.clean(env)?;
        }

        let (index, (fonts, images)) = rayon::join(
            || self.run(PipeId::Index, env),
            || {
                rayon::join(
                    || self.run(PipeId::Fonts, env),
                    || self.run(PipeId::Images, env),
                )
            },
        );
        index?;
        fonts?;
        images?;

        let root = self.registry.env_root(env);
        log!("build"; "{env}: assembled {}", self.config.root_relative(&root).display());
        Ok(())
    }
}
