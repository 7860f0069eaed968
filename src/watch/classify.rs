//! Map changed paths to the pipes that must run again.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::debouncer::Batch;
use crate::assemble::PipeId;
use crate::registry::{Category, GlobSet, PathRegistry};

/// Categories whose changes trigger a rebuild, checked in this order.
pub const WATCHED: [Category; 4] = [
    Category::Index,
    Category::Scripts,
    Category::Styles,
    Category::Partials,
];

pub struct Classifier {
    sets: Vec<(Category, GlobSet)>,
}

impl Classifier {
    pub fn new(registry: &PathRegistry<'_>, categories: &[Category]) -> Result<Self> {
        let sets = categories
            .iter()
            .map(|&category| Ok((category, registry.glob_set(category)?)))
            .collect::<Result<_>>()?;
        Ok(Self { sets })
    }

    /// Directories to watch.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.sets
            .iter()
            .flat_map(|(_, set)| set.bases())
            .map(Path::to_path_buf)
            .collect()
    }

    pub fn category(&self, path: &Path) -> Option<Category> {
        self.sets
            .iter()
            .find(|(_, set)| set.matches(path))
            .map(|(category, _)| *category)
    }

    /// Keep only the changes that belong to a watched category.
    pub fn relevant(&self, batch: Batch) -> Vec<(PathBuf, Category, bool)> {
        batch
            .into_iter()
            .filter_map(|(path, kind)| {
                let category = self.category(&path)?;
                Some((path, category, kind.alters_set()))
            })
            .collect()
    }

    /// Pipes to re-run for a batch, in order.
    ///
    /// A created or removed file changes the injected reference list, so
    /// the index is rebuilt; the index rebuild covers every pipe it
    /// references, which makes the per-category pipes redundant.
    pub fn plan(&self, batch: Batch) -> Vec<PipeId> {
        let changes = self.relevant(batch);
        let rebuild_index = changes
            .iter()
            .any(|(_, category, alters_set)| *category == Category::Index || *alters_set);
        if rebuild_index {
            return vec![PipeId::Index];
        }

        let mut pipes = Vec::new();
        for (_, category, _) in changes {
            let id = match category {
                Category::Scripts => PipeId::AppScripts,
                Category::Styles => PipeId::Styles,
                Category::Partials => PipeId::ScriptedPartials,
                _ => continue,
            };
            if !pipes.contains(&id) {
                pipes.push(id);
            }
        }
        pipes
    }
}
