//! Source pipe: read a registry category from disk.

use std::path::PathBuf;

use anyhow::Result;

use super::{FileSet, Pipe, VirtualFile};
use crate::registry::{Category, GlobSet, PathRegistry};

/// Appends the files of a category to the set, sorted by virtual path.
pub struct Source {
    category: Category,
    root: PathBuf,
    globs: Vec<String>,
}

impl Source {
    pub fn new(registry: &PathRegistry<'_>, category: Category) -> Self {
        Self {
            category,
            root: registry.root().to_path_buf(),
            globs: registry.globs(category),
        }
    }
}

impl Pipe for Source {
    fn name(&self) -> &str {
        self.category.name()
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        let set = GlobSet::new(&self.root, &self.globs)?;
        for matched in set.walk() {
            files.push(VirtualFile::read(&matched)?);
        }
        Ok(files)
    }
}
