//! Destination pipe: write files under a directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use super::{FileSet, Pipe, VirtualFile};
use crate::utils::path::normalize_path;

/// Writes every file at `<dir>/<virtual path>` and records where it went.
/// Virtual paths may climb out of `dir` with `..` (relocated fonts).
///
/// Files carrying a source map get `<name>.map` alongside and a
/// `sourceMappingURL` trailer.
pub struct Dest {
    dir: PathBuf,
}

impl Dest {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Pipe for Dest {
    fn name(&self) -> &str {
        "dest"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        files
            .as_mut_slice()
            .par_iter_mut()
            .try_for_each(|file| write_file(&self.dir, file))?;
        Ok(files)
    }
}

fn write_file(dir: &std::path::Path, file: &mut VirtualFile) -> Result<()> {
    let out = normalize_path(&dir.join(&file.path));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if let Some(map) = file.source_map.take() {
        let map_name = format!("{}.map", file.file_name());
        let map_path = out.with_file_name(&map_name);
        fs::write(&map_path, map)
            .with_context(|| format!("failed to write {}", map_path.display()))?;

        let trailer = if file.has_extension("css") {
            format!("\n/*# sourceMappingURL={map_name} */\n")
        } else {
            format!("\n//# sourceMappingURL={map_name}\n")
        };
        file.contents.extend_from_slice(trailer.as_bytes());
    }

    fs::write(&out, &file.contents).with_context(|| format!("failed to write {}", out.display()))?;
    file.out = Some(out);
    Ok(())
}
