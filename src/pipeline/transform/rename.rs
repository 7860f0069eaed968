//! Path rewrites.

use std::path::{Component, Path, PathBuf};

use anyhow::Result;

use crate::pipeline::{FileSet, Pipe};

/// `main.css` -> `main.min.css`.
pub struct RenameMin;

impl Pipe for RenameMin {
    fn name(&self) -> &str {
        "rename-min"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        for file in files.iter_mut() {
            file.path = min_name(&file.path);
        }
        Ok(files)
    }
}

pub fn min_name(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.min.{}", ext.to_string_lossy()),
        None => format!("{stem}.min"),
    };
    path.with_file_name(name)
}

/// Normalizes font locations relative to their destination.
///
/// The first directory of the virtual path is replaced by `..`, so
/// `bootstrap/fonts/a.woff` written under `styles/` lands in `fonts/`.
/// Files at most one directory deep are flattened into the destination.
pub struct RelocateFonts;

impl Pipe for RelocateFonts {
    fn name(&self) -> &str {
        "relocate-fonts"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        for file in files.iter_mut() {
            file.path = relocate_font(&file.path);
        }
        Ok(files)
    }
}

pub fn relocate_font(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    let dirs: Vec<_> = path
        .parent()
        .map(|p| {
            p.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect()
        })
        .unwrap_or_default();

    if dirs.len() > 1 {
        let mut out = PathBuf::from("..");
        out.extend(&dirs[1..]);
        out.join(name)
    } else {
        PathBuf::from(name)
    }
}
