//! Virtual files and file sets flowing through pipes.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::registry::GlobMatch;

/// A file in flight.
///
/// `path` is the virtual path: relative to the glob base while the file
/// is being transformed, relative to the destination directory once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub path: PathBuf,
    /// Absolute path of the file it was read from; `None` when generated.
    pub source: Option<PathBuf>,
    pub contents: Vec<u8>,
    /// Source map JSON, written next to the file as `<name>.map`.
    pub source_map: Option<String>,
    /// Absolute location once written by a destination pipe.
    pub out: Option<PathBuf>,
}

impl VirtualFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            source: None,
            contents: contents.into(),
            source_map: None,
            out: None,
        }
    }

    /// Read a matched source from disk.
    pub fn read(matched: &GlobMatch) -> Result<Self> {
        let contents = std::fs::read(&matched.path)
            .with_context(|| format!("failed to read {}", matched.path.display()))?;
        Ok(Self {
            path: matched.relative.clone(),
            source: Some(matched.path.clone()),
            contents,
            source_map: None,
            out: None,
        })
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension() == ext
    }

    /// Path used in diagnostics: the source path when known.
    pub fn display_path(&self) -> &Path {
        self.source.as_deref().unwrap_or(&self.path)
    }
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Ordered sequence of virtual files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<VirtualFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn push(&mut self, file: VirtualFile) {
        self.files.push(file);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VirtualFile> {
        self.files.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, VirtualFile> {
        self.files.iter_mut()
    }

    pub fn as_slice(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn as_mut_slice(&mut self) -> &mut [VirtualFile] {
        &mut self.files
    }

    pub fn into_vec(self) -> Vec<VirtualFile> {
        self.files
    }

    /// Virtual paths, in order.
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }

    /// Written locations, in order. Unwritten files are skipped.
    pub fn outputs(&self) -> Vec<&Path> {
        self.files.iter().filter_map(|f| f.out.as_deref()).collect()
    }

    /// Split into (matching, rest), each keeping relative order.
    pub fn partition(self, pred: impl Fn(&VirtualFile) -> bool) -> (Self, Self) {
        let (yes, no): (Vec<_>, Vec<_>) = self.files.into_iter().partition(|f| pred(f));
        (Self { files: yes }, Self { files: no })
    }

    /// Append `other` after this set.
    pub fn merge(mut self, other: Self) -> Self {
        self.files.extend(other.files);
        self
    }
}

impl From<Vec<VirtualFile>> for FileSet {
    fn from(files: Vec<VirtualFile>) -> Self {
        Self { files }
    }
}

impl FromIterator<VirtualFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = VirtualFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FileSet {
    type Item = VirtualFile;
    type IntoIter = std::vec::IntoIter<VirtualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a VirtualFile;
    type IntoIter = std::slice::Iter<'a, VirtualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl Extend<VirtualFile> for FileSet {
    fn extend<I: IntoIterator<Item = VirtualFile>>(&mut self, iter: I) {
        self.files.extend(iter);
    }
}
