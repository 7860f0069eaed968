//! Concatenation into a single bundle.

use anyhow::{Result, anyhow};
use parcel_sourcemap::SourceMap;

use crate::pipeline::{FileSet, Pipe, VirtualFile};

/// Joins every file, in set order, with `\n` into one file named `name`.
///
/// An empty set stays empty: no bundle is produced from nothing. When any
/// input carries a source map, the bundle gets one map covering every
/// mapped input, shifted to the line the input starts on.
pub struct Concat {
    name: String,
}

impl Concat {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Pipe for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        if files.is_empty() {
            return Ok(files);
        }
        let mut contents = Vec::new();
        let mut merged = files
            .iter()
            .any(|f| f.source_map.is_some())
            .then(|| SourceMap::new("/"));
        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                contents.push(b'\n');
            }
            if let Some(merged) = merged.as_mut()
                && let Some(json) = &file.source_map
            {
                let line = line_count(&contents);
                append_map(merged, json, line)
                    .map_err(|e| anyhow!("{}: bad source map: {e}", file.path.display()))?;
            }
            contents.extend_from_slice(&file.contents);
        }

        let mut bundle = VirtualFile::new(&self.name, contents);
        if let Some(mut merged) = merged {
            let json = merged
                .to_json(None)
                .map_err(|e| anyhow!("{}: {e:?}", self.name))?;
            bundle.source_map = Some(json);
        }
        Ok(vec![bundle].into())
    }
}

fn line_count(contents: &[u8]) -> i64 {
    contents.iter().filter(|&&b| b == b'\n').count() as i64
}

fn append_map(merged: &mut SourceMap, json: &str, line: i64) -> Result<()> {
    let mut map = SourceMap::from_json("/", json).map_err(|e| anyhow!("{e:?}"))?;
    merged
        .add_sourcemap(&mut map, line)
        .map_err(|e| anyhow!("{e:?}"))
}
