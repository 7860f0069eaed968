//! Reference injection between HTML comment markers.
//!
//! ```html
//! <!-- bower:js -->
//! <!-- endinject -->
//! ```
//!
//! The content between a `<!-- NAME:EXT -->` marker and the next
//! `<!-- endinject -->` is replaced by one tag per target, with paths
//! relative to the document's output directory, indented like the start
//! marker. Documents without the marker pair are left alone.

use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;

use crate::pipeline::{FileSet, Pipe, extension_of};
use crate::utils::path::relative_path;

pub struct Inject {
    marker: String,
    ext: &'static str,
    targets: Vec<PathBuf>,
}

impl Inject {
    /// Inject the `ext` files among `targets` at `<!-- marker:ext -->`.
    pub fn new<I, P>(marker: &str, ext: &'static str, targets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let targets = targets
            .into_iter()
            .map(Into::into)
            .filter(|p: &PathBuf| extension_of(p) == ext)
            .collect();
        Self {
            marker: marker.to_string(),
            ext,
            targets,
        }
    }

    fn tag(&self, href: &str) -> String {
        match self.ext {
            "css" => format!("<link rel=\"stylesheet\" href=\"{href}\">"),
            _ => format!("<script src=\"{href}\"></script>"),
        }
    }
}

impl Pipe for Inject {
    fn name(&self) -> &str {
        "inject"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        let start = Regex::new(&format!(
            r"(?m)^([ \t]*)(.*?)<!--\s*{}:{}\s*-->",
            regex::escape(&self.marker),
            regex::escape(self.ext)
        ))?;
        let end = Regex::new(r"<!--\s*endinject\s*-->")?;

        for file in files.iter_mut() {
            let out = file
                .out
                .as_deref()
                .with_context(|| format!("{} must be written before injection", file.path.display()))?;
            let base = out.parent().unwrap_or(out);

            let text = file.text().into_owned();
            let Some(caps) = start.captures(&text) else {
                continue;
            };
            let (Some(open), Some(indent)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(close) = end.find_at(&text, open.end()) else {
                continue;
            };

            let indent = indent.as_str();
            let mut block = String::from("\n");
            for target in &self.targets {
                block.push_str(indent);
                block.push_str(&self.tag(&relative_path(target, base)));
                block.push('\n');
            }
            block.push_str(indent);

            let injected = format!("{}{}{}", &text[..open.end()], block, &text[close.start()..]);
            file.set_text(injected);
        }
        Ok(files)
    }
}
