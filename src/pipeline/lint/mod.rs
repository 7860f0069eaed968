//! Validation pipes.
//!
//! A linter inspects one file and returns diagnostics. The [`Lint`] pipe
//! runs it over the whole set in parallel and either fails the chain or
//! reports and passes the files through unchanged.

mod markup;
mod script;

pub use markup::MarkupLint;
pub use script::{BROWSER_GLOBALS, NODE_GLOBALS, ScriptLint};

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use rayon::prelude::*;

use super::{FileSet, Pipe, VirtualFile};
use crate::log;

/// One finding, tied to a file and line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}] {}",
            self.file.display(),
            self.line,
            self.rule,
            self.message
        )
    }
}

/// Lint failure carrying every diagnostic of the set.
#[derive(Debug, thiserror::Error)]
#[error("{}", render(.diagnostics))]
pub struct LintError {
    pub diagnostics: Vec<Diagnostic>,
}

fn render(diagnostics: &[Diagnostic]) -> String {
    let count = diagnostics.len();
    let mut out = format!("{count} lint error{}", if count == 1 { "" } else { "s" });
    for diagnostic in diagnostics {
        out.push_str(&format!("\n  {diagnostic}"));
    }
    out
}

/// Byte offset to 1-based line number.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn line(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

/// Per-file checker.
pub trait Linter: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, file: &VirtualFile) -> Vec<Diagnostic>;
}

/// What to do with diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fail the chain with a [`LintError`].
    Fail,
    /// Log the diagnostics and continue.
    Report,
}

/// Runs a linter over every file of the set.
pub struct Lint<L> {
    linter: L,
    severity: Severity,
}

impl<L: Linter> Lint<L> {
    pub fn fail(linter: L) -> Self {
        Self {
            linter,
            severity: Severity::Fail,
        }
    }

    pub fn report(linter: L) -> Self {
        Self {
            linter,
            severity: Severity::Report,
        }
    }

    /// Diagnostics for the whole set, ordered by file then line.
    pub fn check_all(&self, files: &FileSet) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<_> = files
            .as_slice()
            .par_iter()
            .flat_map_iter(|file| self.linter.check(file))
            .collect();
        diagnostics.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
        diagnostics
    }
}

impl<L: Linter> Pipe for Lint<L> {
    fn name(&self) -> &str {
        self.linter.name()
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let diagnostics = self.check_all(&files);
        if diagnostics.is_empty() {
            return Ok(files);
        }
        match self.severity {
            Severity::Fail => Err(LintError { diagnostics }.into()),
            Severity::Report => {
                for diagnostic in &diagnostics {
                    log!("lint"; "{diagnostic}");
                }
                Ok(files)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoTodo;

    impl Linter for NoTodo {
        fn name(&self) -> &'static str {
            "no-todo"
        }

        fn check(&self, file: &VirtualFile) -> Vec<Diagnostic> {
            file.text()
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains("TODO"))
                .map(|(i, _)| Diagnostic {
                    file: file.path.clone(),
                    line: i + 1,
                    rule: "no-todo",
                    message: "leftover marker".into(),
                })
                .collect()
        }
    }

    fn files() -> FileSet {
        vec![
            VirtualFile::new("b.js", "ok\nTODO"),
            VirtualFile::new("a.js", "TODO"),
        ]
        .into()
    }

    #[test]
    fn test_fail_collects_all_files() {
        let err = Lint::fail(NoTodo).run(files()).unwrap_err();
        let lint = err.downcast_ref::<LintError>().unwrap();
        assert_eq!(lint.diagnostics.len(), 2);
        assert_eq!(lint.diagnostics[0].file, PathBuf::from("a.js"));
        assert_eq!(lint.diagnostics[1].line, 2);
        assert!(err.to_string().contains("b.js:2 [no-todo]"));
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nb\nc");
        assert_eq!(index.line(0), 1);
        assert_eq!(index.line(2), 2);
        assert_eq!(index.line(4), 3);
    }

    #[test]
    fn test_report_passes_files_through() {
        let out = Lint::report(NoTodo).run(files()).unwrap();
        assert_eq!(out, files());
    }
}
