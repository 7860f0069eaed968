//! Transformation pipes.
//!
//! A pipe is a named `FileSet -> FileSet` function. Pipes compose into
//! a [`Chain`], which is itself a pipe, so a whole category build reads
//! as one declaration:
//!
//! ```ignore
//! Chain::new("app-scripts-prod")
//!     .then(Source::new(&registry, Category::Scripts))
//!     .then(Lint::fail(ScriptLint::browser(&globals)))
//!     .then(ModuleOrder)
//!     .then(Annotate)
//!     .then(MinifyJs::with_source_map())
//!     .then(Concat::new("app.min.js"))
//!     .then(Dest::new(prod_root))
//!     .build()?;
//! ```
//!
//! Validation pipes see the whole set before anything downstream runs,
//! so a lint failure leaves the destination untouched.

mod dest;
mod file;
pub mod lint;
mod source;
pub mod transform;

pub use dest::Dest;
pub use file::{FileSet, VirtualFile, extension_of};
pub use source::Source;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::debug;

/// A named, composable transformation over a file set.
pub trait Pipe: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, files: FileSet) -> Result<FileSet>;
}

/// Sequential composition of pipes.
pub struct Chain {
    name: String,
    pipes: Vec<Box<dyn Pipe>>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pipes: Vec::new(),
        }
    }

    pub fn then(mut self, pipe: impl Pipe + 'static) -> Self {
        self.pipes.push(Box::new(pipe));
        self
    }

    /// Append `pipe` only when `enabled`.
    pub fn then_if(self, enabled: bool, pipe: impl Pipe + 'static) -> Self {
        if enabled { self.then(pipe) } else { self }
    }

    /// Stage names, in order.
    pub fn stages(&self) -> Vec<&str> {
        self.pipes.iter().map(|p| p.name()).collect()
    }

    /// Run from an empty set (chains that start with a source).
    pub fn build(&self) -> Result<FileSet> {
        self.run(FileSet::new())
    }
}

impl Pipe for Chain {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        self.pipes.iter().try_fold(files, |files, pipe| {
            let count = files.len();
            let out = pipe
                .run(files)
                .with_context(|| format!("{}: {} failed", self.name, pipe.name()))?;
            debug!("pipe"; "{} / {}: {} -> {} files", self.name, pipe.name(), count, out.len());
            Ok(out)
        })
    }
}

/// Runs independent chains in parallel and appends their outputs, in
/// branch order, to the incoming set. Completes only when every branch has.
pub struct Merge {
    name: String,
    branches: Vec<Chain>,
}

impl Merge {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
        }
    }

    pub fn branch(mut self, chain: Chain) -> Self {
        self.branches.push(chain);
        self
    }
}

impl Pipe for Merge {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let outputs: Vec<FileSet> = self
            .branches
            .par_iter()
            .map(Chain::build)
            .collect::<Result<_>>()?;
        Ok(outputs.into_iter().fold(files, FileSet::merge))
    }
}

/// Adapter turning a closure into a pipe.
pub struct FnPipe<F> {
    name: &'static str,
    f: F,
}

impl<F> FnPipe<F>
where
    F: Fn(FileSet) -> Result<FileSet> + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Pipe for FnPipe<F>
where
    F: Fn(FileSet) -> Result<FileSet> + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        (self.f)(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Pipe for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn run(&self, mut files: FileSet) -> Result<FileSet> {
            for file in files.iter_mut() {
                let text = file.text().to_uppercase();
                file.set_text(text);
            }
            Ok(files)
        }
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = Chain::new("test")
            .then(Upper)
            .then(FnPipe::new("suffix", |mut files: FileSet| {
                for file in files.iter_mut() {
                    let text = format!("{}!", file.text());
                    file.set_text(text);
                }
                Ok(files)
            }));

        let input: FileSet = vec![VirtualFile::new("a.txt", "hi")].into();
        let out = chain.run(input).unwrap();
        assert_eq!(out.as_slice()[0].text(), "HI!");
        assert_eq!(chain.stages(), vec!["upper", "suffix"]);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let chain = Chain::new("failing")
            .then(FnPipe::new("boom", |_| anyhow::bail!("boom")))
            .then(Upper);
        let err = chain.build().unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
    }

    #[test]
    fn test_merge_keeps_branch_order() {
        let branch = |name: &'static str| {
            Chain::new(name).then(FnPipe::new("emit", move |mut files: FileSet| {
                files.push(VirtualFile::new(name, ""));
                Ok(files)
            }))
        };
        let merge = Merge::new("m").branch(branch("a")).branch(branch("b"));
        let out = merge.run(vec![VirtualFile::new("input", "")].into()).unwrap();
        assert_eq!(
            out.paths(),
            vec![
                std::path::Path::new("input"),
                std::path::Path::new("a"),
                std::path::Path::new("b")
            ]
        );
    }

    #[test]
    fn test_then_if() {
        let chain = Chain::new("c").then_if(false, Upper).then_if(true, Upper);
        assert_eq!(chain.stages().len(), 1);
    }
}
