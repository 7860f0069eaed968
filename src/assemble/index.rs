//! The index document and the references injected into it.

use anyhow::Result;
use rayon::prelude::*;

use super::{BuildContext, PipeId};
use crate::core::Env;
use crate::pipeline::lint::{Lint, MarkupLint};
use crate::pipeline::transform::{Inject, MinifyMarkup};
use crate::pipeline::{Chain, Dest, FileSet, Pipe, Source};
use crate::registry::{Category, Destination};

/// Pipes the index references, with the marker and extension their
/// outputs are injected at. Injection happens in this order.
const REFERENCED: [(PipeId, &str, &str); 5] = [
    (PipeId::VendorScripts, "bower", "js"),
    (PipeId::ScriptedPartials, "templates", "js"),
    (PipeId::AppScripts, "inject", "js"),
    (PipeId::Styles, "inject", "css"),
    (PipeId::VendorStyles, "bower", "css"),
];

/// Lint and write the index, build every referenced pipe, then inject
/// their outputs and write again.
pub fn index(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let mut references = Vec::with_capacity(REFERENCED.len());
    for (id, marker, ext) in REFERENCED {
        references.push(Reference {
            chain: ctx.chain(id, env)?,
            marker,
            ext,
        });
    }

    let dir = ctx.registry.dest(Destination::Index, env);
    Ok(Chain::new(format!("index-{env}"))
        .then(Source::new(&ctx.registry, Category::Index))
        .then(Lint::fail(MarkupLint::document()))
        .then(Dest::new(&dir))
        .then(InjectBuilt { references })
        .then_if(env.minifies_scripts(), MinifyMarkup)
        .then(Dest::new(dir)))
}

struct Reference {
    chain: Chain,
    marker: &'static str,
    ext: &'static str,
}

/// Runs the referenced chains in parallel and, once all of them finished,
/// injects their outputs into the incoming documents.
struct InjectBuilt {
    references: Vec<Reference>,
}

impl Pipe for InjectBuilt {
    fn name(&self) -> &str {
        "inject-built"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let outputs: Vec<FileSet> = self
            .references
            .par_iter()
            .map(|r| r.chain.build())
            .collect::<Result<_>>()?;

        self.references
            .iter()
            .zip(&outputs)
            .try_fold(files, |files, (reference, built)| {
                Inject::new(reference.marker, reference.ext, built.outputs()).run(files)
            })
    }
}

pub fn lint_index(ctx: &BuildContext<'_>, _env: Env) -> Result<Chain> {
    Ok(Chain::new("validate-index")
        .then(Source::new(&ctx.registry, Category::Index))
        .then(Lint::fail(MarkupLint::document())))
}
