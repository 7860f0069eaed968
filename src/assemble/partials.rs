//! Partial templates: raw copies and template-cache modules.

use anyhow::Result;

use super::BuildContext;
use crate::core::Env;
use crate::pipeline::lint::{Lint, MarkupLint};
use crate::pipeline::transform::{Concat, MinifyJs, MinifyMarkup, TemplateCache};
use crate::pipeline::{Chain, Dest, Source};
use crate::registry::{Category, Destination};

/// Raw copy for dev; markup problems are reported but do not stop it.
pub fn raw_partials(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    Ok(Chain::new(format!("partials-{env}"))
        .then(Source::new(&ctx.registry, Category::Partials))
        .then(Lint::report(MarkupLint::fragment()))
        .then(Dest::new(ctx.registry.dest(Destination::Partials, env))))
}

/// One template-cache module per partial in dev, a single
/// `templates.min.js` bundle otherwise (minified as code in prod).
pub fn scripted_partials(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let templates = &ctx.config.templates;
    Ok(Chain::new(format!("scripted-partials-{env}"))
        .then(Source::new(&ctx.registry, Category::Partials))
        .then(Lint::fail(MarkupLint::fragment()))
        .then(MinifyMarkup)
        .then(TemplateCache::new(&templates.module, &templates.prefix))
        .then_if(env.concatenates(), Concat::new("templates.min.js"))
        .then_if(env.minifies_scripts(), MinifyJs::new())
        .then(Dest::new(ctx.registry.dest(Destination::Templates, env))))
}

pub fn lint_partials(ctx: &BuildContext<'_>, _env: Env) -> Result<Chain> {
    Ok(Chain::new("validate-partials")
        .then(Source::new(&ctx.registry, Category::Partials))
        .then(Lint::fail(MarkupLint::fragment())))
}
