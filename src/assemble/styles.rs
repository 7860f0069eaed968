//! Stylesheet pipes.

use anyhow::Result;

use super::BuildContext;
use crate::core::Env;
use crate::pipeline::transform::{CompileStyles, Concat, MinifyCss, RenameMin};
use crate::pipeline::{Chain, Dest, Source};
use crate::registry::{Category, Destination};
use crate::vendor::{FileKind, VendorSource};

fn compiler(ctx: &BuildContext<'_>) -> CompileStyles {
    let styles = &ctx.config.styles;
    CompileStyles::new(ctx.registry.root(), &styles.sass, &styles.less)
}

/// Compile to CSS; outside dev also minify with a source map and rename
/// to `.min.css`.
pub fn app_styles(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let chain = Chain::new(format!("styles-{env}"))
        .then(Source::new(&ctx.registry, Category::Styles))
        .then(compiler(ctx));

    let chain = if env.minifies_styles() {
        chain.then(MinifyCss::with_source_map()).then(RenameMin)
    } else {
        chain
    };

    Ok(chain.then(Dest::new(ctx.registry.dest(Destination::Styles, env))))
}

/// Compiled vendor LESS followed by vendor CSS. Outside dev the merged
/// set is bundled into `vendor.min.css`.
pub fn vendor_styles(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let chain = Chain::new(format!("vendor-styles-{env}"))
        .then(VendorSource::new(ctx.config, FileKind::Less))
        .then(compiler(ctx))
        .then(VendorSource::new(ctx.config, FileKind::Css));

    let chain = if env.minifies_styles() {
        chain.then(Concat::new("vendor.min.css")).then(MinifyCss::new())
    } else {
        chain
    };

    Ok(chain.then(Dest::new(ctx.registry.dest(Destination::VendorStyles, env))))
}
