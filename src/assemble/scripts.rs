//! Script pipes: application scripts, vendor scripts and the lint-only
//! passes over server and test scripts.

use anyhow::Result;

use super::BuildContext;
use crate::core::Env;
use crate::pipeline::lint::{Lint, ScriptLint};
use crate::pipeline::transform::{
    Annotate, Concat, MinifyJs, ModuleOrder, OrderingList, StripComments,
};
use crate::pipeline::{Chain, Dest, Source};
use crate::registry::{Category, Destination};
use crate::vendor::{FileKind, VendorSource};

fn browser_lint(ctx: &BuildContext<'_>) -> Lint<ScriptLint> {
    Lint::fail(ScriptLint::browser(&ctx.config.lint.globals))
}

/// Lint, dependency-order and write. Prod annotates and minifies each
/// script with its own source map, then bundles them into `app.min.js`
/// with the maps merged.
pub fn app_scripts(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let chain = Chain::new(format!("app-scripts-{env}"))
        .then(Source::new(&ctx.registry, Category::Scripts))
        .then(browser_lint(ctx))
        .then(ModuleOrder);

    let chain = if env.minifies_scripts() {
        chain
            .then(Annotate)
            .then(MinifyJs::with_source_map())
            .then(Concat::new("app.min.js"))
    } else {
        chain
    };

    Ok(chain.then(Dest::new(ctx.registry.dest(Destination::AppScripts, env))))
}

/// Vendor scripts in dependency order. Dev copies them one by one, test
/// bundles them (dev dependencies included) without comments, prod
/// bundles and minifies.
pub fn vendor_scripts(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let include_dev = env != Env::Prod;
    let chain = Chain::new(format!("vendor-scripts-{env}"))
        .then(VendorSource::new(ctx.config, FileKind::Script).include_dev(include_dev))
        .then(OrderingList::new(&ctx.config.vendor.order)?);

    let chain = match env {
        Env::Dev => chain,
        Env::Test => chain.then(StripComments).then(Concat::new("vendor.js")),
        Env::Prod => chain.then(Concat::new("vendor.min.js")).then(MinifyJs::new()),
    };

    Ok(chain.then(Dest::new(ctx.registry.dest(Destination::VendorScripts, env))))
}

pub fn lint_app_scripts(ctx: &BuildContext<'_>, _env: Env) -> Result<Chain> {
    Ok(Chain::new("validate-app-scripts")
        .then(Source::new(&ctx.registry, Category::Scripts))
        .then(browser_lint(ctx)))
}

pub fn lint_server_scripts(ctx: &BuildContext<'_>, _env: Env) -> Result<Chain> {
    Ok(Chain::new("validate-devserver-scripts")
        .then(Source::new(&ctx.registry, Category::ServerScripts))
        .then(Lint::fail(ScriptLint::node(&ctx.config.lint.server_globals))))
}

/// Test scripts see the browser globals plus the test framework's.
pub fn lint_test_scripts(ctx: &BuildContext<'_>, _env: Env) -> Result<Chain> {
    let lint = &ctx.config.lint;
    let globals: Vec<&str> = lint
        .globals
        .iter()
        .chain(&lint.test_globals)
        .map(String::as_str)
        .collect();
    Ok(Chain::new("validate-test-scripts")
        .then(Source::new(&ctx.registry, Category::TestScripts))
        .then(Lint::fail(ScriptLint::browser(&globals))))
}
