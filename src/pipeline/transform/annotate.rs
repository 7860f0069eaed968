//! Injection annotations for minification-safe dependency injection.
//!
//! `.controller('Name', function (a, b) { ... })` becomes
//! `.controller('Name', ['a', 'b', function (a, b) { ... }])`, and the
//! same for `config`/`run` blocks, so mangled parameter names still
//! resolve to the right services.

use anyhow::{Result, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::{Argument, CallExpression, Expression, FormalParameters};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::span::{SourceType, Span};

use crate::pipeline::{FileSet, Pipe};

/// Registrations taking a name and then the injectable function.
const NAMED: &[&str] = &[
    "controller",
    "service",
    "factory",
    "directive",
    "filter",
    "provider",
    "animation",
    "decorator",
];

/// Blocks taking the injectable function directly.
const BLOCKS: &[&str] = &["config", "run"];

pub struct Annotate;

impl Pipe for Annotate {
    fn name(&self) -> &str {
        "annotate"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        for file in files.iter_mut() {
            let annotated =
                annotate(&file.text()).map_err(|e| anyhow!("{}: {e}", file.path.display()))?;
            file.set_text(annotated);
        }
        Ok(files)
    }
}

pub fn annotate(src: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, src, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        bail!("cannot annotate: {error}");
    }

    let mut finder = Injectables::default();
    finder.visit_program(&ret.program);

    // (position, text) insertions, applied back to front
    let mut edits: Vec<(usize, String)> = Vec::new();
    for (span, names) in finder.found {
        let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
        edits.push((span.start as usize, format!("[{}, ", quoted.join(", "))));
        edits.push((span.end as usize, "]".to_string()));
    }

    let mut out = src.to_string();
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    for (pos, text) in edits {
        out.insert_str(pos, &text);
    }
    Ok(out)
}

/// Injectable functions with at least one parameter, by span.
#[derive(Default)]
struct Injectables {
    found: Vec<(Span, Vec<String>)>,
}

impl<'a> Visit<'a> for Injectables {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Some(arg) = injectable_argument(it)
            && let Some((span, params)) = function_params(arg)
        {
            let names: Vec<String> = params
                .items
                .iter()
                .filter_map(|p| p.pattern.get_identifier_name())
                .map(|name| name.to_string())
                .collect();
            if !names.is_empty() {
                self.found.push((span, names));
            }
        }
        walk::walk_call_expression(self, it);
    }
}

/// The argument holding the injectable function of a registration call.
fn injectable_argument<'b, 'a>(call: &'b CallExpression<'a>) -> Option<&'b Expression<'a>> {
    let method = call.callee.get_member_expr()?.static_property_name()?;
    let index = if NAMED.contains(&method) {
        match call.arguments.first() {
            Some(Argument::StringLiteral(_)) => 1,
            _ => return None,
        }
    } else if BLOCKS.contains(&method) {
        0
    } else {
        return None;
    };
    call.arguments.get(index)?.as_expression()
}

fn function_params<'b, 'a>(expr: &'b Expression<'a>) -> Option<(Span, &'b FormalParameters<'a>)> {
    match expr {
        Expression::FunctionExpression(f) => Some((f.span, &f.params)),
        Expression::ArrowFunctionExpression(f) => Some((f.span, &f.params)),
        _ => None,
    }
}
