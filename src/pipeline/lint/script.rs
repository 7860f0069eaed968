//! Script lint: syntax check and undeclared identifiers.

use std::sync::LazyLock;

use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use regex::Regex;
use rustc_hash::FxHashSet;

use super::{Diagnostic, LineIndex, Linter};
use crate::pipeline::VirtualFile;

/// Language builtins, known in every environment.
const ES_GLOBALS: &[&str] = &[
    "Array", "ArrayBuffer", "Atomics", "BigInt", "BigInt64Array", "BigUint64Array", "Boolean",
    "DataView", "Date", "decodeURI", "decodeURIComponent", "encodeURI", "encodeURIComponent",
    "Error", "escape", "eval", "EvalError", "FinalizationRegistry", "Float32Array",
    "Float64Array", "Function", "globalThis", "Infinity", "Int8Array", "Int16Array",
    "Int32Array", "Intl", "isFinite", "isNaN", "JSON", "Map", "Math", "NaN", "Number",
    "Object", "parseFloat", "parseInt", "Promise", "Proxy", "RangeError", "ReferenceError",
    "Reflect", "RegExp", "Set", "SharedArrayBuffer", "String", "Symbol", "SyntaxError",
    "TypeError", "Uint8Array", "Uint8ClampedArray", "Uint16Array", "Uint32Array", "undefined",
    "unescape", "URIError", "WeakMap", "WeakRef", "WeakSet", "arguments", "console",
    "setTimeout", "clearTimeout", "setInterval", "clearInterval", "queueMicrotask",
    "structuredClone", "TextEncoder", "TextDecoder", "URL", "URLSearchParams",
];

pub const BROWSER_GLOBALS: &[&str] = &[
    "window", "document", "navigator", "location", "history", "screen", "self", "top",
    "parent", "frames", "alert", "confirm", "prompt", "requestAnimationFrame",
    "cancelAnimationFrame", "fetch", "XMLHttpRequest", "localStorage", "sessionStorage",
    "Event", "CustomEvent", "Element", "HTMLElement", "Node", "NodeList", "FormData", "Blob",
    "File", "FileReader", "Image", "WebSocket", "performance", "atob", "btoa",
    "getComputedStyle", "matchMedia", "MutationObserver", "addEventListener",
    "removeEventListener", "dispatchEvent", "Headers", "Request", "Response",
    "AbortController", "crypto", "DOMParser",
];

pub const NODE_GLOBALS: &[&str] = &[
    "require", "module", "exports", "process", "__dirname", "__filename", "Buffer", "global",
    "setImmediate", "clearImmediate",
];

static INLINE_GLOBALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*globals?\s+([^*]*)\*/").expect("valid globals regex"));

/// Parses each script and reports syntax errors and references to
/// identifiers that are neither declared nor allowed globals.
///
/// `/* global a, b */` comments extend the allow-list for that file.
pub struct ScriptLint {
    globals: FxHashSet<String>,
}

impl ScriptLint {
    /// Browser scripts: language + browser globals + `extra`.
    pub fn browser<S: AsRef<str>>(extra: &[S]) -> Self {
        Self::with_env(BROWSER_GLOBALS, extra)
    }

    /// Node scripts: language + node globals + `extra`.
    pub fn node<S: AsRef<str>>(extra: &[S]) -> Self {
        Self::with_env(NODE_GLOBALS, extra)
    }

    fn with_env<S: AsRef<str>>(env: &[&str], extra: &[S]) -> Self {
        let globals = ES_GLOBALS
            .iter()
            .chain(env)
            .map(|g| (*g).to_string())
            .chain(extra.iter().map(|g| g.as_ref().to_string()))
            .collect();
        Self { globals }
    }

    fn is_allowed(&self, name: &str, inline: &FxHashSet<&str>) -> bool {
        self.globals.contains(name) || inline.contains(name)
    }
}

impl Linter for ScriptLint {
    fn name(&self) -> &'static str {
        "script-lint"
    }

    fn check(&self, file: &VirtualFile) -> Vec<Diagnostic> {
        let src = file.text();
        let lines = LineIndex::new(&src);
        let diagnostic = |line: usize, rule: &'static str, message: String| Diagnostic {
            file: file.display_path().to_path_buf(),
            line,
            rule,
            message,
        };

        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, &src, SourceType::cjs()).parse();
        if !ret.errors.is_empty() {
            return ret
                .errors
                .iter()
                .map(|error| {
                    let offset = error
                        .labels
                        .as_ref()
                        .and_then(|labels| labels.first())
                        .map_or(0, |label| label.offset());
                    diagnostic(lines.line(offset), "syntax", error.to_string())
                })
                .collect();
        }

        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let inline = inline_globals(&src);

        let mut undeclared: Vec<String> = semantic
            .scoping()
            .root_unresolved_references()
            .keys()
            .map(|name| name.to_string())
            .filter(|name| !self.is_allowed(name, &inline))
            .collect();
        undeclared.sort();

        undeclared
            .into_iter()
            .map(|name| {
                let line = first_use(&src, &name).map_or(1, |offset| lines.line(offset));
                diagnostic(line, "no-undef", format!("'{name}' is not defined"))
            })
            .collect()
    }
}

/// Names declared through `/* global ... */` comments.
fn inline_globals(src: &str) -> FxHashSet<&str> {
    INLINE_GLOBALS
        .captures_iter(src)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split([',', ' ', '\n', '\t', '\r']))
        .map(|name| name.split(':').next().unwrap_or(name).trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Byte offset of the first standalone occurrence of an identifier.
fn first_use(src: &str, name: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    src.match_indices(name).map(|(i, _)| i).find(|&i| {
        let before = src[..i].chars().next_back();
        let after = src[i + name.len()..].chars().next();
        !before.is_some_and(|c| is_ident(c) || c == '.') && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(lint: &ScriptLint, src: &str) -> Vec<Diagnostic> {
        lint.check(&VirtualFile::new("foo.js", src))
    }

    #[test]
    fn test_undeclared_variable() {
        let lint = ScriptLint::browser(&["angular"]);
        let diags = check(&lint, "var a = 1;\nfunction f() {\n  return a + missing;\n}\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "no-undef");
        assert_eq!(diags[0].line, 3);
        assert!(diags[0].message.contains("missing"));
        assert!(diags[0].to_string().starts_with("foo.js:3"));
    }

    #[test]
    fn test_allowed_globals() {
        let lint = ScriptLint::browser(&["angular"]);
        let src = "angular.module('app', []).run(function () { window.console.log(JSON.stringify({})); });";
        assert!(check(&lint, src).is_empty());
    }

    #[test]
    fn test_node_globals_only_for_node() {
        let src = "var fs = require('fs'); module.exports = fs;";
        assert!(check(&ScriptLint::node::<&str>(&[]), src).is_empty());
        assert_eq!(check(&ScriptLint::browser::<&str>(&[]), src).len(), 2);
    }

    #[test]
    fn test_inline_global_comment() {
        let lint = ScriptLint::browser::<&str>(&[]);
        let src = "/* global moment, _: false */\nmoment(); _.each([], function () {});";
        assert!(check(&lint, src).is_empty());
    }

    #[test]
    fn test_syntax_error() {
        let lint = ScriptLint::browser::<&str>(&[]);
        let diags = check(&lint, "var a = ;");
        assert!(!diags.is_empty());
        assert_eq!(diags[0].rule, "syntax");
    }

    #[test]
    fn test_first_use_skips_members() {
        assert_eq!(first_use("obj.foo + foo", "foo"), Some(10));
        assert_eq!(first_use("food", "foo"), None);
    }
}
