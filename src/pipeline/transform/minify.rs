//! Minification for scripts, stylesheets and markup.
//!
//! Uses oxc for JavaScript, lightningcss for CSS and minify-html for
//! markup.

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use parcel_sourcemap::SourceMap;
use rayon::prelude::*;

use crate::pipeline::{FileSet, Pipe, VirtualFile};

/// Minified code plus an optional source map (JSON).
pub struct Minified {
    pub code: String,
    pub map: Option<String>,
}

/// Minify a browser script, mangling local names.
///
/// Top-level names are shared between scripts and are never renamed.
/// With `source_name`, a source map pointing back at that file is
/// produced too; the mapped variant skips compression, which rewrites
/// nodes without keeping their positions.
pub fn minify_js(source: &str, source_name: Option<&str>) -> Result<Minified> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        bail!("cannot minify: {error}");
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: source_name.is_none().then(CompressOptions::smallest),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let out = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: source_name.map(PathBuf::from),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);
    Ok(Minified {
        code: out.code,
        map: out.map.map(|m| m.to_json_string()),
    })
}

/// Reprint a script without comments, keeping it readable.
pub fn strip_comments(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        bail!("cannot strip comments: {error}");
    }
    let out = Codegen::new()
        .with_options(CodegenOptions {
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .build(&ret.program);
    Ok(out.code)
}

/// Minify CSS source code, optionally with a source map.
pub fn minify_css(source: &str, filename: &str, with_map: bool) -> Result<Minified> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut stylesheet =
        StyleSheet::parse(source, options).map_err(|e| anyhow!("{filename}: {e}"))?;
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    let mut map = if with_map {
        let mut map = SourceMap::new("/");
        let index = map.add_source(filename);
        map.set_source_content(index as usize, source)
            .map_err(|e| anyhow!("{filename}: {e:?}"))?;
        Some(map)
    } else {
        None
    };

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    let map = match map {
        Some(mut map) => Some(map.to_json(None).map_err(|e| anyhow!("{filename}: {e:?}"))?),
        None => None,
    };
    Ok(Minified {
        code: result.code,
        map,
    })
}

/// Minify markup: drop comments, collapse whitespace and drop optional
/// whitespace between tags. Closing tags, the `html`/`head` opening tags
/// and `{{ }}` bindings are kept as written.
pub fn minify_markup(source: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.preserve_brace_template_syntax = true;
    cfg.minify_css = false;
    cfg.minify_js = false;
    let out = minify_html::minify(source.as_bytes(), &cfg);
    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// Pipes
// ============================================================================

/// Minifies every script; optionally attaches a source map whose single
/// source is the script's own virtual path.
#[derive(Default)]
pub struct MinifyJs {
    source_map: bool,
}

impl MinifyJs {
    pub fn new() -> Self {
        Self { source_map: false }
    }

    pub fn with_source_map() -> Self {
        Self { source_map: true }
    }
}

impl Pipe for MinifyJs {
    fn name(&self) -> &str {
        "minify-js"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        map_files(files, |file| {
            let name = file.path.to_string_lossy().replace('\\', "/");
            let min = minify_js(&file.text(), self.source_map.then_some(name.as_str()))
                .map_err(|e| anyhow!("{}: {e}", file.path.display()))?;
            file.set_text(min.code);
            file.source_map = min.map;
            Ok(())
        })
    }
}

/// Minifies every stylesheet; optionally attaches a source map.
#[derive(Default)]
pub struct MinifyCss {
    source_map: bool,
}

impl MinifyCss {
    pub fn new() -> Self {
        Self { source_map: false }
    }

    pub fn with_source_map() -> Self {
        Self { source_map: true }
    }
}

impl Pipe for MinifyCss {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        map_files(files, |file| {
            let filename = file.path.to_string_lossy().replace('\\', "/");
            let min = minify_css(&file.text(), &filename, self.source_map)?;
            file.set_text(min.code);
            file.source_map = min.map;
            Ok(())
        })
    }
}

pub struct MinifyMarkup;

impl Pipe for MinifyMarkup {
    fn name(&self) -> &str {
        "minify-markup"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        map_files(files, |file| {
            let min = minify_markup(&file.text());
            file.set_text(min);
            Ok(())
        })
    }
}

/// Reprints scripts without comments.
pub struct StripComments;

impl Pipe for StripComments {
    fn name(&self) -> &str {
        "strip-comments"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        map_files(files, |file| {
            let stripped = strip_comments(&file.text())
                .map_err(|e| anyhow!("{}: {e}", file.display_path().display()))?;
            file.set_text(stripped);
            Ok(())
        })
    }
}

/// Apply `f` to every file in parallel, keeping order.
fn map_files<F>(mut files: FileSet, f: F) -> Result<FileSet>
where
    F: Fn(&mut VirtualFile) -> Result<()> + Send + Sync,
{
    files.as_mut_slice().par_iter_mut().try_for_each(f)?;
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js_mangles_locals() {
        let src = "function add(first, second) {\n  // sum\n  return first + second;\n}\nadd(1, 2);";
        let min = minify_js(src, None).unwrap();
        assert!(!min.code.contains("first"));
        assert!(!min.code.contains("sum"));
        assert!(min.map.is_none());
    }

    fn map_json(map: &str) -> serde_json::Value {
        serde_json::from_str(map).unwrap()
    }

    #[test]
    fn test_minify_js_source_map() {
        let src = "function greet(name) {\n  return 'hi ' + name;\n}\nwindow.greet = greet;\n";
        let min = minify_js(src, Some("app/greet.js")).unwrap();
        let map = map_json(&min.map.unwrap());
        assert_eq!(map["sources"], serde_json::json!(["app/greet.js"]));
        assert!(!map["mappings"].as_str().unwrap().is_empty());
        assert_eq!(map["sourcesContent"][0], src);
    }

    #[test]
    fn test_minify_js_keeps_top_level_names() {
        let min = minify_js("var shared = 1;\nfunction helper(value) { return value; }", None).unwrap();
        assert!(min.code.contains("shared"));
        assert!(min.code.contains("helper"));
        assert!(!min.code.contains("value"));
    }

    #[test]
    fn test_minify_js_pipe_maps_each_file() {
        let files: FileSet = vec![
            VirtualFile::new("app/a.js", "var first = function (x) { return x * 2; };"),
            VirtualFile::new("app/b.js", "var second = function (y) { return y + 1; };"),
        ]
        .into();
        let out = MinifyJs::with_source_map().run(files).unwrap();
        for (file, name) in out.iter().zip(["app/a.js", "app/b.js"]) {
            let map = map_json(file.source_map.as_deref().unwrap());
            assert_eq!(map["sources"], serde_json::json!([name]));
            assert!(!map["mappings"].as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn test_minify_js_rejects_syntax_errors() {
        assert!(minify_js("var = ;", None).is_err());
    }

    #[test]
    fn test_strip_comments() {
        let out = strip_comments("/* license */\nvar a = 1; // trailing\n").unwrap();
        assert!(!out.contains("license"));
        assert!(!out.contains("trailing"));
        assert!(out.contains("var a = 1"));
    }

    #[test]
    fn test_minify_css_with_map() {
        let min = minify_css("body {\n  color: red;\n}\n", "main.css", true).unwrap();
        assert_eq!(min.code, "body{color:red}");
        assert!(min.map.unwrap().contains("main.css"));
    }

    #[test]
    fn test_minify_markup() {
        let src = "<div>\n  <!-- note -->\n  <p>Hello   <b>world</b></p>\n  <pre>  keep\n  me</pre>\n</div>\n";
        let out = minify_markup(src);
        assert!(!out.contains("note"));
        assert!(out.contains("<p>Hello <b>world</b></p>"));
        assert!(out.contains("<pre>  keep\n  me</pre>"));
        assert!(out.contains("</div>"));
    }

    #[test]
    fn test_minify_markup_keeps_script_bodies() {
        let src = "<script type=\"text/ng-template\" id=\"row.html\">\n  <li>{{ item }}</li>\n</script>";
        assert!(minify_markup(src).contains("{{ item }}"));
    }
}
