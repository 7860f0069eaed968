//! Markup lint over the element tree `tl` builds.
//!
//! Rules: `doctype-first` (documents only), `tag-pair`, `tagname-lowercase`,
//! `attr-lowercase`, `attr-value-double-quotes`, `attr-no-duplication`,
//! `id-unique`, `src-not-empty`.
//!
//! `tl` normalizes attributes and silently drops end tags that do not close
//! the innermost open element, so attribute spelling is read from the start
//! tag text and dropped end tags are recovered from the text around the
//! tree. Every `tl` node is a slice of the input, which gives positions.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use super::{Diagnostic, LineIndex, Linter};
use crate::pipeline::VirtualFile;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose contents are not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^<[^\s/>]+((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*/?>"#,
    )
    .expect("valid start tag regex")
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'=<>`]+))?"#)
        .expect("valid attribute regex")
});

static END_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</([A-Za-z][A-Za-z0-9:-]*)\s*>").expect("valid end tag regex")
});

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

pub struct MarkupLint {
    doctype_first: bool,
}

impl MarkupLint {
    /// Full documents: a doctype must come first.
    pub fn document() -> Self {
        Self { doctype_first: true }
    }

    /// Fragments (partials).
    pub fn fragment() -> Self {
        Self {
            doctype_first: false,
        }
    }
}

/// An element as written in the source.
struct Element<'s> {
    name: &'s str,
    start: usize,
    end: usize,
    start_tag: &'s str,
    /// Its own end tag closes it.
    closed: bool,
    /// Void or self-closing: never takes an end tag.
    leaf: bool,
}

/// Byte offset of `part` inside `src`.
fn offset_in(src: &str, part: &[u8]) -> Option<usize> {
    let start = (part.as_ptr() as usize).checked_sub(src.as_ptr() as usize)?;
    (start + part.len() <= src.len()).then_some(start)
}

fn element<'s>(src: &'s str, tag: &tl::HTMLTag<'_>, parser: &tl::Parser<'_>) -> Option<Element<'s>> {
    let (start, _) = tag.boundaries(parser);
    let end = start + tag.raw().as_bytes().len();
    let raw = src.get(start..end)?;

    let after_lt = raw.get(1..)?;
    let name_len = after_lt
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(after_lt.len());
    let name = &after_lt[..name_len];
    let start_tag = START_TAG.find(raw).map_or(raw, |m| m.as_str());
    let leaf = is_void(name) || start_tag.ends_with("/>");
    let closed = !leaf
        && raw.len() > start_tag.len()
        && raw
            .get(raw.len().saturating_sub(name.len() + 3)..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(&format!("</{name}>")));

    Some(Element {
        name,
        start,
        end,
        start_tag,
        closed,
        leaf,
    })
}

/// Offset of the first thing that is neither whitespace nor a comment.
fn first_content(src: &str) -> Option<usize> {
    let mut pos = 0;
    loop {
        let rest = &src[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.starts_with("<!--") {
            return Some(pos);
        }
        pos += trimmed.find("-->")? + 3;
    }
}

fn is_source_attr(tag: &str, attr: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    match attr {
        "src" => matches!(
            tag.as_str(),
            "img" | "script" | "embed" | "iframe" | "frame" | "input" | "audio" | "video" | "source"
        ),
        "href" => tag == "link",
        "data" => tag == "object",
        _ => false,
    }
}

struct Report<'f> {
    file: &'f VirtualFile,
    lines: LineIndex,
    out: Vec<Diagnostic>,
}

impl Report<'_> {
    fn push(&mut self, offset: usize, rule: &'static str, message: String) {
        self.out.push(Diagnostic {
            file: self.file.display_path().to_path_buf(),
            line: self.lines.line(offset),
            rule,
            message,
        });
    }
}

/// Spelling rules read the start tag text; value rules read what `tl` parsed.
fn check_attributes(
    report: &mut Report<'_>,
    element: &Element<'_>,
    tag: &tl::HTMLTag<'_>,
    ids: &mut FxHashMap<String, usize>,
) {
    let name = element.name;
    let attrs = START_TAG
        .captures(element.start_tag)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());

    let mut seen: Vec<&str> = Vec::new();
    for cap in ATTR.captures_iter(attrs) {
        let attr = cap.get(1).map_or("", |m| m.as_str());
        if attr.chars().any(|c| c.is_ascii_uppercase()) {
            report.push(
                element.start,
                "attr-lowercase",
                format!("attribute name [{attr}] must be lowercase"),
            );
        }
        if let Some(value) = cap.get(2)
            && !value.as_str().starts_with('"')
        {
            report.push(
                element.start,
                "attr-value-double-quotes",
                format!("value of attribute [{attr}] must be in double quotes"),
            );
        }
        if seen.iter().any(|s| s.eq_ignore_ascii_case(attr)) {
            report.push(
                element.start,
                "attr-no-duplication",
                format!("duplicate attribute [{attr}]"),
            );
        }
        seen.push(attr);
    }

    let attributes = tag.attributes();
    if let Some(id) = attributes.id() {
        let id = id.as_utf8_str().trim().to_string();
        if let Some(first) = ids.get(&id) {
            let first = report.lines.line(*first);
            report.push(
                element.start,
                "id-unique",
                format!("id \"{id}\" already used on line {first}"),
            );
        } else if !id.is_empty() {
            ids.insert(id, element.start);
        }
    }

    for (key, value) in attributes.iter() {
        let key = key.to_ascii_lowercase();
        let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
        if is_source_attr(name, &key) && value.is_empty() {
            report.push(
                element.start,
                "src-not-empty",
                format!("<{name}> has an empty [{key}] attribute"),
            );
        }
    }
}

impl Linter for MarkupLint {
    fn name(&self) -> &'static str {
        "markup-lint"
    }

    fn check(&self, file: &VirtualFile) -> Vec<Diagnostic> {
        let src = file.text();
        let mut report = Report {
            file,
            lines: LineIndex::new(&src),
            out: Vec::new(),
        };

        if self.doctype_first
            && let Some(pos) = first_content(&src)
            && !src
                .get(pos..pos + 9)
                .is_some_and(|s| s.eq_ignore_ascii_case("<!doctype"))
        {
            report.push(pos, "doctype-first", "doctype must be declared first".into());
        }

        let dom = match tl::parse(&src, tl::ParserOptions::default()) {
            Ok(dom) => dom,
            Err(e) => {
                report.push(0, "tag-pair", format!("markup cannot be parsed: {e:?}"));
                return report.out;
            }
        };
        let parser = dom.parser();

        // Comments and raw text hide end tags from the pairing check.
        let mut hidden: Vec<Range<usize>> = Vec::new();
        let mut elements: Vec<Element<'_>> = Vec::new();
        let mut ids: FxHashMap<String, usize> = FxHashMap::default();

        for node in dom.nodes() {
            match node {
                tl::Node::Tag(tag) => {
                    let Some(element) = element(&src, tag, parser) else {
                        continue;
                    };
                    if hidden.iter().any(|r| r.contains(&element.start)) {
                        continue;
                    }
                    if element.name.chars().any(|c| c.is_ascii_uppercase()) {
                        report.push(
                            element.start,
                            "tagname-lowercase",
                            format!("tag name <{}> must be lowercase", element.name),
                        );
                    }
                    check_attributes(&mut report, &element, tag, &mut ids);
                    if element.closed && is_raw_text(element.name) {
                        hidden.push(element.start + element.start_tag.len()..element.end);
                    }
                    elements.push(element);
                }
                tl::Node::Comment(comment) => {
                    if let Some(start) = offset_in(&src, comment.as_bytes()) {
                        hidden.push(start..start + comment.as_bytes().len());
                    }
                }
                tl::Node::Raw(_) => {}
            }
        }

        check_pairs(&mut report, &src, &elements, &hidden);

        let mut out = report.out;
        out.sort_by_key(|d| d.line);
        out
    }
}

/// End tags `tl` matched sit at the end of their element. Any other end tag
/// either closes an element out of nesting order or has no start tag.
fn check_pairs(report: &mut Report<'_>, src: &str, elements: &[Element<'_>], hidden: &[Range<usize>]) {
    let matched: Vec<usize> = elements.iter().filter(|e| e.closed).map(|e| e.end).collect();
    let mut loose: Vec<(&str, usize, bool)> = END_TAG
        .captures_iter(src)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let name = cap.get(1)?.as_str();
            let keep = !is_void(name)
                && !matched.contains(&whole.end())
                && !hidden.iter().any(|r| r.contains(&whole.start()));
            keep.then_some((name, whole.start(), false))
        })
        .collect();

    let mut unclosed = Vec::new();
    for element in elements.iter().rev().filter(|e| !e.closed && !e.leaf) {
        let closer = loose
            .iter_mut()
            .find(|(name, at, used)| !*used && *at > element.start && name.eq_ignore_ascii_case(element.name));
        match closer {
            Some(closer) => closer.2 = true,
            None => unclosed.push(element),
        }
    }

    for element in unclosed {
        let before = loose.iter().find(|(_, at, _)| *at > element.start);
        let message = match before {
            Some((name, _, _)) => format!("tag <{}> is not closed before </{name}>", element.name),
            None => format!("tag <{}> is never closed", element.name),
        };
        report.push(element.start, "tag-pair", message);
    }

    for (name, at, _) in loose.iter().filter(|(_, _, used)| !used) {
        report.push(*at, "tag-pair", format!("end tag </{name}> has no matching start tag"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(lint: &MarkupLint, src: &str) -> Vec<&'static str> {
        lint.check(&VirtualFile::new("x.html", src))
            .into_iter()
            .map(|d| d.rule)
            .collect()
    }

    fn messages(src: &str) -> Vec<String> {
        MarkupLint::fragment()
            .check(&VirtualFile::new("x.html", src))
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_clean_fragment() {
        let src = "<div class=\"nav\">\n  <img src=\"a.png\">\n  <br/>\n</div>\n";
        assert!(rules(&MarkupLint::fragment(), src).is_empty());
    }

    #[test]
    fn test_doctype_first() {
        let lint = MarkupLint::document();
        assert_eq!(rules(&lint, "<html></html>"), vec!["doctype-first"]);
        assert!(rules(&lint, "<!-- c -->\n<!DOCTYPE html>\n<html></html>").is_empty());
        assert!(rules(&MarkupLint::fragment(), "<div></div>").is_empty());
    }

    #[test]
    fn test_tag_pair() {
        let lint = MarkupLint::fragment();
        assert_eq!(rules(&lint, "<div><span></div>"), vec!["tag-pair"]);
        assert_eq!(rules(&lint, "</p>"), vec!["tag-pair"]);
        assert_eq!(rules(&lint, "<ul><li>a</li>"), vec!["tag-pair"]);
    }

    #[test]
    fn test_tag_pair_messages() {
        let nested = messages("<div><span></div>");
        assert_eq!(nested.len(), 1);
        assert!(nested[0].starts_with("tag <span> is"), "{nested:?}");
        assert_eq!(messages("</p>"), vec!["end tag </p> has no matching start tag"]);
        assert_eq!(messages("<ul><li>a</li>"), vec!["tag <ul> is never closed"]);
    }

    #[test]
    fn test_end_tags_in_comments_and_scripts_are_ignored() {
        let src = "<!-- </div> -->\n<script>var s = '</p>';</script>\n<div></div>\n";
        assert!(rules(&MarkupLint::fragment(), src).is_empty());
    }

    #[test]
    fn test_attribute_rules() {
        let lint = MarkupLint::fragment();
        assert_eq!(rules(&lint, "<DIV></DIV>"), vec!["tagname-lowercase"]);
        assert_eq!(rules(&lint, "<a HREF=\"x\"></a>"), vec!["attr-lowercase"]);
        assert_eq!(rules(&lint, "<a href='x'></a>"), vec!["attr-value-double-quotes"]);
        assert_eq!(
            rules(&lint, "<a class=\"a\" class=\"b\"></a>"),
            vec!["attr-no-duplication"]
        );
        assert_eq!(rules(&lint, "<img src=\"\">"), vec!["src-not-empty"]);
    }

    #[test]
    fn test_id_unique() {
        let lint = MarkupLint::fragment();
        let diags = lint.check(&VirtualFile::new(
            "x.html",
            "<div id=\"a\"></div>\n<p id=\"a\"></p>",
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "id-unique");
        assert_eq!(diags[0].line, 2);
        assert_eq!(diags[0].message, "id \"a\" already used on line 1");
    }

    #[test]
    fn test_first_content_skips_comments() {
        assert_eq!(first_content("  <!-- a -->\n<p>"), Some(13));
        assert_eq!(first_content("<!-- open"), None);
        assert_eq!(first_content("  \n"), None);
    }
}
