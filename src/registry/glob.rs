//! Glob sets with negation.
//!
//! Each positive glob is walked from its non-magic base directory, and
//! files keep their path relative to that base as virtual path.
//! Negations (`!pattern`) apply to every positive glob and always win,
//! regardless of where they appear in the list.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use ignore::Match;
use ignore::overrides::{Override, OverrideBuilder};
use jwalk::WalkDir;
use rustc_hash::FxHashSet;

/// A matched file: absolute path plus path relative to its glob base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobMatch {
    pub path: PathBuf,
    pub relative: PathBuf,
}

struct Entry {
    base: PathBuf,
    matcher: Override,
}

/// Compiled glob list, rooted at the project root.
pub struct GlobSet {
    root: PathBuf,
    entries: Vec<Entry>,
}

impl GlobSet {
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self> {
        let (negations, positives): (Vec<String>, Vec<String>) = patterns
            .iter()
            .map(|p| clean_pattern(p.as_ref()))
            .partition(|p| p.starts_with('!'));

        let mut entries = Vec::with_capacity(positives.len());
        for pattern in positives {
            let mut builder = OverrideBuilder::new(root);
            builder
                .add(&pattern)
                .with_context(|| format!("invalid glob `{pattern}`"))?;
            for negation in &negations {
                builder
                    .add(negation)
                    .with_context(|| format!("invalid glob `{negation}`"))?;
            }
            let matcher = builder
                .build()
                .with_context(|| format!("invalid glob `{pattern}`"))?;
            entries.push(Entry {
                base: root.join(glob_base(&pattern)),
                matcher,
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Whether `path` (absolute or root-relative) is selected by the set.
    pub fn matches(&self, path: &Path) -> bool {
        self.entry_for(path).is_some()
    }

    /// Path relative to the base of the first glob selecting `path`.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        let entry = self.entry_for(path)?;
        let absolute = self.absolute(path);
        let base = if entry.base == absolute {
            absolute.parent()?
        } else {
            &entry.base
        };
        absolute.strip_prefix(base).ok().map(Path::to_path_buf)
    }

    /// Base directories of the positive globs (watch roots).
    pub fn bases(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.base.as_path())
    }

    /// Evaluate the globs against the filesystem.
    ///
    /// Results are sorted by relative path; a file selected by more than
    /// one glob is reported once, for the first glob.
    pub fn walk(&self) -> Vec<GlobMatch> {
        let mut seen = FxHashSet::default();
        let mut matches = Vec::new();

        for entry in &self.entries {
            if !entry.base.exists() {
                continue;
            }
            if entry.base.is_file() {
                self.push_match(entry, &entry.base, &mut seen, &mut matches);
                continue;
            }
            for dir_entry in WalkDir::new(&entry.base).sort(true).into_iter().flatten() {
                if !dir_entry.file_type().is_file() {
                    continue;
                }
                self.push_match(entry, &dir_entry.path(), &mut seen, &mut matches);
            }
        }

        matches.sort_by(|a, b| a.relative.cmp(&b.relative));
        matches
    }

    fn push_match(
        &self,
        entry: &Entry,
        path: &Path,
        seen: &mut FxHashSet<PathBuf>,
        out: &mut Vec<GlobMatch>,
    ) {
        let Ok(rel_root) = path.strip_prefix(&self.root) else {
            return;
        };
        if !matches!(entry.matcher.matched(rel_root, false), Match::Whitelist(_)) {
            return;
        }
        if !seen.insert(path.to_path_buf()) {
            return;
        }
        // A literal glob names a file; its base is the parent directory.
        let base = if entry.base == path {
            path.parent().unwrap_or(&self.root)
        } else {
            &entry.base
        };
        let relative = path.strip_prefix(base).unwrap_or(path).to_path_buf();
        out.push(GlobMatch {
            path: path.to_path_buf(),
            relative,
        });
    }

    fn entry_for(&self, path: &Path) -> Option<&Entry> {
        let absolute = self.absolute(path);
        let rel_root = absolute.strip_prefix(&self.root).ok()?;
        self.entries
            .iter()
            .find(|e| matches!(e.matcher.matched(rel_root, false), Match::Whitelist(_)))
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Strip whitespace and a leading `./`, keeping any negation marker.
fn clean_pattern(pattern: &str) -> String {
    let pattern = pattern.trim();
    match pattern.strip_prefix('!') {
        Some(rest) => format!("!{}", rest.strip_prefix("./").unwrap_or(rest)),
        None => pattern.strip_prefix("./").unwrap_or(pattern).to_string(),
    }
}

/// Non-magic directory prefix of a glob (`app/**/*.js` → `app`).
///
/// For a literal path the whole path is returned; `walk` treats a base
/// that is a file specially.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let part = part.to_string_lossy();
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part.as_ref());
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("app/**/*.js"), PathBuf::from("app"));
        assert_eq!(glob_base("./app/images/**/*"), PathBuf::from("app/images"));
        assert_eq!(glob_base("app/index.html"), PathBuf::from("app/index.html"));
        assert_eq!(glob_base("*.js"), PathBuf::new());
    }

    #[test]
    fn test_walk_with_negation() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "app/index.html");
        touch(root, "app/components/home.html");
        touch(root, "app/nav.html");
        touch(root, "app/app.js");

        let set = GlobSet::new(root, &["app/**/*.html", "!app/index.html"]).unwrap();
        let rels: Vec<_> = set.walk().into_iter().map(|m| m.relative).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("components/home.html"), PathBuf::from("nav.html")]
        );
    }

    #[test]
    fn test_negation_wins_regardless_of_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "app/index.html");
        touch(root, "app/nav.html");

        let set = GlobSet::new(root, &["!app/index.html", "app/**/*.html"]).unwrap();
        assert!(!set.matches(Path::new("app/index.html")));
        assert!(set.matches(&root.join("app/nav.html")));
    }

    #[test]
    fn test_literal_glob() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "app/index.html");

        let set = GlobSet::new(root, &["./app/index.html"]).unwrap();
        let matches = set.walk();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].relative, PathBuf::from("index.html"));
    }

    #[test]
    fn test_multiple_globs_dedup() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "app/main.css");
        touch(root, "app/theme.scss");

        let set = GlobSet::new(root, &["app/**/*.css", "app/**/*.scss", "app/**/*"]).unwrap();
        let matches = set.walk();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_relative_for_changed_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let set = GlobSet::new(root, &["app/**/*.js"]).unwrap();
        assert_eq!(
            set.relative(&root.join("app/components/nav.js")),
            Some(PathBuf::from("components/nav.js"))
        );
        assert_eq!(set.relative(&root.join("lib/x.js")), None);
    }
}
