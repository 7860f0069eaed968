//! Ordering lists: explicit precedence by file name.

use anyhow::{Context, Result};
use regex::Regex;

use crate::pipeline::{FileSet, Pipe};

/// Ordered filename patterns where `*` matches any run of characters.
///
/// Files matching a pattern come first, grouped by the first pattern they
/// match, in pattern order. Unmatched files follow. Input order is kept
/// within every group.
pub struct OrderingList {
    patterns: Vec<Regex>,
}

impl OrderingList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                let escaped: Vec<_> = p.split('*').map(regex::escape).collect();
                Regex::new(&format!("^{}$", escaped.join(".*")))
                    .with_context(|| format!("invalid ordering pattern `{p}`"))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// Index of the first pattern matching `name`.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.patterns.iter().position(|re| re.is_match(name))
    }
}

impl Pipe for OrderingList {
    fn name(&self) -> &str {
        "order"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let mut files = files.into_vec();
        // stable: ties keep input order
        files.sort_by_key(|f| self.rank(&f.file_name()).unwrap_or(usize::MAX));
        Ok(files.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VendorConfig;
    use crate::pipeline::VirtualFile;

    fn names(files: &FileSet) -> Vec<String> {
        files.iter().map(|f| f.file_name().into_owned()).collect()
    }

    #[test]
    fn test_default_vendor_order() {
        let order = OrderingList::new(&VendorConfig::default().order).unwrap();
        let files: FileSet = [
            "lodash.js",
            "angular-route.js",
            "ui-bootstrap-tpls.js",
            "angular.js",
            "jquery.js",
            "angular-animate.js",
            "moment.js",
            "alpha.js",
        ]
        .into_iter()
        .map(|n| VirtualFile::new(n, ""))
        .collect();

        let ordered = order.run(files).unwrap();
        assert_eq!(
            names(&ordered),
            vec![
                "moment.js",
                "jquery.js",
                "angular.js",
                "angular-route.js",
                "angular-animate.js",
                "ui-bootstrap-tpls.js",
                "lodash.js",
                "alpha.js",
            ]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let order = OrderingList::new(&["angular*.js", "angular.js"]).unwrap();
        assert_eq!(order.rank("angular.js"), Some(0));
        assert_eq!(order.rank("jquery.js"), None);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let order = OrderingList::new(&["de.js"]).unwrap();
        assert_eq!(order.rank("de.js"), Some(0));
        assert_eq!(order.rank("node.js"), None);
    }
}
