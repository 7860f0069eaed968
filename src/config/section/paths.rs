//! `[paths]` section configuration.
//!
//! Source globs (relative to the project root) and output roots.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! scripts = "app/**/*.js"
//! styles = ["app/**/*.css", "app/**/*.scss"]
//! partials = ["app/**/*.html", "!app/index.html"]
//! index = "app/index.html"
//! dist_prod = "dist.prod"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;
use crate::config::util::one_or_many;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub scripts: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub styles: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub fonts: Vec<String>,
    /// The HTML shell.
    pub index: String,
    #[serde(deserialize_with = "one_or_many")]
    pub partials: Vec<String>,
    /// Sources of the backing application server.
    #[serde(deserialize_with = "one_or_many")]
    pub server_scripts: Vec<String>,
    /// Unit test sources run by the test runner.
    #[serde(deserialize_with = "one_or_many")]
    pub test_scripts: Vec<String>,

    pub dist_dev: PathBuf,
    pub dist_test: PathBuf,
    pub dist_prod: PathBuf,
    /// Bundle directory under the test/prod roots.
    pub scripts_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts: vec!["app/**/*.js".into()],
            styles: vec!["app/**/*.css".into(), "app/**/*.scss".into()],
            images: vec!["app/images/**/*".into()],
            fonts: vec!["app/fonts/**/*".into()],
            index: "app/index.html".into(),
            partials: vec!["app/**/*.html".into(), "!app/index.html".into()],
            server_scripts: vec!["devServer/**/*.js".into()],
            test_scripts: vec!["app-test/**/*.js".into()],
            dist_dev: "dist.dev".into(),
            dist_test: "dist.test".into(),
            dist_prod: "dist.prod".into(),
            scripts_dir: "scripts".into(),
        }
    }
}

impl PathsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let required = [
            ("paths.scripts", &self.scripts),
            ("paths.styles", &self.styles),
            ("paths.partials", &self.partials),
        ];
        for (field, globs) in required {
            if !globs.iter().any(|g| !g.starts_with('!')) {
                diag.error_with_hint(
                    field,
                    "at least one positive glob is required",
                    "globs are relative to the project root, e.g. \"app/**/*.js\"",
                );
            }
        }

        if self.index.trim().is_empty() || self.index.contains('*') {
            diag.error("paths.index", "must name a single HTML file");
        }

        let roots = [
            ("paths.dist_dev", &self.dist_dev),
            ("paths.dist_test", &self.dist_test),
            ("paths.dist_prod", &self.dist_prod),
        ];
        for (field, root) in roots {
            if root.as_os_str().is_empty() || root == &PathBuf::from(".") {
                diag.error(field, "output root must be a dedicated directory");
            }
        }
    }
}
