//! External tool sections: `[lint]`, `[styles]`, `[templates]`, `[test]`, `[doc]`.
//!
//! Commands are argument arrays. `$GANTRY_*` variables are substituted
//! before execution (see `utils::exec::resolve_args`).
//!
//! # Example
//!
//! ```toml
//! [lint]
//! globals = ["angular", "moment"]
//!
//! [styles]
//! sass = ["sass", "--no-source-map", "$GANTRY_FILE"]
//! less = ["lessc", "$GANTRY_FILE"]
//!
//! [templates]
//! module = "myAppTemplates"
//!
//! [test]
//! command = ["karma", "start", "karma.conf.js"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Script lint settings.
///
/// Standard browser globals are always known; these lists add to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Extra globals for app scripts.
    pub globals: Vec<String>,
    /// Extra globals for test scripts.
    pub test_globals: Vec<String>,
    /// Extra globals for backing server scripts (node globals are implied).
    pub server_globals: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            globals: vec!["angular".into()],
            test_globals: [
                "describe",
                "xdescribe",
                "it",
                "xit",
                "expect",
                "beforeEach",
                "afterEach",
                "spyOn",
                "jasmine",
                "module",
                "inject",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            server_globals: Vec::new(),
        }
    }
}

/// Stylesheet compilers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Command compiling one `.scss`/`.sass` file to CSS on stdout.
    pub sass: Vec<String>,
    /// Command compiling one `.less` file to CSS on stdout.
    pub less: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            sass: vec!["sass".into(), "--no-source-map".into(), "$GANTRY_FILE".into()],
            less: vec!["lessc".into(), "$GANTRY_FILE".into()],
        }
    }
}

/// Template cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Module the generated cache entries register with.
    pub module: String,
    /// Prefix prepended to each cache key.
    pub prefix: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            module: "healthyGulpAngularAppComponents".into(),
            prefix: String::new(),
        }
    }
}

/// Test runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub command: Vec<String>,
    /// Appended for `test` (run once and exit).
    pub single_run_args: Vec<String>,
    /// Appended for `tdd` (keep running).
    pub continuous_args: Vec<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: vec!["karma".into(), "start".into(), "karma.conf.js".into()],
            single_run_args: vec!["--single-run".into()],
            continuous_args: vec!["--no-single-run".into(), "--auto-watch".into()],
        }
    }
}

/// API documentation generator; app script paths are appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    pub command: Vec<String>,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            command: vec!["jsdoc".into(), "-d".into(), "docs/jsdoc".into()],
        }
    }
}

impl StylesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.sass.is_empty() {
            diag.error("styles.sass", "command must not be empty");
        }
        if self.less.is_empty() {
            diag.error("styles.less", "command must not be empty");
        }
    }
}

impl TemplatesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let valid = !self.module.is_empty()
            && self
                .module
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
        if !valid {
            diag.error(
                "templates.module",
                format!("`{}` is not a valid module name", self.module),
            );
        }
    }
}
