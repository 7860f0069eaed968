//! `[vendor]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [vendor]
//! manifest = "bower.json"
//! order = ["jquery.js", "angular.js", "angular-*.js"]
//!
//! [[vendor.special_images]]
//! pattern = "leaflet/dist/images/.+\\.png$"
//! target = "images"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Root dependency manifest (relative to the project root).
    pub manifest: PathBuf,

    /// Installed components directory. Falls back to `.bowerrc`, then
    /// `bower_components`.
    pub directory: Option<PathBuf>,

    /// Precedence list for vendor scripts; `*` matches any run of characters.
    pub order: Vec<String>,

    /// Images that need a dedicated destination under the styles directory.
    pub special_images: Vec<SpecialImageRule>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            manifest: "bower.json".into(),
            directory: None,
            order: [
                // non-angular dependencies
                "moment.js",
                "de.js",
                "jquery.js",
                "Chart.js",
                "daterangepicker.js",
                // angular
                "angular.js",
                "angular-*.js",
                "ui-bootstrap*.js",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            special_images: Vec::new(),
        }
    }
}

/// Route vendor images matching `pattern` (regex, case-insensitive) to
/// `<styles>/<target>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialImageRule {
    pub pattern: String,
    pub target: String,
}

impl VendorConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (i, rule) in self.special_images.iter().enumerate() {
            if let Err(e) = Regex::new(&rule.pattern) {
                diag.error(
                    format!("vendor.special_images[{i}].pattern"),
                    format!("invalid pattern: {e}"),
                );
            }
        }
    }
}
