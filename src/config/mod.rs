//! Project configuration management for `gantry.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # Config file lookup, serde helpers
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                         |
//! |----------------|-------------------------------------------------|
//! | `[paths]`      | Source globs and output roots                   |
//! | `[vendor]`     | Dependency manifest, ordering, special images   |
//! | `[lint]`       | Extra globals known to the script linter        |
//! | `[styles]`     | External stylesheet compilers                   |
//! | `[templates]`  | Template cache module                           |
//! | `[serve]`      | Live reload port                                |
//! | `[server]`     | Backing application server                      |
//! | `[test]`       | Test runner                                     |
//! | `[doc]`        | API documentation generator                     |
//! | `[mock]`       | Mock API server                                 |
//!
//! A missing config file is not an error: every section has defaults
//! matching the conventional project layout, rooted at the working directory.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    DocConfig, LintConfig, MockConfig, PathsConfig, ServeConfig, ServerConfig, SpecialImageRule,
    StylesConfig, TemplatesConfig, TestConfig, VendorConfig,
};

use crate::{cli::Cli, debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing gantry.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub paths: PathsConfig,
    pub vendor: VendorConfig,
    pub lint: LintConfig,
    pub styles: StylesConfig,
    pub templates: TemplatesConfig,
    pub serve: ServeConfig,
    pub server: ServerConfig,
    pub test: TestConfig,
    pub doc: DocConfig,
    pub mock: MockConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self::with_root(&cwd)
            }
        };

        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration rooted at `root`.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };
        config.finalize();
        config
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Resolve relative settings against the project root.
    fn finalize(&mut self) {
        if self.vendor.directory.is_none() {
            self.vendor.directory = Some(self.bowerrc_directory().unwrap_or_else(|| "bower_components".into()));
        }
    }

    /// `directory` from a `.bowerrc` next to the manifest, if any.
    fn bowerrc_directory(&self) -> Option<PathBuf> {
        let content = fs::read_to_string(self.root.join(".bowerrc")).ok()?;
        let json: serde_json::Value = serde_json::from_str(&content).ok()?;
        json.get("directory")?.as_str().map(PathBuf::from)
    }

    /// Validate all sections, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.paths.validate(&mut diag);
        self.vendor.validate(&mut diag);
        self.styles.validate(&mut diag);
        self.templates.validate(&mut diag);
        self.server.validate(&mut diag);
        self.mock.validate(&mut diag);
        diag.into_result()
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Installed vendor components directory (absolute).
    pub fn vendor_dir(&self) -> PathBuf {
        let dir = self
            .vendor
            .directory
            .clone()
            .unwrap_or_else(|| "bower_components".into());
        self.root_join(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ProjectConfig::from_str("").unwrap();
        assert_eq!(config.paths.index, "app/index.html");
        assert_eq!(config.templates.module, "healthyGulpAngularAppComponents");
        assert_eq!(config.mock.port, 8081);
    }

    #[test]
    fn test_section_override() {
        let config = ProjectConfig::from_str(
            r#"
            [paths]
            scripts = "src/**/*.js"
            dist_prod = "build"

            [templates]
            module = "appTemplates"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.scripts, vec!["src/**/*.js"]);
        assert_eq!(config.paths.dist_prod, PathBuf::from("build"));
        assert_eq!(config.paths.dist_dev, PathBuf::from("dist.dev"));
        assert_eq!(config.templates.module, "appTemplates");
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) = ProjectConfig::parse_with_ignored(
            r#"
            [paths]
            scriptz = "app/**/*.js"
            "#,
        )
        .unwrap();
        assert_eq!(ignored, vec!["paths.scriptz"]);
    }

    #[test]
    fn test_bowerrc_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".bowerrc"), r#"{ "directory": "vendor/lib" }"#).unwrap();

        let config = ProjectConfig::with_root(temp.path());
        assert_eq!(config.vendor_dir(), temp.path().join("vendor/lib"));
    }

    #[test]
    fn test_default_vendor_dir() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::with_root(temp.path());
        assert_eq!(config.vendor_dir(), temp.path().join("bower_components"));
        assert!(config.validate().is_ok());
    }
}
