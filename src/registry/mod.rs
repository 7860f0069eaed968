//! Path registry: source globs and output destinations.
//!
//! Every pipe asks the registry where its inputs come from and where its
//! outputs go. Globs are evaluated fresh on each call, nothing is cached
//! between invocations.

mod glob;

pub use glob::{GlobMatch, GlobSet, glob_base};

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::ProjectConfig;
use crate::core::Env;

/// Source categories known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scripts,
    Styles,
    Images,
    Fonts,
    Index,
    Partials,
    ServerScripts,
    TestScripts,
}

impl Category {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::Index => "index",
            Self::Partials => "partials",
            Self::ServerScripts => "server_scripts",
            Self::TestScripts => "test_scripts",
        }
    }
}

/// Output locations, one per kind of produced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    AppScripts,
    VendorScripts,
    Styles,
    VendorStyles,
    /// Raw partial copies (dev only).
    Partials,
    /// Template-cache modules.
    Templates,
    Fonts,
    VendorFonts,
    Images,
    VendorImages,
    Index,
}

/// Read-only view of the configured paths, resolved against the project root.
#[derive(Clone, Copy)]
pub struct PathRegistry<'a> {
    config: &'a ProjectConfig,
}

impl<'a> PathRegistry<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &'a Path {
        self.config.get_root()
    }

    /// Glob list for a category.
    ///
    /// The partials list always excludes the index document.
    pub fn globs(&self, category: Category) -> Vec<String> {
        let paths = &self.config.paths;
        match category {
            Category::Scripts => paths.scripts.clone(),
            Category::Styles => paths.styles.clone(),
            Category::Images => paths.images.clone(),
            Category::Fonts => paths.fonts.clone(),
            Category::Index => vec![paths.index.clone()],
            Category::Partials => {
                let mut globs = paths.partials.clone();
                let index = paths.index.trim_start_matches("./");
                let excluded = globs
                    .iter()
                    .any(|g| g.strip_prefix('!').map(|g| g.trim_start_matches("./")) == Some(index));
                if !excluded {
                    globs.push(format!("!{index}"));
                }
                globs
            }
            Category::ServerScripts => paths.server_scripts.clone(),
            Category::TestScripts => paths.test_scripts.clone(),
        }
    }

    /// Compiled glob set for a category.
    pub fn glob_set(&self, category: Category) -> Result<GlobSet> {
        GlobSet::new(self.root(), &self.globs(category))
    }

    /// Evaluate a category against the filesystem.
    pub fn sources(&self, category: Category) -> Result<Vec<GlobMatch>> {
        Ok(self.glob_set(category)?.walk())
    }

    /// Absolute path of the index source document.
    pub fn index_source(&self) -> PathBuf {
        self.root().join(self.config.paths.index.trim_start_matches("./"))
    }

    /// Absolute output root of an environment.
    pub fn env_root(&self, env: Env) -> PathBuf {
        let paths = &self.config.paths;
        let root = match env {
            Env::Dev => &paths.dist_dev,
            Env::Test => &paths.dist_test,
            Env::Prod => &paths.dist_prod,
        };
        self.root().join(root)
    }

    /// Bundle directory: the root in dev, `<root>/scripts` otherwise.
    pub fn scripts_dir(&self, env: Env) -> PathBuf {
        let root = self.env_root(env);
        match env {
            Env::Dev => root,
            Env::Test | Env::Prod => root.join(&self.config.paths.scripts_dir),
        }
    }

    pub fn styles_dir(&self, env: Env) -> PathBuf {
        self.env_root(env).join("styles")
    }

    /// Absolute destination directory of `dest` in `env`.
    pub fn dest(&self, dest: Destination, env: Env) -> PathBuf {
        let root = self.env_root(env);
        match dest {
            Destination::AppScripts => self.scripts_dir(env),
            Destination::VendorScripts => match env {
                Env::Dev => root.join("bower_components"),
                Env::Test | Env::Prod => self.scripts_dir(env),
            },
            Destination::Styles | Destination::Partials | Destination::Index => root,
            Destination::VendorStyles | Destination::VendorFonts | Destination::VendorImages => {
                self.styles_dir(env)
            }
            Destination::Templates => match env {
                Env::Dev => root.join("templates"),
                Env::Test | Env::Prod => self.scripts_dir(env),
            },
            Destination::Fonts => root.join("fonts"),
            Destination::Images => root.join("images"),
        }
    }

    /// Destination of a vendor image matched by a special routing rule.
    pub fn special_image_dest(&self, env: Env, suffix: &str) -> PathBuf {
        self.styles_dir(env).join(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProjectConfig {
        ProjectConfig::with_root(Path::new("/project"))
    }

    #[test]
    fn test_partials_exclude_index() {
        let mut config = config();
        config.paths.partials = vec!["app/**/*.html".into()];
        let registry = PathRegistry::new(&config);
        assert_eq!(
            registry.globs(Category::Partials),
            vec!["app/**/*.html".to_string(), "!app/index.html".to_string()]
        );
    }

    #[test]
    fn test_partials_negation_not_duplicated() {
        let config = config();
        let registry = PathRegistry::new(&config);
        let globs = registry.globs(Category::Partials);
        assert_eq!(globs.iter().filter(|g| g.starts_with('!')).count(), 1);
    }

    #[test]
    fn test_destinations() {
        let config = config();
        let registry = PathRegistry::new(&config);
        let dev = PathBuf::from("/project/dist.dev");
        let prod = PathBuf::from("/project/dist.prod");

        assert_eq!(registry.dest(Destination::AppScripts, Env::Dev), dev);
        assert_eq!(
            registry.dest(Destination::VendorScripts, Env::Dev),
            dev.join("bower_components")
        );
        assert_eq!(registry.dest(Destination::Templates, Env::Dev), dev.join("templates"));
        assert_eq!(registry.dest(Destination::AppScripts, Env::Prod), prod.join("scripts"));
        assert_eq!(registry.dest(Destination::Templates, Env::Prod), prod.join("scripts"));
        assert_eq!(registry.dest(Destination::VendorFonts, Env::Test), PathBuf::from("/project/dist.test/styles"));
        assert_eq!(registry.dest(Destination::Images, Env::Prod), prod.join("images"));
        assert_eq!(registry.special_image_dest(Env::Prod, "images/ui"), prod.join("styles/images/ui"));
    }
}
