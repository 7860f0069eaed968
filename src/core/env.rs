//! Target environments.

use std::fmt;

/// One of the three deployable output trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Env {
    Dev,
    Test,
    Prod,
}

impl Env {
    pub const ALL: [Self; 3] = [Self::Dev, Self::Test, Self::Prod];

    /// Short name used in task names (`build-app-dev`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    /// Bundles are concatenated outside of dev.
    pub const fn concatenates(self) -> bool {
        !matches!(self, Self::Dev)
    }

    /// Stylesheets and templates are minified outside of dev.
    pub const fn minifies_styles(self) -> bool {
        !matches!(self, Self::Dev)
    }

    /// Scripts (and the index document) are only minified in prod.
    pub const fn minifies_scripts(self) -> bool {
        matches!(self, Self::Prod)
    }

    /// Value passed to the backing server's mode variable.
    pub const fn server_mode(self) -> &'static str {
        match self {
            Self::Prod => "production",
            Self::Dev | Self::Test => "development",
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flags() {
        assert!(!Env::Dev.concatenates());
        assert!(Env::Test.concatenates());
        assert!(Env::Test.minifies_styles());
        assert!(!Env::Test.minifies_scripts());
        assert!(Env::Prod.minifies_scripts());
    }

    #[test]
    fn test_server_mode() {
        assert_eq!(Env::Dev.server_mode(), "development");
        assert_eq!(Env::Prod.server_mode(), "production");
    }
}
