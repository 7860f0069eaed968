//! Configuration utility functions.

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`.
/// Returns the absolute path to the config file if found.
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Same as [`find_config_file`], starting at `start`.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Accept either `"glob"` or `["glob", ...]`.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("app/components");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("gantry.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("gantry.toml")).unwrap();
        assert_eq!(found, temp.path().join("gantry.toml"));
    }

    #[test]
    fn test_find_config_missing() {
        let temp = TempDir::new().unwrap();
        assert!(find_config_file_from(temp.path(), Path::new("does-not-exist.toml")).is_none());
    }

    #[test]
    fn test_one_or_many() {
        #[derive(Deserialize)]
        struct Sample {
            #[serde(deserialize_with = "one_or_many")]
            globs: Vec<String>,
        }

        let one: Sample = toml::from_str(r#"globs = "app/**/*.js""#).unwrap();
        assert_eq!(one.globs, vec!["app/**/*.js"]);

        let many: Sample = toml::from_str(r#"globs = ["a/*.css", "a/*.scss"]"#).unwrap();
        assert_eq!(many.globs.len(), 2);
    }
}
