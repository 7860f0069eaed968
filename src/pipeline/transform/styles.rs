//! Stylesheet compilation through external compilers.
//!
//! `.css` passes through. `.scss`/`.sass` and `.less` are handed to the
//! configured commands, which must print CSS on stdout. Sass partials
//! (`_name.scss`) only exist to be imported and are dropped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::pipeline::{FileSet, Pipe, VirtualFile};
use crate::utils::exec::{Cmd, STYLE_FILTER, resolve_args};

pub struct CompileStyles {
    root: PathBuf,
    sass: Vec<String>,
    less: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Css,
    Sass,
    Less,
}

fn syntax_of(file: &VirtualFile) -> Option<Syntax> {
    match file.extension().as_str() {
        "css" => Some(Syntax::Css),
        "scss" | "sass" => Some(Syntax::Sass),
        "less" => Some(Syntax::Less),
        _ => None,
    }
}

impl CompileStyles {
    pub fn new(root: &Path, sass: &[String], less: &[String]) -> Self {
        Self {
            root: root.to_path_buf(),
            sass: sass.to_vec(),
            less: less.to_vec(),
        }
    }

    fn compile(&self, mut file: VirtualFile) -> Result<Option<VirtualFile>> {
        let command = match syntax_of(&file) {
            Some(Syntax::Css) | None => return Ok(Some(file)),
            Some(Syntax::Sass) if file.file_name().starts_with('_') => return Ok(None),
            Some(Syntax::Sass) => &self.sass,
            Some(Syntax::Less) => &self.less,
        };

        let Some(source) = file.source.clone() else {
            bail!("{}: only files on disk can be compiled", file.path.display());
        };

        let vars = style_vars(&self.root, &source);
        let args = resolve_args(command, &vars);
        let output = Cmd::from_slice(&args)
            .cwd(&self.root)
            .envs(&vars)
            .filter(&STYLE_FILTER)
            .run()
            .with_context(|| format!("failed to compile {}", source.display()))?;

        file.contents = output.stdout;
        file.path.set_extension("css");
        Ok(Some(file))
    }
}

/// `$GANTRY_*` variables for one stylesheet.
fn style_vars(root: &Path, source: &Path) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    vars.insert("GANTRY_ROOT".into(), root.display().to_string());
    vars.insert("GANTRY_FILE".into(), source.display().to_string());
    if let Some(dir) = source.parent() {
        vars.insert("GANTRY_FILE_DIR".into(), dir.display().to_string());
    }
    vars
}

impl Pipe for CompileStyles {
    fn name(&self) -> &str {
        "compile-styles"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let compiled: Vec<Option<VirtualFile>> = files
            .into_vec()
            .into_par_iter()
            .map(|file| self.compile(file))
            .collect::<Result<_>>()?;
        Ok(compiled.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn compiler() -> CompileStyles {
        CompileStyles::new(
            Path::new("/project"),
            &["gantry-no-such-sass".into(), "$GANTRY_FILE".into()],
            &["gantry-no-such-lessc".into(), "$GANTRY_FILE".into()],
        )
    }

    #[test]
    fn test_css_passes_through_and_partials_dropped() {
        let files: FileSet = vec![
            VirtualFile::new("main.css", "a{}"),
            VirtualFile::new("_vars.scss", "$x: 1;"),
        ]
        .into();
        let out = compiler().run(files).unwrap();
        assert_eq!(out.paths(), vec![Path::new("main.css")]);
    }

    #[test]
    fn test_missing_compiler_is_reported() {
        let mut file = VirtualFile::new("theme.less", "@a: 1;");
        file.source = Some("/project/app/theme.less".into());
        let err = compiler().run(vec![file].into()).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn test_style_vars() {
        let vars = style_vars(Path::new("/p"), Path::new("/p/app/main.scss"));
        assert_eq!(vars["GANTRY_FILE"], "/p/app/main.scss");
        assert_eq!(vars["GANTRY_FILE_DIR"], "/p/app");
    }
}
