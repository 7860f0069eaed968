//! Template cache modules: partials turned into scripts that prime the
//! client-side template cache.

use anyhow::Result;

use crate::pipeline::{FileSet, Pipe};
use crate::utils::path::to_slash;

/// Wraps each partial in a module-run block registering it under its
/// virtual path (plus `prefix`). The module is created if it does not
/// exist yet. `nav.html` becomes `nav.js`.
pub struct TemplateCache {
    module: String,
    prefix: String,
}

impl TemplateCache {
    pub fn new(module: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            prefix: prefix.into(),
        }
    }

    pub fn render(&self, key: &str, markup: &str) -> String {
        let module = escape(&self.module);
        format!(
            "(function(module) {{\n\
             try {{\n  module = angular.module('{module}');\n\
             }} catch (e) {{\n  module = angular.module('{module}', []);\n}}\n\
             module.run(['$templateCache', function($templateCache) {{\n  \
             $templateCache.put('{}',\n    '{}');\n\
             }}]);\n\
             }})();\n",
            escape(key),
            escape(markup)
        )
    }
}

impl Pipe for TemplateCache {
    fn name(&self) -> &str {
        "template-cache"
    }

    fn run(&self, mut files: FileSet) -> Result<FileSet> {
        for file in files.iter_mut() {
            let key = format!("{}{}", self.prefix, to_slash(&file.path));
            let script = self.render(&key, &file.text());
            file.set_text(script);
            file.path.set_extension("js");
        }
        Ok(files)
    }
}

/// Escape for a single-quoted JS string; newlines continue the literal.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace("\r\n", "\n")
        .replace('\n', "\\n' +\n    '")
}
