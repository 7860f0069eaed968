//! Assembler tests over a scratch project (plain CSS and JS only, no
//! external compilers).

use super::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
  <!-- inject:css -->
  <!-- endinject -->
  <!-- bower:css -->
  <!-- endinject -->
</head>
<body ng-app="app">
  <div ng-view></div>
  <!-- bower:js -->
  <!-- endinject -->
  <!-- templates:js -->
  <!-- endinject -->
  <!-- inject:js -->
  <!-- endinject -->
</body>
</html>
"#;

struct Project {
    temp: TempDir,
    config: ProjectConfig,
    table: PipeTable,
}

impl Project {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let write = |rel: &str, content: &str| {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };

        write("app/index.html", INDEX);
        write("app/app.js", "angular.module('app', ['app.nav']);\n");
        write(
            "app/components/nav.js",
            "angular.module('app.nav', []).controller('NavCtrl', function ($scope) {\n  $scope.open = false;\n});\n",
        );
        write("app/components/nav.html", "<nav class=\"top\">\n  <a href=\"#/\">Home</a>\n</nav>\n");
        write("app/styles/main.css", "body {\n  margin: 0;\n}\n");
        write("bower.json", r#"{"dependencies": {"bootstrap": "*", "jquery": "*"}}"#);
        write("bower_components/jquery/.bower.json", r#"{"main": "dist/jquery.js"}"#);
        write("bower_components/jquery/dist/jquery.js", "/* jquery */\nwindow.jQuery = {};\n");
        write(
            "bower_components/bootstrap/.bower.json",
            r#"{"main": ["dist/css/bootstrap.css", "dist/css/theme.css"], "dependencies": {"jquery": "*"}}"#,
        );
        write("bower_components/bootstrap/dist/css/bootstrap.css", ".btn { color: red; }\n");
        write("bower_components/bootstrap/dist/css/theme.css", ".btn { border: 0; }\n");

        let config = ProjectConfig::with_root(root);
        Self {
            temp,
            config,
            table: PipeTable::new(),
        }
    }

    fn ctx(&self) -> BuildContext<'_> {
        BuildContext::new(&self.config, &self.table)
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn dist(&self, env: Env) -> PathBuf {
        self.ctx().registry.env_root(env)
    }

    /// Sorted relative paths of every file under an environment root.
    fn tree(&self, env: Env) -> Vec<String> {
        let root = self.dist(env);
        let mut files: Vec<String> = jwalk::WalkDir::new(&root)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}

#[test]
fn test_table_covers_every_pipe() {
    let table = PipeTable::new();
    for id in PipeId::ALL {
        assert!(table.get(id).is_some(), "{} missing", id.name());
    }
}

#[test]
fn test_index_chain_construction_builds_nothing() {
    let project = Project::new();
    let chain = project.ctx().chain(PipeId::Index, Env::Dev).unwrap();
    assert!(!project.dist(Env::Dev).exists());
    assert!(chain.stages().contains(&"inject-built"));

    chain.build().unwrap();
    let tree = project.tree(Env::Dev);
    assert!(tree.contains(&"index.html".to_string()), "{tree:?}");
    assert!(tree.contains(&"app.js".to_string()), "{tree:?}");
}

#[test]
fn test_dev_index_injection_order() {
    let project = Project::new();
    project.ctx().assemble(Env::Dev).unwrap();

    let index = fs::read_to_string(project.dist(Env::Dev).join("index.html")).unwrap();
    let pos = |needle: &str| {
        index
            .find(needle)
            .unwrap_or_else(|| panic!("`{needle}` not injected:\n{index}"))
    };

    let vendor = pos("<script src=\"bower_components/jquery.js\"></script>");
    let templates = pos("<script src=\"templates/components/nav.js\"></script>");
    let app = pos("<script src=\"app.js\"></script>");
    let nav = pos("<script src=\"components/nav.js\"></script>");
    assert!(vendor < templates && templates < app);
    // the module declaring `app.nav` comes before its user
    assert!(nav < app);

    pos("<link rel=\"stylesheet\" href=\"styles/main.css\">");
    let bootstrap = pos("<link rel=\"stylesheet\" href=\"styles/bootstrap.css\">");
    let theme = pos("<link rel=\"stylesheet\" href=\"styles/theme.css\">");
    assert!(bootstrap < theme);
}

#[test]
fn test_dev_tree() {
    let project = Project::new();
    project.ctx().assemble(Env::Dev).unwrap();

    assert_eq!(
        project.tree(Env::Dev),
        vec![
            "app.js",
            "bower_components/jquery.js",
            "components/nav.js",
            "index.html",
            "styles/bootstrap.css",
            "styles/main.css",
            "styles/theme.css",
            "templates/components/nav.js",
        ]
    );
}

#[test]
fn test_prod_is_idempotent() {
    let project = Project::new();
    let ctx = project.ctx();

    ctx.assemble(Env::Prod).unwrap();
    let first = project.tree(Env::Prod);
    let bytes: Vec<Vec<u8>> = first
        .iter()
        .map(|rel| fs::read(project.dist(Env::Prod).join(rel)).unwrap())
        .collect();

    ctx.assemble(Env::Prod).unwrap();
    assert_eq!(project.tree(Env::Prod), first);
    for (rel, before) in first.iter().zip(&bytes) {
        let after = fs::read(project.dist(Env::Prod).join(rel)).unwrap();
        assert_eq!(&after, before, "{rel} changed between builds");
    }

    for expected in [
        "index.html",
        "scripts/app.min.js",
        "scripts/app.min.js.map",
        "scripts/vendor.min.js",
        "scripts/templates.min.js",
        "styles/main.min.css",
        "styles/vendor.min.css",
    ] {
        assert!(first.iter().any(|f| f == expected), "{expected} missing from {first:?}");
    }
}

#[test]
fn test_every_env_is_stable() {
    let project = Project::new();
    let ctx = project.ctx();
    for env in Env::ALL {
        ctx.assemble(env).unwrap();
        let first = project.tree(env);
        ctx.assemble(env).unwrap();
        assert_eq!(project.tree(env), first, "{env}");
    }
}

#[test]
fn test_prod_index_references_bundles() {
    let project = Project::new();
    project.ctx().assemble(Env::Prod).unwrap();

    let index = fs::read_to_string(project.dist(Env::Prod).join("index.html")).unwrap();
    let vendor = index.find("scripts/vendor.min.js").unwrap();
    let templates = index.find("scripts/templates.min.js").unwrap();
    let app = index.find("scripts/app.min.js").unwrap();
    assert!(vendor < templates && templates < app);
    assert!(index.contains("styles/vendor.min.css"));
    assert!(!index.contains("<!--"));
}

#[test]
fn test_clean_build_drops_removed_sources() {
    let project = Project::new();
    let ctx = project.ctx();
    let extra = project.root().join("app/extra.js");
    fs::write(&extra, "var extra = 1;\n").unwrap();

    ctx.assemble(Env::Test).unwrap();
    assert!(project.tree(Env::Test).contains(&"scripts/extra.js".to_string()));

    fs::remove_file(&extra).unwrap();
    ctx.assemble(Env::Test).unwrap();
    let tree = project.tree(Env::Test);
    assert!(!tree.iter().any(|f| f.contains("extra")), "{tree:?}");
    assert!(tree.contains(&"scripts/vendor.js".to_string()));
}

#[test]
fn test_undeclared_variable_writes_nothing() {
    let project = Project::new();
    fs::write(project.root().join("app/foo.js"), "var a = 1;\n\nbar(a);\n").unwrap();

    let err = project.ctx().run(PipeId::AppScripts, Env::Dev).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("foo.js"), "{message}");
    assert!(message.contains("'bar' is not defined"), "{message}");
    assert!(!project.dist(Env::Dev).join("foo.js").exists());
    assert!(!project.dist(Env::Dev).join("app.js").exists());
}

#[test]
fn test_partial_becomes_template_module() {
    let project = Project::new();
    project.ctx().run(PipeId::ScriptedPartials, Env::Dev).unwrap();

    let modules = project.tree(Env::Dev);
    assert_eq!(modules, vec!["templates/components/nav.js"]);

    let module = fs::read_to_string(project.dist(Env::Dev).join(&modules[0])).unwrap();
    assert!(module.contains("$templateCache.put('components/nav.html'"));
    assert!(module.contains("angular.module('healthyGulpAngularAppComponents')"));
}

#[test]
fn test_prod_vendor_styles_bundle() {
    let project = Project::new();
    let out = project.ctx().run(PipeId::VendorStyles, Env::Prod).unwrap();

    assert_eq!(out.paths(), vec![Path::new("vendor.min.css")]);
    let css = fs::read_to_string(project.dist(Env::Prod).join("styles/vendor.min.css")).unwrap();
    assert!(css.contains(".btn{"));
    assert!(css.contains("border:0"));
}

#[test]
fn test_special_images_routing() {
    let mut project = Project::new();
    let write = |rel: &str| {
        let path = project.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, [0x89, b'P', b'N', b'G']).unwrap();
    };
    write("bower_components/chosen/chosen-sprite.png");
    write("bower_components/chosen/close.png");
    write("app/images/logo.png");
    fs::write(
        project.root().join("bower_components/chosen/.bower.json"),
        r#"{"main": ["chosen-sprite.png", "close.png"]}"#,
    )
    .unwrap();
    fs::write(
        project.root().join("bower.json"),
        r#"{"dependencies": {"chosen": "*"}}"#,
    )
    .unwrap();
    project.config.vendor.special_images = vec![crate::config::SpecialImageRule {
        pattern: "sprite".into(),
        target: "chosen".into(),
    }];

    project.ctx().run(PipeId::Images, Env::Dev).unwrap();
    assert_eq!(
        project.tree(Env::Dev),
        vec!["images/logo.png", "styles/chosen/chosen-sprite.png", "styles/close.png"]
    );
}

#[test]
fn test_lint_test_scripts_knows_test_globals() {
    let project = Project::new();
    let spec = project.root().join("app-test/nav.spec.js");
    fs::create_dir_all(spec.parent().unwrap()).unwrap();
    fs::write(&spec, "describe('nav', function () {\n  it('opens', function () {\n    expect(true).toBe(true);\n  });\n});\n").unwrap();

    project.ctx().run(PipeId::LintTestScripts, Env::Test).unwrap();
    assert!(project.ctx().run(PipeId::LintAppScripts, Env::Dev).is_ok());
}

#[test]
fn test_prod_app_scripts_source_map() {
    let project = Project::new();
    project.ctx().run(PipeId::AppScripts, Env::Prod).unwrap();

    let scripts = project.dist(Env::Prod).join("scripts");
    let bundle = fs::read_to_string(scripts.join("app.min.js")).unwrap();
    assert!(bundle.ends_with("//# sourceMappingURL=app.min.js.map\n"));

    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(scripts.join("app.min.js.map")).unwrap()).unwrap();
    assert_eq!(map["sources"], serde_json::json!(["components/nav.js", "app.js"]));
    assert!(!map["mappings"].as_str().unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn test_prod_vendor_less_and_css_bundle() {
    let mut project = Project::new();
    let write = |rel: &str, content: &str| {
        let path = project.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    };
    write("bower.json", r#"{"dependencies": {"kit": "*"}}"#);
    write("bower_components/kit/.bower.json", r#"{"main": ["dist/a.css", "less/b.less"]}"#);
    write("bower_components/kit/dist/a.css", ".a {\n  color: red;\n}\n");
    write("bower_components/kit/less/b.less", ".b {\n  margin: 0;\n}\n");
    project.config.styles.less = vec!["cat".into(), "$GANTRY_FILE".into()];

    let out = project.ctx().run(PipeId::VendorStyles, Env::Prod).unwrap();
    assert_eq!(out.paths(), vec![Path::new("vendor.min.css")]);
    assert_eq!(project.tree(Env::Prod), vec!["styles/vendor.min.css"]);

    let css = fs::read_to_string(project.dist(Env::Prod).join("styles/vendor.min.css")).unwrap();
    // compiled LESS first, then plain CSS
    let less = css.find(".b{margin:0}").unwrap_or_else(|| panic!("{css}"));
    let plain = css.find(".a{color:red}").unwrap_or_else(|| panic!("{css}"));
    assert!(less < plain, "{css}");
}
