//! The fixed task table.

use super::{Task, TaskError, TaskGraph, external};
use crate::assemble::PipeId;
use crate::core::Env;
use crate::{mock, watch};

/// A task running one pipe family in one environment.
fn pipe(name: impl Into<String>, description: &'static str, id: PipeId, env: Env) -> Task {
    Task::new(name, description).action(move |ctx| ctx.run(id, env).map(drop))
}

pub fn catalog() -> Result<TaskGraph, TaskError> {
    let mut tasks = Vec::new();

    for env in Env::ALL {
        tasks.push(
            Task::new(format!("clean-{env}"), "remove the environment output")
                .action(move |ctx| ctx.clean(env)),
        );
        tasks.push(pipe(
            format!("build-app-scripts-{env}"),
            "lint and build application scripts",
            PipeId::AppScripts,
            env,
        ));
        tasks.push(pipe(
            format!("build-vendor-scripts-{env}"),
            "build vendor scripts",
            PipeId::VendorScripts,
            env,
        ));
        tasks.push(pipe(
            format!("build-index-{env}"),
            "build the index with everything it references",
            PipeId::Index,
            env,
        ));
        tasks.push(
            Task::new(format!("build-app-{env}"), "assemble the environment")
                .action(move |ctx| ctx.assemble(env)),
        );
        tasks.push(
            Task::new(format!("clean-build-app-{env}"), "clean, then assemble the environment")
                .after(format!("clean-{env}"))
                .action(move |ctx| ctx.assemble(env)),
        );
    }

    for env in [Env::Dev, Env::Prod] {
        tasks.push(pipe(format!("build-styles-{env}"), "compile stylesheets", PipeId::Styles, env));
        tasks.push(pipe(
            format!("build-vendor-styles-{env}"),
            "build vendor stylesheets",
            PipeId::VendorStyles,
            env,
        ));
    }

    tasks.extend([
        pipe("validate-app-scripts", "lint application scripts", PipeId::LintAppScripts, Env::Dev),
        pipe("validate-partials", "lint partial templates", PipeId::LintPartials, Env::Dev),
        pipe("validate-index", "lint the index document", PipeId::LintIndex, Env::Dev),
        pipe(
            "validate-devserver-scripts",
            "lint the backing server scripts",
            PipeId::LintServerScripts,
            Env::Dev,
        ),
        pipe("validate-test-scripts", "lint unit tests", PipeId::LintTestScripts, Env::Test),
        pipe("build-partials-dev", "copy partial templates", PipeId::Partials, Env::Dev),
        pipe(
            "convert-partials-to-js",
            "turn partials into template-cache modules",
            PipeId::ScriptedPartials,
            Env::Dev,
        ),
        pipe("build-fonts-dev", "copy fonts", PipeId::Fonts, Env::Dev),
        pipe("build-images-dev", "copy images", PipeId::Images, Env::Dev),
        Task::new("watch-dev", "build dev, then rebuild and reload on change")
            .after("clean-build-app-dev")
            .after("validate-devserver-scripts")
            .action(|ctx| watch::run(ctx, Env::Dev)),
        Task::new("watch-prod", "build prod, then rebuild and reload on change")
            .after("clean-build-app-prod")
            .after("validate-devserver-scripts")
            .action(|ctx| watch::run(ctx, Env::Prod)),
        Task::new("prepare-test", "build the test environment and lint unit tests")
            .after("clean-build-app-test")
            .after("validate-test-scripts"),
        Task::new("test", "run unit tests once")
            .after("prepare-test")
            .action(|ctx| external::run_tests(ctx.config, external::TestMode::Single)),
        Task::new("tdd", "run unit tests continuously")
            .after("prepare-test")
            .action(|ctx| external::run_tests(ctx.config, external::TestMode::Continuous)),
        Task::new("watch-test", "run unit tests, again on every script change")
            .action(external::watch_tests),
        Task::new("doc", "generate API documentation").action(external::doc),
        Task::new("mockserver", "serve mocked API responses").action(|ctx| mock::serve(ctx.config)),
        Task::new("build", "clean production build").after("clean-build-app-prod"),
        Task::new("default", "alias for watch-dev").after("watch-dev"),
    ]);

    TaskGraph::new(tasks)
}
