//! Named tasks with prerequisites.
//!
//! The graph is a fixed table validated once when it is built (unknown
//! prerequisites and cycles are rejected). Running a task first runs each
//! of its transitive prerequisites exactly once, in dependency order, and
//! stops at the first failure.

mod catalog;
mod external;

pub use catalog::catalog;

use std::time::Instant;

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::assemble::BuildContext;
use crate::log;

pub type Action = Box<dyn Fn(&BuildContext<'_>) -> Result<()> + Send + Sync>;

/// One entry of the task table.
pub struct Task {
    pub name: String,
    pub description: &'static str,
    pub deps: Vec<String>,
    action: Option<Action>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: &'static str) -> Self {
        Self {
            name: name.into(),
            description,
            deps: Vec::new(),
            action: None,
        }
    }

    pub fn after(mut self, dep: impl Into<String>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn action(mut self, action: impl Fn(&BuildContext<'_>) -> Result<()> + Send + Sync + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("unknown task `{0}`")]
    Unknown(String),

    #[error("task `{task}` depends on unknown task `{dep}`")]
    UnknownDependency { task: String, dep: String },

    #[error("task `{0}` is defined twice")]
    Duplicate(String),

    #[error("task dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("task `{0}` failed")]
    Failed(String),
}

pub struct TaskGraph {
    tasks: Vec<Task>,
    index: FxHashMap<String, usize>,
}

impl TaskGraph {
    pub fn new(tasks: Vec<Task>) -> Result<Self, TaskError> {
        let mut index = FxHashMap::default();
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), i).is_some() {
                return Err(TaskError::Duplicate(task.name.clone()));
            }
        }
        for task in &tasks {
            if let Some(dep) = task.deps.iter().find(|d| !index.contains_key(*d)) {
                return Err(TaskError::UnknownDependency {
                    task: task.name.clone(),
                    dep: dep.clone(),
                });
            }
        }

        let graph = Self { tasks, index };
        graph.check_cycles()?;
        Ok(graph)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// DFS with an explicit path; the first back edge found is reported
    /// as the cycle it closes.
    fn check_cycles(&self) -> Result<(), TaskError> {
        let mut visited = FxHashSet::default();
        for start in 0..self.tasks.len() {
            let mut path = Vec::new();
            self.visit(start, &mut path, &mut visited)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        node: usize,
        path: &mut Vec<usize>,
        visited: &mut FxHashSet<usize>,
    ) -> Result<(), TaskError> {
        if let Some(pos) = path.iter().position(|&n| n == node) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&n| self.tasks[n].name.clone())
                .collect();
            cycle.push(self.tasks[node].name.clone());
            return Err(TaskError::Cycle(cycle));
        }
        if !visited.insert(node) {
            return Ok(());
        }

        path.push(node);
        for dep in &self.tasks[node].deps {
            self.visit(self.index[dep], path, visited)?;
        }
        path.pop();
        Ok(())
    }

    /// Execution order for `name`: every transitive prerequisite once,
    /// dependencies before dependents, `name` last.
    pub fn plan(&self, name: &str) -> Result<Vec<&str>, TaskError> {
        let &root = self
            .index
            .get(name)
            .ok_or_else(|| TaskError::Unknown(name.to_string()))?;

        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        self.post_order(root, &mut seen, &mut order);
        Ok(order.into_iter().map(|i| self.tasks[i].name.as_str()).collect())
    }

    fn post_order(&self, node: usize, seen: &mut FxHashSet<usize>, order: &mut Vec<usize>) {
        if !seen.insert(node) {
            return;
        }
        for dep in &self.tasks[node].deps {
            self.post_order(self.index[dep], seen, order);
        }
        order.push(node);
    }

    /// Run `name` and its prerequisites. The first failure aborts
    /// everything that has not started yet.
    pub fn run(&self, name: &str, ctx: &BuildContext<'_>) -> Result<()> {
        for step in self.plan(name)? {
            let task = &self.tasks[self.index[step]];
            let Some(action) = &task.action else {
                continue;
            };

            log!("task"; "starting `{step}`");
            let started = Instant::now();
            action(ctx).map_err(|e| e.context(TaskError::Failed(step.to_string())))?;
            log!("task"; "finished `{step}` after {:.2?}", started.elapsed());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::PipeTable;
    use crate::config::ProjectConfig;
    use anyhow::bail;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    fn recording(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Task {
        let log = Arc::clone(log);
        let owned = name.to_string();
        Task::new(name, "").action(move |_| {
            log.lock().push(owned.clone());
            Ok(())
        })
    }

    fn with_ctx(f: impl FnOnce(&BuildContext<'_>)) {
        let config = ProjectConfig::with_root(Path::new("/project"));
        let table = PipeTable::new();
        f(&BuildContext::new(&config, &table));
    }

    #[test]
    fn test_prerequisites_run_once_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = TaskGraph::new(vec![
            recording("clean", &log),
            recording("scripts", &log).after("clean"),
            recording("styles", &log).after("clean"),
            recording("build", &log).after("scripts").after("styles"),
        ])
        .unwrap();

        with_ctx(|ctx| graph.run("build", ctx).unwrap());
        assert_eq!(*log.lock(), vec!["clean", "scripts", "styles", "build"]);
    }

    #[test]
    fn test_failure_aborts_dependents() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = TaskGraph::new(vec![
            Task::new("lint", "").action(|_| bail!("2 problems")),
            recording("build", &log).after("lint"),
        ])
        .unwrap();

        with_ctx(|ctx| {
            let err = graph.run("build", ctx).unwrap_err();
            assert_eq!(
                err.downcast_ref::<TaskError>(),
                Some(&TaskError::Failed("lint".into()))
            );
            assert!(format!("{err:#}").contains("2 problems"));
        });
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_cycle_rejected_at_build() {
        let result = TaskGraph::new(vec![
            Task::new("a", "").after("b"),
            Task::new("b", "").after("c"),
            Task::new("c", "").after("a"),
        ]);
        assert_eq!(
            result.err(),
            Some(TaskError::Cycle(vec!["a".into(), "b".into(), "c".into(), "a".into()]))
        );
    }

    #[test]
    fn test_unknown_names() {
        let result = TaskGraph::new(vec![Task::new("a", "").after("missing")]);
        assert!(matches!(result.err(), Some(TaskError::UnknownDependency { .. })));

        let graph = TaskGraph::new(vec![Task::new("a", "")]).unwrap();
        assert_eq!(graph.plan("nope"), Err(TaskError::Unknown("nope".into())));
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = TaskGraph::new(vec![Task::new("a", ""), Task::new("a", "")]);
        assert_eq!(result.err(), Some(TaskError::Duplicate("a".into())));
    }
}
