//! Dependency order for application scripts.
//!
//! A file declaring a module (`angular.module('x', [...])`) comes before
//! the files using it (`angular.module('x')`), and the declarations of
//! its listed dependencies come before it. Unrelated files keep their
//! path order.

use std::collections::BTreeSet;

use anyhow::Result;
use oxc::allocator::Allocator;
use oxc::ast::ast::{Argument, ArrayExpressionElement, CallExpression};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::span::SourceType;
use rustc_hash::FxHashMap;

use crate::pipeline::{FileSet, Pipe};

#[derive(Debug, Default)]
struct ModuleRefs {
    declares: Vec<String>,
    /// Modules used or required as dependencies.
    needs: Vec<String>,
}

impl<'a> Visit<'a> for ModuleRefs {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if it.callee.is_specific_member_access("angular", "module")
            && let Some(Argument::StringLiteral(name)) = it.arguments.first()
        {
            match it.arguments.get(1) {
                Some(Argument::ArrayExpression(deps)) => {
                    self.needs.extend(deps.elements.iter().filter_map(|e| match e {
                        ArrayExpressionElement::StringLiteral(dep) => Some(dep.value.to_string()),
                        _ => None,
                    }));
                    self.declares.push(name.value.to_string());
                }
                _ => self.needs.push(name.value.to_string()),
            }
        }
        walk::walk_call_expression(self, it);
    }
}

/// Module references in a script. Scripts that do not parse have none and
/// keep their place; the lint stage reports them.
fn scan(src: &str) -> ModuleRefs {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, src, SourceType::script()).parse();
    let mut refs = ModuleRefs::default();
    if ret.errors.is_empty() {
        refs.visit_program(&ret.program);
    }
    refs
}

pub struct ModuleOrder;

impl Pipe for ModuleOrder {
    fn name(&self) -> &str {
        "module-order"
    }

    fn run(&self, files: FileSet) -> Result<FileSet> {
        let refs: Vec<ModuleRefs> = files.iter().map(|f| scan(&f.text())).collect();

        let mut declared_in: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, r) in refs.iter().enumerate() {
            for name in &r.declares {
                declared_in.entry(name.as_str()).or_insert(i);
            }
        }

        // edges: declaring file -> dependent file
        let n = refs.len();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for (i, r) in refs.iter().enumerate() {
            let mut sources = BTreeSet::new();
            for name in &r.needs {
                if let Some(&j) = declared_in.get(name.as_str())
                    && j != i
                {
                    sources.insert(j);
                }
            }
            for j in sources {
                dependents[j].push(i);
                indegree[i] += 1;
            }
        }

        // Kahn's algorithm, always taking the lowest ready index
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &k in &dependents[i] {
                indegree[k] -= 1;
                if indegree[k] == 0 {
                    ready.insert(k);
                }
            }
        }
        // cycles: remaining files in path order
        if order.len() < n {
            let placed: BTreeSet<usize> = order.iter().copied().collect();
            order.extend((0..n).filter(|i| !placed.contains(i)));
        }

        let mut slots: Vec<_> = files.into_vec().into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }
}
