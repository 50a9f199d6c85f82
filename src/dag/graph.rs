// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::registry::{Composition, TaskAction, TaskRegistry};
use crate::engine::TaskName;
use crate::errors::{Result, SitewatchError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
    composition: Composition,
    action: TaskAction,
    halt_on_failure: bool,
}

/// Validated in-memory DAG keyed by task name.
///
/// Construction rejects unknown dependencies, self-dependencies and cycles,
/// so the scheduler can walk edges without guarding against loops.
#[derive(Debug, Clone)]
pub struct DagGraph {
    /// Declaration order, for stable listings.
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build and validate a DAG from a task registry.
    pub fn from_registry(registry: &TaskRegistry) -> Result<Self> {
        if registry.is_empty() {
            return Err(SitewatchError::ConfigError(
                "task registry must contain at least one task".to_string(),
            ));
        }

        validate_dependencies(registry)?;
        validate_acyclic(registry)?;

        let mut order = Vec::with_capacity(registry.len());
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        for def in registry.iter() {
            order.push(def.name.clone());
            nodes.insert(
                def.name.clone(),
                DagNode {
                    deps: def.after.clone(),
                    dependents: Vec::new(),
                    composition: def.composition,
                    action: def.action.clone(),
                    halt_on_failure: def.halt_on_failure,
                },
            );
        }

        for def in registry.iter() {
            for dep in &def.after {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(def.name.clone());
                }
            }
        }

        Ok(Self { order, nodes })
    }

    /// All task names in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn composition_of(&self, name: &str) -> Option<Composition> {
        self.nodes.get(name).map(|n| n.composition)
    }

    pub fn action_of(&self, name: &str) -> Option<&TaskAction> {
        self.nodes.get(name).map(|n| &n.action)
    }

    pub fn halts_on_failure(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.halt_on_failure)
    }

    /// The target plus everything it transitively runs after.
    pub fn upstream_closure(&self, target: &str) -> HashSet<TaskName> {
        let mut seen: HashSet<TaskName> = HashSet::new();
        let mut stack = vec![target.to_string()];

        while let Some(name) = stack.pop() {
            if !self.nodes.contains_key(&name) || !seen.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }

        seen
    }

    /// Execution plan for `target`: its upstream closure in an order that
    /// respects both dependency edges and series composition.
    pub fn plan(&self, target: &str) -> Result<Vec<TaskName>> {
        if !self.contains(target) {
            return Err(SitewatchError::TaskNotFound(target.to_string()));
        }

        let closure = self.upstream_closure(target);
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        // Add nodes in declaration order so ties break predictably.
        for name in self.order.iter().filter(|n| closure.contains(*n)) {
            graph.add_node(name.as_str());
        }

        for name in self.order.iter().filter(|n| closure.contains(*n)) {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
            if self.composition_of(name) == Some(Composition::Series) {
                for pair in self.dependencies_of(name).windows(2) {
                    graph.add_edge(pair[0].as_str(), pair[1].as_str(), ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
            Err(cycle) => Err(SitewatchError::DagCycle(format!(
                "series composition creates a cycle involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}

fn validate_dependencies(registry: &TaskRegistry) -> Result<()> {
    for def in registry.iter() {
        for dep in &def.after {
            if dep == &def.name {
                return Err(SitewatchError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    def.name
                )));
            }
            if !registry.contains(dep) {
                return Err(SitewatchError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}'",
                    def.name, dep
                )));
            }
        }
        if let TaskAction::Watch { trigger } = &def.action {
            if !registry.contains(trigger) {
                return Err(SitewatchError::ConfigError(format!(
                    "task '{}' watches for unknown task '{}'",
                    def.name, trigger
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(registry: &TaskRegistry) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for def in registry.iter() {
        graph.add_node(def.name.as_str());
    }

    for def in registry.iter() {
        for dep in &def.after {
            graph.add_edge(dep.as_str(), def.name.as_str(), ());
        }
        // Series parts also order each other; a part that must run after a
        // later part would never become ready.
        if def.composition == Composition::Series {
            for pair in def.after.windows(2) {
                graph.add_edge(pair[0].as_str(), pair[1].as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SitewatchError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
