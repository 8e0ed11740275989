// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Task dependency graph
//!
//! Builds and validates the dependency graph of a set of tasks. Unknown
//! dependencies, duplicate names and cycles are rejected here, before any
//! task gets a chance to run.

use futures::future::BoxFuture;
use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use std::future::Future;

use crate::errors::BuildflowError;

/// Results of the tasks completed before a task started
#[derive(Debug, Clone)]
pub struct TaskResults<T> {
    values: HashMap<String, T>,
}

impl<T> TaskResults<T> {
    pub fn new(values: HashMap<String, T>) -> Self {
        Self { values }
    }

    pub fn get(&self, task: &str) -> Option<&T> {
        self.values.get(task)
    }

    /// Result of `dependency`, as needed by `task`
    pub fn require(&self, task: &str, dependency: &str) -> Result<&T, BuildflowError> {
        self.values
            .get(dependency)
            .ok_or_else(|| BuildflowError::MissingTaskResult {
                task: task.to_string(),
                dependency: dependency.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type TaskUnit<T, E> = Box<dyn FnOnce(TaskResults<T>) -> BoxFuture<'static, Result<T, E>> + Send>;

/// A named unit of work with explicit dependencies
pub struct Task<T, E> {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) depends_on: Vec<String>,
    pub(crate) unit: TaskUnit<T, E>,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a task running `unit` once all of `depends_on` succeeded
    pub fn new<F, Fut>(name: impl Into<String>, depends_on: &[&str], unit: F) -> Self
    where
        F: FnOnce(TaskResults<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            unit: Box::new(move |results| -> BoxFuture<'static, Result<T, E>> {
                Box::pin(unit(results))
            }),
        }
    }
}

impl<T, E> Task<T, E> {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

impl<T, E> std::fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Collects tasks before validating them into a [`TaskGraph`]
pub struct TaskGraphBuilder<T, E> {
    tasks: Vec<Task<T, E>>,
}

impl<T, E> TaskGraphBuilder<T, E> {
    pub fn task(mut self, task: Task<T, E>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Result<TaskGraph<T, E>, BuildflowError> {
        TaskGraph::build(self.tasks)
    }
}

/// A validated, acyclic set of tasks
pub struct TaskGraph<T, E> {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    tasks: Vec<Task<T, E>>,
}

impl<T, E> TaskGraph<T, E> {
    pub fn builder() -> TaskGraphBuilder<T, E> {
        TaskGraphBuilder { tasks: Vec::new() }
    }

    /// Build and validate a graph from tasks
    pub fn build(tasks: Vec<Task<T, E>>) -> Result<Self, BuildflowError> {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();

        // Add all tasks as nodes
        for (idx, task) in tasks.iter().enumerate() {
            if name_to_index.contains_key(&task.name) {
                return Err(BuildflowError::DuplicateTask {
                    task: task.name.clone(),
                });
            }
            let node = graph.add_node(idx);
            name_to_index.insert(task.name.clone(), node);
        }

        // Add dependency edges
        for task in &tasks {
            let task_node = name_to_index[&task.name];

            for dep_name in &task.depends_on {
                let dep_node = name_to_index.get(dep_name).ok_or_else(|| {
                    BuildflowError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep_name.clone(),
                    }
                })?;

                if !graph.contains_edge(*dep_node, task_node) {
                    graph.add_edge(*dep_node, task_node, ());
                }
            }
        }

        let dag = Self {
            graph,
            name_to_index,
            tasks,
        };
        dag.validate_acyclic()?;

        Ok(dag)
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), BuildflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(_) => Err(BuildflowError::CircularDependency {
                tasks: self.find_cycle_members(),
            }),
        }
    }

    /// Names of the tasks in the first cycle found
    fn find_cycle_members(&self) -> Vec<String> {
        let mut members: Vec<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .unwrap_or_default();

        members.sort();
        let mut names: Vec<String> = members
            .iter()
            .map(|n| self.name_of(*n).to_string())
            .collect();
        if let Some(first) = names.first().cloned() {
            names.push(first);
        }
        names
    }

    fn name_of(&self, node: NodeIndex) -> &str {
        &self.tasks[self.graph[node]].name
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in insertion order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Task names in a valid execution order
    pub fn topological_order(&self) -> Vec<String> {
        // Acyclicity was checked in `build`
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.name_of(n).to_string()).collect())
            .unwrap_or_default()
    }

    /// Tasks that must complete before `task`
    pub fn dependencies(&self, task: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(task)?;
        Some(self.neighbors(*node, Direction::Incoming))
    }

    /// Tasks that wait for `task`
    pub fn dependents(&self, task: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(task)?;
        Some(self.neighbors(*node, Direction::Outgoing))
    }

    fn neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<String> {
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        nodes.sort();
        nodes.into_iter().map(|n| self.name_of(n).to_string()).collect()
    }

    /// Check if task A depends (directly or transitively) on task B
    pub fn depends_on(&self, task_a: &str, task_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(task_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(task_b) else {
            return false;
        };

        has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for task in &self.tasks {
            out.push_str(&format!("    {}[{}]\n", task.name, task.name));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph build {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        // Isolated nodes
        for task in &self.tasks {
            let node = self.name_to_index[&task.name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", task.name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Numbered execution order with descriptions and dependencies
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, name) in self.topological_order().iter().enumerate() {
            let task = &self.tasks[self.graph[self.name_to_index[name]]];
            let deps = self.dependencies(name).unwrap_or_default();

            out.push_str(&format!("{}. {}", i + 1, name));

            if let Some(ref description) = task.description {
                out.push_str(&format!(" - {}", description));
            }

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }

    fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .collect();
        edges.sort();
        edges
            .into_iter()
            .map(|(from, to)| (self.name_of(from), self.name_of(to)))
            .collect()
    }

    /// Split into the scheduling structure and the task units
    pub(crate) fn into_parts(self) -> (DiGraph<usize, ()>, Vec<Task<T, E>>) {
        (self.graph, self.tasks)
    }
}

impl<T, E> std::fmt::Debug for TaskGraph<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
