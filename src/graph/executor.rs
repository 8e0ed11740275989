// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Graph executor
//!
//! Runs the tasks of a [`TaskGraph`] as their dependencies complete.
//! Tasks whose dependencies are all satisfied run concurrently. The first
//! failure stops new tasks from starting; tasks already running are left to
//! finish. Registered finalizers run afterwards whatever the outcome.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::dag::{TaskGraph, TaskResults};

/// The task that failed first, with its error
#[derive(Debug, Clone)]
pub struct TaskFailure<E> {
    pub task: String,
    pub error: E,
}

/// Everything known about a graph run once it resolved
#[derive(Debug)]
pub struct GraphOutcome<T, E> {
    /// Results of every task that succeeded
    pub results: HashMap<String, T>,
    /// First failure, if any
    pub failure: Option<TaskFailure<E>>,
    /// Tasks that never started, in declaration order
    pub not_run: Vec<String>,
    /// Wall clock time of the run, finalizers excluded
    pub duration: Duration,
}

impl<T, E> GraphOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Full results on success, or the first failure with the partial results
    pub fn into_result(self) -> Result<HashMap<String, T>, (TaskFailure<E>, HashMap<String, T>)> {
        match self.failure {
            None => Ok(self.results),
            Some(failure) => Err((failure, self.results)),
        }
    }
}

/// Step that runs once a graph run resolved, successful or not
#[async_trait]
pub trait Finalizer<T, E>: Send + Sync {
    async fn finalize(&self, outcome: &GraphOutcome<T, E>);
}

/// Executes task graphs
pub struct GraphExecutor<T, E> {
    finalizers: Vec<Arc<dyn Finalizer<T, E>>>,
}

impl<T, E> GraphExecutor<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            finalizers: Vec::new(),
        }
    }

    /// Add a finalizer; finalizers run in registration order
    pub fn with_finalizer(mut self, finalizer: Arc<dyn Finalizer<T, E>>) -> Self {
        self.finalizers.push(finalizer);
        self
    }

    /// Run every task of `graph`, then the finalizers
    pub async fn execute(&self, graph: TaskGraph<T, E>) -> GraphOutcome<T, E> {
        let start = Instant::now();
        let (dag, tasks) = graph.into_parts();

        let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
        let mut units: Vec<Option<_>> = tasks.into_iter().map(|t| Some(t.unit)).collect();

        let mut in_degree: HashMap<NodeIndex, usize> = dag
            .node_indices()
            .map(|n| (n, dag.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: VecDeque<NodeIndex> = dag
            .node_indices()
            .filter(|n| in_degree[n] == 0)
            .collect();

        let mut running = FuturesUnordered::new();
        let mut results: HashMap<String, T> = HashMap::new();
        let mut failure: Option<TaskFailure<E>> = None;

        loop {
            if failure.is_none() {
                while let Some(node) = ready.pop_front() {
                    let idx = dag[node];
                    let Some(unit) = units[idx].take() else {
                        continue;
                    };

                    debug!("Starting task '{}'", names[idx]);
                    let future = unit(TaskResults::new(results.clone()));
                    running.push(async move { (node, future.await) });
                }
            }

            let Some((node, result)) = running.next().await else {
                break;
            };
            let name = &names[dag[node]];

            match result {
                Ok(value) => {
                    debug!("Task '{}' completed", name);
                    results.insert(name.clone(), value);

                    let mut dependents: Vec<NodeIndex> =
                        dag.neighbors_directed(node, Direction::Outgoing).collect();
                    dependents.sort();

                    for dependent in dependents {
                        if let Some(degree) = in_degree.get_mut(&dependent) {
                            *degree -= 1;
                            if *degree == 0 {
                                ready.push_back(dependent);
                            }
                        }
                    }
                }
                Err(error) => {
                    if failure.is_none() {
                        warn!("Task '{}' failed, no further tasks will start", name);
                        failure = Some(TaskFailure {
                            task: name.clone(),
                            error,
                        });
                    } else {
                        debug!("Task '{}' also failed, keeping the first failure", name);
                    }
                }
            }
        }

        let not_run: Vec<String> = units
            .iter()
            .zip(&names)
            .filter(|(unit, _)| unit.is_some())
            .map(|(_, name)| name.clone())
            .collect();

        if failure.is_none() && !not_run.is_empty() {
            // Unreachable for graphs built through `TaskGraph::build`
            warn!("Tasks never became ready: {}", not_run.join(", "));
        }

        let outcome = GraphOutcome {
            results,
            failure,
            not_run,
            duration: start.elapsed(),
        };

        for finalizer in &self.finalizers {
            finalizer.finalize(&outcome).await;
        }

        outcome
    }
}

impl<T, E> Default for GraphExecutor<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuildflowError;
    use crate::graph::Task;
    use std::sync::Mutex;
    use tokio::sync::Barrier;

    type Log = Arc<Mutex<Vec<String>>>;

    fn logged(log: &Log, name: &'static str, deps: &[&str]) -> Task<u32, String> {
        let log = log.clone();
        Task::new(name, deps, move |_| async move {
            log.lock().unwrap().push(format!("start:{}", name));
            tokio::task::yield_now().await;
            log.lock().unwrap().push(format!("end:{}", name));
            Ok(1)
        })
    }

    fn position(log: &[String], entry: &str) -> usize {
        log.iter().position(|e| e == entry).unwrap()
    }

    #[tokio::test]
    async fn test_dependencies_complete_before_start() {
        let log: Log = Arc::default();
        let graph = TaskGraph::build(vec![
            logged(&log, "d", &["b", "c"]),
            logged(&log, "b", &["a"]),
            logged(&log, "c", &["a"]),
            logged(&log, "a", &[]),
        ])
        .unwrap();

        let outcome = GraphExecutor::new().execute(graph).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.results.len(), 4);

        let log = log.lock().unwrap();
        assert!(position(&log, "end:a") < position(&log, "start:b"));
        assert!(position(&log, "end:a") < position(&log, "start:c"));
        assert!(position(&log, "end:b") < position(&log, "start:d"));
        assert!(position(&log, "end:c") < position(&log, "start:d"));
    }

    #[tokio::test]
    async fn test_results_are_threaded_to_dependents() {
        let graph = TaskGraph::<u32, String>::builder()
            .task(Task::new("base", &[], |_| async { Ok(20) }))
            .task(Task::new("double", &["base"], |results| async move {
                let base = *results.get("base").unwrap();
                Ok(base * 2)
            }))
            .task(Task::new("sum", &["double"], |results| async move {
                Ok(results.get("base").unwrap() + results.get("double").unwrap())
            }))
            .build()
            .unwrap();

        let results = GraphExecutor::new().execute(graph).await.into_result().unwrap();
        assert_eq!(results["sum"], 60);
    }

    #[tokio::test]
    async fn test_independent_tasks_run_concurrently() {
        // Each task waits for the other one: this only finishes if both are
        // in flight at the same time.
        let barrier = Arc::new(Barrier::new(2));
        let left = barrier.clone();
        let right = barrier.clone();

        let graph = TaskGraph::<u32, String>::builder()
            .task(Task::new("left", &[], move |_| async move {
                left.wait().await;
                Ok(1)
            }))
            .task(Task::new("right", &[], move |_| async move {
                right.wait().await;
                Ok(2)
            }))
            .build()
            .unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            GraphExecutor::new().execute(graph),
        )
        .await
        .expect("independent tasks did not overlap");
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_failure_stops_new_tasks_but_lets_running_finish() {
        let log: Log = Arc::default();
        let slow_log = log.clone();

        let graph = TaskGraph::<u32, String>::builder()
            .task(Task::new("broken", &[], |_| async {
                Err("broken failed".to_string())
            }))
            .task(Task::new("slow", &[], move |_| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                slow_log.lock().unwrap().push("slow finished".into());
                Ok(1)
            }))
            .task(logged(&log, "after_broken", &["broken"]))
            .task(logged(&log, "after_slow", &["slow"]))
            .build()
            .unwrap();

        let outcome = GraphExecutor::new().execute(graph).await;

        let failure = outcome.failure.as_ref().unwrap();
        assert_eq!(failure.task, "broken");
        assert_eq!(failure.error, "broken failed");
        assert!(outcome.results.contains_key("slow"));
        assert_eq!(outcome.not_run, vec!["after_broken", "after_slow"]);
        assert_eq!(*log.lock().unwrap(), vec!["slow finished".to_string()]);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let graph = TaskGraph::<u32, String>::builder()
            .task(Task::new("first", &[], |_| async { Err("first".to_string()) }))
            .task(Task::new("second", &[], |_| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err("second".to_string())
            }))
            .build()
            .unwrap();

        let (failure, partial) = GraphExecutor::new()
            .execute(graph)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(failure.error, "first");
        assert!(partial.is_empty());
    }

    struct CountingFinalizer {
        calls: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl Finalizer<u32, String> for CountingFinalizer {
        async fn finalize(&self, outcome: &GraphOutcome<u32, String>) {
            self.calls.lock().unwrap().push(outcome.is_success());
        }
    }

    #[tokio::test]
    async fn test_finalizer_runs_on_success_and_failure() {
        let finalizer = Arc::new(CountingFinalizer {
            calls: Mutex::new(Vec::new()),
        });
        let executor = GraphExecutor::new().with_finalizer(finalizer.clone());

        let ok = TaskGraph::build(vec![Task::new("ok", &[], |_| async { Ok(1) })]).unwrap();
        executor.execute(ok).await;

        let bad = TaskGraph::build(vec![Task::new("bad", &[], |_| async {
            Err("nope".to_string())
        })])
        .unwrap();
        executor.execute(bad).await;

        assert_eq!(*finalizer.calls.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_cycle_rejected_before_any_task_runs() {
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();

        let result = TaskGraph::<u32, BuildflowError>::build(vec![
            Task::new("a", &["b"], move |_| async move {
                *flag.lock().unwrap() = true;
                Ok(1)
            }),
            Task::new("b", &["a"], |_| async { Ok(2) }),
        ]);

        assert!(matches!(result, Err(BuildflowError::CircularDependency { .. })));
        assert!(!*ran.lock().unwrap());
    }
}
