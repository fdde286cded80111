#![allow(dead_code)]

use async_trait::async_trait;
use parallel_gateway::config::EngineConfigBuilder;
use parallel_gateway::delegate::TaskDelegate;
use parallel_gateway::graph::{Activity, ActivityKind, ProcessGraph};
use parallel_gateway::ExecutionContext;
use petgraph::graph::NodeIndex;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

pub const AFTER_JOIN: &str = "after_join";

/// Two parallel sections one after the other.
pub const TWO_SECTIONS: &str = r#"
id: two_sections
nodes:
  - { kind: Start, id: start }
  - { kind: ParallelGateway, id: f1 }
  - { kind: ServiceTask, id: a, task_type: a }
  - { kind: ServiceTask, id: b, task_type: b }
  - { kind: ParallelGateway, id: j1 }
  - { kind: ParallelGateway, id: f2 }
  - { kind: ServiceTask, id: c, task_type: c }
  - { kind: ServiceTask, id: d, task_type: d }
  - { kind: ParallelGateway, id: j2 }
  - { kind: End, id: end }
edges:
  - { from: start, to: f1 }
  - { from: f1, to: a }
  - { from: f1, to: b }
  - { from: a, to: j1 }
  - { from: b, to: j1 }
  - { from: j1, to: f2 }
  - { from: f2, to: c }
  - { from: f2, to: d }
  - { from: c, to: j2 }
  - { from: d, to: j2 }
  - { from: j2, to: end }
"#;

/// A fork inside one branch of another fork.
pub const NESTED: &str = r#"
id: nested
nodes:
  - { kind: Start, id: start }
  - { kind: ParallelGateway, id: f1 }
  - { kind: ServiceTask, id: a, task_type: a }
  - { kind: ParallelGateway, id: f2 }
  - { kind: ServiceTask, id: b, task_type: b }
  - { kind: ServiceTask, id: c, task_type: c }
  - { kind: ParallelGateway, id: j2 }
  - { kind: ServiceTask, id: d, task_type: d }
  - { kind: ParallelGateway, id: j1 }
  - { kind: End, id: end }
edges:
  - { from: start, to: f1 }
  - { from: f1, to: a }
  - { from: f1, to: f2 }
  - { from: f2, to: b }
  - { from: f2, to: c }
  - { from: b, to: j2 }
  - { from: c, to: j2 }
  - { from: j2, to: d }
  - { from: a, to: j1 }
  - { from: d, to: j1 }
  - { from: j1, to: end }
"#;

/// Ordered log of which service tasks ran, and on which thread.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<(String, ThreadId)>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, name: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((name.to_string(), std::thread::current().id()));
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, thread)| *thread)
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| n.as_str() == name).count()
    }
}

/// Service task delegate that optionally sleeps or fails, then journals itself.
pub struct Step {
    name: String,
    journal: Arc<Journal>,
    delay: Duration,
    fail: bool,
}

impl Step {
    pub fn ok(name: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Self::build(name, journal, Duration::ZERO, false)
    }

    pub fn slow(name: &str, journal: &Arc<Journal>, delay: Duration) -> Arc<Self> {
        Self::build(name, journal, delay, false)
    }

    pub fn failing(name: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Self::build(name, journal, Duration::ZERO, true)
    }

    fn build(name: &str, journal: &Arc<Journal>, delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            delay,
            fail,
        })
    }
}

#[async_trait]
impl TaskDelegate for Step {
    async fn execute(&self, _ctx: &ExecutionContext) -> anyhow::Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            anyhow::bail!("{} could not complete", self.name);
        }
        self.journal.record(&self.name);
        Ok(())
    }
}

/// Register a journaling delegate for every branch plus the after-join task.
pub fn with_steps(
    mut builder: EngineConfigBuilder,
    journal: &Arc<Journal>,
    branches: &[&str],
) -> EngineConfigBuilder {
    for name in branches.iter().chain(std::iter::once(&AFTER_JOIN)) {
        builder = builder.delegate(*name, Step::ok(name, journal));
    }
    builder
}

/// start -> fork -> (one service task per branch) -> join -> after_join -> end
///
/// Each branch task uses its own id as task type.
pub fn fork_join(key: &str, branches: &[&str]) -> ProcessGraph {
    let mut graph = ProcessGraph::new(key);
    let start = add(&mut graph, "start", ActivityKind::StartEvent);
    let fork = add(&mut graph, "fork", ActivityKind::ParallelGateway);
    let join = add(&mut graph, "join", ActivityKind::ParallelGateway);
    let after = add(
        &mut graph,
        AFTER_JOIN,
        ActivityKind::ServiceTask {
            task_type: AFTER_JOIN.to_string(),
        },
    );
    let end = add(&mut graph, "end", ActivityKind::EndEvent);

    link(&mut graph, start, fork);
    for branch in branches {
        let task = add(
            &mut graph,
            branch,
            ActivityKind::ServiceTask {
                task_type: branch.to_string(),
            },
        );
        link(&mut graph, fork, task);
        link(&mut graph, task, join);
    }
    link(&mut graph, join, after);
    link(&mut graph, after, end);
    graph
}

fn link(graph: &mut ProcessGraph, from: NodeIndex, to: NodeIndex) {
    graph
        .add_transition(from, to)
        .expect("both ends belong to the graph");
}

fn add(graph: &mut ProcessGraph, id: &str, kind: ActivityKind) -> NodeIndex {
    graph
        .add_activity(Activity::new(id, kind))
        .expect("unique activity id")
}
