//! Process graph
//!
//! Activities are petgraph nodes, sequence flows are edges. Each activity's
//! behavior is resolved from its kind when it is added, so the walker never
//! looks anything up by type at run time.

use crate::behavior::ActivityBehavior;
use crate::error::ConfigurationError;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of activity types this engine knows how to run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    StartEvent,
    EndEvent,
    ServiceTask { task_type: String },
    ParallelGateway,
}

#[derive(Clone, Debug)]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    behavior: ActivityBehavior,
}

impl Activity {
    pub fn new(id: impl Into<String>, kind: ActivityKind) -> Self {
        let behavior = ActivityBehavior::resolve(&kind);
        Self {
            id: id.into(),
            kind,
            behavior,
        }
    }

    pub fn behavior(&self) -> &ActivityBehavior {
        &self.behavior
    }
}

/// A sequence flow between two activities.
#[derive(Clone, Debug)]
pub struct Transition {
    pub id: String,
}

#[derive(Debug, Default)]
pub struct ProcessGraph {
    key: String,
    graph: DiGraph<Activity, Transition>,
    by_id: HashMap<String, NodeIndex>,
}

impl ProcessGraph {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Process definition key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn add_activity(&mut self, activity: Activity) -> Result<NodeIndex, ConfigurationError> {
        if self.by_id.contains_key(&activity.id) {
            return Err(ConfigurationError::InvalidDefinition(format!(
                "duplicate activity id '{}'",
                activity.id
            )));
        }
        let id = activity.id.clone();
        let idx = self.graph.add_node(activity);
        self.by_id.insert(id, idx);
        Ok(idx)
    }

    /// Both ends must be activities of this graph.
    pub fn add_transition(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
    ) -> Result<EdgeIndex, ConfigurationError> {
        let id = format!("{}->{}", self.activity(from)?.id, self.activity(to)?.id);
        Ok(self.graph.add_edge(from, to, Transition { id }))
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn activity(&self, idx: NodeIndex) -> Result<&Activity, ConfigurationError> {
        self.graph
            .node_weight(idx)
            .ok_or_else(|| ConfigurationError::UnknownActivity(format!("index {}", idx.index())))
    }

    pub fn start_event(&self) -> Result<NodeIndex, ConfigurationError> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].kind == ActivityKind::StartEvent)
            .ok_or_else(|| {
                ConfigurationError::InvalidDefinition(format!(
                    "process '{}' has no start event",
                    self.key
                ))
            })
    }

    /// Targets of the outgoing transitions, in the order the transitions were added.
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_edges(idx, Direction::Outgoing)
            .into_iter()
            .map(|(_, target)| target)
            .collect()
    }

    /// Sources of the incoming transitions, in the order the transitions were added.
    pub fn incoming(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_edges(idx, Direction::Incoming)
            .into_iter()
            .map(|(_, source)| source)
            .collect()
    }

    pub fn incoming_count(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn outgoing_count(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn activities(&self) -> impl Iterator<Item = (NodeIndex, &Activity)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    // petgraph walks adjacency lists newest-first; sort back into insertion order.
    fn ordered_edges(&self, idx: NodeIndex, dir: Direction) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges
    }
}
