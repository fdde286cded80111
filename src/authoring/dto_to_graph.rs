use super::dto::*;
use super::validate::validate_dto;
use crate::error::ConfigurationError;
use crate::graph::{Activity, ActivityKind, ProcessGraph};
use std::collections::HashMap;

/// Validate a ProcessDefinitionDto and build the runtime graph.
///
/// Edges are added in definition order, which fixes the order a fork
/// drives its branches in.
pub fn build_graph(dto: &ProcessDefinitionDto) -> Result<ProcessGraph, ConfigurationError> {
    let errors = validate_dto(dto);
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(ConfigurationError::InvalidDefinition(msgs.join("\n")));
    }

    let mut graph = ProcessGraph::new(dto.id.clone());
    let mut index = HashMap::with_capacity(dto.nodes.len());

    for node in &dto.nodes {
        let kind = match node {
            NodeDto::Start { .. } => ActivityKind::StartEvent,
            NodeDto::End { .. } => ActivityKind::EndEvent,
            NodeDto::ServiceTask { task_type, .. } => ActivityKind::ServiceTask {
                task_type: task_type.clone(),
            },
            NodeDto::ParallelGateway { .. } => ActivityKind::ParallelGateway,
        };
        let idx = graph.add_activity(Activity::new(node.id(), kind))?;
        index.insert(node.id(), idx);
    }

    for edge in &dto.edges {
        let from = *index
            .get(edge.from.as_str())
            .ok_or_else(|| ConfigurationError::UnknownActivity(edge.from.clone()))?;
        let to = *index
            .get(edge.to.as_str())
            .ok_or_else(|| ConfigurationError::UnknownActivity(edge.to.clone()))?;
        graph.add_transition(from, to)?;
    }

    tracing::debug!(
        process_key = %dto.id,
        activities = dto.nodes.len(),
        transitions = dto.edges.len(),
        "process graph built"
    );
    Ok(graph)
}
