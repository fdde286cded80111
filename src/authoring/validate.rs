use super::dto::*;
use crate::behavior::gateway::classify;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub rule: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

fn error(rule: &str, message: String) -> ValidationError {
    ValidationError {
        rule: rule.to_string(),
        message,
    }
}

/// Validate a ProcessDefinitionDto before building the graph. Returns all errors found.
pub fn validate_dto(dto: &ProcessDefinitionDto) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut node_map: HashMap<&str, &NodeDto> = HashMap::new();

    // V1: Node IDs must be unique
    for node in &dto.nodes {
        let id = node.id();
        if node_map.contains_key(id) {
            errors.push(error("V1", format!("Duplicate node id: {id}")));
        } else {
            node_map.insert(id, node);
        }
    }

    // V2: Edges reference known nodes
    let mut incoming: HashMap<&str, usize> = HashMap::new();
    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    for edge in &dto.edges {
        for (end, id) in [("from", &edge.from), ("to", &edge.to)] {
            if !node_map.contains_key(id.as_str()) {
                errors.push(error(
                    "V2",
                    format!("Edge {}->{}: unknown '{end}' node {id}", edge.from, edge.to),
                ));
            }
        }
        *outgoing.entry(edge.from.as_str()).or_default() += 1;
        *incoming.entry(edge.to.as_str()).or_default() += 1;
    }

    // V3: Exactly one Start node
    let start_count = dto
        .nodes
        .iter()
        .filter(|n| matches!(n, NodeDto::Start { .. }))
        .count();
    if start_count != 1 {
        errors.push(error(
            "V3",
            format!("Expected exactly one Start node, found {start_count}"),
        ));
    }

    // V4: Every ParallelGateway is a fork (1 in, 2+ out) or a join (2+ in, 1 out)
    for node in &dto.nodes {
        if let NodeDto::ParallelGateway { id } = node {
            let ins = incoming.get(id.as_str()).copied().unwrap_or(0);
            let outs = outgoing.get(id.as_str()).copied().unwrap_or(0);
            if let Err(e) = classify(id, ins, outs) {
                errors.push(error("V4", e.to_string()));
            }
        }
    }

    errors
}
