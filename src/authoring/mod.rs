//! Authoring: YAML process definitions to runtime graphs.

pub mod dto;
pub mod dto_to_graph;
pub mod validate;
pub mod yaml;

pub use dto_to_graph::build_graph;
pub use validate::{validate_dto, ValidationError};
pub use yaml::parse_process_yaml;

use crate::error::ConfigurationError;
use crate::graph::ProcessGraph;

/// Parse, validate and build in one step.
pub fn graph_from_yaml(yaml_str: &str) -> Result<ProcessGraph, ConfigurationError> {
    let dto = parse_process_yaml(yaml_str)
        .map_err(|e| ConfigurationError::InvalidDefinition(format!("{e:#}")))?;
    build_graph(&dto)
}
