use super::dto::ProcessDefinitionDto;
use anyhow::Result;

/// Parse a YAML string into a ProcessDefinitionDto.
///
/// No validation here; [`super::build_graph`] validates before building.
pub fn parse_process_yaml(yaml_str: &str) -> Result<ProcessDefinitionDto> {
    let dto: ProcessDefinitionDto = serde_yaml::from_str(yaml_str)?;
    Ok(dto)
}
