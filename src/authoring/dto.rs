use serde::{Deserialize, Serialize};

// ── Top-level DTO ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinitionDto {
    pub id: String,
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

// ── Edge ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDto {
    pub from: String,
    pub to: String,
}

// ── Node (tagged enum) ──

/// Parallel gateways carry no direction: fork or join follows from the edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeDto {
    Start { id: String },
    End { id: String },
    ServiceTask { id: String, task_type: String },
    ParallelGateway { id: String },
}

impl NodeDto {
    pub fn id(&self) -> &str {
        match self {
            NodeDto::Start { id }
            | NodeDto::End { id }
            | NodeDto::ServiceTask { id, .. }
            | NodeDto::ParallelGateway { id } => id,
        }
    }
}
