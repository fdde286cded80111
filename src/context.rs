//! Execution context
//!
//! The carrier handed to every behavior: request data, the owning process
//! instance, and the engine configuration. All of it is immutable or
//! internally synchronized, so one context can be shared across branches.
//! [`ExecutionContext::branch`] makes the isolated per-branch copy used by
//! service orchestration.

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::types::ProcessInstance;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-call request data.
pub type Request = BTreeMap<String, serde_json::Value>;

/// Request key bounding the orchestration latch wait, in milliseconds.
pub const LATCH_WAIT_TIME_MS: &str = "latch_wait_time_ms";

/// The join activity a branch last arrived at.
///
/// Each branch context owns its own cell; the branch task reads it with
/// [`HandoffCell::take`] and returns the value as its result, so nothing
/// depends on which thread ran the branch.
#[derive(Debug, Default)]
pub struct HandoffCell {
    arrived_at: Mutex<Option<NodeIndex>>,
}

impl HandoffCell {
    pub async fn set(&self, join: NodeIndex) {
        *self.arrived_at.lock().await = Some(join);
    }

    pub async fn get(&self) -> Option<NodeIndex> {
        *self.arrived_at.lock().await
    }

    /// Read and clear.
    pub async fn take(&self) -> Option<NodeIndex> {
        self.arrived_at.lock().await.take()
    }
}

pub struct ExecutionContext {
    request: Arc<Request>,
    process_instance: Arc<ProcessInstance>,
    config: Arc<EngineConfig>,
    handoff: HandoffCell,
}

impl ExecutionContext {
    pub fn new(
        request: Request,
        process_instance: Arc<ProcessInstance>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            request: Arc::new(request),
            process_instance,
            config,
            handoff: HandoffCell::default(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn process_instance(&self) -> &Arc<ProcessInstance> {
        &self.process_instance
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn handoff(&self) -> &HandoffCell {
        &self.handoff
    }

    /// Independent copy for one orchestrated branch: its own request map and
    /// an empty handoff cell. The process instance and configuration are shared.
    pub fn branch(&self) -> Self {
        Self {
            request: Arc::new(self.request.as_ref().clone()),
            process_instance: Arc::clone(&self.process_instance),
            config: Arc::clone(&self.config),
            handoff: HandoffCell::default(),
        }
    }

    /// Latch wait bound from the request. `None` means wait indefinitely.
    pub fn latch_wait_time(&self) -> Result<Option<Duration>, ConfigurationError> {
        match self.request.get(LATCH_WAIT_TIME_MS) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|ms| Some(Duration::from_millis(ms)))
                .ok_or_else(|| ConfigurationError::InvalidRequestOption {
                    key: LATCH_WAIT_TIME_MS.to_string(),
                    reason: format!("expected a non-negative integer, got {value}"),
                }),
        }
    }
}
