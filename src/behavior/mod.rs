//! Activity behaviors
//!
//! One variant per [`ActivityKind`], picked when the activity is added to the
//! graph. Only the parallel gateway does real scheduling work; the event and
//! task behaviors are the minimum needed to drive branches through a graph.

pub mod gateway;

use crate::context::ExecutionContext;
use crate::engine::ProcessEngine;
use crate::error::{ConfigurationError, EngineError, EngineResult};
use crate::graph::ActivityKind;
use crate::types::{now_ms, ProcessState};
use gateway::ParallelGatewayBehavior;
use petgraph::graph::NodeIndex;
use std::sync::Arc;

/// What the walker does after entering a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnterOutcome {
    /// Leave the node and follow its outgoing transitions.
    Continue,
    /// The branch stops here. Nothing more runs on this call path.
    Suspended,
}

impl EnterOutcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, EnterOutcome::Suspended)
    }
}

#[derive(Clone, Debug)]
pub enum ActivityBehavior {
    StartEvent,
    EndEvent,
    ServiceTask { task_type: String },
    ParallelGateway(ParallelGatewayBehavior),
}

impl ActivityBehavior {
    pub(crate) fn resolve(kind: &ActivityKind) -> Self {
        match kind {
            ActivityKind::StartEvent => ActivityBehavior::StartEvent,
            ActivityKind::EndEvent => ActivityBehavior::EndEvent,
            ActivityKind::ServiceTask { task_type } => ActivityBehavior::ServiceTask {
                task_type: task_type.clone(),
            },
            ActivityKind::ParallelGateway => {
                ActivityBehavior::ParallelGateway(ParallelGatewayBehavior)
            }
        }
    }

    pub(crate) async fn enter(
        &self,
        engine: &ProcessEngine,
        ctx: &Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> EngineResult<EnterOutcome> {
        match self {
            ActivityBehavior::StartEvent => {
                let record = engine.record_entry(ctx, node).await?;
                engine.complete_execution(ctx, &record).await;
                Ok(EnterOutcome::Continue)
            }
            ActivityBehavior::EndEvent => {
                let record = engine.record_entry(ctx, node).await?;
                engine.complete_execution(ctx, &record).await;
                let instance = ctx.process_instance();
                if instance.active_executions().await.is_empty() {
                    instance
                        .set_state(ProcessState::Completed { at: now_ms() })
                        .await;
                    tracing::info!(
                        instance_id = %instance.instance_id,
                        activity_id = %record.activity_id,
                        "process instance completed"
                    );
                }
                Ok(EnterOutcome::Continue)
            }
            ActivityBehavior::ServiceTask { task_type } => {
                let delegate = ctx
                    .config()
                    .delegates()
                    .get(task_type)
                    .ok_or_else(|| ConfigurationError::UnknownDelegate(task_type.clone()))?;
                let record = engine.record_entry(ctx, node).await?;
                delegate
                    .execute(ctx)
                    .await
                    .map_err(|e| EngineError::Delegate {
                        task_type: task_type.clone(),
                        message: format!("{e:#}"),
                    })?;
                engine.complete_execution(ctx, &record).await;
                Ok(EnterOutcome::Continue)
            }
            ActivityBehavior::ParallelGateway(gateway) => gateway.enter(engine, ctx, node).await,
        }
    }
}
