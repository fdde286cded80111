//! Process walker
//!
//! Enters nodes, hands them to their behavior, and follows outgoing
//! transitions when the behavior says so. Branches that run on the worker
//! pool re-enter the walker from other tasks, hence the boxed `'static`
//! futures on [`ProcessEngine::enter`] and [`ProcessEngine::leave`].

pub use crate::behavior::EnterOutcome;

use crate::config::EngineConfig;
use crate::context::{ExecutionContext, Request};
use crate::error::{EngineError, EngineResult};
use crate::graph::ProcessGraph;
use crate::types::{ExecutionRecord, ProcessInstance};
use futures::future::BoxFuture;
use futures::FutureExt;
use petgraph::graph::NodeIndex;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ProcessEngine {
    graph: Arc<ProcessGraph>,
    config: Arc<EngineConfig>,
}

impl ProcessEngine {
    pub fn new(graph: impl Into<Arc<ProcessGraph>>, config: impl Into<Arc<EngineConfig>>) -> Self {
        Self {
            graph: graph.into(),
            config: config.into(),
        }
    }

    pub fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    /// Root context for a new call against `instance`.
    pub fn context(&self, request: Request, instance: Arc<ProcessInstance>) -> Arc<ExecutionContext> {
        Arc::new(ExecutionContext::new(
            request,
            instance,
            Arc::clone(&self.config),
        ))
    }

    /// Create an instance and run it from its start event until every branch
    /// has completed or paused.
    pub async fn start(&self, request: Request) -> EngineResult<Arc<ProcessInstance>> {
        let start = self.graph.start_event()?;
        let instance = Arc::new(ProcessInstance::new(self.graph.key()));
        tracing::info!(
            instance_id = %instance.instance_id,
            process_key = %instance.process_key,
            "starting process instance"
        );

        let ctx = self.context(request, Arc::clone(&instance));
        self.enter(ctx, start).await?;
        Ok(instance)
    }

    /// Run the node's behavior; on [`EnterOutcome::Continue`] leave it too.
    pub fn enter(
        &self,
        ctx: Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> BoxFuture<'static, EngineResult<EnterOutcome>> {
        let engine = self.clone();
        async move {
            let activity = engine.graph.activity(node)?;
            tracing::trace!(
                instance_id = %ctx.process_instance().instance_id,
                activity_id = %activity.id,
                "entering activity"
            );
            let outcome = activity.behavior().enter(&engine, &ctx, node).await?;
            if outcome == EnterOutcome::Continue {
                engine.leave(ctx, node).await?;
            }
            Ok(outcome)
        }
        .boxed()
    }

    /// Enter every outgoing target in transition order.
    pub fn leave(
        &self,
        ctx: Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> BoxFuture<'static, EngineResult<()>> {
        let engine = self.clone();
        async move {
            for target in engine.graph.outgoing(node) {
                engine.enter(Arc::clone(&ctx), target).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// New active record for `node` in the instance's in-memory view.
    pub async fn record_entry(
        &self,
        ctx: &ExecutionContext,
        node: NodeIndex,
    ) -> EngineResult<ExecutionRecord> {
        let activity = self.graph.activity(node)?;
        let instance = ctx.process_instance();
        let record = ExecutionRecord::new(instance.instance_id, activity.id.clone());
        instance.add_execution(record.clone()).await;
        Ok(record)
    }

    pub(crate) async fn complete_execution(&self, ctx: &ExecutionContext, record: &ExecutionRecord) {
        if !ctx.process_instance().mark_done(record.execution_id).await {
            tracing::warn!(
                execution_id = %record.execution_id,
                activity_id = %record.activity_id,
                "completed a record the instance never held"
            );
        }
    }

    /// Write the instance's whole in-memory view to the execution store.
    pub async fn persist(&self, instance: &ProcessInstance) -> EngineResult<()> {
        let store = self.config.execution_store();
        let records = instance.executions().await;
        for record in &records {
            store
                .save_execution(record)
                .await
                .map_err(EngineError::storage)?;
        }
        tracing::debug!(
            instance_id = %instance.instance_id,
            records = records.len(),
            "process instance persisted"
        );
        Ok(())
    }
}
