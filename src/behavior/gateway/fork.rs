use super::ParallelGatewayBehavior;
use crate::context::ExecutionContext;
use crate::engine::ProcessEngine;
use crate::error::EngineResult;
use petgraph::graph::NodeIndex;
use std::sync::Arc;

impl ParallelGatewayBehavior {
    /// Drive every outgoing branch of a fork to its next pause point.
    ///
    /// Without a worker pool the branches run one after another on the calling
    /// task, in transition order, and the first failure stops the rest. With a
    /// pool they run concurrently and the fork returns once all of them have
    /// settled. All branches share the caller's context.
    pub(crate) async fn fork(
        &self,
        engine: &ProcessEngine,
        ctx: &Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> EngineResult<()> {
        let graph = engine.graph();
        let fork_id = &graph.activity(node)?.id;
        let targets = graph.outgoing(node);

        let Some(pool) = ctx.config().worker_pool() else {
            tracing::debug!(
                instance_id = %ctx.process_instance().instance_id,
                fork = %fork_id,
                branches = targets.len(),
                "fork running branches sequentially"
            );
            for target in targets {
                engine.enter(Arc::clone(ctx), target).await?;
            }
            return Ok(());
        };

        let mut tasks = Vec::with_capacity(targets.len());
        for target in targets {
            let label = graph.activity(target)?.id.clone();
            tasks.push((label, engine.enter(Arc::clone(ctx), target)));
        }

        tracing::debug!(
            instance_id = %ctx.process_instance().instance_id,
            fork = %fork_id,
            branches = tasks.len(),
            pool_size = pool.size(),
            "fork dispatching branches to worker pool"
        );
        pool.invoke_all(tasks).await?;
        Ok(())
    }
}
