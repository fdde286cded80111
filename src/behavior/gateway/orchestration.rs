//! Service-orchestration fast path
//!
//! The fork runs each branch on its own copy of the context, waits on a
//! countdown latch, then takes the join that the first branch reached and
//! continues past it once, on the dispatching call. Joins do no counting at
//! all: a branch entering one only records which join it hit.
//!
//! Every branch is assumed to converge on the same join. Siblings that
//! report a different join are logged, not reconciled.

use super::ParallelGatewayBehavior;
use crate::context::ExecutionContext;
use crate::engine::ProcessEngine;
use crate::error::{ConfigurationError, EngineResult};
use crate::latch::CountDownLatch;
use crate::pool::{branch_failed, interrupted, release_permit_while};
use petgraph::graph::NodeIndex;
use std::sync::Arc;

impl ParallelGatewayBehavior {
    pub(crate) async fn orchestrate_fork(
        &self,
        engine: &ProcessEngine,
        ctx: &Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> EngineResult<()> {
        let graph = engine.graph();
        let fork_id = &graph.activity(node)?.id;
        let pool = ctx
            .config()
            .worker_pool()
            .ok_or_else(|| ConfigurationError::MissingWorkerPool(fork_id.clone()))?;
        let wait = ctx.latch_wait_time()?;
        let targets = graph.outgoing(node);
        let instance_id = ctx.process_instance().instance_id;

        let latch = Arc::new(CountDownLatch::new(targets.len()));
        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            let label = graph.activity(target)?.id.clone();
            let branch = Arc::new(ctx.branch());
            let countdown = latch.guard();
            let entered = engine.enter(Arc::clone(&branch), target);
            let handle = pool.submit(&label, async move {
                let _countdown = countdown;
                entered.await?;
                Ok(branch.handoff().take().await)
            })?;
            handles.push((label, handle));
        }

        tracing::debug!(
            instance_id = %instance_id,
            fork = %fork_id,
            branches = handles.len(),
            wait_ms = ?wait.map(|d| d.as_millis()),
            "orchestrated fork dispatched"
        );

        // A fork nested inside an orchestrated branch waits here from a pool task.
        let all_settled = release_permit_while(async {
            match wait {
                Some(timeout) => latch.wait_timeout(timeout).await,
                None => {
                    latch.wait().await;
                    true
                }
            }
        })
        .await;

        let mut handles = handles.into_iter();
        let Some((first_label, first)) = handles.next() else {
            return Ok(());
        };

        if !all_settled {
            tracing::warn!(
                instance_id = %instance_id,
                fork = %fork_id,
                outstanding = latch.count(),
                "latch wait timed out, outstanding branches keep running"
            );
            if !first.is_finished() {
                tracing::warn!(
                    instance_id = %instance_id,
                    fork = %fork_id,
                    branch = %first_label,
                    "first branch still running, not continuing past the join"
                );
                return Ok(());
            }
        }

        let arrived_at = match first.await {
            Ok(Ok(arrived_at)) => arrived_at,
            Ok(Err(err)) => return Err(branch_failed(first_label, err).into()),
            Err(join_err) => return Err(interrupted(first_label, join_err).into()),
        };

        // Finished siblings still get their failures surfaced; unfinished
        // ones are detached and left to run.
        for (label, handle) in handles {
            if !handle.is_finished() {
                continue;
            }
            match handle.await {
                Ok(Ok(other)) if other != arrived_at => {
                    tracing::warn!(
                        instance_id = %instance_id,
                        fork = %fork_id,
                        branch = %label,
                        "branch reached a different join than the first branch"
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => return Err(branch_failed(label, err).into()),
                Err(join_err) => return Err(interrupted(label, join_err).into()),
            }
        }

        match arrived_at {
            Some(join) => {
                tracing::debug!(
                    instance_id = %instance_id,
                    fork = %fork_id,
                    join = %graph.activity(join)?.id,
                    "continuing past orchestrated join"
                );
                engine.leave(Arc::clone(ctx), join).await
            }
            None => {
                tracing::warn!(
                    instance_id = %instance_id,
                    fork = %fork_id,
                    branch = %first_label,
                    "first branch reached no join, nothing to continue"
                );
                Ok(())
            }
        }
    }

    /// A branch arriving at a join: note where it is and stop.
    pub(crate) async fn orchestrate_join(&self, ctx: &ExecutionContext, node: NodeIndex) {
        tracing::trace!(
            instance_id = %ctx.process_instance().instance_id,
            join = ?node,
            "branch parked at orchestrated join"
        );
        ctx.handoff().set(node).await;
    }
}
