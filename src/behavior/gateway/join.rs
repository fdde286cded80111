use super::{merge_active, ParallelGatewayBehavior};
use crate::context::ExecutionContext;
use crate::engine::ProcessEngine;
use crate::error::{EngineError, EngineResult};
use crate::types::ExecutionRecord;
use petgraph::graph::NodeIndex;
use uuid::Uuid;

/// Result of one branch arriving at a join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinDecision {
    /// Every incoming branch has arrived. The caller continues past the join.
    Complete,
    /// Still waiting on other branches. The caller's branch ends here.
    Wait,
}

impl ParallelGatewayBehavior {
    /// Record one branch's arrival at a join and decide whether the join fires.
    ///
    /// Runs under the process-instance lock keyed by the instance id, so
    /// concurrent arrivals (in this engine process or another one sharing the
    /// lock and store) see each other's records. Exactly one arrival among
    /// the incoming branches gets [`JoinDecision::Complete`]. The lock is
    /// released on every path, including a failed acquire.
    pub async fn join(
        &self,
        engine: &ProcessEngine,
        ctx: &ExecutionContext,
        node: NodeIndex,
    ) -> EngineResult<JoinDecision> {
        let key = ctx.process_instance().instance_id.to_string();
        let owner = Uuid::now_v7();
        let lock = ctx.config().lock_strategy();

        let decision = match lock.try_lock(&key, owner).await {
            Ok(()) => self.synchronize(engine, ctx, node).await,
            Err(e) => Err(EngineError::LockAcquisition {
                key: key.clone(),
                reason: format!("{e:#}"),
            }),
        };
        let released = lock.unlock(&key, owner).await;

        match (decision, released) {
            (Ok(decision), Ok(())) => Ok(decision),
            (Ok(_), Err(e)) => Err(EngineError::LockRelease {
                key,
                reason: format!("{e:#}"),
            }),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                let release_err = format!("{release_err:#}");
                tracing::warn!(
                    key = %key,
                    error = %release_err,
                    "lock release failed after join error"
                );
                Err(err)
            }
        }
    }

    /// The locked part of [`Self::join`].
    async fn synchronize(
        &self,
        engine: &ProcessEngine,
        ctx: &ExecutionContext,
        node: NodeIndex,
    ) -> EngineResult<JoinDecision> {
        let graph = engine.graph();
        let join_id = &graph.activity(node)?.id;
        let expected = graph.incoming_count(node);
        let instance = ctx.process_instance();
        let store = ctx.config().execution_store();

        let arrival = engine.record_entry(ctx, node).await?;
        if let Err(e) = store.save_execution(&arrival).await {
            // Never leave an arrival active in memory that the store lacks.
            engine.complete_execution(ctx, &arrival).await;
            return Err(EngineError::storage(e));
        }

        // The whole in-memory view goes into the merge, so a record this
        // process already retired shadows a stale active copy in the store.
        let in_memory = instance.executions().await;
        let persisted = store
            .find_active_executions(instance.instance_id)
            .await
            .map_err(EngineError::storage)?;
        let arrived: Vec<ExecutionRecord> = merge_active(&in_memory, &persisted)
            .into_iter()
            .filter(|r| r.is_active_at(join_id))
            .collect();

        tracing::debug!(
            instance_id = %instance.instance_id,
            join = %join_id,
            execution_id = %arrival.execution_id,
            arrived = arrived.len(),
            expected,
            "branch arrived at join"
        );

        if arrived.len() != expected {
            if arrived.len() > expected {
                tracing::warn!(
                    instance_id = %instance.instance_id,
                    join = %join_id,
                    arrived = arrived.len(),
                    expected,
                    "more arrivals than incoming transitions; join will not fire"
                );
            }
            return Ok(JoinDecision::Wait);
        }

        // The join consumes every arrival in memory before touching the
        // store, and every store write is attempted even after one fails.
        for record in &arrived {
            instance.mark_done(record.execution_id).await;
        }
        let mut first_failure = None;
        for record in &arrived {
            if let Err(e) = store.mark_done(record).await {
                let error = format!("{e:#}");
                tracing::warn!(
                    instance_id = %instance.instance_id,
                    join = %join_id,
                    execution_id = %record.execution_id,
                    error = %error,
                    "could not mark arrival done in the store"
                );
                first_failure.get_or_insert(e);
            }
        }
        if let Some(e) = first_failure {
            return Err(EngineError::storage(e));
        }

        tracing::info!(
            instance_id = %instance.instance_id,
            join = %join_id,
            branches = expected,
            "join complete"
        );
        Ok(JoinDecision::Complete)
    }
}
