//! Parallel gateway
//!
//! A parallel gateway is a fork or a join depending only on its edges:
//! one incoming and several outgoing is a fork, several incoming and one
//! outgoing is a join. Anything else is a broken definition.
//!
//! Two runtime modes:
//! - default: forks drive every branch (sequentially, or on the worker pool)
//!   and joins count arrivals under the process-instance lock;
//! - service orchestration: forks run branches on isolated contexts behind a
//!   countdown latch, and joins only record where the branch arrived.

mod fork;
mod join;
mod merge;
mod orchestration;

pub use join::JoinDecision;
pub use merge::merge_active;

use super::EnterOutcome;
use crate::context::ExecutionContext;
use crate::engine::ProcessEngine;
use crate::error::{ConfigurationError, EngineResult};
use petgraph::graph::NodeIndex;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayShape {
    Fork,
    Join,
}

/// Decide a gateway's role from its edge counts.
pub fn classify(
    activity_id: &str,
    incoming: usize,
    outgoing: usize,
) -> Result<GatewayShape, ConfigurationError> {
    match (incoming, outgoing) {
        (1, out) if out >= 2 => Ok(GatewayShape::Fork),
        (inc, 1) if inc >= 2 => Ok(GatewayShape::Join),
        _ => Err(ConfigurationError::MalformedGateway {
            activity_id: activity_id.to_string(),
            incoming,
            outgoing,
        }),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelGatewayBehavior;

impl ParallelGatewayBehavior {
    pub(crate) async fn enter(
        &self,
        engine: &ProcessEngine,
        ctx: &Arc<ExecutionContext>,
        node: NodeIndex,
    ) -> EngineResult<EnterOutcome> {
        let graph = engine.graph();
        let activity = graph.activity(node)?;
        let shape = classify(
            &activity.id,
            graph.incoming_count(node),
            graph.outgoing_count(node),
        )?;

        if ctx.config().service_orchestration() {
            match shape {
                GatewayShape::Fork => self.orchestrate_fork(engine, ctx, node).await?,
                GatewayShape::Join => self.orchestrate_join(ctx, node).await,
            }
            // The continuation past the join already ran on the dispatching
            // call, so the gateway always reports a pause upstream.
            return Ok(EnterOutcome::Suspended);
        }

        match shape {
            GatewayShape::Fork => {
                self.fork(engine, ctx, node).await?;
                // Every branch has been driven already; the walker must not
                // follow the outgoing transitions a second time.
                Ok(EnterOutcome::Suspended)
            }
            GatewayShape::Join => match self.join(engine, ctx, node).await? {
                JoinDecision::Complete => Ok(EnterOutcome::Continue),
                JoinDecision::Wait => Ok(EnterOutcome::Suspended),
            },
        }
    }
}
