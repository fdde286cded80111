//! Parallel gateway core for a process-execution engine.
//!
//! A parallel gateway either forks one incoming branch into several
//! concurrent ones or joins several branches back into one. This crate holds
//! that scheduling core plus the small walker and collaborators needed to run
//! it:
//!
//! - [`behavior::gateway`]: fork/join classification, default-mode fork and
//!   join, the service-orchestration fast path, record merging
//! - [`engine::ProcessEngine`]: enters and leaves graph nodes
//! - [`store`], [`lock`], [`pool`], [`latch`]: the collaborators the gateway
//!   talks to, each with an in-process implementation
//! - [`authoring`]: YAML definitions to validated [`graph::ProcessGraph`]s

pub mod authoring;
pub mod behavior;
pub mod config;
pub mod context;
pub mod delegate;
pub mod engine;
pub mod error;
pub mod graph;
pub mod latch;
pub mod lock;
pub mod pool;
pub mod store;
pub mod store_memory;
pub mod telemetry;
pub mod types;

pub use behavior::gateway::{classify, merge_active, GatewayShape, JoinDecision, ParallelGatewayBehavior};
pub use behavior::EnterOutcome;
pub use config::{EngineConfig, EngineOptions};
pub use context::{ExecutionContext, Request};
pub use engine::ProcessEngine;
pub use error::{ConcurrencyFailure, ConfigurationError, EngineError, EngineResult};
pub use types::{ExecutionRecord, ProcessInstance, ProcessState};
