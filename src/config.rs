//! Engine configuration
//!
//! [`EngineOptions`] is the serializable part, loaded from YAML and/or the
//! environment. [`EngineConfig`] bundles the options with the collaborators
//! the gateway core talks to.

use crate::delegate::{DelegateRegistry, TaskDelegate};
use crate::error::{ConfigurationError, EngineResult};
use crate::lock::{LockStrategy, MemoryLockStrategy};
use crate::pool::WorkerPool;
use crate::store::ExecutionStore;
use crate::store_memory::MemoryExecutionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_SERVICE_ORCHESTRATION: &str = "GATEWAY_SERVICE_ORCHESTRATION";
pub const ENV_WORKER_THREADS: &str = "GATEWAY_WORKER_THREADS";
pub const ENV_LOCK_TIMEOUT_MS: &str = "GATEWAY_LOCK_TIMEOUT_MS";

fn default_lock_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Run parallel gateways in the stateless service-orchestration mode.
    #[serde(default)]
    pub service_orchestration: bool,
    /// Size of the branch worker pool. Absent = forks run sequentially.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// How long a join waits for the process-instance lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            service_orchestration: false,
            worker_threads: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl EngineOptions {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigurationError::InvalidOptions(e.to_string()))
    }

    /// Defaults overlaid with `GATEWAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        if let Some(raw) = lookup(ENV_SERVICE_ORCHESTRATION) {
            self.service_orchestration = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => return Err(invalid(ENV_SERVICE_ORCHESTRATION, other)),
            };
        }
        if let Some(raw) = lookup(ENV_WORKER_THREADS) {
            let threads: usize = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_WORKER_THREADS, &raw))?;
            self.worker_threads = (threads > 0).then_some(threads);
        }
        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.lock_timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_LOCK_TIMEOUT_MS, &raw))?;
        }
        Ok(self)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn invalid(key: &str, value: &str) -> ConfigurationError {
    ConfigurationError::InvalidOptions(format!("{key}: unsupported value '{value}'"))
}

/// Options plus the collaborators the gateway core uses.
pub struct EngineConfig {
    options: EngineOptions,
    worker_pool: Option<WorkerPool>,
    lock_strategy: Arc<dyn LockStrategy>,
    execution_store: Arc<dyn ExecutionStore>,
    delegates: DelegateRegistry,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn service_orchestration(&self) -> bool {
        self.options.service_orchestration
    }

    pub fn worker_pool(&self) -> Option<&WorkerPool> {
        self.worker_pool.as_ref()
    }

    pub fn lock_strategy(&self) -> &Arc<dyn LockStrategy> {
        &self.lock_strategy
    }

    pub fn execution_store(&self) -> &Arc<dyn ExecutionStore> {
        &self.execution_store
    }

    pub fn delegates(&self) -> &DelegateRegistry {
        &self.delegates
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("options", &self.options)
            .field("worker_pool", &self.worker_pool)
            .field("delegates", &self.delegates)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    options: EngineOptions,
    worker_pool: Option<WorkerPool>,
    lock_strategy: Option<Arc<dyn LockStrategy>>,
    execution_store: Option<Arc<dyn ExecutionStore>>,
    delegates: DelegateRegistry,
}

impl EngineConfigBuilder {
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn service_orchestration(mut self, enabled: bool) -> Self {
        self.options.service_orchestration = enabled;
        self
    }

    /// Use an explicit pool instead of building one from `worker_threads`.
    pub fn worker_pool(mut self, pool: WorkerPool) -> Self {
        self.worker_pool = Some(pool);
        self
    }

    pub fn lock_strategy(mut self, lock: Arc<dyn LockStrategy>) -> Self {
        self.lock_strategy = Some(lock);
        self
    }

    pub fn execution_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.execution_store = Some(store);
        self
    }

    pub fn delegate(mut self, task_type: impl Into<String>, delegate: Arc<dyn TaskDelegate>) -> Self {
        self.delegates.register(task_type, delegate);
        self
    }

    /// Missing collaborators default to the in-memory implementations. A pool
    /// sized by `worker_threads` is bound to the current tokio runtime.
    pub fn build(self) -> EngineResult<EngineConfig> {
        let worker_pool = match (self.worker_pool, self.options.worker_threads) {
            (Some(pool), _) => Some(pool),
            (None, Some(threads)) => Some(WorkerPool::new(threads)?),
            (None, None) => None,
        };
        let lock_strategy = self.lock_strategy.unwrap_or_else(|| {
            Arc::new(MemoryLockStrategy::new(self.options.lock_timeout()))
        });
        let execution_store = self
            .execution_store
            .unwrap_or_else(|| Arc::new(MemoryExecutionStore::new()));

        tracing::debug!(
            service_orchestration = self.options.service_orchestration,
            worker_threads = ?worker_pool.as_ref().map(WorkerPool::size),
            "engine configuration built"
        );

        Ok(EngineConfig {
            options: self.options,
            worker_pool,
            lock_strategy,
            execution_store,
            delegates: self.delegates,
        })
    }
}
