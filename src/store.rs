use crate::types::ExecutionRecord;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence trait for execution records.
///
/// This is the durable view of an instance's records. The gateway core reads
/// it next to the in-memory view on [`crate::types::ProcessInstance`] and
/// merges the two; backends are free to double-write, the merge dedupes.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert or replace a record, keyed by `execution_id`.
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<()>;

    /// Active records of one process instance, any activity.
    async fn find_active_executions(&self, process_instance_id: Uuid)
        -> Result<Vec<ExecutionRecord>>;

    /// Flag a record done. Idempotent; a record the store never saw is
    /// stored as done.
    async fn mark_done(&self, record: &ExecutionRecord) -> Result<()>;

    /// Every record of one process instance, done or not.
    async fn load_executions(&self, process_instance_id: Uuid) -> Result<Vec<ExecutionRecord>>;
}
