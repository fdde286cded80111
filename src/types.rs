use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

// ─── Scalar aliases ───────────────────────────────────────────

/// Epoch milliseconds (UTC).
pub type Timestamp = i64;

// ─── Execution records ────────────────────────────────────────

/// A token saying "one branch is currently parked at activity X".
///
/// Identity is `execution_id`: two records with the same id are two views of
/// the same logical record, whatever their `active` flags say.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: Uuid,
    pub process_instance_id: Uuid,
    /// Definition id of the activity the branch is parked at.
    pub activity_id: String,
    pub active: bool,
    pub created_at: Timestamp,
}

impl ExecutionRecord {
    pub fn new(process_instance_id: Uuid, activity_id: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::now_v7(),
            process_instance_id,
            activity_id: activity_id.into(),
            active: true,
            created_at: now_ms(),
        }
    }

    /// Same logical record, regardless of which view it came from.
    pub fn same_as(&self, other: &ExecutionRecord) -> bool {
        self.execution_id == other.execution_id
    }

    pub fn is_active_at(&self, activity_id: &str) -> bool {
        self.active && self.activity_id == activity_id
    }
}

// ─── Process instance ─────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ProcessState {
    Running,
    Completed { at: Timestamp },
}

/// One running instantiation of a process definition.
///
/// Holds the in-memory view of the instance's execution records: the ones
/// created (or touched) by this engine process. The durable view lives behind
/// [`crate::store::ExecutionStore`].
#[derive(Debug)]
pub struct ProcessInstance {
    pub instance_id: Uuid,
    pub process_key: String,
    pub created_at: Timestamp,
    state: RwLock<ProcessState>,
    executions: RwLock<Vec<ExecutionRecord>>,
}

impl ProcessInstance {
    pub fn new(process_key: impl Into<String>) -> Self {
        Self::with_id(Uuid::now_v7(), process_key)
    }

    /// A view onto an existing instance, e.g. one loaded by another engine process.
    pub fn with_id(instance_id: Uuid, process_key: impl Into<String>) -> Self {
        Self {
            instance_id,
            process_key: process_key.into(),
            created_at: now_ms(),
            state: RwLock::new(ProcessState::Running),
            executions: RwLock::new(Vec::new()),
        }
    }

    pub async fn state(&self) -> ProcessState {
        self.state.read().await.clone()
    }

    pub(crate) async fn set_state(&self, state: ProcessState) {
        *self.state.write().await = state;
    }

    /// Append a record to the in-memory view.
    pub async fn add_execution(&self, record: ExecutionRecord) {
        self.executions.write().await.push(record);
    }

    /// Active records in the in-memory view.
    pub async fn active_executions(&self) -> Vec<ExecutionRecord> {
        self.executions
            .read()
            .await
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect()
    }

    /// Every record in the in-memory view, done or not.
    pub async fn executions(&self) -> Vec<ExecutionRecord> {
        self.executions.read().await.clone()
    }

    /// Mark a record done in the in-memory view. Returns false if this view
    /// never held the record.
    pub async fn mark_done(&self, execution_id: Uuid) -> bool {
        let mut executions = self.executions.write().await;
        match executions
            .iter_mut()
            .find(|r| r.execution_id == execution_id)
        {
            Some(record) => {
                record.active = false;
                true
            }
            None => false,
        }
    }
}

pub(crate) fn now_ms() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
