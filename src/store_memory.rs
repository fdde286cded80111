use crate::store::ExecutionStore;
use crate::types::ExecutionRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process [`ExecutionStore`], shared between engine instances through an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    records: RwLock<HashMap<Uuid, Vec<ExecutionRecord>>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let instance_records = records.entry(record.process_instance_id).or_default();
        match instance_records
            .iter_mut()
            .find(|r| r.execution_id == record.execution_id)
        {
            Some(existing) => *existing = record.clone(),
            None => instance_records.push(record.clone()),
        }
        Ok(())
    }

    async fn find_active_executions(
        &self,
        process_instance_id: Uuid,
    ) -> Result<Vec<ExecutionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&process_instance_id)
            .map(|rs| rs.iter().filter(|r| r.active).cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_done(&self, record: &ExecutionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let instance_records = records.entry(record.process_instance_id).or_default();
        match instance_records
            .iter_mut()
            .find(|r| r.execution_id == record.execution_id)
        {
            Some(existing) => existing.active = false,
            None => {
                let mut done = record.clone();
                done.active = false;
                instance_records.push(done);
            }
        }
        Ok(())
    }

    async fn load_executions(&self, process_instance_id: Uuid) -> Result<Vec<ExecutionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&process_instance_id)
            .cloned()
            .unwrap_or_default())
    }
}
