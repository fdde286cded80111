use crate::context::ExecutionContext;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// User code behind a service task, registered by task type.
#[async_trait]
pub trait TaskDelegate: Send + Sync {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct DelegateRegistry {
    delegates: HashMap<String, Arc<dyn TaskDelegate>>,
}

impl DelegateRegistry {
    pub fn register(&mut self, task_type: impl Into<String>, delegate: Arc<dyn TaskDelegate>) {
        self.delegates.insert(task_type.into(), delegate);
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskDelegate>> {
        self.delegates.get(task_type).cloned()
    }

    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.delegates.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DelegateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.task_types().collect();
        types.sort_unstable();
        f.debug_struct("DelegateRegistry")
            .field("task_types", &types)
            .finish()
    }
}
