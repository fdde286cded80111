//! Worker pool for parallel branch tasks
//!
//! A thin layer over a tokio runtime handle: a semaphore bounds how many
//! branch tasks run at once, and closing it rejects further submissions.
//!
//! A branch task that blocks on its own child branches (a second fork
//! further down the branch, or a nested one) hands its permit back for the
//! duration of the wait, so a pool of any size makes progress.

use crate::error::{ConcurrencyFailure, ConfigurationError, EngineError, EngineResult};
use std::cell::Cell;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle};

tokio::task_local! {
    static PERMIT: PermitSlot;
}

/// The permit a pool task runs under, with the semaphore it came from.
struct PermitSlot {
    permits: Arc<Semaphore>,
    held: Cell<Option<OwnedSemaphorePermit>>,
}

#[derive(Clone, Debug)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Pool on the runtime the caller is running in.
    pub fn new(size: usize) -> EngineResult<Self> {
        let handle = Handle::try_current().map_err(|e| {
            ConfigurationError::InvalidOptions(format!("worker pool needs a tokio runtime: {e}"))
        })?;
        Self::with_handle(handle, size)
    }

    pub fn with_handle(handle: Handle, size: usize) -> EngineResult<Self> {
        if size == 0 {
            return Err(
                ConfigurationError::InvalidOptions("worker pool size must be > 0".into()).into(),
            );
        }
        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shutdown(&self) -> bool {
        self.permits.is_closed()
    }

    /// Stop accepting work. Tasks already running are left alone; tasks still
    /// waiting for a permit fail with a rejection.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    /// Submit one task. The returned handle resolves to the task's own result.
    pub fn submit<T, F>(&self, label: &str, task: F) -> EngineResult<JoinHandle<EngineResult<T>>>
    where
        T: Send + 'static,
        F: Future<Output = EngineResult<T>> + Send + 'static,
    {
        if self.permits.is_closed() {
            return Err(ConcurrencyFailure::Rejected(format!(
                "worker pool is shut down, cannot run branch into '{label}'"
            ))
            .into());
        }

        let permits = self.permits.clone();
        let label = label.to_string();
        Ok(self.handle.spawn(async move {
            let permit = permits.clone().acquire_owned().await.map_err(|_| {
                ConcurrencyFailure::Rejected(format!(
                    "worker pool shut down before branch into '{label}' started"
                ))
            })?;
            let slot = PermitSlot {
                permits,
                held: Cell::new(Some(permit)),
            };
            PERMIT.scope(slot, task).await
        }))
    }

    /// Submit every task and wait for all of them.
    ///
    /// Results come back in submission order. If any task fails, the first
    /// failure (in submission order) is returned once every task has settled;
    /// work already done by sibling tasks is not undone.
    pub async fn invoke_all<T, F>(&self, tasks: Vec<(String, F)>) -> EngineResult<Vec<T>>
    where
        T: Send + 'static,
        F: Future<Output = EngineResult<T>> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(tasks.len());
        for (label, task) in tasks {
            let handle = self.submit(&label, task)?;
            handles.push((label, handle));
        }

        let (results, first_failure) = release_permit_while(async move {
            let mut results = Vec::with_capacity(handles.len());
            let mut first_failure: Option<ConcurrencyFailure> = None;
            for (label, handle) in handles {
                let failure = match handle.await {
                    Ok(Ok(value)) => {
                        results.push(value);
                        continue;
                    }
                    Ok(Err(err)) => branch_failed(label, err),
                    Err(join_err) => interrupted(label, join_err),
                };
                tracing::error!(error = %failure, "branch task failed");
                if first_failure.is_none() {
                    first_failure = Some(failure);
                }
            }
            (results, first_failure)
        })
        .await;

        match first_failure {
            Some(failure) => Err(failure.into()),
            None => Ok(results),
        }
    }
}

/// Run `wait` without holding the calling pool task's permit.
///
/// Outside a pool task this just awaits `wait`. Inside one, the permit is
/// returned to its semaphore first and taken back once `wait` completes. If
/// the pool was shut down in between, the task finishes without a permit.
pub(crate) async fn release_permit_while<F: Future>(wait: F) -> F::Output {
    let released = PERMIT
        .try_with(|slot| slot.held.take().map(|_| Arc::clone(&slot.permits)))
        .ok()
        .flatten();
    if released.is_some() {
        tracing::trace!("pool task released its permit while waiting on child branches");
    }

    let output = wait.await;

    if let Some(permits) = released {
        match permits.acquire_owned().await {
            Ok(permit) => {
                // Still inside the same task scope, so the slot is there.
                let _ = PERMIT.try_with(|slot| slot.held.set(Some(permit)));
            }
            Err(_) => tracing::debug!("worker pool shut down while a branch task was waiting"),
        }
    }
    output
}

pub(crate) fn branch_failed(target: String, err: EngineError) -> ConcurrencyFailure {
    ConcurrencyFailure::BranchFailed {
        target,
        source: Box::new(err),
    }
}

pub(crate) fn interrupted(target: String, err: JoinError) -> ConcurrencyFailure {
    let reason = if err.is_cancelled() {
        "task was cancelled".to_string()
    } else {
        format!("task panicked: {err}")
    };
    ConcurrencyFailure::Interrupted { target, reason }
}
