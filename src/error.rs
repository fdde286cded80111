//! Engine error types
//!
//! Every failure raised inside the gateway core is folded into [`EngineError`]
//! before it crosses the crate boundary, so callers have one catch point.

/// Malformed process definitions and engine setup mistakes. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "parallel gateway '{activity_id}' is neither fork nor join shaped \
         ({incoming} incoming, {outgoing} outgoing)"
    )]
    MalformedGateway {
        activity_id: String,
        incoming: usize,
        outgoing: usize,
    },

    #[error("Unknown activity: {0}")]
    UnknownActivity(String),

    #[error("No task delegate registered for task type '{0}'")]
    UnknownDelegate(String),

    #[error("Service orchestration requires a worker pool (gateway '{0}')")]
    MissingWorkerPool(String),

    #[error("Invalid request option '{key}': {reason}")]
    InvalidRequestOption { key: String, reason: String },

    #[error("Invalid process definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid engine options: {0}")]
    InvalidOptions(String),
}

/// A branch task raised, was interrupted, or could not be submitted.
#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyFailure {
    #[error("branch into '{target}' failed: {source}")]
    BranchFailed {
        target: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("branch into '{target}' was interrupted: {reason}")]
    Interrupted { target: String, reason: String },

    #[error("worker pool rejected submission: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Concurrency failure: {0}")]
    Concurrency(#[from] ConcurrencyFailure),

    #[error("Failed to acquire lock '{key}': {reason}")]
    LockAcquisition { key: String, reason: String },

    #[error("Failed to release lock '{key}': {reason}")]
    LockRelease { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task '{task_type}' failed: {message}")]
    Delegate { task_type: String, message: String },
}

impl EngineError {
    /// Wrap a collaborator (store) failure, keeping the full context chain.
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        EngineError::Storage(format!("{err:#}"))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, EngineError::Concurrency(_))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_gateway_message_names_activity() {
        let err: EngineError = ConfigurationError::MalformedGateway {
            activity_id: "gw_1".to_string(),
            incoming: 1,
            outgoing: 1,
        }
        .into();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("gw_1"), "message should name the gateway: {msg}");
        assert!(msg.contains("1 incoming"));
    }

    #[test]
    fn test_branch_failure_keeps_source_chain() {
        let inner = EngineError::Delegate {
            task_type: "charge_card".to_string(),
            message: "declined".to_string(),
        };
        let err: EngineError = ConcurrencyFailure::BranchFailed {
            target: "task_b".to_string(),
            source: Box::new(inner),
        }
        .into();
        assert!(err.is_concurrency());
        let source = std::error::Error::source(&err).expect("concurrency source");
        assert!(source.to_string().contains("task_b"));
    }

    #[test]
    fn test_storage_error_keeps_context() {
        let err = EngineError::storage(anyhow::anyhow!("disk full").context("save_execution"));
        assert_eq!(err.to_string(), "Storage error: save_execution: disk full");
    }
}
