use crate::types::ExecutionRecord;
use std::collections::HashSet;
use uuid::Uuid;

/// Union of the in-memory and persisted views of an instance's records.
///
/// Records are matched by `execution_id`. When both views hold a record the
/// in-memory copy wins: it is the one this engine process last touched.
/// Persisted-only records come first, then every in-memory record in order.
pub fn merge_active(
    in_memory: &[ExecutionRecord],
    persisted: &[ExecutionRecord],
) -> Vec<ExecutionRecord> {
    let mut seen: HashSet<Uuid> = in_memory.iter().map(|r| r.execution_id).collect();

    let mut merged = Vec::with_capacity(in_memory.len() + persisted.len());
    for record in persisted {
        if seen.insert(record.execution_id) {
            merged.push(record.clone());
        }
    }
    merged.extend(in_memory.iter().cloned());
    merged
}
