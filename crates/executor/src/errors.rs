use scanlens_core::{QueryName, ResolveError, TimeRange};
use thiserror::Error;

use crate::client::WarehouseError;

/// Failures raised while running recommendation queries, labeled with
/// the (query, window) pair that produced them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("resolving {query} for {time_range}: {source}")]
    Resolve {
        query: QueryName,
        time_range: TimeRange,
        #[source]
        source: ResolveError,
    },
    #[error("executing {query} for {time_range}: {source}")]
    Warehouse {
        query: QueryName,
        time_range: TimeRange,
        #[source]
        source: WarehouseError,
    },
    #[error("worker task failed: {0}")]
    Join(String),
}

impl ExecutorError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ExecutorError::Warehouse { source, .. } if source.is_permission_denied())
    }
}
