//! The warehouse boundary: the executor issues resolved SQL and gets
//! opaque rows back. Row decoding into typed payloads is per-query
//! caller responsibility, so the seam stays schema-free.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures from executing or iterating a query at the warehouse.
///
/// Permission rejections are distinguished so callers can log them at a
/// lower severity; handling is otherwise identical to a generic failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("query execution failed: {0}")]
    Execution(String),
}

impl WarehouseError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, WarehouseError::PermissionDenied(_))
    }
}

/// Client capable of running a resolved query in a given location.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn execute(&self, sql: &str, location: &str) -> Result<Vec<Value>, WarehouseError>;
}
