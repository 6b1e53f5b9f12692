//! Concurrent execution of the recommendation query catalog against a
//! warehouse client.

pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod fanout;
pub mod transform;

pub use client::{WarehouseClient, WarehouseError};
pub use config::ExecutorConfig;
pub use errors::ExecutorError;
pub use executor::RecommendationExecutor;
pub use fanout::{FailurePolicy, FanOut, TaskFuture};
pub use transform::{to_payload, TotalPrice, TransformerContext};
