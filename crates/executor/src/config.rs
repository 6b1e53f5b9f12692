/// Configuration for the recommendation executor.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently running query tasks across one
    /// fan-out. `None` runs every task at once.
    pub max_concurrency: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_concurrency: Some(16) }
    }
}
