//! Fans the query catalog out against the warehouse and folds the
//! results into one recommendation summary.
//!
//! Three task shapes share the generic fan-out:
//! - plain queries: one task per (query, window) pair, best-effort;
//! - slots batches (billing-project / user): the primary metric and its
//!   breakdowns run all-or-nothing, partial slot data is useless;
//! - on-demand dimensions: each dimension runs its primary query plus
//!   its breakdown sub-queries best-effort, a failed part leaves a null
//!   slot in the dimension's payload and never fails the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scanlens_core::query::{
    billing_project_slots_queries, on_demand_billing_project_queries, on_demand_dataset_queries,
    on_demand_project_queries, on_demand_user_queries, queries_per_mode, should_skip,
    user_slots_queries,
};
use scanlens_core::resolver;
use scanlens_core::summary::{aggregate, RecommendationSummary, TimeRangeRecommendation};
use scanlens_core::{QueryName, Replacements, TimeRange};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::WarehouseClient;
use crate::config::ExecutorConfig;
use crate::errors::ExecutorError;
use crate::fanout::{FailurePolicy, FanOut, TaskFuture};
use crate::transform::{to_payload, TransformerContext};

pub struct RecommendationExecutor<C> {
    client: Arc<C>,
    config: ExecutorConfig,
}

impl<C: WarehouseClient + 'static> RecommendationExecutor<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, ExecutorConfig::default())
    }

    pub fn with_config(client: Arc<C>, config: ExecutorConfig) -> Self {
        Self { client, config }
    }

    /// Runs every applicable catalog query for every observation window.
    ///
    /// The batch as a whole is best-effort: per-task failures come back
    /// in the error list while the rest of the summary stands. An
    /// all-or-nothing sub-batch that fails contributes one error and no
    /// partial payload.
    pub async fn execute(
        &self,
        replacements: &Replacements,
        ctx: &TransformerContext,
        has_table_discovery: bool,
        now: DateTime<Utc>,
    ) -> (RecommendationSummary, Vec<ExecutorError>) {
        let replacements = Arc::new(replacements.clone());
        let ctx = Arc::new(ctx.clone());
        let mut tasks: Vec<TaskFuture<RecommendationSummary>> = Vec::new();

        for time_range in TimeRange::ALL {
            for queries in queries_per_mode().values() {
                for (&query, &template) in queries {
                    if should_skip(query, time_range, &replacements, has_table_discovery) {
                        debug!(%query, %time_range, "skipping query");
                        continue;
                    }

                    match query {
                        QueryName::BillingProjectSlots
                        | QueryName::StandardBillingProjectSlots
                        | QueryName::EnterpriseBillingProjectSlots
                        | QueryName::EnterprisePlusBillingProjectSlots => {
                            tasks.push(self.slots_batch_task(
                                query,
                                template,
                                billing_project_slots_batch(),
                                time_range,
                                Arc::clone(&replacements),
                                now,
                            ));
                        }
                        QueryName::UserSlots
                        | QueryName::StandardUserSlots
                        | QueryName::EnterpriseUserSlots
                        | QueryName::EnterprisePlusUserSlots => {
                            tasks.push(self.slots_batch_task(
                                query,
                                template,
                                user_slots_batch(),
                                time_range,
                                Arc::clone(&replacements),
                                now,
                            ));
                        }
                        QueryName::BillingProject
                        | QueryName::Project
                        | QueryName::Dataset
                        | QueryName::User => {
                            tasks.push(self.on_demand_dimension_task(
                                query,
                                template,
                                on_demand_breakdowns(query),
                                time_range,
                                Arc::clone(&replacements),
                                Arc::clone(&ctx),
                                now,
                            ));
                        }
                        _ => tasks.push(self.single_query_task(
                            query,
                            template,
                            time_range,
                            Arc::clone(&replacements),
                            Arc::clone(&ctx),
                            now,
                        )),
                    }
                }
            }
        }

        info!(task_count = tasks.len(), "dispatching recommendation queries");

        let fan_out = FanOut::new(FailurePolicy::BestEffort, self.config.max_concurrency);
        let results = match fan_out.run(tasks).await {
            Ok(results) => results,
            Err(err) => return (RecommendationSummary::new(), vec![err]),
        };

        let mut fragments = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(fragment) => fragments.push(fragment),
                Err(err) => errors.push(err),
            }
        }

        (aggregate(fragments), errors)
    }

    /// One (query, window) pair resolved and executed on its own.
    fn single_query_task(
        &self,
        query: QueryName,
        template: &'static str,
        time_range: TimeRange,
        replacements: Arc<Replacements>,
        ctx: Arc<TransformerContext>,
        now: DateTime<Utc>,
    ) -> TaskFuture<RecommendationSummary> {
        let client = Arc::clone(&self.client);

        Box::pin(async move {
            let resolved = resolver::resolve(query, template, &replacements, time_range, now)
                .map_err(|source| ExecutorError::Resolve { query, time_range, source })?;

            debug!(%query, %time_range, "executing query");
            let rows = client
                .execute(&resolved.sql, &replacements.location)
                .await
                .map_err(|source| ExecutorError::Warehouse { query, time_range, source })?;

            Ok(fragment(query, time_range, to_payload(rows, &ctx, time_range)))
        })
    }

    /// A slots batch: the primary metric plus its breakdown sub-queries,
    /// all resolved under the parent query's identity and executed
    /// all-or-nothing.
    fn slots_batch_task(
        &self,
        query: QueryName,
        primary_template: &'static str,
        breakdowns: Vec<(&'static str, &'static str)>,
        time_range: TimeRange,
        replacements: Arc<Replacements>,
        now: DateTime<Utc>,
    ) -> TaskFuture<RecommendationSummary> {
        let client = Arc::clone(&self.client);

        Box::pin(async move {
            let mut labeled = vec![("slots", primary_template)];
            labeled.extend(breakdowns);

            let mut subtasks: Vec<TaskFuture<Vec<Value>>> = Vec::with_capacity(labeled.len());
            for &(_, template) in &labeled {
                let resolved = resolver::resolve(query, template, &replacements, time_range, now)
                    .map_err(|source| ExecutorError::Resolve { query, time_range, source })?;
                let client = Arc::clone(&client);
                let location = replacements.location.clone();
                subtasks.push(Box::pin(async move {
                    client
                        .execute(&resolved.sql, &location)
                        .await
                        .map_err(|source| ExecutorError::Warehouse { query, time_range, source })
                }));
            }

            debug!(%query, %time_range, parts = labeled.len(), "executing slots batch");
            let results = FanOut::new(FailurePolicy::AbortOnFirstError, None).run(subtasks).await?;

            let mut payload = serde_json::Map::new();
            for ((label, _), result) in labeled.iter().zip(results) {
                // AbortOnFirstError already failed the batch on any error.
                if let Ok(rows) = result {
                    payload.insert((*label).to_string(), Value::Array(rows));
                }
            }

            Ok(fragment(query, time_range, Value::Object(payload)))
        })
    }

    /// One on-demand dimension: the primary query plus its breakdown
    /// sub-queries, all resolved under the dimension's identity. A
    /// failed part leaves its slot null; the batch itself never fails.
    fn on_demand_dimension_task(
        &self,
        query: QueryName,
        primary_template: &'static str,
        breakdowns: Vec<(&'static str, &'static str)>,
        time_range: TimeRange,
        replacements: Arc<Replacements>,
        ctx: Arc<TransformerContext>,
        now: DateTime<Utc>,
    ) -> TaskFuture<RecommendationSummary> {
        let client = Arc::clone(&self.client);

        Box::pin(async move {
            let mut labeled = vec![(query.as_str(), primary_template)];
            labeled.extend(breakdowns);

            let mut subtasks: Vec<TaskFuture<Value>> = Vec::with_capacity(labeled.len());
            for (position, &(_, template)) in labeled.iter().enumerate() {
                let client = Arc::clone(&client);
                let replacements = Arc::clone(&replacements);
                let ctx = Arc::clone(&ctx);
                subtasks.push(Box::pin(async move {
                    let resolved =
                        resolver::resolve(query, template, &replacements, time_range, now)
                            .map_err(|source| ExecutorError::Resolve { query, time_range, source })?;
                    let rows = client
                        .execute(&resolved.sql, &replacements.location)
                        .await
                        .map_err(|source| ExecutorError::Warehouse { query, time_range, source })?;
                    // The primary metric carries the pricing context;
                    // breakdowns are plain row sets.
                    Ok(if position == 0 {
                        to_payload(rows, &ctx, time_range)
                    } else {
                        Value::Array(rows)
                    })
                }));
            }

            debug!(%query, %time_range, parts = labeled.len(), "executing on-demand dimension");
            let results = FanOut::new(FailurePolicy::BestEffort, None).run(subtasks).await?;

            let mut payload = serde_json::Map::new();
            for ((label, _), result) in labeled.iter().zip(results) {
                // Failures were logged by the fan-out; a null slot means
                // "not computed", not "absent by design".
                payload.insert((*label).to_string(), result.unwrap_or(Value::Null));
            }

            Ok(fragment(query, time_range, Value::Object(payload)))
        })
    }
}

fn billing_project_slots_batch() -> Vec<(&'static str, &'static str)> {
    let queries = billing_project_slots_queries();
    vec![
        ("topUsers", queries[&QueryName::BillingProjectSlotsTopUsers]),
        ("topQueries", queries[&QueryName::BillingProjectSlotsTopQueries]),
    ]
}

fn user_slots_batch() -> Vec<(&'static str, &'static str)> {
    let queries = user_slots_queries();
    vec![("topQueries", queries[&QueryName::UserSlotsTopQueries])]
}

fn on_demand_breakdowns(query: QueryName) -> Vec<(&'static str, &'static str)> {
    match query {
        QueryName::BillingProject => {
            let queries = on_demand_billing_project_queries();
            vec![
                ("topQueries", queries[&QueryName::BillingProjectTopQueries]),
                ("topUsers", queries[&QueryName::BillingProjectTopUsers]),
            ]
        }
        QueryName::User => {
            let queries = on_demand_user_queries();
            vec![
                ("topProjects", queries[&QueryName::UserTopProjects]),
                ("topDatasets", queries[&QueryName::UserTopDatasets]),
                ("topTables", queries[&QueryName::UserTopTables]),
                ("topQueries", queries[&QueryName::UserTopQueries]),
            ]
        }
        QueryName::Project => {
            let queries = on_demand_project_queries();
            vec![
                ("topTables", queries[&QueryName::ProjectTopTables]),
                ("topDatasets", queries[&QueryName::ProjectTopDatasets]),
                ("topQueries", queries[&QueryName::ProjectTopQueries]),
                ("topUsers", queries[&QueryName::ProjectTopUsers]),
            ]
        }
        QueryName::Dataset => {
            let queries = on_demand_dataset_queries();
            vec![
                ("topTables", queries[&QueryName::DatasetTopTables]),
                ("topQueries", queries[&QueryName::DatasetTopQueries]),
                ("topUsers", queries[&QueryName::DatasetTopUsers]),
            ]
        }
        _ => Vec::new(),
    }
}

fn fragment(query: QueryName, time_range: TimeRange, payload: Value) -> RecommendationSummary {
    RecommendationSummary::from([(
        query,
        TimeRangeRecommendation::from([(time_range, payload)]),
    )])
}
