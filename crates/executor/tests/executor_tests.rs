//! End-to-end runs of the recommendation executor against a scripted
//! in-memory warehouse.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use scanlens_core::{Mode, QueryName, Replacements, TimeRange};
use scanlens_executor::{
    RecommendationExecutor, TransformerContext, WarehouseClient, WarehouseError,
};
use serde_json::{json, Value};

struct ScriptedWarehouse {
    failures: Vec<(&'static str, WarehouseError)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedWarehouse {
    fn succeeding() -> Self {
        Self::failing(Vec::new())
    }

    fn failing(failures: Vec<(&'static str, WarehouseError)>) -> Self {
        Self { failures, calls: Mutex::new(Vec::new()) }
    }

    fn saw_query(&self, marker: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|line| line.contains(marker))
    }
}

#[async_trait]
impl WarehouseClient for ScriptedWarehouse {
    async fn execute(&self, sql: &str, _location: &str) -> Result<Vec<Value>, WarehouseError> {
        let first_line = sql.lines().next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(first_line);

        for (marker, err) in &self.failures {
            if sql.contains(marker) {
                return Err(err.clone());
            }
        }
        Ok(vec![json!({"row": 1})])
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 7, 15, 12, 0, 0).unwrap()
}

fn replacements() -> Replacements {
    Replacements {
        project_id: "acme-prod".to_string(),
        dataset_id: "audit".to_string(),
        tables_discovery_table: "tables_discovery".to_string(),
        location: "US".to_string(),
        projects_with_reservations: vec!["res-1".to_string()],
        projects_by_edition: BTreeMap::from([(
            Mode::StandardEdition,
            vec!["std-project".to_string()],
        )]),
        historical_jobs: Vec::new(),
        min_date: NaiveDate::from_ymd_opt(2022, 7, 14).unwrap(),
        max_date: NaiveDate::from_ymd_opt(2022, 7, 14).unwrap(),
    }
}

#[tokio::test]
async fn full_run_covers_the_applicable_catalog() {
    let client = Arc::new(ScriptedWarehouse::succeeding());
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), true, now()).await;

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");

    // Scan queries run for every window.
    assert_eq!(summary[&QueryName::TotalScanPrice].len(), 3);
    // Storage sizes are window-independent: month only.
    assert_eq!(
        summary[&QueryName::TableStorageTb].keys().copied().collect::<Vec<_>>(),
        vec![TimeRange::Month]
    );
    // Only the configured edition's queries ran.
    assert!(summary.contains_key(&QueryName::StandardUserSlots));
    assert!(!summary.contains_key(&QueryName::EnterpriseUserSlots));

    // A slots batch folds its sub-queries into one payload.
    let batch = &summary[&QueryName::BillingProjectSlots][&TimeRange::Week];
    assert!(batch.get("slots").is_some());
    assert!(batch.get("topUsers").is_some());
    assert!(batch.get("topQueries").is_some());

    // Each on-demand dimension folds its primary metric and breakdowns
    // into one payload.
    let user = &summary[&QueryName::User][&TimeRange::Day];
    for label in ["user", "topProjects", "topDatasets", "topTables", "topQueries"] {
        assert_ne!(user[label], Value::Null, "missing user breakdown {label}");
    }

    let billing_project = &summary[&QueryName::BillingProject][&TimeRange::Day];
    for label in ["billingProject", "topQueries", "topUsers"] {
        assert_ne!(billing_project[label], Value::Null);
    }

    let dataset = &summary[&QueryName::Dataset][&TimeRange::Day];
    for label in ["dataset", "topTables", "topQueries", "topUsers"] {
        assert_ne!(dataset[label], Value::Null);
    }

    let project = &summary[&QueryName::Project][&TimeRange::Day];
    for label in ["project", "topTables", "topDatasets", "topQueries", "topUsers"] {
        assert_ne!(project[label], Value::Null);
    }
}

#[tokio::test]
async fn slots_batch_is_all_or_nothing() {
    init_tracing();
    let client = Arc::new(ScriptedWarehouse::failing(vec![(
        "-- billingProjectSlotsTopUsers",
        WarehouseError::Execution("quota exceeded".to_string()),
    )]));
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), true, now()).await;

    // The primary metric succeeded but is not surfaced without its
    // breakdowns.
    assert!(client.saw_query("-- billingProjectSlots"));
    assert!(!summary.contains_key(&QueryName::BillingProjectSlots));
    assert!(errors
        .iter()
        .any(|err| matches!(err, scanlens_executor::ExecutorError::Warehouse {
            query: QueryName::BillingProjectSlots,
            ..
        })));

    // Unrelated queries are unaffected.
    assert!(summary.contains_key(&QueryName::UserSlots));
}

#[tokio::test]
async fn failed_dimension_leaves_a_null_slot_without_failing_the_run() {
    init_tracing();
    let client = Arc::new(ScriptedWarehouse::failing(vec![(
        "-- onDemandDataset\n",
        WarehouseError::Execution("backend error".to_string()),
    )]));
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), true, now()).await;

    assert!(errors.is_empty(), "dimension failures must not surface: {errors:?}");

    // Only the primary metric's slot is null; its breakdowns still ran.
    let dataset = &summary[&QueryName::Dataset][&TimeRange::Week];
    assert_eq!(dataset["dataset"], Value::Null);
    for label in ["topTables", "topQueries", "topUsers"] {
        assert_ne!(dataset[label], Value::Null);
    }

    for query in [QueryName::BillingProject, QueryName::Project, QueryName::User] {
        assert_ne!(summary[&query][&TimeRange::Week], Value::Null);
    }
}

#[tokio::test]
async fn failed_breakdown_nulls_its_slot_without_touching_its_siblings() {
    init_tracing();
    let client = Arc::new(ScriptedWarehouse::failing(vec![(
        "-- onDemandUserTopTables",
        WarehouseError::Execution("backend error".to_string()),
    )]));
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), true, now()).await;

    assert!(errors.is_empty(), "breakdown failures must not surface: {errors:?}");

    let user = &summary[&QueryName::User][&TimeRange::Month];
    assert_eq!(user["topTables"], Value::Null);
    for label in ["user", "topProjects", "topDatasets", "topQueries"] {
        assert_ne!(user[label], Value::Null, "sibling {label} was lost");
    }
}

#[tokio::test]
async fn permission_denied_is_recoverable_and_distinguished() {
    let client = Arc::new(ScriptedWarehouse::failing(vec![(
        "-- totalScan",
        WarehouseError::PermissionDenied("missing audit-log access".to_string()),
    )]));
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), true, now()).await;

    assert!(!summary.contains_key(&QueryName::TotalScanPrice));
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|err| err.is_permission_denied()));
    // The rest of the run is intact.
    assert!(summary.contains_key(&QueryName::CostFromTableTypes));
}

#[tokio::test]
async fn missing_discovery_data_skips_dependent_queries() {
    let client = Arc::new(ScriptedWarehouse::succeeding());
    let executor = RecommendationExecutor::new(Arc::clone(&client));

    let (summary, errors) =
        executor.execute(&replacements(), &TransformerContext::default(), false, now()).await;

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert!(!summary.contains_key(&QueryName::CostFromTableTypes));
    assert!(!summary.contains_key(&QueryName::PartitionTables));
    assert!(summary.contains_key(&QueryName::TotalScanPrice));
    assert!(summary.contains_key(&QueryName::UserSlots));
}
