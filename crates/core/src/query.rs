//! Query identities, pricing-mode ownership, and the static query catalog.
//!
//! Every named analytical query belongs to exactly one pricing [`Mode`];
//! ownership drives which reservation-project list and which deduplication
//! placeholders a query resolves with. Sub-queries (top-users /
//! top-queries breakdowns) are deliberately absent from the catalog: they
//! always resolve under their parent query's identity.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::ResolveError;
use crate::replacements::Replacements;
use crate::templates;
use crate::timerange::TimeRange;

/// Identifier of a named analytical query template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QueryName {
    // Hybrid (runs over both reserved and on-demand jobs)
    CostFromTableTypes,
    TotalScanPrice,
    StorageSavings,
    TableStorageTb,
    TableStoragePrice,
    DatasetStorageTb,
    DatasetStoragePrice,
    ProjectStorageTb,
    ProjectStoragePrice,
    // On-demand
    LimitingJobsSavings,
    UsePartitionField,
    PartitionTables,
    ClusterTables,
    SlotsExplorerOnDemand,
    BillingProject,
    Project,
    Dataset,
    User,
    // Flat-rate
    ScheduledQueriesMovement,
    SlotsExplorerFlatRate,
    BillingProjectSlots,
    UserSlots,
    // Editions
    StandardScheduledQueriesMovement,
    StandardSlotsExplorer,
    StandardBillingProjectSlots,
    StandardUserSlots,
    EnterpriseScheduledQueriesMovement,
    EnterpriseSlotsExplorer,
    EnterpriseBillingProjectSlots,
    EnterpriseUserSlots,
    EnterprisePlusScheduledQueriesMovement,
    EnterprisePlusSlotsExplorer,
    EnterprisePlusBillingProjectSlots,
    EnterprisePlusUserSlots,
    // Sub-queries, resolved under their parent's identity
    BillingProjectSlotsTopUsers,
    BillingProjectSlotsTopQueries,
    UserSlotsTopQueries,
    BillingProjectTopQueries,
    BillingProjectTopUsers,
    UserTopProjects,
    UserTopDatasets,
    UserTopTables,
    UserTopQueries,
    ProjectTopTables,
    ProjectTopDatasets,
    ProjectTopQueries,
    ProjectTopUsers,
    DatasetTopTables,
    DatasetTopQueries,
    DatasetTopUsers,
}

impl QueryName {
    /// Document key used when recommendations are persisted and when
    /// executions are labeled in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            QueryName::CostFromTableTypes => "costFromTableTypes",
            QueryName::TotalScanPrice => "totalScanPrice",
            QueryName::StorageSavings => "storageSavings",
            QueryName::TableStorageTb => "tableStorageTB",
            QueryName::TableStoragePrice => "tableStoragePrice",
            QueryName::DatasetStorageTb => "datasetStorageTB",
            QueryName::DatasetStoragePrice => "datasetStoragePrice",
            QueryName::ProjectStorageTb => "projectStorageTB",
            QueryName::ProjectStoragePrice => "projectStoragePrice",
            QueryName::LimitingJobsSavings => "limitingJobsSavings",
            QueryName::UsePartitionField => "usePartitionField",
            QueryName::PartitionTables => "partitionTables",
            QueryName::ClusterTables => "clusterTables",
            QueryName::SlotsExplorerOnDemand => "onDemandSlotsExplorer",
            QueryName::BillingProject => "billingProject",
            QueryName::Project => "project",
            QueryName::Dataset => "dataset",
            QueryName::User => "user",
            QueryName::ScheduledQueriesMovement => "scheduledQueriesMovement",
            QueryName::SlotsExplorerFlatRate => "flatRateSlotsExplorer",
            QueryName::BillingProjectSlots => "billingProjectSlots",
            QueryName::UserSlots => "userSlots",
            QueryName::StandardScheduledQueriesMovement => "standardScheduledQueriesMovement",
            QueryName::StandardSlotsExplorer => "standardSlotsExplorer",
            QueryName::StandardBillingProjectSlots => "standardBillingProjectSlots",
            QueryName::StandardUserSlots => "standardUserSlots",
            QueryName::EnterpriseScheduledQueriesMovement => "enterpriseScheduledQueriesMovement",
            QueryName::EnterpriseSlotsExplorer => "enterpriseSlotsExplorer",
            QueryName::EnterpriseBillingProjectSlots => "enterpriseBillingProjectSlots",
            QueryName::EnterpriseUserSlots => "enterpriseUserSlots",
            QueryName::EnterprisePlusScheduledQueriesMovement => {
                "enterprisePlusScheduledQueriesMovement"
            }
            QueryName::EnterprisePlusSlotsExplorer => "enterprisePlusSlotsExplorer",
            QueryName::EnterprisePlusBillingProjectSlots => "enterprisePlusBillingProjectSlots",
            QueryName::EnterprisePlusUserSlots => "enterprisePlusUserSlots",
            QueryName::BillingProjectSlotsTopUsers => "billingProjectSlotsTopUsers",
            QueryName::BillingProjectSlotsTopQueries => "billingProjectSlotsTopQueries",
            QueryName::UserSlotsTopQueries => "userSlotsTopQueries",
            QueryName::BillingProjectTopQueries => "billingProjectTopQueries",
            QueryName::BillingProjectTopUsers => "billingProjectTopUsers",
            QueryName::UserTopProjects => "userTopProjects",
            QueryName::UserTopDatasets => "userTopDatasets",
            QueryName::UserTopTables => "userTopTables",
            QueryName::UserTopQueries => "userTopQueries",
            QueryName::ProjectTopTables => "projectTopTables",
            QueryName::ProjectTopDatasets => "projectTopDatasets",
            QueryName::ProjectTopQueries => "projectTopQueries",
            QueryName::ProjectTopUsers => "projectTopUsers",
            QueryName::DatasetTopTables => "datasetTopTables",
            QueryName::DatasetTopQueries => "datasetTopQueries",
            QueryName::DatasetTopUsers => "datasetTopUsers",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing/billing model a query is computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mode {
    OnDemand,
    FlatRate,
    StandardEdition,
    EnterpriseEdition,
    EnterprisePlusEdition,
    Hybrid,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::OnDemand => "on-demand",
            Mode::FlatRate => "flat-rate",
            Mode::StandardEdition => "standard-edition",
            Mode::EnterpriseEdition => "enterprise-edition",
            Mode::EnterprisePlusEdition => "enterprise-plus-edition",
            Mode::Hybrid => "hybrid",
        }
    }

    /// Resolves the mode that owns `query`, via an index precomputed from
    /// the catalog. Stable across calls; fails for names outside every
    /// mode's set (sub-queries included).
    pub fn of(query: QueryName) -> Result<Mode, ResolveError> {
        MODE_INDEX.get(&query).copied().ok_or(ResolveError::UnknownQuery(query))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type QueryCatalog = BTreeMap<Mode, BTreeMap<QueryName, &'static str>>;

/// The static query catalog: which mode owns which query, and the raw
/// template each resolves from. Edition variants share the flat-rate
/// template text; only their placeholder resolution differs.
pub fn queries_per_mode() -> &'static QueryCatalog {
    &QUERIES_PER_MODE
}

static QUERIES_PER_MODE: Lazy<QueryCatalog> = Lazy::new(|| {
    let mut catalog = QueryCatalog::new();

    catalog.insert(
        Mode::Hybrid,
        BTreeMap::from([
            (QueryName::CostFromTableTypes, templates::COST_FROM_TABLE_TYPES),
            (QueryName::TotalScanPrice, templates::TOTAL_SCAN),
            (QueryName::StorageSavings, templates::STORAGE_SAVINGS),
            (QueryName::TableStorageTb, templates::TABLE_STORAGE_TB),
            (QueryName::TableStoragePrice, templates::TABLE_STORAGE_PRICE),
            (QueryName::DatasetStorageTb, templates::DATASET_STORAGE_TB),
            (QueryName::DatasetStoragePrice, templates::DATASET_STORAGE_PRICE),
            (QueryName::ProjectStorageTb, templates::PROJECT_STORAGE_TB),
            (QueryName::ProjectStoragePrice, templates::PROJECT_STORAGE_PRICE),
        ]),
    );

    catalog.insert(
        Mode::OnDemand,
        BTreeMap::from([
            (QueryName::LimitingJobsSavings, templates::LIMITING_JOBS_SAVINGS),
            (QueryName::UsePartitionField, templates::USE_PARTITION_FIELD),
            (QueryName::PartitionTables, templates::PARTITION_TABLES),
            (QueryName::ClusterTables, templates::CLUSTER_TABLES),
            (QueryName::SlotsExplorerOnDemand, templates::SLOTS_EXPLORER),
            (QueryName::BillingProject, templates::ON_DEMAND_BILLING_PROJECT),
            (QueryName::Project, templates::ON_DEMAND_PROJECT),
            (QueryName::Dataset, templates::ON_DEMAND_DATASET),
            (QueryName::User, templates::ON_DEMAND_USER),
        ]),
    );

    catalog.insert(
        Mode::FlatRate,
        BTreeMap::from([
            (QueryName::ScheduledQueriesMovement, templates::SCHEDULED_QUERIES_MOVEMENT),
            (QueryName::SlotsExplorerFlatRate, templates::SLOTS_EXPLORER),
            (QueryName::BillingProjectSlots, templates::BILLING_PROJECT_SLOTS),
            (QueryName::UserSlots, templates::USER_SLOTS),
        ]),
    );

    catalog.insert(
        Mode::StandardEdition,
        BTreeMap::from([
            (QueryName::StandardScheduledQueriesMovement, templates::SCHEDULED_QUERIES_MOVEMENT),
            (QueryName::StandardSlotsExplorer, templates::SLOTS_EXPLORER),
            (QueryName::StandardBillingProjectSlots, templates::BILLING_PROJECT_SLOTS),
            (QueryName::StandardUserSlots, templates::USER_SLOTS),
        ]),
    );

    catalog.insert(
        Mode::EnterpriseEdition,
        BTreeMap::from([
            (QueryName::EnterpriseScheduledQueriesMovement, templates::SCHEDULED_QUERIES_MOVEMENT),
            (QueryName::EnterpriseSlotsExplorer, templates::SLOTS_EXPLORER),
            (QueryName::EnterpriseBillingProjectSlots, templates::BILLING_PROJECT_SLOTS),
            (QueryName::EnterpriseUserSlots, templates::USER_SLOTS),
        ]),
    );

    catalog.insert(
        Mode::EnterprisePlusEdition,
        BTreeMap::from([
            (
                QueryName::EnterprisePlusScheduledQueriesMovement,
                templates::SCHEDULED_QUERIES_MOVEMENT,
            ),
            (QueryName::EnterprisePlusSlotsExplorer, templates::SLOTS_EXPLORER),
            (QueryName::EnterprisePlusBillingProjectSlots, templates::BILLING_PROJECT_SLOTS),
            (QueryName::EnterprisePlusUserSlots, templates::USER_SLOTS),
        ]),
    );

    catalog
});

// Lookup index so classification is O(log n) per call instead of a scan
// over every mode's key set.
static MODE_INDEX: Lazy<BTreeMap<QueryName, Mode>> = Lazy::new(|| {
    let mut index = BTreeMap::new();

    for (mode, queries) in QUERIES_PER_MODE.iter() {
        for query in queries.keys() {
            index.insert(*query, *mode);
        }
    }

    index
});

/// Sub-queries of the billing-project slots batch, resolved under
/// [`QueryName::BillingProjectSlots`] (or its edition parent).
pub fn billing_project_slots_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([
            (QueryName::BillingProjectSlotsTopUsers, templates::BILLING_PROJECT_SLOTS_TOP_USERS),
            (
                QueryName::BillingProjectSlotsTopQueries,
                templates::BILLING_PROJECT_SLOTS_TOP_QUERIES,
            ),
        ])
    });

    &QUERIES
}

/// Sub-queries of the user slots batch, resolved under
/// [`QueryName::UserSlots`] (or its edition parent).
pub fn user_slots_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([(QueryName::UserSlotsTopQueries, templates::USER_SLOTS_TOP_QUERIES)])
    });

    &QUERIES
}

/// Breakdown sub-queries of the on-demand billing-project dimension,
/// resolved under [`QueryName::BillingProject`].
pub fn on_demand_billing_project_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([
            (
                QueryName::BillingProjectTopQueries,
                templates::ON_DEMAND_BILLING_PROJECT_TOP_QUERIES,
            ),
            (QueryName::BillingProjectTopUsers, templates::ON_DEMAND_BILLING_PROJECT_TOP_USERS),
        ])
    });

    &QUERIES
}

/// Breakdown sub-queries of the on-demand user dimension, resolved under
/// [`QueryName::User`].
pub fn on_demand_user_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([
            (QueryName::UserTopProjects, templates::ON_DEMAND_USER_TOP_PROJECTS),
            (QueryName::UserTopDatasets, templates::ON_DEMAND_USER_TOP_DATASETS),
            (QueryName::UserTopTables, templates::ON_DEMAND_USER_TOP_TABLES),
            (QueryName::UserTopQueries, templates::ON_DEMAND_USER_TOP_QUERIES),
        ])
    });

    &QUERIES
}

/// Breakdown sub-queries of the on-demand project dimension, resolved
/// under [`QueryName::Project`].
pub fn on_demand_project_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([
            (QueryName::ProjectTopTables, templates::ON_DEMAND_PROJECT_TOP_TABLES),
            (QueryName::ProjectTopDatasets, templates::ON_DEMAND_PROJECT_TOP_DATASETS),
            (QueryName::ProjectTopQueries, templates::ON_DEMAND_PROJECT_TOP_QUERIES),
            (QueryName::ProjectTopUsers, templates::ON_DEMAND_PROJECT_TOP_USERS),
        ])
    });

    &QUERIES
}

/// Breakdown sub-queries of the on-demand dataset dimension, resolved
/// under [`QueryName::Dataset`].
pub fn on_demand_dataset_queries() -> &'static BTreeMap<QueryName, &'static str> {
    static QUERIES: Lazy<BTreeMap<QueryName, &'static str>> = Lazy::new(|| {
        BTreeMap::from([
            (QueryName::DatasetTopTables, templates::ON_DEMAND_DATASET_TOP_TABLES),
            (QueryName::DatasetTopQueries, templates::ON_DEMAND_DATASET_TOP_QUERIES),
            (QueryName::DatasetTopUsers, templates::ON_DEMAND_DATASET_TOP_USERS),
        ])
    });

    &QUERIES
}

/// Queries that read only the audit log, never the tables-discovery table.
/// These still run for customers without discovery data.
const TABLE_DISCOVERY_INDEPENDENT: [QueryName; 22] = [
    QueryName::TotalScanPrice,
    QueryName::ScheduledQueriesMovement,
    QueryName::SlotsExplorerFlatRate,
    QueryName::SlotsExplorerOnDemand,
    QueryName::BillingProjectSlots,
    QueryName::UserSlots,
    QueryName::BillingProject,
    QueryName::Project,
    QueryName::Dataset,
    QueryName::User,
    QueryName::StandardScheduledQueriesMovement,
    QueryName::StandardSlotsExplorer,
    QueryName::StandardBillingProjectSlots,
    QueryName::StandardUserSlots,
    QueryName::EnterpriseScheduledQueriesMovement,
    QueryName::EnterpriseSlotsExplorer,
    QueryName::EnterpriseBillingProjectSlots,
    QueryName::EnterpriseUserSlots,
    QueryName::EnterprisePlusScheduledQueriesMovement,
    QueryName::EnterprisePlusSlotsExplorer,
    QueryName::EnterprisePlusBillingProjectSlots,
    QueryName::EnterprisePlusUserSlots,
];

/// Edition whose reservation-project list a query resolves with, when the
/// query is edition-tagged. Everything else uses the flat global list.
pub fn edition_of(query: QueryName) -> Option<Mode> {
    match Mode::of(query) {
        Ok(
            mode @ (Mode::StandardEdition | Mode::EnterpriseEdition | Mode::EnterprisePlusEdition),
        ) => Some(mode),
        _ => None,
    }
}

/// Whether a (query, window) pair should be left out of a run.
///
/// Storage-TB queries run only for the month window (storage does not
/// change with the window), reservation-scoped queries are pointless
/// without reservation projects, and discovery-dependent queries cannot
/// run without the discovery table.
pub fn should_skip(
    query: QueryName,
    time_range: TimeRange,
    replacements: &Replacements,
    has_table_discovery: bool,
) -> bool {
    if !has_table_discovery && !TABLE_DISCOVERY_INDEPENDENT.contains(&query) {
        return true;
    }

    let storage_tb = [
        QueryName::TableStorageTb,
        QueryName::DatasetStorageTb,
        QueryName::ProjectStorageTb,
    ];
    if storage_tb.contains(&query) {
        return time_range != TimeRange::Month;
    }

    match Mode::of(query) {
        Ok(Mode::FlatRate) => replacements.projects_with_reservations.is_empty(),
        Ok(
            mode @ (Mode::StandardEdition | Mode::EnterpriseEdition | Mode::EnterprisePlusEdition),
        ) => replacements
            .projects_by_edition
            .get(&mode)
            .map_or(true, |projects| projects.is_empty()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements_with_reservations() -> Replacements {
        Replacements {
            projects_with_reservations: vec!["p1".into()],
            projects_by_edition: BTreeMap::from([(
                Mode::StandardEdition,
                vec!["edition-project".to_string()],
            )]),
            ..Replacements::default()
        }
    }

    #[test]
    fn every_catalog_query_belongs_to_exactly_one_mode() {
        let mut seen = BTreeMap::new();

        for (mode, queries) in queries_per_mode() {
            for query in queries.keys() {
                assert!(
                    seen.insert(*query, *mode).is_none(),
                    "{query} appears in more than one mode set"
                );
            }
        }
    }

    #[test]
    fn mode_classification_is_stable_and_total_over_the_catalog() {
        for (mode, queries) in queries_per_mode() {
            for query in queries.keys() {
                assert_eq!(Mode::of(*query).unwrap(), *mode);
                assert_eq!(Mode::of(*query).unwrap(), *mode);
            }
        }
    }

    #[test]
    fn sub_queries_are_outside_every_mode_set() {
        let slots_subs = [
            QueryName::BillingProjectSlotsTopUsers,
            QueryName::BillingProjectSlotsTopQueries,
            QueryName::UserSlotsTopQueries,
        ];
        let breakdown_subs = [
            on_demand_billing_project_queries(),
            on_demand_user_queries(),
            on_demand_project_queries(),
            on_demand_dataset_queries(),
        ];

        for query in slots_subs
            .into_iter()
            .chain(breakdown_subs.into_iter().flat_map(|map| map.keys().copied()))
        {
            assert_eq!(Mode::of(query), Err(ResolveError::UnknownQuery(query)));
        }
    }

    #[test]
    fn each_on_demand_dimension_carries_its_breakdowns() {
        assert_eq!(on_demand_billing_project_queries().len(), 2);
        assert_eq!(on_demand_user_queries().len(), 4);
        assert_eq!(on_demand_project_queries().len(), 4);
        assert_eq!(on_demand_dataset_queries().len(), 3);

        assert!(on_demand_user_queries().contains_key(&QueryName::UserTopTables));
        assert!(on_demand_dataset_queries().contains_key(&QueryName::DatasetTopUsers));
    }

    #[test]
    fn edition_tagging_follows_mode_ownership() {
        assert_eq!(edition_of(QueryName::StandardUserSlots), Some(Mode::StandardEdition));
        assert_eq!(
            edition_of(QueryName::EnterprisePlusBillingProjectSlots),
            Some(Mode::EnterprisePlusEdition)
        );
        assert_eq!(edition_of(QueryName::UserSlots), None);
        assert_eq!(edition_of(QueryName::CostFromTableTypes), None);
    }

    #[test]
    fn storage_tb_queries_run_only_for_the_month_window() {
        let replacements = replacements_with_reservations();

        for query in [
            QueryName::TableStorageTb,
            QueryName::DatasetStorageTb,
            QueryName::ProjectStorageTb,
        ] {
            assert!(should_skip(query, TimeRange::Day, &replacements, true));
            assert!(should_skip(query, TimeRange::Week, &replacements, true));
            assert!(!should_skip(query, TimeRange::Month, &replacements, true));
        }
    }

    #[test]
    fn reservation_scoped_queries_are_skipped_without_reservations() {
        let empty = Replacements::default();

        assert!(should_skip(QueryName::BillingProjectSlots, TimeRange::Month, &empty, true));
        assert!(should_skip(QueryName::StandardUserSlots, TimeRange::Month, &empty, true));
        assert!(!should_skip(QueryName::CostFromTableTypes, TimeRange::Month, &empty, true));

        let populated = replacements_with_reservations();
        assert!(!should_skip(QueryName::BillingProjectSlots, TimeRange::Month, &populated, true));
        assert!(!should_skip(QueryName::StandardUserSlots, TimeRange::Month, &populated, true));
        assert!(should_skip(QueryName::EnterpriseUserSlots, TimeRange::Month, &populated, true));
    }

    #[test]
    fn discovery_dependent_queries_are_skipped_without_table_discovery() {
        let replacements = replacements_with_reservations();

        assert!(should_skip(QueryName::CostFromTableTypes, TimeRange::Month, &replacements, false));
        assert!(should_skip(QueryName::PartitionTables, TimeRange::Month, &replacements, false));
        assert!(!should_skip(QueryName::TotalScanPrice, TimeRange::Month, &replacements, false));
        assert!(!should_skip(QueryName::UserSlots, TimeRange::Month, &replacements, false));
    }
}
