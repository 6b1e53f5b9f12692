//! Template resolution: placeholder substitution, the deduplication
//! clause, and the conditional historical union.
//!
//! Resolution is pure. The computed date window comes back on
//! [`ResolvedQuery`] instead of being written into the shared
//! [`Replacements`], so concurrent fan-out can share one bag by
//! reference.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::errors::ResolveError;
use crate::query::{Mode, QueryName};
use crate::replacements::{render_reservations, Replacements};
use crate::templates;
use crate::timerange::TimeRange;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Output of one resolution call: executable SQL plus the absolute window
/// it was resolved for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub sql: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Resolves `template` for one (query, window) pair.
///
/// The validation gate runs before any window arithmetic: empty
/// project/dataset/discovery-table identifiers fail immediately. The
/// window is `max_date − day_count .. max_date`; the historical cutoff
/// used for the union decision is `now − day_count`.
pub fn resolve(
    query: QueryName,
    template: &str,
    replacements: &Replacements,
    time_range: TimeRange,
    now: DateTime<Utc>,
) -> Result<ResolvedQuery, ResolveError> {
    validate(replacements)?;

    let days = time_range.day_count();
    let start_date = replacements.max_date - Duration::days(days);
    let end_date = replacements.max_date;
    let cutoff = (now - Duration::days(days)).date_naive();

    let dedup_clause = jobs_deduplicated_clause(query, replacements, start_date, cutoff)?;

    let slots = BTreeMap::from([
        (templates::PROJECT_ID_TOKEN, replacements.project_id.clone()),
        (templates::DATASET_ID_TOKEN, replacements.dataset_id.clone()),
        (templates::TABLES_DISCOVERY_TOKEN, replacements.tables_discovery_table.clone()),
        (templates::JOBS_DEDUPLICATED_TOKEN, dedup_clause),
        (templates::SCAN_ATTRIBUTION_TOKEN, scan_attribution_clause(replacements)),
        (templates::TABLE_ID_BASE_NAME_TOKEN, templates::GET_TABLE_ID_BASE_NAME.to_string()),
        (templates::START_DATE_TOKEN, start_date.format(DATE_FORMAT).to_string()),
        (templates::END_DATE_TOKEN, end_date.format(DATE_FORMAT).to_string()),
        (templates::PRICE_PER_TB_SCAN_TOKEN, templates::PRICE_PER_TB_SCAN.to_string()),
    ]);

    Ok(ResolvedQuery {
        sql: apply_placeholders(template, &slots),
        start_date,
        end_date,
    })
}

fn validate(replacements: &Replacements) -> Result<(), ResolveError> {
    if replacements.project_id.is_empty() {
        return Err(ResolveError::MissingField("project_id"));
    }
    if replacements.dataset_id.is_empty() {
        return Err(ResolveError::MissingField("dataset_id"));
    }
    if replacements.tables_discovery_table.is_empty() {
        return Err(ResolveError::MissingField("tables_discovery_table"));
    }
    Ok(())
}

/// Builds the jobs-deduplicated fragment for one query: reservation-set
/// selection, the mode and query placeholder tokens, and the historical
/// union, all pre-substituted so the fragment drops into the outer
/// template with no tokens left.
pub fn jobs_deduplicated_clause(
    query: QueryName,
    replacements: &Replacements,
    start_date: NaiveDate,
    cutoff: NaiveDate,
) -> Result<String, ResolveError> {
    let reservations = replacements.reservations_for(query);
    let union = historical_union(query, replacements, reservations, start_date, cutoff)?;
    let mode_token = mode_placeholder(query, false)?;

    let slots = BTreeMap::from([
        (templates::PROJECT_ID_TOKEN, replacements.project_id.clone()),
        (templates::DATASET_ID_TOKEN, replacements.dataset_id.clone()),
        (templates::MODE_TOKEN, mode_token.to_string()),
        (templates::QUERY_TOKEN, query_placeholder(query, false).to_string()),
        (templates::PROJECTS_WITH_RESERVATIONS_TOKEN, render_reservations(reservations)),
        (templates::START_DATE_TOKEN, start_date.format(DATE_FORMAT).to_string()),
        (templates::HISTORICAL_JOBS_TOKEN, union),
    ]);

    Ok(apply_placeholders(templates::JOBS_DEDUPLICATED_WITH_CLAUSE, &slots))
}

/// Builds the archived-rows union, or an empty string when the live
/// window already covers the requested history (`min_date` on or after
/// `cutoff`). The short circuit is not an error.
///
/// One union block is emitted per known archive source; a customer with
/// no archives gets no union even for a deep window.
pub fn historical_union(
    query: QueryName,
    replacements: &Replacements,
    reservations: &[String],
    start_date: NaiveDate,
    cutoff: NaiveDate,
) -> Result<String, ResolveError> {
    if replacements.min_date >= cutoff {
        return Ok(String::new());
    }

    let mode_token = mode_placeholder(query, true)?;
    let mut blocks = Vec::with_capacity(replacements.historical_jobs.len());

    for source in &replacements.historical_jobs {
        let slots = BTreeMap::from([
            (templates::PROJECT_ID_TOKEN, replacements.project_id.clone()),
            (templates::DATASET_ID_TOKEN, replacements.dataset_id.clone()),
            (templates::HISTORICAL_JOBS_TABLE_TOKEN, source.clone()),
            (templates::MODE_TOKEN, mode_token.to_string()),
            (templates::QUERY_TOKEN, query_placeholder(query, true).to_string()),
            (templates::PROJECTS_WITH_RESERVATIONS_TOKEN, render_reservations(reservations)),
            (templates::START_DATE_TOKEN, start_date.format(DATE_FORMAT).to_string()),
            (templates::END_DATE_TOKEN, cutoff.format(DATE_FORMAT).to_string()),
        ]);
        blocks.push(apply_placeholders(templates::HISTORICAL_JOBS_UNION, &slots));
    }

    Ok(blocks.join("\n"))
}

/// The reservation-filter token for the dedup predicate.
///
/// TotalScanPrice and StorageSavings are pinned to `NOT` ahead of mode
/// lookup. Hybrid renders one of two qualifications of the same logical
/// predicate: the archive stores job columns flattened, the live audit
/// log nests them.
fn mode_placeholder(query: QueryName, historical_path: bool) -> Result<&'static str, ResolveError> {
    if matches!(query, QueryName::TotalScanPrice | QueryName::StorageSavings) {
        return Ok("NOT");
    }

    match Mode::of(query)? {
        Mode::OnDemand => Ok("NOT"),
        Mode::FlatRate
        | Mode::StandardEdition
        | Mode::EnterpriseEdition
        | Mode::EnterprisePlusEdition => Ok(""),
        Mode::Hybrid => Ok(if historical_path {
            "IS NOT NULL OR projectId"
        } else {
            "IS NOT NULL OR protopayload_auditlog.servicedata_v1_bigquery.jobCompletedEvent.job.jobName.projectId"
        }),
    }
}

/// Queries that inspect raw query text get the query column; everything
/// else carries `NULL` to keep the scanned payload small.
fn query_placeholder(query: QueryName, historical_path: bool) -> &'static str {
    match query {
        QueryName::ClusterTables | QueryName::PartitionTables | QueryName::UsePartitionField => {
            if historical_path {
                "query"
            } else {
                "protopayload_auditlog.servicedata_v1_bigquery.jobCompletedEvent.job.jobConfiguration.query.query"
            }
        }
        _ => "NULL",
    }
}

fn scan_attribution_clause(replacements: &Replacements) -> String {
    let slots = BTreeMap::from([
        (templates::PROJECT_ID_TOKEN, replacements.project_id.clone()),
        (templates::DATASET_ID_TOKEN, replacements.dataset_id.clone()),
        (templates::TABLES_DISCOVERY_TOKEN, replacements.tables_discovery_table.clone()),
    ]);

    apply_placeholders(templates::SCAN_ATTRIBUTION_WITH_CLAUSE, &slots)
}

/// One structural pass over the template. A `{...}` span that is not a
/// known slot is emitted verbatim, which keeps embedded JavaScript
/// bodies intact, and substituted values are never rescanned, so no
/// value can trigger a second substitution.
fn apply_placeholders(template: &str, slots: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}') {
            Some(close) => {
                let token = &tail[..=close];
                match slots.get(token) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(token),
                }
                rest = &tail[close + 1..];
            }
            None => {
                rest = tail;
                break;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{
        BILLING_PROJECT_SLOTS, CLUSTER_TABLES, LIMITING_JOBS_SAVINGS, TOTAL_SCAN,
    };
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
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
            projects_with_reservations: vec!["res-1".to_string(), "res-2".to_string()],
            projects_by_edition: BTreeMap::new(),
            historical_jobs: vec!["historical_jobs".to_string()],
            min_date: ymd(2022, 5, 1),
            max_date: ymd(2022, 7, 14),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let replacements = replacements();

        let a = resolve(
            QueryName::LimitingJobsSavings,
            LIMITING_JOBS_SAVINGS,
            &replacements,
            TimeRange::Week,
            now(),
        )
        .unwrap();
        let b = resolve(
            QueryName::LimitingJobsSavings,
            LIMITING_JOBS_SAVINGS,
            &replacements,
            TimeRange::Week,
            now(),
        )
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn validation_gate_rejects_every_missing_identifier() {
        let cases = [
            (
                Replacements { project_id: String::new(), ..replacements() },
                ResolveError::MissingField("project_id"),
            ),
            (
                Replacements { dataset_id: String::new(), ..replacements() },
                ResolveError::MissingField("dataset_id"),
            ),
            (
                Replacements { tables_discovery_table: String::new(), ..replacements() },
                ResolveError::MissingField("tables_discovery_table"),
            ),
        ];

        for (bag, expected) in cases {
            let err = resolve(QueryName::TotalScanPrice, TOTAL_SCAN, &bag, TimeRange::Day, now())
                .unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[test]
    fn window_is_day_count_back_from_max_date() {
        let replacements = replacements();

        let resolved = resolve(
            QueryName::TotalScanPrice,
            "{startDate}..{endDate}",
            &replacements,
            TimeRange::Month,
            now(),
        )
        .unwrap();

        assert_eq!(resolved.start_date, ymd(2022, 6, 14));
        assert_eq!(resolved.end_date, ymd(2022, 7, 14));
        assert_eq!(resolved.sql, "2022-06-14..2022-07-14");
    }

    #[test]
    fn mode_placeholder_follows_pricing_mode() {
        assert_eq!(mode_placeholder(QueryName::LimitingJobsSavings, false).unwrap(), "NOT");
        assert_eq!(mode_placeholder(QueryName::ScheduledQueriesMovement, false).unwrap(), "");
        assert_eq!(mode_placeholder(QueryName::StandardUserSlots, false).unwrap(), "");
        assert_eq!(
            mode_placeholder(QueryName::TableStorageTb, true).unwrap(),
            "IS NOT NULL OR projectId"
        );
        assert_eq!(
            mode_placeholder(QueryName::TableStorageTb, false).unwrap(),
            "IS NOT NULL OR protopayload_auditlog.servicedata_v1_bigquery.jobCompletedEvent.job.jobName.projectId"
        );
        // Pinned ahead of mode lookup even though both are hybrid queries.
        assert_eq!(mode_placeholder(QueryName::TotalScanPrice, false).unwrap(), "NOT");
        assert_eq!(mode_placeholder(QueryName::StorageSavings, true).unwrap(), "NOT");
    }

    #[test]
    fn unknown_query_fails_everywhere_a_mode_is_needed() {
        let replacements = replacements();
        let query = QueryName::UserSlotsTopQueries;
        let expected = ResolveError::UnknownQuery(query);

        assert_eq!(Mode::of(query).unwrap_err(), expected);
        assert_eq!(
            jobs_deduplicated_clause(query, &replacements, ymd(2022, 7, 7), ymd(2022, 7, 8))
                .unwrap_err(),
            expected
        );
        assert_eq!(
            historical_union(
                query,
                &replacements,
                &replacements.projects_with_reservations,
                ymd(2022, 7, 7),
                ymd(2022, 7, 8),
            )
            .unwrap_err(),
            expected
        );
    }

    #[test]
    fn historical_union_short_circuits_when_window_is_covered() {
        let mut replacements = replacements();
        replacements.min_date = ymd(2022, 7, 14);

        let union = historical_union(
            QueryName::CostFromTableTypes,
            &replacements,
            &replacements.projects_with_reservations,
            ymd(2022, 6, 14),
            ymd(2022, 6, 15),
        )
        .unwrap();

        assert_eq!(union, "");
    }

    #[test]
    fn historical_union_carries_cutoff_as_end_date() {
        let replacements = replacements();

        let union = historical_union(
            QueryName::CostFromTableTypes,
            &replacements,
            &replacements.projects_with_reservations,
            ymd(2022, 6, 14),
            ymd(2022, 6, 15),
        )
        .unwrap();

        assert!(union.contains("UNION ALL"));
        assert!(union.contains("`acme-prod.audit.historical_jobs`"));
        assert!(union.contains(r#"(projectId IS NOT NULL OR projectId IN ("res-1","res-2"))"#));
        assert!(union.contains("DATE(startTime) >= '2022-06-14'"));
        assert!(union.contains("DATE(startTime) < '2022-06-15'"));
    }

    #[test]
    fn dedup_clause_is_fully_substituted() {
        let replacements = replacements();

        let clause = jobs_deduplicated_clause(
            QueryName::LimitingJobsSavings,
            &replacements,
            ymd(2022, 7, 7),
            ymd(2022, 7, 8),
        )
        .unwrap();

        assert!(clause.contains("`acme-prod.audit.cloudaudit_googleapis_com_data_access`"));
        assert!(clause.contains(r#"NOT IN ("res-1","res-2")"#));
        assert!(clause.contains(">= '2022-07-07'"));
        assert!(clause.contains("NULL AS query"));
        assert!(!clause.contains("{modePlaceholder}"));
        assert!(!clause.contains("{historicalJobsPlaceholder}"));
        assert!(!clause.contains("{projectsWithReservations}"));
    }

    #[test]
    fn query_embedding_templates_carry_the_query_column() {
        let replacements = replacements();

        let resolved = resolve(
            QueryName::ClusterTables,
            CLUSTER_TABLES,
            &replacements,
            TimeRange::Week,
            now(),
        )
        .unwrap();

        assert!(resolved.sql.contains(
            "protopayload_auditlog.servicedata_v1_bigquery.jobCompletedEvent.job.jobConfiguration.query.query AS query"
        ));
        // The embedded JavaScript body survives substitution untouched.
        assert!(resolved.sql.contains("getTableIdBaseName(tableId)"));
        assert!(resolved.sql.contains("${date[1]}-${date[2]}-${date[3]}"));
    }

    #[test]
    fn unknown_tokens_survive_substitution_verbatim() {
        let replacements = replacements();

        let resolved = resolve(
            QueryName::TotalScanPrice,
            "SELECT {notAKnownToken} FROM x WHERE d >= '{startDate}'",
            &replacements,
            TimeRange::Day,
            now(),
        )
        .unwrap();

        assert_eq!(
            resolved.sql,
            "SELECT {notAKnownToken} FROM x WHERE d >= '2022-07-13'"
        );
    }

    #[test]
    fn price_per_tb_scan_is_inlined() {
        let replacements = replacements();

        let resolved = resolve(
            QueryName::LimitingJobsSavings,
            LIMITING_JOBS_SAVINGS,
            &replacements,
            TimeRange::Week,
            now(),
        )
        .unwrap();

        assert!(resolved.sql.contains("ROUND(6.25*SUM(totalBilledBytes"));
        assert!(!resolved.sql.contains("{pricePerTBScan}"));
    }

    #[test]
    fn flat_rate_queries_keep_reservations_only() {
        let replacements = replacements();

        let resolved = resolve(
            QueryName::BillingProjectSlots,
            BILLING_PROJECT_SLOTS,
            &replacements,
            TimeRange::Week,
            now(),
        )
        .unwrap();

        // Empty mode token: the predicate keeps reservation projects.
        assert!(resolved.sql.contains(r#"projectId  IN ("res-1","res-2")"#));
    }
}
