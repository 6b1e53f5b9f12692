//! The per-run parameter bag driving template substitution.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::query::{self, Mode, QueryName};

/// Substitution inputs for one customer run. Built once per run and
/// shared read-only across concurrent resolution calls; the resolved
/// window comes back on [`crate::resolver::ResolvedQuery`] rather than
/// being written into this bag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacements {
    pub project_id: String,
    pub dataset_id: String,
    pub tables_discovery_table: String,
    pub location: String,
    /// Flat/global reservation-project list, used by every query that is
    /// not edition-tagged.
    pub projects_with_reservations: Vec<String>,
    /// Per-edition reservation-project lists.
    pub projects_by_edition: BTreeMap<Mode, Vec<String>>,
    /// Archive tables holding jobs older than the audit-log retention.
    pub historical_jobs: Vec<String>,
    /// Oldest audit-log date observed for this customer.
    pub min_date: NaiveDate,
    /// Newest audit-log date observed; the window end for every range.
    pub max_date: NaiveDate,
}

impl Replacements {
    /// Reservation projects a query deduplicates against: edition-tagged
    /// queries get that edition's list, everything else the flat list.
    pub fn reservations_for(&self, query: QueryName) -> &[String] {
        match query::edition_of(query) {
            Some(edition) => self
                .projects_by_edition
                .get(&edition)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            None => &self.projects_with_reservations,
        }
    }
}

/// Renders a reservation-project list the exact way downstream SQL
/// expects it: `("p1","p2")`, and `("")` for an empty list (never `()`).
pub fn render_reservations(projects: &[String]) -> String {
    if projects.is_empty() {
        return r#"("")"#.to_string();
    }

    let quoted: Vec<String> = projects.iter().map(|p| format!("\"{p}\"")).collect();
    format!("({})", quoted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reservation_list_renders_as_quoted_empty_string() {
        assert_eq!(render_reservations(&[]), r#"("")"#);
    }

    #[test]
    fn single_reservation_project() {
        assert_eq!(render_reservations(&["project1".to_string()]), r#"("project1")"#);
    }

    #[test]
    fn multiple_reservation_projects_are_comma_joined() {
        let projects = vec!["project1".to_string(), "project2".to_string(), "project3".to_string()];
        assert_eq!(render_reservations(&projects), r#"("project1","project2","project3")"#);
    }

    #[test]
    fn edition_queries_use_their_edition_reservation_list() {
        let replacements = Replacements {
            projects_with_reservations: vec!["flat".to_string()],
            projects_by_edition: BTreeMap::from([(
                Mode::EnterpriseEdition,
                vec!["ent-a".to_string(), "ent-b".to_string()],
            )]),
            ..Replacements::default()
        };

        assert_eq!(
            replacements.reservations_for(QueryName::EnterpriseUserSlots),
            ["ent-a".to_string(), "ent-b".to_string()]
        );
        assert_eq!(
            replacements.reservations_for(QueryName::UserSlots),
            ["flat".to_string()]
        );
        // No list configured for that edition: empty, not the flat list.
        assert!(replacements.reservations_for(QueryName::StandardUserSlots).is_empty());
    }
}
