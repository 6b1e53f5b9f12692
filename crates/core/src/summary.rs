//! Nested recommendation result maps and their merge semantics.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::query::QueryName;
use crate::timerange::TimeRange;

/// Payloads for one query across observation windows.
pub type TimeRangeRecommendation = BTreeMap<TimeRange, Value>;

/// The unit of executor output and of persistence: at most one payload
/// per (query, window) pair.
pub type RecommendationSummary = BTreeMap<QueryName, TimeRangeRecommendation>;

/// Combines two independently computed summaries into a new one; `b`
/// wins when both carry the same query. Collisions are not expected
/// (disjoint computations produce disjoint keys) but must not panic.
pub fn merge(a: &RecommendationSummary, b: &RecommendationSummary) -> RecommendationSummary {
    let mut merged = a.clone();
    for (query, ranges) in b {
        merged.insert(*query, ranges.clone());
    }
    merged
}

/// Fan-in fold over per-task summary fragments: later fragments win per
/// (query, window) pair, so fragments for different windows of the same
/// query accumulate instead of clobbering each other.
pub fn aggregate<I>(fragments: I) -> RecommendationSummary
where
    I: IntoIterator<Item = RecommendationSummary>,
{
    let mut out = RecommendationSummary::new();
    for fragment in fragments {
        for (query, ranges) in fragment {
            out.entry(query).or_default().extend(ranges);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(query: QueryName, range: TimeRange, payload: Value) -> RecommendationSummary {
        RecommendationSummary::from([(query, TimeRangeRecommendation::from([(range, payload)]))])
    }

    #[test]
    fn merge_keeps_disjoint_queries_from_both_sides() {
        let a = summary(QueryName::TotalScanPrice, TimeRange::Day, json!({"tb": 1}));
        let b = summary(QueryName::UserSlots, TimeRange::Day, json!({"slots": 2}));

        let merged = merge(&a, &b);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&QueryName::TotalScanPrice][&TimeRange::Day], json!({"tb": 1}));
        assert_eq!(merged[&QueryName::UserSlots][&TimeRange::Day], json!({"slots": 2}));
    }

    #[test]
    fn merge_second_argument_wins_on_collision() {
        let a = summary(QueryName::TotalScanPrice, TimeRange::Day, json!("first"));
        let b = summary(QueryName::TotalScanPrice, TimeRange::Day, json!("second"));

        let merged = merge(&a, &b);

        assert_eq!(merged[&QueryName::TotalScanPrice][&TimeRange::Day], json!("second"));
    }

    #[test]
    fn aggregate_accumulates_windows_per_query() {
        let fragments = vec![
            summary(QueryName::UserSlots, TimeRange::Day, json!(1)),
            summary(QueryName::UserSlots, TimeRange::Week, json!(7)),
            summary(QueryName::TotalScanPrice, TimeRange::Month, json!(30)),
        ];

        let folded = aggregate(fragments);

        assert_eq!(folded[&QueryName::UserSlots].len(), 2);
        assert_eq!(folded[&QueryName::UserSlots][&TimeRange::Week], json!(7));
        assert_eq!(folded[&QueryName::TotalScanPrice][&TimeRange::Month], json!(30));
    }
}
