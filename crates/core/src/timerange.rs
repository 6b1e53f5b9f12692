//! Symbolic observation windows and their day-count arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ResolveError;

/// Observation window a recommendation is computed over.
///
/// Every window maps 1:1 to a fixed day count; the resolver subtracts that
/// count from the newest audit-log date to obtain the query's start date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
}

impl TimeRange {
    /// All windows a recommendation run covers, in ascending order.
    pub const ALL: [TimeRange; 3] = [TimeRange::Day, TimeRange::Week, TimeRange::Month];

    pub fn day_count(self) -> i64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
        }
    }

    /// Parses the symbolic form used in stored documents and task payloads.
    /// Anything outside `day`/`week`/`month` is rejected.
    pub fn parse(value: &str) -> Result<Self, ResolveError> {
        match value {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            other => Err(ResolveError::UnknownTimeRange(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_counts_match_the_documented_windows() {
        assert_eq!(TimeRange::Day.day_count(), 1);
        assert_eq!(TimeRange::Week.day_count(), 7);
        assert_eq!(TimeRange::Month.day_count(), 30);
    }

    #[test]
    fn parse_accepts_only_known_windows() {
        assert_eq!(TimeRange::parse("day").unwrap(), TimeRange::Day);
        assert_eq!(TimeRange::parse("week").unwrap(), TimeRange::Week);
        assert_eq!(TimeRange::parse("month").unwrap(), TimeRange::Month);

        let err = TimeRange::parse("past-0-day").unwrap_err();
        assert!(matches!(err, ResolveError::UnknownTimeRange(ref v) if v == "past-0-day"));
    }

    #[test]
    fn parse_round_trips_through_as_str() {
        for range in TimeRange::ALL {
            assert_eq!(TimeRange::parse(range.as_str()).unwrap(), range);
        }
    }
}
