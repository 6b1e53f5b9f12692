use thiserror::Error;

use crate::query::QueryName;

/// Failures raised while turning a query template into executable SQL.
///
/// All variants are fatal to the single resolution call that raised them;
/// whether they abort a whole batch is the executor's decision.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A required `Replacements` field was empty. Raised by the validation
    /// gate before any window arithmetic happens.
    #[error("missing required replacement field '{0}'")]
    MissingField(&'static str),
    #[error("unknown time range '{0}'")]
    UnknownTimeRange(String),
    /// The query name is absent from every pricing mode's set.
    #[error("query '{0}' is not within any known pricing mode")]
    UnknownQuery(QueryName),
}
