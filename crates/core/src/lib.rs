pub mod errors;
pub mod query;
pub mod replacements;
pub mod resolver;
pub mod summary;
pub mod templates;
pub mod timerange;

pub use chrono;

pub use errors::ResolveError;
pub use query::{Mode, QueryName};
pub use replacements::{render_reservations, Replacements};
pub use resolver::{resolve, ResolvedQuery};
pub use summary::{aggregate, merge, RecommendationSummary, TimeRangeRecommendation};
pub use timerange::TimeRange;
