mod builder;
mod engine;
mod error;
mod present;
mod types;

pub use builder::{
    MAX_ADDITIONAL_CONDITIONS, MAX_TOTAL_YEARS, build_conditions, parse_seed_text, validate_seed,
};
pub use engine::{MAX_AMOUNT, project, project_sequence};
pub use error::ProjectionError;
pub use present::{chart_series, format_amount, summarize, table_rows};
pub use types::{
    ChartSeries, ConditionInput, GrowthCondition, GrowthConditionSequence, ProjectionSummary,
    TableRow, YearlyResult,
};
