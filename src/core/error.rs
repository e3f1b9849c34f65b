use thiserror::Error;

/// Errors raised while validating form input or running a projection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    /// Seed absent, zero, negative or not a number.
    #[error("starting amount must be greater than zero")]
    InvalidSeed,
    /// Base rate or years absent (or zero).
    #[error("the first growth period needs both a rate and a number of years")]
    MissingBaseInput,
    /// An additional row has exactly one of rate/years filled.
    #[error("additional growth period {} needs both a rate and a number of years", .index + 1)]
    PartialAdditionalInput { index: usize },
    #[error("too many growth periods: at most {max} additional periods, got {got}")]
    TooManyConditions { max: usize, got: usize },
    #[error("growth periods span {got} years, at most {max} are allowed")]
    TooManyYears { max: u64, got: u64 },
    /// Running amount left the range whole currency units are reported in.
    #[error("amount in year {year} is too large to report")]
    AmountOutOfRange { year: u32 },
    #[error("invalid growth period: {0}")]
    InvalidCondition(String),
    /// Projector called with a non-positive seed or no conditions.
    #[error("invalid projection input: {0}")]
    InvalidInput(String),
}

impl ProjectionError {
    /// Form field the message belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ProjectionError::InvalidSeed => "seed",
            ProjectionError::MissingBaseInput => "base",
            ProjectionError::PartialAdditionalInput { .. }
            | ProjectionError::TooManyConditions { .. } => "steps",
            ProjectionError::TooManyYears { .. } => "years",
            ProjectionError::AmountOutOfRange { .. }
            | ProjectionError::InvalidCondition(_)
            | ProjectionError::InvalidInput(_) => "input",
        }
    }
}
