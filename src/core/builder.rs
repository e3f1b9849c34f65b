use super::{ConditionInput, GrowthCondition, GrowthConditionSequence, ProjectionError};

/// Rows the form may add after the base period.
pub const MAX_ADDITIONAL_CONDITIONS: usize = 6;

/// Longest projection the form may request, summed across all periods.
pub const MAX_TOTAL_YEARS: u64 = 1_000;

/// Assembles the base period and any additional rows into a sequence.
///
/// Blank additional rows are skipped, half-filled rows are rejected before
/// anything is projected.
pub fn build_conditions(
    base: ConditionInput,
    additional: &[ConditionInput],
) -> Result<GrowthConditionSequence, ProjectionError> {
    let Some((base_rate, base_years)) = base.truthy() else {
        return Err(ProjectionError::MissingBaseInput);
    };

    let mut conditions = Vec::with_capacity(additional.len() + 1);
    conditions.push(GrowthCondition::new(base_rate, base_years)?);

    for (index, row) in additional.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        if !row.is_complete() {
            return Err(ProjectionError::PartialAdditionalInput { index });
        }
        // A zero rate or zero years reads as an unfilled row.
        if let Some((rate, years)) = row.truthy() {
            conditions.push(GrowthCondition::new(rate, years)?);
        }
    }

    GrowthConditionSequence::new(conditions)
}

pub fn validate_seed(seed: Option<f64>) -> Result<f64, ProjectionError> {
    match seed {
        Some(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ProjectionError::InvalidSeed),
    }
}

/// Reads a seed typed with digit grouping, e.g. "1,000,000".
///
/// A leading `-` is kept so negative text still fails `validate_seed`.
pub fn parse_seed_text(text: &str) -> Option<f64> {
    let text = text.trim();
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<f64>().ok()?;
    if text.starts_with('-') {
        Some(-value)
    } else {
        Some(value)
    }
}
