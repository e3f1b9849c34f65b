use tracing::debug;

use super::{GrowthCondition, GrowthConditionSequence, ProjectionError, YearlyResult};

/// Largest whole amount reported, the exact-integer range of an `f64`.
pub const MAX_AMOUNT: i64 = 1 << 53;

/// Applies each condition's annual rate in order, one year at a time.
///
/// `total` and `increase` are rounded independently from the unrounded
/// running amount, so `increase` can differ by one from the difference of
/// two consecutive rounded totals. A running amount beyond `MAX_AMOUNT` in
/// either direction fails with `AmountOutOfRange`.
pub fn project(
    seed: f64,
    conditions: &[GrowthCondition],
) -> Result<Vec<YearlyResult>, ProjectionError> {
    if !seed.is_finite() || seed <= 0.0 {
        return Err(ProjectionError::InvalidInput(format!(
            "seed must be > 0, got {seed}"
        )));
    }
    if checked_amount(seed).is_none() {
        return Err(ProjectionError::InvalidInput(format!(
            "seed must be <= {MAX_AMOUNT}, got {seed}"
        )));
    }
    if conditions.is_empty() {
        return Err(ProjectionError::InvalidInput(
            "at least one growth condition is required".to_string(),
        ));
    }

    let mut results = Vec::new();
    let mut current_amount = seed;
    let mut year_count = 0u32;

    for condition in conditions {
        for _ in 0..condition.years() {
            let before = current_amount;
            current_amount *= 1.0 + condition.rate();
            year_count += 1;

            let out_of_range = ProjectionError::AmountOutOfRange { year: year_count };
            let total = checked_amount(current_amount).ok_or(out_of_range.clone())?;
            let increase = checked_amount(current_amount - before).ok_or(out_of_range)?;
            results.push(YearlyResult {
                year: year_count,
                total,
                increase,
            });
        }
    }

    debug!(
        seed,
        conditions = conditions.len(),
        years = results.len(),
        "projection complete"
    );
    Ok(results)
}

pub fn project_sequence(
    seed: f64,
    conditions: &GrowthConditionSequence,
) -> Result<Vec<YearlyResult>, ProjectionError> {
    project(seed, conditions.as_slice())
}

/// Rounds half away from zero; `None` outside `-MAX_AMOUNT..=MAX_AMOUNT`.
pub(crate) fn checked_amount(value: f64) -> Option<i64> {
    let rounded = value.round();
    let limit = MAX_AMOUNT as f64;
    if rounded.is_finite() && (-limit..=limit).contains(&rounded) {
        Some(rounded as i64)
    } else {
        None
    }
}
