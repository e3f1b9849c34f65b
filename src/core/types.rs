use serde::Serialize;

use super::ProjectionError;

/// One contiguous growth period compounded annually at a constant rate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct GrowthCondition {
    rate: f64,
    years: u32,
}

impl GrowthCondition {
    pub fn new(rate: f64, years: u32) -> Result<Self, ProjectionError> {
        if !rate.is_finite() {
            return Err(ProjectionError::InvalidCondition(format!(
                "rate must be a finite number, got {rate}"
            )));
        }
        if years == 0 {
            return Err(ProjectionError::InvalidCondition(
                "years must be >= 1".to_string(),
            ));
        }
        Ok(Self { rate, years })
    }

    /// Fractional rate per year, e.g. 0.05 for 5%.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn years(&self) -> u32 {
        self.years
    }
}

/// Ordered, non-empty list of growth periods. Order is application order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GrowthConditionSequence(Vec<GrowthCondition>);

impl GrowthConditionSequence {
    pub fn new(conditions: Vec<GrowthCondition>) -> Result<Self, ProjectionError> {
        if conditions.is_empty() {
            return Err(ProjectionError::InvalidInput(
                "condition sequence must not be empty".to_string(),
            ));
        }
        Ok(Self(conditions))
    }

    pub fn as_slice(&self) -> &[GrowthCondition] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_years(&self) -> u64 {
        self.0.iter().map(|condition| u64::from(condition.years())).sum()
    }
}

/// A form row as typed by the user: either field may be left blank.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ConditionInput {
    pub rate: Option<f64>,
    pub years: Option<u32>,
}

impl ConditionInput {
    pub fn new(rate: Option<f64>, years: Option<u32>) -> Self {
        Self { rate, years }
    }

    pub fn filled(rate: f64, years: u32) -> Self {
        Self {
            rate: Some(rate),
            years: Some(years),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.rate.is_none() && self.years.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.rate.is_some() && self.years.is_some()
    }

    /// Both fields present, non-zero and not NaN.
    pub(crate) fn truthy(&self) -> Option<(f64, u32)> {
        match (self.rate, self.years) {
            (Some(rate), Some(years)) if rate != 0.0 && !rate.is_nan() && years != 0 => {
                Some((rate, years))
            }
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyResult {
    pub year: u32,
    pub total: i64,
    pub increase: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub principal: Vec<i64>,
    pub prior_growth: Vec<i64>,
    pub current_growth: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub year: u32,
    pub total: String,
    pub increase: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub total_years: u32,
    pub final_total: i64,
    pub total_growth: i64,
}
