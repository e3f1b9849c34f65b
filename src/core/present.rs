use super::{ChartSeries, ProjectionSummary, TableRow, YearlyResult};

/// Splits each year into principal, growth from earlier years, and this
/// year's growth, for a stacked bar chart.
pub fn chart_series(seed: f64, years: &[YearlyResult]) -> ChartSeries {
    let principal = principal_amount(seed);
    let mut series = ChartSeries {
        labels: Vec::with_capacity(years.len()),
        principal: Vec::with_capacity(years.len()),
        prior_growth: Vec::with_capacity(years.len()),
        current_growth: Vec::with_capacity(years.len()),
    };

    for row in years {
        series.labels.push(format!("Year {}", row.year));
        series.principal.push(principal);
        series.prior_growth.push(
            row.total
                .saturating_sub(principal)
                .saturating_sub(row.increase),
        );
        series.current_growth.push(row.increase);
    }
    series
}

pub fn table_rows(years: &[YearlyResult]) -> Vec<TableRow> {
    years
        .iter()
        .map(|row| TableRow {
            year: row.year,
            total: format_amount(row.total),
            increase: format_amount(row.increase),
        })
        .collect()
}

pub fn summarize(seed: f64, years: &[YearlyResult]) -> ProjectionSummary {
    let principal = principal_amount(seed);
    let final_total = years.last().map_or(principal, |row| row.total);
    ProjectionSummary {
        total_years: years.last().map_or(0, |row| row.year),
        final_total,
        total_growth: final_total.saturating_sub(principal),
    }
}

// Saturating cast; NaN maps to 0.
fn principal_amount(seed: f64) -> i64 {
    seed.round() as i64
}

/// Whole currency units with comma thousands separators.
pub fn format_amount(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
