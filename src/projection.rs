//! Forward projections over the monthly fact series.
//!
//! A deliberately simple seasonal-naive-growth model: per-calendar-month
//! seasonality factors around the series average, one clamped half-over-half
//! growth rate, and a compounding monthly multiplier. No confidence
//! intervals and no outlier handling.

use crate::error::{PnlError, Result};
use crate::schema::{MonthlyFact, ProjectionPoint};
use crate::utils::{add_months, round2};
use chrono::Datelike;
use log::debug;

/// Annualized growth assumed when the series is too short to measure.
pub const DEFAULT_GROWTH: f64 = 0.05;
pub const GROWTH_MIN: f64 = -0.30;
pub const GROWTH_MAX: f64 = 0.50;
pub const PROJECTION_MONTHS: usize = 12;

fn cash_flow(fact: &MonthlyFact) -> f64 {
    fact.revenue - fact.expenses - fact.cogs
}

/// Half-over-half revenue growth, clamped to [-30%, +50%].
///
/// Series shorter than 12 months fall back to [`DEFAULT_GROWTH`]; a zero
/// first-half total yields 0 rather than a division fault.
pub fn growth_rate(facts: &[MonthlyFact]) -> f64 {
    let growth = if facts.len() >= 12 {
        let half = facts.len() / 2;
        let first: f64 = facts[..half].iter().map(|f| f.revenue).sum();
        let second: f64 = facts[half..].iter().map(|f| f.revenue).sum();
        if first == 0.0 {
            0.0
        } else {
            (second - first) / first
        }
    } else {
        DEFAULT_GROWTH
    };

    growth.clamp(GROWTH_MIN, GROWTH_MAX)
}

/// Seasonality factor per calendar month (index 0 = January): that month's
/// average revenue over the overall average. Months with no observations,
/// or a zero overall average, get a neutral 1.0.
pub fn seasonality_factors(facts: &[MonthlyFact]) -> [f64; 12] {
    let mut factors = [1.0; 12];
    if facts.is_empty() {
        return factors;
    }

    let overall: f64 = facts.iter().map(|f| f.revenue).sum::<f64>() / facts.len() as f64;
    if overall == 0.0 {
        return factors;
    }

    let mut sums = [0.0_f64; 12];
    let mut counts = [0_u32; 12];
    for fact in facts {
        let idx = fact.month.month0() as usize;
        sums[idx] += fact.revenue;
        counts[idx] += 1;
    }

    for idx in 0..12 {
        if counts[idx] > 0 {
            factors[idx] = (sums[idx] / counts[idx] as f64) / overall;
        }
    }
    factors
}

/// Projects exactly [`PROJECTION_MONTHS`] forward points from the observed
/// series. The input is re-sorted by month, so callers may pass rows in any
/// order. At least one fact is required.
pub fn project(facts: &[MonthlyFact]) -> Result<Vec<ProjectionPoint>> {
    if facts.is_empty() {
        return Err(PnlError::EmptyHistory);
    }

    let mut history = facts.to_vec();
    history.sort_by_key(|f| f.month);

    let n = history.len() as f64;
    let avg_revenue: f64 = history.iter().map(|f| f.revenue).sum::<f64>() / n;
    let avg_cash_flow: f64 = history.iter().map(cash_flow).sum::<f64>() / n;
    let avg_net_profit: f64 = history.iter().map(|f| f.net_profit).sum::<f64>() / n;

    let growth = growth_rate(&history);
    let factors = seasonality_factors(&history);
    let Some(last) = history.last() else {
        return Err(PnlError::EmptyHistory);
    };

    debug!(
        "projecting from {} observed months: avg revenue {:.2}, growth {:.4}",
        history.len(),
        avg_revenue,
        growth
    );

    let mut points = Vec::with_capacity(PROJECTION_MONTHS);
    for offset in 1..=PROJECTION_MONTHS {
        let month = add_months(last.month, offset as i32);
        let factor = factors[month.month0() as usize];
        let multiplier = (1.0 + growth / 12.0).powi(offset as i32);

        points.push(ProjectionPoint {
            month,
            revenue: round2(avg_revenue * multiplier * factor),
            cash_flow: round2(avg_cash_flow * multiplier * factor),
            net_profit: round2(avg_net_profit * multiplier * factor),
            is_projected: true,
            seasonality_factor: Some(factor),
            recurring_expenses: None,
        });
    }

    Ok(points)
}

/// The observed months as chart points followed by the 12 projected ones.
pub fn projection_timeline(facts: &[MonthlyFact]) -> Result<Vec<ProjectionPoint>> {
    let mut history = facts.to_vec();
    history.sort_by_key(|f| f.month);

    let mut points: Vec<ProjectionPoint> = history
        .iter()
        .map(|fact| ProjectionPoint {
            month: fact.month,
            revenue: fact.revenue,
            cash_flow: cash_flow(fact),
            net_profit: fact.net_profit,
            is_projected: false,
            seasonality_factor: None,
            recurring_expenses: None,
        })
        .collect();

    points.extend(project(&history)?);
    Ok(points)
}
