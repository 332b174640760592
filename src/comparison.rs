//! Period-over-period metric math: totals over fact slices, percentage
//! change with a zero-baseline guard, polarity and neutrality
//! classification, and the related-metric deltas the insight text draws on.

use crate::insight::comparison_insight;
use crate::schema::MonthlyFact;
use serde::{Deserialize, Serialize};

/// Changes within this percentage band (inclusive) read as "stable".
pub const NEUTRAL_BAND: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    GrossRevenue,
    Cogs,
    GrossMargin,
    FixedOverhead,
    NetMargin,
}

impl Metric {
    /// Lower-case name used inside insight sentences.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::GrossRevenue => "revenue",
            Metric::Cogs => "cost of goods sold",
            Metric::GrossMargin => "gross margin",
            Metric::FixedOverhead => "fixed overhead",
            Metric::NetMargin => "net margin",
        }
    }

    /// Cost metrics invert polarity: a decrease is favorable.
    pub fn is_cost(&self) -> bool {
        matches!(self, Metric::Cogs | Metric::FixedOverhead)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    revenue: f64,
    cogs: f64,
    expenses: f64,
}

impl Totals {
    fn from_facts(facts: &[MonthlyFact]) -> Self {
        facts.iter().fold(Self::default(), |acc, f| Self {
            revenue: acc.revenue + f.revenue,
            cogs: acc.cogs + f.cogs,
            expenses: acc.expenses + f.expenses,
        })
    }

    fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::GrossRevenue => self.revenue,
            Metric::Cogs => self.cogs,
            Metric::GrossMargin => self.revenue - self.cogs,
            Metric::FixedOverhead => self.expenses,
            Metric::NetMargin => self.revenue - self.cogs - self.expenses,
        }
    }
}

/// Sum of the metric over the period's facts.
pub fn metric_value(facts: &[MonthlyFact], metric: Metric) -> f64 {
    Totals::from_facts(facts).metric(metric)
}

/// Percentage change against the comparison baseline. A zero baseline is
/// defined as 0% change, never a division fault.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous.abs() * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedMetric {
    pub name: String,
    pub value: f64,
    pub change: f64,
}

/// Sibling metrics shown next to the headline number, with their own
/// period-over-period changes.
pub fn related_metrics(
    current: &[MonthlyFact],
    comparison: &[MonthlyFact],
    metric: Metric,
) -> Vec<RelatedMetric> {
    let now = Totals::from_facts(current);
    let prior = Totals::from_facts(comparison);

    let related = |name: &str, m: Metric| RelatedMetric {
        name: name.to_string(),
        value: now.metric(m),
        change: percentage_change(now.metric(m), prior.metric(m)),
    };

    match metric {
        Metric::GrossMargin => vec![
            related("Revenue", Metric::GrossRevenue),
            related("COGS", Metric::Cogs),
        ],
        Metric::NetMargin => vec![
            related("Gross Margin", Metric::GrossMargin),
            related("Fixed Overhead", Metric::FixedOverhead),
        ],
        Metric::GrossRevenue => vec![
            related("COGS", Metric::Cogs),
            related("Gross Margin", Metric::GrossMargin),
        ],
        Metric::Cogs | Metric::FixedOverhead => vec![
            related("Revenue", Metric::GrossRevenue),
            related("Net Margin", Metric::NetMargin),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
    pub amount: f64,
    pub percentage: f64,
    pub is_positive: bool,
    pub is_neutral: bool,
}

impl MetricChange {
    /// Classifies a change. Neutral (within ±[`NEUTRAL_BAND`]) reads as
    /// positive for display; outside the band, cost metrics count a
    /// decrease as favorable and everything else an increase.
    pub fn classify(metric: Metric, amount: f64, percentage: f64) -> Self {
        let is_neutral = percentage.abs() <= NEUTRAL_BAND;
        let is_positive = if is_neutral {
            true
        } else if metric.is_cost() {
            amount < 0.0
        } else {
            amount > 0.0
        };

        Self {
            amount,
            percentage,
            is_positive,
            is_neutral,
        }
    }
}

/// A fully assembled current-vs-comparison view of one metric, insight
/// text included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub metric: Metric,
    pub current: PeriodSummary,
    pub comparison: PeriodSummary,
    pub change: MetricChange,
    pub related: Vec<RelatedMetric>,
    pub insight: String,
}

pub fn compare_periods(
    metric: Metric,
    current_facts: &[MonthlyFact],
    current_label: &str,
    comparison_facts: &[MonthlyFact],
    comparison_label: &str,
) -> PeriodComparison {
    let current_value = metric_value(current_facts, metric);
    let comparison_value = metric_value(comparison_facts, metric);
    let amount = current_value - comparison_value;
    let percentage = percentage_change(current_value, comparison_value);

    let change = MetricChange::classify(metric, amount, percentage);
    let related = related_metrics(current_facts, comparison_facts, metric);
    let insight = comparison_insight(
        metric,
        current_value,
        &change,
        &related,
        comparison_label,
    );

    PeriodComparison {
        metric,
        current: PeriodSummary {
            label: current_label.to_string(),
            value: current_value,
        },
        comparison: PeriodSummary {
            label: comparison_label.to_string(),
            value: comparison_value,
        },
        change,
        related,
        insight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn fact(month: u32, revenue: f64, cogs: f64, expenses: f64) -> MonthlyFact {
        MonthlyFact {
            company_id: "co-1".to_string(),
            month: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            revenue,
            cogs,
            expenses,
            net_profit: revenue - cogs - expenses,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_metric_totals() {
        let facts = vec![fact(1, 1000.0, 200.0, 300.0), fact(2, 500.0, 100.0, 100.0)];

        assert_eq!(metric_value(&facts, Metric::GrossRevenue), 1500.0);
        assert_eq!(metric_value(&facts, Metric::Cogs), 300.0);
        assert_eq!(metric_value(&facts, Metric::GrossMargin), 1200.0);
        assert_eq!(metric_value(&facts, Metric::FixedOverhead), 400.0);
        assert_eq!(metric_value(&facts, Metric::NetMargin), 800.0);
    }

    #[test]
    fn test_percentage_change_zero_baseline() {
        assert_eq!(percentage_change(500.0, 0.0), 0.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert_eq!(percentage_change(150.0, 100.0), 50.0);
        assert_eq!(percentage_change(50.0, -100.0), 150.0);
    }

    #[test]
    fn test_neutral_band_boundary() {
        let at_band = MetricChange::classify(Metric::GrossRevenue, 2.0, 2.0);
        assert!(at_band.is_neutral);
        assert!(at_band.is_positive);

        let just_over = MetricChange::classify(Metric::GrossRevenue, 2.0, 2.0001);
        assert!(!just_over.is_neutral);

        let negative_at_band = MetricChange::classify(Metric::GrossRevenue, -2.0, -2.0);
        assert!(negative_at_band.is_neutral);

        let negative_over = MetricChange::classify(Metric::GrossRevenue, -2.0, -2.0001);
        assert!(!negative_over.is_neutral);
    }

    #[test]
    fn test_cost_metric_polarity_reversed() {
        let falling_costs = MetricChange::classify(Metric::Cogs, -500.0, -20.0);
        assert!(falling_costs.is_positive);

        let rising_costs = MetricChange::classify(Metric::FixedOverhead, 500.0, 20.0);
        assert!(!rising_costs.is_positive);

        let rising_revenue = MetricChange::classify(Metric::GrossRevenue, 500.0, 20.0);
        assert!(rising_revenue.is_positive);

        let falling_revenue = MetricChange::classify(Metric::NetMargin, -500.0, -20.0);
        assert!(!falling_revenue.is_positive);
    }

    #[test]
    fn test_related_metric_sets() {
        let current = vec![fact(2, 1000.0, 200.0, 300.0)];
        let prior = vec![fact(1, 800.0, 250.0, 300.0)];

        let names = |metric| {
            related_metrics(&current, &prior, metric)
                .into_iter()
                .map(|r| r.name)
                .collect::<Vec<_>>()
        };

        assert_eq!(names(Metric::GrossMargin), vec!["Revenue", "COGS"]);
        assert_eq!(names(Metric::NetMargin), vec!["Gross Margin", "Fixed Overhead"]);
        assert_eq!(names(Metric::GrossRevenue), vec!["COGS", "Gross Margin"]);
        assert_eq!(names(Metric::Cogs), vec!["Revenue", "Net Margin"]);
        assert_eq!(names(Metric::FixedOverhead), vec!["Revenue", "Net Margin"]);
    }

    #[test]
    fn test_related_metric_changes() {
        let current = vec![fact(2, 1000.0, 200.0, 300.0)];
        let prior = vec![fact(1, 800.0, 250.0, 300.0)];

        let related = related_metrics(&current, &prior, Metric::GrossMargin);
        assert_eq!(related[0].value, 1000.0);
        assert_eq!(related[0].change, 25.0);
        assert_eq!(related[1].value, 200.0);
        assert_eq!(related[1].change, -20.0);
    }

    #[test]
    fn test_compare_periods_assembly() {
        let current = vec![fact(2, 1500.0, 200.0, 300.0)];
        let prior = vec![fact(1, 1000.0, 250.0, 300.0)];

        let comparison = compare_periods(
            Metric::GrossRevenue,
            &current,
            "Feb 2025",
            &prior,
            "Jan 2025",
        );

        assert_eq!(comparison.current.value, 1500.0);
        assert_eq!(comparison.comparison.value, 1000.0);
        assert_eq!(comparison.change.amount, 500.0);
        assert_eq!(comparison.change.percentage, 50.0);
        assert!(comparison.change.is_positive);
        assert!(!comparison.change.is_neutral);
        assert!(!comparison.insight.is_empty());
    }
}
