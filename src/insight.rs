//! Template-based insight text. Deterministic by construction: the same
//! numbers always produce the same sentences, which is what makes the
//! output testable. The observations are heuristic reading aids, not
//! verified accounting statements.

use crate::comparison::{Metric, MetricChange, RelatedMetric};
use crate::schema::{Insight, InsightKind, MonthlyFact, Severity};
use chrono::Datelike;

/// Half-over-half revenue growth below this magnitude (in percent) is not
/// worth a trend insight.
pub const TREND_THRESHOLD: f64 = 3.0;
/// Calendar-month deviation (in percent) that counts as seasonality.
pub const SEASONALITY_THRESHOLD: f64 = 10.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn format_k(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("${:.0}K", value / 1000.0)
    } else {
        format!("${:.0}", value)
    }
}

/// One to several sentences describing a current-vs-comparison change.
///
/// Neutral changes emphasize stability; favorable ones highlight the
/// improvement and cross-reference a related metric when it reinforces the
/// story; unfavorable ones suggest a cause from the related metrics and a
/// corrective action.
pub fn comparison_insight(
    metric: Metric,
    current_value: f64,
    change: &MetricChange,
    related: &[RelatedMetric],
    comparison_label: &str,
) -> String {
    let metric_name = metric.display_name();
    let abs_change = format!("{:.0}", change.percentage.abs());
    let direction = if change.percentage >= 0.0 {
        "increased"
    } else {
        "decreased"
    };

    if change.is_neutral {
        return format!(
            "Your {metric_name} remained relatively stable compared to {comparison_label}, \
             with only a {abs_change}% change. This consistency suggests stable operations. \
             Consider whether this is aligned with your growth goals or if there are \
             opportunities to optimize."
        );
    }

    let find = |name: &str| related.iter().find(|r| r.name == name);

    if metric.is_cost() {
        if change.is_positive {
            let mut text = format!(
                "Great news! Your {metric_name} {direction} by {abs_change}% compared to \
                 {comparison_label}. "
            );
            if let Some(revenue) = find("Revenue") {
                if revenue.change > 0.0 {
                    text.push_str(&format!(
                        "Even better, revenue grew by {:.0}% while costs dropped. ",
                        revenue.change
                    ));
                }
            }
            text.push_str(
                "This efficiency improvement is boosting your bottom line. Keep monitoring \
                 what's working.",
            );
            return text;
        }

        let mut text = format!(
            "Your {metric_name} {direction} by {abs_change}% compared to {comparison_label}. "
        );
        if !related.is_empty() {
            match find("Revenue") {
                Some(revenue) if revenue.change > 0.0 && revenue.change > change.percentage => {
                    text.push_str(&format!(
                        "However, revenue growth ({:.0}%) outpaced this increase, so margins \
                         may still be healthy. ",
                        revenue.change
                    ));
                }
                _ => text.push_str(
                    "Review your cost structure to identify areas for optimization. ",
                ),
            }
        }
        text.push_str("Consider negotiating with suppliers or improving operational efficiency.");
        return text;
    }

    if change.is_positive {
        let mut text = format!(
            "Your {metric_name} {direction} by {abs_change}% compared to {comparison_label}, \
             reaching {}. ",
            format_k(current_value)
        );

        if metric == Metric::GrossMargin {
            if let (Some(cogs), Some(revenue)) = (find("COGS"), find("Revenue")) {
                if revenue.change > cogs.change {
                    text.push_str(&format!(
                        "This is excellent - you're scaling efficiently with revenue ({:.0}%) \
                         growing faster than COGS ({:.0}%). ",
                        revenue.change, cogs.change
                    ));
                }
            }
        }

        if metric == Metric::GrossRevenue {
            text.push_str("Strong revenue growth indicates healthy demand. ");
            match find("Gross Margin") {
                Some(margin) if margin.change > 0.0 => text.push_str(
                    "Your margins are also improving, suggesting profitable growth.",
                ),
                _ => text.push_str("Monitor margins to ensure growth remains profitable."),
            }
        } else {
            text.push_str(
                "Consider reinvesting this gain into growth initiatives while maintaining \
                 cost discipline.",
            );
        }
        return text;
    }

    let mut text = format!(
        "Your {metric_name} {direction} by {abs_change}% compared to {comparison_label}, \
         now at {}. ",
        format_k(current_value)
    );

    match metric {
        Metric::GrossRevenue => text.push_str(
            "This decline warrants attention. Review sales pipeline, marketing effectiveness, \
             and market conditions. ",
        ),
        Metric::GrossMargin => {
            if let Some(cogs) = find("COGS") {
                if cogs.change > 0.0 {
                    text.push_str(&format!(
                        "Rising COGS ({:.0}%) is compressing margins. Review supplier contracts \
                         and production costs. ",
                        cogs.change
                    ));
                }
            }
        }
        Metric::NetMargin => {
            if let Some(overhead) = find("Fixed Overhead") {
                if overhead.change > 0.0 {
                    text.push_str(&format!(
                        "Increased overhead ({:.0}%) is impacting net margin. Review fixed \
                         costs for optimization opportunities. ",
                        overhead.change
                    ));
                }
            }
        }
        _ => {}
    }
    text.push_str("Focus on cost optimization and revenue recovery strategies.");
    text
}

/// Categorized observations over the full historical series: a trend line
/// when growth is meaningful, seasonal extremes when a month deviates
/// enough, and an always-present profitability summary.
pub fn insights_from_history(facts: &[MonthlyFact]) -> Vec<Insight> {
    if facts.len() < 2 {
        return vec![Insight {
            kind: InsightKind::Warning,
            message: "More historical data needed for accurate projections".to_string(),
            severity: Severity::Warning,
        }];
    }

    let mut history = facts.to_vec();
    history.sort_by_key(|f| f.month);

    let mut insights = Vec::new();

    if history.len() >= 12 {
        let half = history.len() / 2;
        let first: f64 = history[..half].iter().map(|f| f.revenue).sum();
        let second: f64 = history[half..].iter().map(|f| f.revenue).sum();

        if first > 0.0 {
            let growth = (second - first) / first * 100.0;
            if growth.abs() > TREND_THRESHOLD {
                let sign = if growth > 0.0 { "+" } else { "" };
                insights.push(Insight {
                    kind: InsightKind::Trend,
                    message: format!(
                        "Trend: {}{:.0}% revenue growth over the period",
                        sign, growth
                    ),
                    severity: if growth > 0.0 {
                        Severity::Success
                    } else {
                        Severity::Warning
                    },
                });
            }
        }
    }

    let overall: f64 =
        history.iter().map(|f| f.revenue).sum::<f64>() / history.len() as f64;

    let mut sums = [0.0_f64; 12];
    let mut counts = [0_u32; 12];
    for fact in &history {
        let idx = fact.month.month0() as usize;
        sums[idx] += fact.revenue;
        counts[idx] += 1;
    }

    let mut high = (0.0_f64, "");
    let mut low = (0.0_f64, "");
    for idx in 0..12 {
        if counts[idx] == 0 {
            continue;
        }
        let month_avg = sums[idx] / counts[idx] as f64;
        let pct = if overall > 0.0 {
            (month_avg - overall) / overall * 100.0
        } else {
            0.0
        };
        if pct > high.0 {
            high = (pct, MONTH_NAMES[idx]);
        }
        if pct < low.0 {
            low = (pct, MONTH_NAMES[idx]);
        }
    }

    if high.0.abs() > SEASONALITY_THRESHOLD || low.0.abs() > SEASONALITY_THRESHOLD {
        insights.push(Insight {
            kind: InsightKind::Seasonality,
            message: format!(
                "Seasonality: {} typically +{:.0}%, {} typically {:.0}%",
                high.1, high.0, low.1, low.0
            ),
            severity: Severity::Info,
        });
    }

    let avg_net_profit: f64 =
        history.iter().map(|f| f.net_profit).sum::<f64>() / history.len() as f64;
    let margin = if overall > 0.0 {
        avg_net_profit / overall * 100.0
    } else {
        0.0
    };
    let profitable = avg_net_profit > 0.0;

    insights.push(Insight {
        kind: if profitable {
            InsightKind::Trend
        } else {
            InsightKind::Warning
        },
        message: format!(
            "Average profit margin: {:.1}% ({})",
            margin,
            if profitable { "profitable" } else { "needs attention" }
        ),
        severity: if profitable {
            Severity::Success
        } else {
            Severity::Warning
        },
    });

    insights
}
