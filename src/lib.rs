//! # PnL Insights
//!
//! A library for turning QuickBooks Profit & Loss reports into normalized
//! monthly financial facts, forward projections, and plain-language
//! insights.
//!
//! ## Core Concepts
//!
//! - **Report tree**: the nested section/row structure a P&L report query
//!   returns. Parsed in two modes: summary (section totals) and detail
//!   (individual line transactions).
//! - **Monthly fact**: the canonical per-company-per-month aggregate
//!   (revenue, COGS, expenses, net profit).
//! - **Backfill**: the bulk pull of historical facts and transactions over
//!   a window of calendar months, driven by [`backfill::run_backfill`]
//!   against pluggable report-source and persistence traits.
//! - **Reconciliation**: a best-effort join attaching last-modified
//!   timestamps to parsed lines, keyed by date and absolute amount.
//! - **Projections**: 12 forward months from seasonality factors and a
//!   clamped half-over-half growth rate. Deliberately a simple model, not
//!   a statistical forecast.
//! - **Insights**: deterministic template text over metric deltas and the
//!   historical series.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pnl_insights::*;
//! use chrono::{NaiveDate, Utc};
//!
//! let report: Report = serde_json::from_str(&summary_body)?;
//! let totals = parse_summary(&report);
//!
//! let fact = MonthlyFact {
//!     company_id: "co-1".to_string(),
//!     month: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
//!     revenue: totals.revenue,
//!     cogs: totals.cogs,
//!     expenses: totals.expenses,
//!     net_profit: round2(totals.revenue - totals.cogs - totals.expenses),
//!     updated_at: Utc::now(),
//! };
//!
//! let points = project(&[fact.clone()])?;
//! let observations = insights_from_history(&[fact]);
//! ```

pub mod backfill;
pub mod comparison;
pub mod error;
pub mod insight;
pub mod parser;
pub mod projection;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod utils;

#[cfg(feature = "qbo")]
pub mod qbo;

pub use backfill::{
    month_windows, run_backfill, BackfillConfig, BackfillSummary, FactQuery, FactStore,
    FetchStage, MonthFailure, MonthWindow, ReportSource, FACT_BATCH_SIZE, TXN_BATCH_SIZE,
};
pub use comparison::{
    compare_periods, metric_value, percentage_change, related_metrics, Metric, MetricChange,
    PeriodComparison, PeriodSummary, RelatedMetric, NEUTRAL_BAND,
};
pub use error::{PnlError, Result};
pub use insight::{
    comparison_insight, insights_from_history, SEASONALITY_THRESHOLD, TREND_THRESHOLD,
};
pub use parser::{parse_detail, parse_summary, DetailContext, SummaryTotals};
pub use projection::{
    growth_rate, project, projection_timeline, seasonality_factors, DEFAULT_GROWTH,
    GROWTH_MAX, GROWTH_MIN, PROJECTION_MONTHS,
};
pub use reconcile::{LastUpdatedMap, TxnMeta, TRANSACTION_TYPES};
pub use report::{parse_amount, Report, ReportRow};
pub use schema::*;
pub use utils::*;
