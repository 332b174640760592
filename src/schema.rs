use crate::utils::month_label;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which Profit & Loss report to request from the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    ProfitAndLossSummary,
    ProfitAndLossDetail,
}

impl ReportKind {
    /// Report name as the upstream Report API expects it.
    pub fn api_name(&self) -> &'static str {
        match self {
            ReportKind::ProfitAndLossSummary => "ProfitAndLoss",
            ReportKind::ProfitAndLossDetail => "ProfitAndLossDetail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountingMethod {
    Cash,
    Accrual,
}

impl AccountingMethod {
    pub fn api_name(&self) -> &'static str {
        match self {
            AccountingMethod::Cash => "Cash",
            AccountingMethod::Accrual => "Accrual",
        }
    }
}

/// The canonical per-company-per-month aggregate. Exactly one row exists per
/// (company_id, month); a re-run replaces it rather than appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFact {
    pub company_id: String,
    /// First-of-month date identifying the calendar month.
    pub month: NaiveDate,
    pub revenue: f64,
    pub cogs: f64,
    pub expenses: f64,
    /// Always `round2(revenue - cogs - expenses)`.
    pub net_profit: f64,
    pub updated_at: DateTime<Utc>,
}

/// One parsed Profit & Loss detail line. `txn_id` is synthetic
/// (`RPT-{month}-{n}`) and is regenerated on every full backfill; it is not
/// stable across re-syncs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub company_id: String,
    pub txn_id: String,
    pub date: NaiveDate,
    /// Non-negative magnitude, rounded to 2 decimals.
    pub amount: f64,
    /// Derived from the report's transaction-type column, e.g. "PnL-Invoice".
    pub source: String,
    /// Memo / payee / split / parent account joined with " | ", max 500 chars.
    pub description: String,
    /// Upstream account id resolved by case-insensitive trimmed name match.
    pub account_id: Option<String>,
    /// Best-effort last-modified timestamp attached by the reconciler.
    /// Matched on date + absolute amount only, so collisions are possible.
    pub qbo_last_updated: Option<DateTime<Utc>>,
}

/// One chart-of-accounts entry, snapshotted wholesale on each backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
    pub company_id: String,
    pub account_id: String,
    pub name: String,
    pub kind: Option<String>,
    pub subtype: Option<String>,
}

/// Chart-of-accounts lookup keyed by lower-cased, trimmed account name.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    by_name: HashMap<String, AccountRef>,
}

impl AccountIndex {
    pub fn new(accounts: impl IntoIterator<Item = AccountRef>) -> Self {
        let mut by_name = HashMap::new();
        for account in accounts {
            by_name.insert(account.name.to_lowercase().trim().to_string(), account);
        }
        Self { by_name }
    }

    pub fn resolve(&self, name: &str) -> Option<&AccountRef> {
        self.by_name.get(name.to_lowercase().trim())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// One point on the projection chart. Historical points carry
/// `is_projected = false`; the 12 forward points carry `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    /// First-of-month date for the point.
    pub month: NaiveDate,
    pub revenue: f64,
    pub cash_flow: f64,
    pub net_profit: f64,
    pub is_projected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_expenses: Option<Vec<RecurringExpense>>,
}

impl ProjectionPoint {
    /// Chart label, e.g. "Jan '25".
    pub fn label(&self) -> String {
        month_label(self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub description: String,
    pub amount: f64,
    pub expected_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Seasonality,
    Trend,
    Recurring,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Success,
}

/// A categorized, severity-tagged observation derived from the numbers.
/// Heuristic text, recomputed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
    pub severity: Severity,
}
