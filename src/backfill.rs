//! The backfill driver: walks a sequence of calendar-month windows, parses
//! each month's summary and detail reports, and writes the results through
//! a persistence sink.
//!
//! A single month's fetch failure is recorded and skipped, never fatal;
//! store failures abort the run. Callers own any retry and the surrounding
//! sync-status bookkeeping.

use crate::error::Result;
use crate::parser::{parse_detail, parse_summary, DetailContext};
use crate::reconcile::LastUpdatedMap;
use crate::report::Report;
use crate::schema::{
    AccountIndex, AccountingMethod, MonthlyFact, ReportKind, TransactionRecord,
};
use crate::utils::{add_months, last_day_of_month, month_start, round2};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::{info, warn};

/// Monthly facts per upsert call. Sized for the sink's payload limit, not
/// for atomicity.
pub const FACT_BATCH_SIZE: usize = 50;
/// Transaction records per insert call.
pub const TXN_BATCH_SIZE: usize = 500;

/// One calendar-month window, closed on both ends, labeled by its
/// first-of-month date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub month: NaiveDate,
}

/// The `months_back` calendar windows ending with the month containing
/// `today`, most recent first.
pub fn month_windows(today: NaiveDate, months_back: u32) -> Vec<MonthWindow> {
    let current = month_start(today.year(), today.month());
    (0..months_back)
        .map(|i| {
            let month = add_months(current, -(i as i32));
            MonthWindow {
                start: month,
                end: last_day_of_month(month.year(), month.month()),
                month,
            }
        })
        .collect()
}

/// Per-month report access. One fetch per (kind, window); failures are
/// expected and handled by the driver.
pub trait ReportSource {
    fn fetch(
        &mut self,
        kind: ReportKind,
        window: &MonthWindow,
        method: AccountingMethod,
    ) -> Result<Report>;
}

/// Persistence sink for backfill output. Upserts replace by
/// (company_id, month); transaction inserts follow a full delete-by-company
/// reset.
pub trait FactStore {
    fn delete_transactions(&mut self, company_id: &str) -> Result<()>;
    fn insert_transactions(&mut self, batch: &[TransactionRecord]) -> Result<()>;
    fn upsert_facts(&mut self, batch: &[MonthlyFact]) -> Result<()>;
}

/// Read-side access for the projection and insight paths: a company's
/// facts, optionally bounded to a month range (inclusive), ascending by
/// month.
pub trait FactQuery {
    fn facts_in_range(
        &self,
        company_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<MonthlyFact>>;
}

#[derive(Debug, Clone)]
pub struct BackfillConfig {
    pub company_id: String,
    pub months_back: u32,
    pub accounting_method: AccountingMethod,
}

impl BackfillConfig {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            months_back: 24,
            accounting_method: AccountingMethod::Cash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Summary,
    Detail,
}

/// A month the run could not fully process. Summary-stage failures mean no
/// fact was emitted for the month; detail-stage failures mean the fact was
/// kept without transaction detail.
#[derive(Debug, Clone)]
pub struct MonthFailure {
    pub month: NaiveDate,
    pub stage: FetchStage,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BackfillSummary {
    pub months_processed: usize,
    pub facts: Vec<MonthlyFact>,
    pub total_transactions: usize,
    pub errors: Vec<MonthFailure>,
}

/// Runs a full backfill for one company.
///
/// `today` anchors the month windows and `now` stamps `updated_at`, so a
/// re-run over identical upstream data produces identical facts.
pub fn run_backfill(
    source: &mut dyn ReportSource,
    store: &mut dyn FactStore,
    accounts: &AccountIndex,
    last_updated: &LastUpdatedMap,
    config: &BackfillConfig,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<BackfillSummary> {
    info!(
        "starting backfill for {} over {} months",
        config.company_id, config.months_back
    );

    store.delete_transactions(&config.company_id)?;

    let mut summary = BackfillSummary::default();

    for window in month_windows(today, config.months_back) {
        let report = match source.fetch(
            ReportKind::ProfitAndLossSummary,
            &window,
            config.accounting_method,
        ) {
            Ok(report) => report,
            Err(err) => {
                warn!("skipping {} summary: {}", window.month, err);
                summary.errors.push(MonthFailure {
                    month: window.month,
                    stage: FetchStage::Summary,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let totals = parse_summary(&report);
        summary.facts.push(MonthlyFact {
            company_id: config.company_id.clone(),
            month: window.month,
            revenue: totals.revenue,
            cogs: totals.cogs,
            expenses: totals.expenses,
            net_profit: round2(totals.revenue - totals.cogs - totals.expenses),
            updated_at: now,
        });
        summary.months_processed += 1;

        let detail = match source.fetch(
            ReportKind::ProfitAndLossDetail,
            &window,
            config.accounting_method,
        ) {
            Ok(report) => report,
            Err(err) => {
                warn!("skipping {} detail: {}", window.month, err);
                summary.errors.push(MonthFailure {
                    month: window.month,
                    stage: FetchStage::Detail,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let records = parse_detail(
            &detail,
            &DetailContext {
                company_id: &config.company_id,
                month: window.month,
                accounts,
                last_updated,
            },
        );

        for batch in records.chunks(TXN_BATCH_SIZE) {
            store.insert_transactions(batch)?;
        }
        summary.total_transactions += records.len();
    }

    for batch in summary.facts.chunks(FACT_BATCH_SIZE) {
        store.upsert_facts(batch)?;
    }

    info!(
        "backfill for {} finished: {} months, {} transactions, {} skipped fetches",
        config.company_id,
        summary.months_processed,
        summary.total_transactions,
        summary.errors.len()
    );

    Ok(summary)
}
