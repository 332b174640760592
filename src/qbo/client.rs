use crate::backfill::{MonthWindow, ReportSource};
use crate::error::{PnlError, Result};
use crate::reconcile::{LastUpdatedMap, TxnMeta, TRANSACTION_TYPES};
use crate::report::Report;
use crate::schema::{AccountIndex, AccountRef, AccountingMethod, ReportKind};
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;

const QBO_BASE_URL: &str = "https://quickbooks.api.intuit.com/v3";
const PAGE_SIZE: usize = 1000;

/// Pause between sequential requests. The upstream API allows roughly 500
/// requests per minute; this keeps a full backfill comfortably under it.
const REQUEST_DELAY: Duration = Duration::from_millis(150);

#[derive(Clone)]
pub struct QboClient {
    client: Client,
    access_token: String,
    realm_id: String,
    base_url: String,
}

impl QboClient {
    pub fn new(access_token: String, realm_id: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            realm_id,
            base_url: QBO_BASE_URL.to_string(),
        }
    }

    /// Overrides the API host, for sandbox tenants and tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One Report API call.
    pub async fn report(
        &self,
        kind: ReportKind,
        start: NaiveDate,
        end: NaiveDate,
        method: AccountingMethod,
    ) -> Result<Report> {
        let url = format!(
            "{}/company/{}/reports/{}",
            self.base_url,
            self.realm_id,
            kind.api_name()
        );

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(&[
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("accounting_method", method.api_name().to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let details = res.text().await?;
            return Err(PnlError::ReportFetch {
                month: start.format("%Y-%m").to_string(),
                details: format!("status {}: {}", status, details),
            });
        }

        Ok(res.json().await?)
    }

    /// One Query API call, returning the raw response body.
    pub async fn query(&self, query: &str) -> Result<serde_json::Value> {
        let url = format!("{}/company/{}/query", self.base_url, self.realm_id);

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(&[("query", query)])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let details = res.text().await?;
            return Err(PnlError::QueryFailed {
                query: query.to_string(),
                details: format!("status {}: {}", status, details),
            });
        }

        Ok(res.json().await?)
    }

    /// Pages through `SELECT * FROM {entity}` with STARTPOSITION/MAXRESULTS.
    pub async fn query_paged(
        &self,
        entity: &str,
        where_clause: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let mut all = Vec::new();
        let mut start = 1_usize;

        loop {
            let clause = if where_clause.is_empty() {
                String::new()
            } else {
                format!("WHERE {} ", where_clause)
            };
            let query = format!(
                "SELECT * FROM {} {}STARTPOSITION {} MAXRESULTS {}",
                entity, clause, start, PAGE_SIZE
            );

            let data = self.query(&query).await?;
            let rows = data
                .get("QueryResponse")
                .and_then(|r| r.get(entity))
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();

            let count = rows.len();
            all.extend(rows);
            if count < PAGE_SIZE {
                break;
            }
            start += PAGE_SIZE;
            sleep(REQUEST_DELAY).await;
        }

        Ok(all)
    }

    /// Snapshots the full chart of accounts into a name-keyed index.
    pub async fn fetch_account_index(&self, company_id: &str) -> Result<AccountIndex> {
        let rows = self.query_paged("Account", "").await?;

        let accounts: Vec<AccountRef> = rows
            .into_iter()
            .filter_map(|row| {
                Some(AccountRef {
                    company_id: company_id.to_string(),
                    account_id: row.get("Id")?.as_str()?.to_string(),
                    name: row.get("Name")?.as_str()?.to_string(),
                    kind: row
                        .get("AccountType")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    subtype: row
                        .get("AccountSubType")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                })
            })
            .collect();

        info!("synced {} accounts", accounts.len());
        Ok(AccountIndex::new(accounts))
    }

    /// Builds the reconciliation map across every known transaction type.
    /// A type that fails to fetch is skipped; the map is best-effort.
    pub async fn fetch_last_updated_map(&self, since: NaiveDate) -> Result<LastUpdatedMap> {
        let mut map = LastUpdatedMap::new();
        let clause = format!("TxnDate >= '{}'", since.format("%Y-%m-%d"));

        for txn_type in TRANSACTION_TYPES {
            match self.query_paged(txn_type, &clause).await {
                Ok(rows) => {
                    let total = rows.len();
                    for row in rows {
                        match serde_json::from_value::<TxnMeta>(row) {
                            Ok(txn) => map.insert_transaction(txn_type, &txn),
                            Err(err) => {
                                debug!("skipping malformed {} row: {}", txn_type, err)
                            }
                        }
                    }
                    debug!("fetched {} {} transactions", total, txn_type);
                }
                Err(err) => warn!("skipping {}: {}", txn_type, err),
            }
            sleep(REQUEST_DELAY).await;
        }

        info!("built last-updated map with {} entries", map.len());
        Ok(map)
    }

    /// Prefetches summary and detail reports for each window, sequentially
    /// and rate-limited. Per-month failures are stored, not raised; the
    /// backfill driver decides what a failed month means.
    pub async fn fetch_month_reports(
        &self,
        windows: &[MonthWindow],
        method: AccountingMethod,
    ) -> PrefetchedReports {
        let mut prefetched = PrefetchedReports::default();

        for window in windows {
            let summary = self
                .report(
                    ReportKind::ProfitAndLossSummary,
                    window.start,
                    window.end,
                    method,
                )
                .await;
            sleep(REQUEST_DELAY).await;

            let detail = self
                .report(
                    ReportKind::ProfitAndLossDetail,
                    window.start,
                    window.end,
                    method,
                )
                .await;
            sleep(REQUEST_DELAY).await;

            prefetched.insert(window.month, ReportKind::ProfitAndLossSummary, summary);
            prefetched.insert(window.month, ReportKind::ProfitAndLossDetail, detail);
        }

        prefetched
    }
}

/// Reports fetched ahead of a backfill run, keyed by month and kind.
/// Fetch failures are kept as stored errors and surface through
/// [`ReportSource::fetch`] exactly once.
#[derive(Default)]
pub struct PrefetchedReports {
    reports: HashMap<(ReportKind, NaiveDate), Result<Report>>,
}

impl PrefetchedReports {
    pub fn insert(&mut self, month: NaiveDate, kind: ReportKind, report: Result<Report>) {
        self.reports.insert((kind, month), report);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl ReportSource for PrefetchedReports {
    fn fetch(
        &mut self,
        kind: ReportKind,
        window: &MonthWindow,
        _method: AccountingMethod,
    ) -> Result<Report> {
        self.reports
            .remove(&(kind, window.month))
            .unwrap_or_else(|| {
                Err(PnlError::ReportFetch {
                    month: window.month.to_string(),
                    details: "month was not prefetched".to_string(),
                })
            })
    }
}
