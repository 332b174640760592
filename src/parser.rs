//! Walkers over the normalized Profit & Loss report tree.
//!
//! Summary mode scans section banners for the known total labels and yields
//! one `SummaryTotals` per report. Detail mode yields one
//! [`TransactionRecord`] candidate per leaf data row, tracking the active
//! section and nearest plain account-group header while descending.

use crate::reconcile::LastUpdatedMap;
use crate::report::{parse_amount, Cells, Report, ReportRow};
use crate::schema::{AccountIndex, TransactionRecord};
use crate::utils::round2;
use chrono::NaiveDate;
use log::debug;
use std::collections::HashSet;

const DESCRIPTION_MAX: usize = 500;

/// Exact-string label tables for the summary totals, checked against the
/// lower-cased first column of each banner. Listed in match priority.
const REVENUE_LABELS: [&str; 2] = ["total income", "total for income"];
const COGS_LABELS: [&str; 2] = ["total for cost of sales", "total cost of sales"];
const COGS_FALLBACK_LABELS: [&str; 2] = [
    "total for cost of goods sold",
    "total cost of goods sold",
];
const EXPENSE_LABELS: [&str; 2] = ["total expenses", "total for expenses"];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryTotals {
    pub revenue: f64,
    pub cogs: f64,
    pub expenses: f64,
}

/// Extracts the revenue / COGS / expense totals from a P&L summary report.
///
/// Every node's summary banner (and header banner, as a fallback) is
/// checked; the last matching banner in walk order wins. The
/// cost-of-goods-sold label variants only apply while cogs is still zero.
pub fn parse_summary(report: &Report) -> SummaryTotals {
    let mut totals = SummaryTotals::default();
    scan_totals(&report.normalize(), &mut totals);

    SummaryTotals {
        revenue: round2(totals.revenue),
        cogs: round2(totals.cogs),
        expenses: round2(totals.expenses),
    }
}

fn scan_totals(rows: &[ReportRow], totals: &mut SummaryTotals) {
    for row in rows {
        if let ReportRow::Group {
            header,
            children,
            summary,
        } = row
        {
            for banner in [summary, header].into_iter().flatten() {
                apply_total_banner(banner, totals);
            }
            scan_totals(children, totals);
        }
    }
}

fn apply_total_banner(banner: &Cells, totals: &mut SummaryTotals) {
    let label = banner.first().map(|s| s.to_lowercase()).unwrap_or_default();
    let amount = parse_amount(banner.get(1).map(String::as_str).unwrap_or(""));

    if REVENUE_LABELS.contains(&label.as_str()) {
        totals.revenue = amount;
    }
    if COGS_LABELS.contains(&label.as_str()) {
        totals.cogs = amount;
    } else if COGS_FALLBACK_LABELS.contains(&label.as_str()) && totals.cogs == 0.0 {
        totals.cogs = amount;
    }
    if EXPENSE_LABELS.contains(&label.as_str()) {
        totals.expenses = amount;
    }
}

/// Which P&L section the walk is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Income,
    Cogs,
    Expense,
}

/// Walk state threaded by value through the recursion: a group's header
/// updates the state its later siblings see, while updates made inside the
/// group's children stay scoped to that subtree.
#[derive(Debug, Clone, Default)]
struct SectionCtx {
    section: Option<Section>,
    parent_account: Option<String>,
}

impl SectionCtx {
    fn observe_header(&mut self, header: &Cells) {
        let label = header.first().cloned().unwrap_or_default();
        let lower = label.to_lowercase();

        if lower.contains("income") && !lower.contains("net") && !lower.contains("total") {
            self.section = Some(Section::Income);
        } else if lower.contains("cost of sales") || lower.contains("cost of goods") {
            self.section = Some(Section::Cogs);
        } else if lower.contains("expense") && !lower.contains("net") && !lower.contains("total")
        {
            self.section = Some(Section::Expense);
        }

        // Plain account-group headers (anything that is not a section or
        // total banner) name the account the leaf rows roll up under.
        if !lower.contains("total")
            && !lower.contains("income")
            && !lower.contains("expense")
            && !lower.contains("cost of")
            && !lower.contains("gross profit")
            && !lower.contains("net")
        {
            self.parent_account = Some(label);
        }
    }
}

/// Inputs shared by every row of one month's detail parse.
pub struct DetailContext<'a> {
    pub company_id: &'a str,
    /// First-of-month key the synthetic txn ids are derived from.
    pub month: NaiveDate,
    pub accounts: &'a AccountIndex,
    pub last_updated: &'a LastUpdatedMap,
}

/// Extracts transaction records from a P&L detail report.
///
/// Rows are silently dropped when they have no usable date, a "total"
/// marker in the date or type column, a zero or unparseable amount, no
/// active section, or a composite key already emitted this pass. The dedup
/// key is `(date, type, doc number, |amount|, resolved account name)` —
/// distinct transactions sharing all five fields collapse to one record,
/// and the same transaction can reappear if any field parses differently.
pub fn parse_detail(report: &Report, ctx: &DetailContext) -> Vec<TransactionRecord> {
    let mut pass = DetailPass {
        ctx,
        seen: HashSet::new(),
        line_index: 0,
        records: Vec::new(),
    };
    pass.walk(&report.normalize(), SectionCtx::default());
    pass.records
}

struct DetailPass<'a, 'b> {
    ctx: &'a DetailContext<'b>,
    seen: HashSet<String>,
    line_index: u32,
    records: Vec<TransactionRecord>,
}

impl DetailPass<'_, '_> {
    fn walk(&mut self, rows: &[ReportRow], ctx: SectionCtx) {
        let mut ctx = ctx;
        for row in rows {
            match row {
                ReportRow::Group {
                    header, children, ..
                } => {
                    if let Some(h) = header {
                        ctx.observe_header(h);
                    }
                    self.walk(children, ctx.clone());
                }
                ReportRow::Data(cols) => self.emit(cols, &ctx),
            }
        }
    }

    fn emit(&mut self, cols: &Cells, ctx: &SectionCtx) {
        let col = |i: usize| cols.get(i).map(String::as_str).unwrap_or("");

        let date_raw = col(0);
        let txn_type = col(1);
        let doc_num = col(2);
        let name = col(3);
        let memo = col(4);
        let split = col(5);

        if date_raw.is_empty() || date_raw.to_lowercase().contains("total") {
            return;
        }
        if txn_type.to_lowercase().contains("total") {
            return;
        }

        // Amount lives in column 6; some report layouts shift it to the
        // second-to-last column.
        let amount_raw = match col(6) {
            "" if cols.len() >= 2 => col(cols.len() - 2),
            other => other,
        };
        let amount_raw = if amount_raw.is_empty() { "0" } else { amount_raw };

        let amount = parse_amount(amount_raw);
        if amount == 0.0 || ctx.section.is_none() {
            return;
        }

        let Ok(date) = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d") else {
            debug!("dropping detail row with unusable date {:?}", date_raw);
            return;
        };

        let account_search_name = ctx
            .parent_account
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(split).filter(|s| !s.is_empty()))
            .or_else(|| Some(name).filter(|s| !s.is_empty()))
            .unwrap_or("")
            .to_lowercase()
            .trim()
            .to_string();

        let unique_key = format!(
            "{}-{}-{}-{:.2}-{}",
            date_raw,
            txn_type,
            doc_num,
            amount.abs(),
            account_search_name
        );
        if !self.seen.insert(unique_key) {
            return;
        }

        self.line_index += 1;

        let description = [memo, name, split, ctx.parent_account.as_deref().unwrap_or("")]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" | ");
        let description = if description.is_empty() {
            "From P&L Report".to_string()
        } else {
            description.chars().take(DESCRIPTION_MAX).collect()
        };

        let source_type = if txn_type.is_empty() {
            "Transaction"
        } else {
            txn_type
        };

        self.records.push(TransactionRecord {
            company_id: self.ctx.company_id.to_string(),
            txn_id: format!(
                "RPT-{}-{}",
                self.ctx.month.format("%Y-%m-%d"),
                self.line_index
            ),
            date,
            amount: round2(amount.abs()),
            source: format!("PnL-{}", source_type),
            description,
            account_id: self
                .ctx
                .accounts
                .resolve(&account_search_name)
                .map(|a| a.account_id.clone()),
            qbo_last_updated: self.ctx.last_updated.lookup(date, amount.abs()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AccountRef;
    use serde_json::json;

    fn summary_report(banners: Vec<(&str, &str)>) -> Report {
        let rows: Vec<_> = banners
            .into_iter()
            .map(|(label, amount)| {
                json!({
                    "Summary": { "ColData": [{ "value": label }, { "value": amount }] }
                })
            })
            .collect();
        serde_json::from_value(json!({ "Rows": { "Row": rows } })).unwrap()
    }

    #[test]
    fn test_summary_total_income() {
        let report = summary_report(vec![("Total Income", "$12,345.67")]);
        let totals = parse_summary(&report);
        assert_eq!(totals.revenue, 12345.67);
        assert_eq!(totals.cogs, 0.0);
        assert_eq!(totals.expenses, 0.0);
    }

    #[test]
    fn test_summary_all_sections_and_last_match_wins() {
        let report = summary_report(vec![
            ("Total Income", "100.00"),
            ("Total for Cost of Sales", "20.00"),
            ("Total Expenses", "30.00"),
            ("Total Income", "150.00"),
        ]);
        let totals = parse_summary(&report);
        assert_eq!(totals.revenue, 150.0);
        assert_eq!(totals.cogs, 20.0);
        assert_eq!(totals.expenses, 30.0);
    }

    #[test]
    fn test_summary_cogs_fallback_only_when_unset() {
        let report = summary_report(vec![("Total Cost of Goods Sold", "40.00")]);
        assert_eq!(parse_summary(&report).cogs, 40.0);

        let report = summary_report(vec![
            ("Total Cost of Sales", "20.00"),
            ("Total Cost of Goods Sold", "40.00"),
        ]);
        assert_eq!(parse_summary(&report).cogs, 20.0);
    }

    #[test]
    fn test_summary_reads_header_banner_and_parenthesized_amounts() {
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [{
                "Header": { "ColData": [{ "value": "Total Expenses" }, { "value": "(250.00)" }] },
                "Rows": {}
            }]}
        }))
        .unwrap();
        assert_eq!(parse_summary(&report).expenses, -250.0);
    }

    #[test]
    fn test_summary_nested_sections() {
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [{
                "Header": { "ColData": [{ "value": "Income" }] },
                "Rows": { "Row": [{
                    "Header": { "ColData": [{ "value": "Sales" }] },
                    "Rows": {},
                    "Summary": { "ColData": [{ "value": "Total Sales" }, { "value": "999.00" }] }
                }]},
                "Summary": { "ColData": [{ "value": "Total Income" }, { "value": "1,000.00" }] }
            }]}
        }))
        .unwrap();
        assert_eq!(parse_summary(&report).revenue, 1000.0);
    }

    fn detail_row(date: &str, txn_type: &str, num: &str, name: &str, memo: &str, split: &str, amount: &str) -> serde_json::Value {
        json!({
            "type": "Data",
            "ColData": [
                { "value": date }, { "value": txn_type }, { "value": num },
                { "value": name }, { "value": memo }, { "value": split },
                { "value": amount }
            ]
        })
    }

    fn detail_report(section: &str, rows: Vec<serde_json::Value>) -> Report {
        serde_json::from_value(json!({
            "Rows": { "Row": [{
                "Header": { "ColData": [{ "value": section }] },
                "Rows": { "Row": rows }
            }]}
        }))
        .unwrap()
    }

    fn ctx<'a>(accounts: &'a AccountIndex, map: &'a LastUpdatedMap) -> DetailContext<'a> {
        DetailContext {
            company_id: "co-1",
            month: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            accounts,
            last_updated: map,
        }
    }

    #[test]
    fn test_detail_emits_record_with_section_active() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        let report = detail_report(
            "Income",
            vec![detail_row("2025-01-15", "Invoice", "1042", "Acme", "consulting", "Services", "1,500.00")],
        );

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.txn_id, "RPT-2025-01-01-1");
        assert_eq!(record.amount, 1500.0);
        assert_eq!(record.source, "PnL-Invoice");
        assert_eq!(record.description, "consulting | Acme | Services");
        assert_eq!(record.account_id, None);
        assert_eq!(record.qbo_last_updated, None);
    }

    #[test]
    fn test_detail_parenthesized_amount_stored_as_magnitude() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        let report = detail_report(
            "Expenses",
            vec![detail_row("2025-01-20", "Journal Entry", "", "", "reversal", "", "(500.00)")],
        );

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 500.0);
    }

    #[test]
    fn test_detail_row_without_section_is_dropped() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [
                detail_row("2025-01-20", "Expense", "", "", "", "", "(500.00)")
            ]}
        }))
        .unwrap();

        assert!(parse_detail(&report, &ctx(&accounts, &map)).is_empty());
    }

    #[test]
    fn test_detail_drops_zero_amount_and_total_rows() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        let report = detail_report(
            "Income",
            vec![
                detail_row("2025-01-15", "Invoice", "1", "A", "", "", "0.00"),
                detail_row("Total", "Invoice", "2", "B", "", "", "10.00"),
                detail_row("2025-01-16", "Total Invoice", "3", "C", "", "", "10.00"),
                detail_row("2025-01-17", "Invoice", "4", "D", "", "", "not a number"),
            ],
        );

        assert!(parse_detail(&report, &ctx(&accounts, &map)).is_empty());
    }

    #[test]
    fn test_detail_dedup_key_includes_account_name() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        // Same date/type/num/amount but different split accounts: both kept.
        let report = detail_report(
            "Income",
            vec![
                detail_row("2025-01-15", "Invoice", "7", "", "", "Sales", "100.00"),
                detail_row("2025-01-15", "Invoice", "7", "", "", "Consulting", "100.00"),
                detail_row("2025-01-15", "Invoice", "7", "", "", "Sales", "100.00"),
            ],
        );

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_detail_parent_account_header_resolves_account() {
        let accounts = AccountIndex::new(vec![AccountRef {
            company_id: "co-1".to_string(),
            account_id: "qbo-55".to_string(),
            name: "Office Supplies".to_string(),
            kind: None,
            subtype: None,
        }]);
        let map = LastUpdatedMap::new();
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [{
                "Header": { "ColData": [{ "value": "Expenses" }] },
                "Rows": { "Row": [{
                    "Header": { "ColData": [{ "value": "Office Supplies" }] },
                    "Rows": { "Row": [
                        detail_row("2025-01-10", "Expense", "", "Staples", "paper", "", "89.99")
                    ]}
                }]}
            }]}
        }))
        .unwrap();

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].account_id.as_deref(), Some("qbo-55"));
        assert_eq!(records[0].description, "paper | Staples | Office Supplies");
    }

    #[test]
    fn test_detail_section_header_does_not_leak_out_of_subtree() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        // The Income header sits inside the first group; the sibling data
        // row outside that group has no active section and is dropped.
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [
                {
                    "Rows": { "Row": [{
                        "Header": { "ColData": [{ "value": "Income" }] },
                        "Rows": { "Row": [
                            detail_row("2025-01-15", "Invoice", "1", "A", "", "", "10.00")
                        ]}
                    }]}
                },
                detail_row("2025-01-16", "Invoice", "2", "B", "", "", "20.00")
            ]}
        }))
        .unwrap();

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 10.0);
    }

    #[test]
    fn test_detail_header_applies_to_later_siblings() {
        let accounts = AccountIndex::default();
        let map = LastUpdatedMap::new();
        // A header group followed by a sibling data row at the same level:
        // the section persists past the group.
        let report: Report = serde_json::from_value(json!({
            "Rows": { "Row": [
                { "Header": { "ColData": [{ "value": "Income" }] }, "Rows": {} },
                detail_row("2025-01-16", "Invoice", "2", "B", "", "", "20.00")
            ]}
        }))
        .unwrap();

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 20.0);
    }

    #[test]
    fn test_detail_attaches_last_updated_timestamp() {
        use chrono::TimeZone;

        let accounts = AccountIndex::default();
        let updated = chrono::Utc.with_ymd_and_hms(2025, 1, 16, 8, 30, 0).unwrap();
        let mut map = LastUpdatedMap::new();
        map.insert_transaction(
            "Invoice",
            &crate::reconcile::TxnMeta {
                id: "9".to_string(),
                txn_date: NaiveDate::from_ymd_opt(2025, 1, 15),
                total_amt: 1500.0,
                line: vec![],
                meta_data: crate::reconcile::TxnMetaData {
                    last_updated_time: Some(updated),
                },
            },
        );

        let report = detail_report(
            "Income",
            vec![detail_row("2025-01-15", "Invoice", "1042", "Acme", "", "", "1,500.00")],
        );

        let records = parse_detail(&report, &ctx(&accounts, &map));
        assert_eq!(records[0].qbo_last_updated, Some(updated));
    }
}
