//! Best-effort reconciliation of report line items against transaction
//! metadata fetched from the Query API.
//!
//! P&L detail rows carry no stable transaction id, so the only join
//! available is `{date}-{absolute amount}`. That key collides across
//! unrelated transactions sharing a date and amount; the resulting
//! `qbo_last_updated` values are a heuristic, not a guarantee, and a miss
//! simply leaves the field empty.

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

/// Transaction entities queried when building the reconciliation map.
pub const TRANSACTION_TYPES: [&str; 11] = [
    "Purchase",
    "SalesReceipt",
    "Invoice",
    "Payment",
    "Bill",
    "BillPayment",
    "JournalEntry",
    "Deposit",
    "RefundReceipt",
    "CreditMemo",
    "VendorCredit",
];

/// Query API transaction shape, reduced to the fields reconciliation needs.
#[derive(Debug, Clone, Deserialize)]
pub struct TxnMeta {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "TxnDate")]
    pub txn_date: Option<NaiveDate>,
    #[serde(rename = "TotalAmt", default)]
    pub total_amt: f64,
    #[serde(rename = "Line", default)]
    pub line: Vec<TxnLine>,
    #[serde(rename = "MetaData", default)]
    pub meta_data: TxnMetaData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxnLine {
    #[serde(rename = "Amount", default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxnMetaData {
    #[serde(rename = "LastUpdatedTime")]
    pub last_updated_time: Option<DateTime<Utc>>,
}

/// Lookup from composite transaction keys to the last-modified timestamp.
///
/// Three key families are written per transaction:
/// - `{type}-{id}`: exact identity. Written but not consulted by the
///   current matching path; retained so an exact-match join can be added
///   without refetching.
/// - `{date}-{|total|:.2}`: the primary matching key. Last writer wins.
/// - `{date}-{|line amount|:.2}` per line item: first writer wins.
#[derive(Debug, Clone, Default)]
pub struct LastUpdatedMap {
    entries: HashMap<String, DateTime<Utc>>,
}

impl LastUpdatedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from batches of `(transaction type, transactions)`.
    pub fn from_batches<'a, I>(batches: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Vec<TxnMeta>)>,
    {
        let mut map = Self::new();
        for (txn_type, txns) in batches {
            for txn in &txns {
                map.insert_transaction(txn_type, txn);
            }
        }
        debug!("reconciliation map holds {} entries", map.len());
        map
    }

    pub fn insert_transaction(&mut self, txn_type: &str, txn: &TxnMeta) {
        let Some(updated) = txn.meta_data.last_updated_time else {
            return;
        };
        let Some(date) = txn.txn_date else {
            return;
        };

        self.entries
            .insert(format!("{}-{}", txn_type, txn.id), updated);
        self.entries.insert(amount_key(date, txn.total_amt), updated);

        for line in &txn.line {
            self.entries
                .entry(amount_key(date, line.amount))
                .or_insert(updated);
        }
    }

    /// Looks up the primary `{date}-{|amount|:.2}` key.
    pub fn lookup(&self, date: NaiveDate, amount: f64) -> Option<DateTime<Utc>> {
        self.entries.get(&amount_key(date, amount)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn amount_key(date: NaiveDate, amount: f64) -> String {
    format!("{}-{:.2}", date.format("%Y-%m-%d"), amount.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn txn(id: &str, date: (i32, u32, u32), total: f64, lines: &[f64], at: DateTime<Utc>) -> TxnMeta {
        TxnMeta {
            id: id.to_string(),
            txn_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            total_amt: total,
            line: lines.iter().map(|&amount| TxnLine { amount }).collect(),
            meta_data: TxnMetaData {
                last_updated_time: Some(at),
            },
        }
    }

    #[test]
    fn test_lookup_by_date_and_amount() {
        let mut map = LastUpdatedMap::new();
        map.insert_transaction("Invoice", &txn("9", (2025, 1, 15), 250.0, &[], ts(9)));

        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(map.lookup(date, 250.0), Some(ts(9)));
        assert_eq!(map.lookup(date, -250.0), Some(ts(9)));
        assert_eq!(map.lookup(date, 251.0), None);
    }

    #[test]
    fn test_total_key_last_writer_wins() {
        let mut map = LastUpdatedMap::new();
        map.insert_transaction("Invoice", &txn("1", (2025, 1, 15), 100.0, &[], ts(9)));
        map.insert_transaction("Bill", &txn("2", (2025, 1, 15), 100.0, &[], ts(11)));

        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(map.lookup(date, 100.0), Some(ts(11)));
    }

    #[test]
    fn test_line_key_first_writer_wins() {
        let mut map = LastUpdatedMap::new();
        map.insert_transaction("Invoice", &txn("1", (2025, 1, 15), 300.0, &[40.0], ts(9)));
        map.insert_transaction("Bill", &txn("2", (2025, 1, 15), 400.0, &[40.0], ts(11)));

        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(map.lookup(date, 40.0), Some(ts(9)));
    }

    #[test]
    fn test_missing_timestamp_or_date_is_skipped() {
        let mut map = LastUpdatedMap::new();

        let mut no_ts = txn("1", (2025, 1, 15), 100.0, &[], ts(9));
        no_ts.meta_data.last_updated_time = None;
        map.insert_transaction("Invoice", &no_ts);

        let mut no_date = txn("2", (2025, 1, 15), 100.0, &[], ts(9));
        no_date.txn_date = None;
        map.insert_transaction("Invoice", &no_date);

        assert!(map.is_empty());
    }

    #[test]
    fn test_wire_deserialization() {
        let json = serde_json::json!({
            "Id": "145",
            "TxnDate": "2025-01-15",
            "TotalAmt": 1250.5,
            "Line": [{ "Amount": 1000.0 }, { "Amount": 250.5 }],
            "MetaData": { "LastUpdatedTime": "2025-01-16T08:30:00Z" }
        });

        let txn: TxnMeta = serde_json::from_value(json).unwrap();
        assert_eq!(txn.id, "145");
        assert_eq!(txn.line.len(), 2);
        assert!(txn.meta_data.last_updated_time.is_some());
    }
}
