//! QuickBooks Online client, enabled with the `qbo` feature.
//!
//! The core of the crate stays synchronous over already-fetched data; this
//! module does the fetching. [`QboClient::fetch_month_reports`] prefetches
//! a window's reports into a [`PrefetchedReports`], which implements
//! [`crate::backfill::ReportSource`] so the driver runs unchanged.

mod client;

pub use client::{PrefetchedReports, QboClient};
