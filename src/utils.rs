use chrono::{Datelike, Days, NaiveDate};

/// Rounds to 2 decimal places, half away from zero nudged with an epsilon
/// so that values like 1.005 (stored as 1.00499...) land on 1.01.
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0 + 0.5).floor() / 100.0
}

pub fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| panic!("invalid year-month {}-{}", year, month))
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    month_start(next_year, next_month)
        .checked_sub_days(Days::new(1))
        .expect("month start has a predecessor")
}

/// First-of-month date shifted by `offset` calendar months (negative moves back).
pub fn add_months(date: NaiveDate, offset: i32) -> NaiveDate {
    let zero_based = date.year() * 12 + date.month() as i32 - 1 + offset;
    let year = zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    month_start(year, month)
}

/// Short dashboard-style label, e.g. "Jan '25".
pub fn month_label(date: NaiveDate) -> String {
    format!("{} '{:02}", date.format("%b"), date.year() % 100)
}
