//! Display formatting for amounts, dates, durations, and elapsed time.
//!
//! Every function here is pure. Anything that depends on the current time
//! takes `now` as an argument so output is reproducible.

use chrono::{DateTime, NaiveDate, Utc};

/// Shown wherever an optional value is absent.
pub const PLACEHOLDER: &str = "-";

const BILLION: i64 = 1_000_000_000;
const MILLION: i64 = 1_000_000;

/// Compact Rupiah amount: `Rp 2.5B`, `Rp 12.0M`, `Rp 150.000`.
///
/// Amounts below one million are written in full with `.` thousands
/// separators. Missing and zero amounts render as `Rp 0`.
pub fn format_currency(value: Option<i64>) -> String {
    let value = value.unwrap_or(0);
    if value >= BILLION {
        format!("Rp {:.1}B", value as f64 / BILLION as f64)
    } else if value >= MILLION {
        format!("Rp {:.1}M", value as f64 / MILLION as f64)
    } else {
        format_currency_full(Some(value))
    }
}

/// Full Rupiah amount with thousands grouping: `Rp 2.500.000.000`.
pub fn format_currency_full(value: Option<i64>) -> String {
    let value = value.unwrap_or(0);
    let sign = if value < 0 { "-" } else { "" };
    format!("Rp {sign}{}", group_thousands(value.unsigned_abs()))
}

/// Indonesian digit grouping: `1234567` → `1.234.567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// `Jan 5, 2025`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_date)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Contract term: an explicit date range, else a month count, else `-`.
pub fn format_duration(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    months: Option<u32>,
) -> String {
    match (start, end, months) {
        (Some(start), Some(end), _) => format!("{} → {}", format_date(start), format_date(end)),
        (_, _, Some(m)) if m > 0 => plural(i64::from(m), "month"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Elapsed time between `ts` and `now`, e.g. `45 min ago`, `3 days ago`.
///
/// Anything under a minute, including timestamps in the future, is
/// `Just now`. Months are 30 days and years 365 days.
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - ts).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} ago", plural(hours, "hour"));
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{} ago", plural(days, "day"));
    }
    let weeks = days / 7;
    if weeks < 5 {
        return format!("{} ago", plural(weeks, "week"));
    }
    let months = days / 30;
    if months < 12 {
        return format!("{} ago", plural(months, "month"));
    }
    format!("{} ago", plural(days / 365, "year"))
}

/// One decimal place with a percent sign: `45.0%`.
pub fn format_percentage(pct: f64) -> String {
    format!("{pct:.1}%")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
