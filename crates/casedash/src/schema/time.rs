//! Calendar resolutions and date parsing for time columns.

use chrono::{Datelike, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::ColType;

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================
// ISO-8601 subsets accepted by the time columns, compiled once on first use.

static ISO_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[T ].*)?$").unwrap());
static ISO_WEEK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-?W(\d{2})(?:-?([1-7]))?$").unwrap());
static ISO_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static ISO_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static QUARTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());

/// Calendar granularity of a time column, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeResolution {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeResolution {
    /// All resolutions, finest first.
    pub const ALL: [TimeResolution; 5] = [
        TimeResolution::Day,
        TimeResolution::Week,
        TimeResolution::Month,
        TimeResolution::Quarter,
        TimeResolution::Year,
    ];

    /// Start of the calendar period containing `date`.
    ///
    /// Weeks start on Monday (ISO-8601).
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeResolution::Day => date,
            TimeResolution::Week => {
                date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            TimeResolution::Month => date.with_day(1).unwrap_or(date),
            TimeResolution::Quarter => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            TimeResolution::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Start of the period following the one that starts at `start`.
    pub fn next(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeResolution::Day => start.succ_opt(),
            TimeResolution::Week => start.checked_add_days(chrono::Days::new(7)),
            TimeResolution::Month => start.checked_add_months(Months::new(1)),
            TimeResolution::Quarter => start.checked_add_months(Months::new(3)),
            TimeResolution::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Canonical label of the period containing `date`.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            TimeResolution::Day => date.format("%Y-%m-%d").to_string(),
            TimeResolution::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TimeResolution::Month => date.format("%Y-%m").to_string(),
            TimeResolution::Quarter => format!("{}-Q{}", date.year(), date.month0() / 3 + 1),
            TimeResolution::Year => date.format("%Y").to_string(),
        }
    }
}

/// Parse an ISO-8601 calendar value: day, week, month or year form.
///
/// Datetimes are truncated to their date.
pub fn parse_iso(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(caps) = ISO_DAY.captures(raw) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }
    if let Some(caps) = ISO_WEEK.captures(raw) {
        let weekday = match caps.get(3) {
            Some(d) => weekday_from_iso(d.as_str().parse().ok()?)?,
            None => Weekday::Mon,
        };
        return NaiveDate::from_isoywd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, weekday);
    }
    if let Some(caps) = ISO_MONTH.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 1);
    }
    if let Some(caps) = ISO_YEAR.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, 1, 1);
    }
    None
}

/// Parse a `yyyy-Qn` quarter value to the first day of the quarter.
pub fn parse_quarter(raw: &str) -> Option<NaiveDate> {
    let caps = QUARTER.captures(raw.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let quarter: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
}

/// Parse a raw value with the parser matching the column type.
///
/// Non-time column types never parse.
pub fn parse_date(col_type: ColType, raw: &str) -> Option<NaiveDate> {
    match col_type.time_resolution()? {
        TimeResolution::Quarter => parse_quarter(raw),
        TimeResolution::Day
        | TimeResolution::Week
        | TimeResolution::Month
        | TimeResolution::Year => parse_iso(raw),
    }
}

/// Whole calendar months from `from` to `to` (zero when `to` precedes `from`).
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn weekday_from_iso(day: u32) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
