//! Calendar grid — whole weeks (Sunday first) covering one month, each day
//! coloured by its record.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::DailyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Sunday,
    Saturday,
    Weekday,
}

impl DayKind {
    fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sun => DayKind::Sunday,
            Weekday::Sat => DayKind::Saturday,
            _ => DayKind::Weekday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for the leading/trailing days of neighbouring months
    pub in_month: bool,
    pub day_kind: DayKind,
    /// The day record's circle colour, if one was logged
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid month `{0}`, expected YYYY-MM")]
pub struct MonthError(pub String);

/// Parse `YYYY-MM` into (year, month).
pub fn parse_month(s: &str) -> Result<(i32, u32), MonthError> {
    let err = || MonthError(s.to_string());
    let (y, m) = s.split_once('-').ok_or_else(err)?;
    if y.len() != 4 || m.len() != 2 {
        return Err(err());
    }
    let year: i32 = y.parse().map_err(|_| err())?;
    let month: u32 = m.parse().map_err(|_| err())?;
    if !(1..=12).contains(&month) {
        return Err(err());
    }
    Ok((year, month))
}

/// Weeks covering `year`/`month`, Sunday through Saturday. Returns None for an
/// out-of-range month.
pub fn month_grid(
    year: i32,
    month: u32,
    records: &BTreeMap<String, DailyRecord>,
) -> Option<Vec<[DayCell; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;

    let start = first - Duration::days(first.weekday().num_days_from_sunday() as i64);
    let end = last + Duration::days(6 - last.weekday().num_days_from_sunday() as i64);

    let cell = |date: NaiveDate| DayCell {
        date,
        in_month: date.month() == month && date.year() == year,
        day_kind: DayKind::of(date),
        color: records
            .get(&date.format("%Y-%m-%d").to_string())
            .and_then(|r| r.circle_color.clone()),
    };

    let mut weeks = Vec::new();
    let mut day = start;
    while day <= end {
        weeks.push(std::array::from_fn(|i| cell(day + Duration::days(i as i64))));
        day += Duration::days(7);
    }
    Some(weeks)
}
