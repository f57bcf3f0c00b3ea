//! Calendar date-time values.
//!
//! `DateTime` keeps the month as a zero-based [`Month`]. Backends report
//! months one-based through [`BackendTime`]; the conversion between the two
//! is the only place where that correction happens.

use crate::error::{DataErrorKind, Error, Result};
use crate::validate;
use std::fmt;

/// Month of the year, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Month {
    #[default]
    January = 0,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month from its zero-based index.
    pub fn from_index(index: u32) -> Option<Month> {
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }

    pub const fn index(self) -> u32 {
        self as u32
    }

    /// One-based month number as printed in dates.
    pub const fn number(self) -> u32 {
        self as u32 + 1
    }
}

const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: i32, month: Month) -> u32 {
    match month {
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

/// A calendar date and time of day with second precision, no time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    year: i32,
    month: Month,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl Default for DateTime {
    /// The Unix epoch.
    fn default() -> Self {
        Self {
            year: 1970,
            month: Month::January,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    pub fn new(
        year: i32,
        month: Month,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self> {
        if day == 0 || day > days_in_month(year, month) {
            return Err(invalid(format!(
                "day {} out of range for {:?} {}",
                day, month, year
            )));
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(invalid(format!(
                "time {:02}:{:02}:{:02} out of range",
                hour, minute, second
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Midnight of the given date.
    pub fn date(year: i32, month: Month, day: u32) -> Result<Self> {
        Self::new(year, month, day, 0, 0, 0)
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn month(&self) -> Month {
        self.month
    }

    pub const fn day(&self) -> u32 {
        self.day
    }

    pub const fn hour(&self) -> u32 {
        self.hour
    }

    pub const fn minute(&self) -> u32 {
        self.minute
    }

    pub const fn second(&self) -> u32 {
        self.second
    }

    /// Parse the canonical `YYYY-MM-DD HH:MM:SS` form.
    pub fn parse(text: &str) -> Result<Self> {
        let Some(parts) = validate::datetime_parts(text) else {
            return Err(invalid(format!(
                "'{}' is not a date-time of the form YYYY-MM-DD HH:MM:SS",
                text
            )));
        };
        let [year, month, day, hour, minute, second] = parts;
        let year = i32::try_from(year).map_err(|_| invalid(format!("year {} out of range", year)))?;
        let month = month
            .checked_sub(1)
            .and_then(Month::from_index)
            .ok_or_else(|| invalid(format!("month {} out of range", month)))?;
        Self::new(year, month, day, hour, minute, second)
    }

    /// Seconds since the Unix epoch.
    pub fn to_unix(&self) -> i64 {
        let days = days_from_civil(i64::from(self.year), self.month.number(), self.day);
        days * 86_400
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }

    pub fn from_unix(seconds: i64) -> Result<Self> {
        let days = seconds.div_euclid(86_400);
        let secs = seconds.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        let year = i32::try_from(year).map_err(|_| invalid(format!("timestamp {} out of range", seconds)))?;
        let month = Month::from_index(month - 1)
            .ok_or_else(|| invalid(format!("timestamp {} out of range", seconds)))?;
        // secs < 86400, so the components fit in u32
        let secs = u32::try_from(secs).unwrap_or(0);
        Self::new(year, month, day, secs / 3600, secs % 3600 / 60, secs % 60)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year,
            self.month.number(),
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

impl std::str::FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DateTime::parse(s)
    }
}

fn invalid(message: String) -> Error {
    Error::data(DataErrorKind::FormatError, message)
}

// Howard Hinnant's civil calendar algorithms.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (
        year,
        u32::try_from(month).unwrap_or(1),
        u32::try_from(day).unwrap_or(1),
    )
}

/// Date-time as reported by a backend: the month is one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTime {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl TryFrom<BackendTime> for DateTime {
    type Error = Error;

    fn try_from(t: BackendTime) -> Result<Self> {
        let month = t
            .month
            .checked_sub(1)
            .and_then(Month::from_index)
            .ok_or_else(|| invalid(format!("backend month {} out of range", t.month)))?;
        DateTime::new(t.year, month, t.day, t.hour, t.minute, t.second)
    }
}

impl From<DateTime> for BackendTime {
    fn from(dt: DateTime) -> Self {
        Self {
            year: dt.year,
            month: dt.month.number(),
            day: dt.day,
            hour: dt.hour,
            minute: dt.minute,
            second: dt.second,
        }
    }
}
