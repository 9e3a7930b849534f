//! Precision-aware date, time and datetime values
//!
//! FHIRPath temporal literals carry their precision: `@2023` is a year, not
//! January 1st. Ordering compares component by component and reports
//! "unknown" when two values agree on their shared components but differ in
//! precision. When both datetimes carry a timezone offset and enough
//! precision to denote an instant, ordering is instant-based instead.

use chrono::{Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::fmt;

/// A date with year, optional month, optional day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    /// Four-digit year
    pub year: i32,
    /// 1-based month, present at month precision or finer
    pub month: Option<u32>,
    /// 1-based day of month, present at day precision
    pub day: Option<u32>,
}

impl Date {
    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD` (without the `@` sigil).
    /// Returns `None` when a component is out of range or not a calendar day.
    pub fn parse(text: &str) -> Option<Date> {
        let mut parts = text.splitn(3, '-');
        let year_text = parts.next()?;
        if year_text.len() != 4 {
            return None;
        }
        let year: i32 = year_text.parse().ok()?;
        let month = match parts.next() {
            Some(m) => {
                if m.len() != 2 {
                    return None;
                }
                let month: u32 = m.parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                Some(month)
            }
            None => None,
        };
        let day = match parts.next() {
            Some(d) => {
                if d.len() != 2 {
                    return None;
                }
                let day: u32 = d.parse().ok()?;
                NaiveDate::from_ymd_opt(year, month?, day)?;
                Some(day)
            }
            None => None,
        };
        Some(Date { year, month, day })
    }

    /// The date as a chrono `NaiveDate`, available at day precision only.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)
    }

    fn from_naive(date: NaiveDate) -> Date {
        Date {
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
        }
    }

    /// Component-wise partial ordering; `None` when the shared components
    /// are equal but precision differs.
    pub fn cmp_partial(&self, other: &Date) -> Option<Ordering> {
        match self.year.cmp(&other.year) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        match (self.month, other.month) {
            (Some(a), Some(b)) => match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return Some(ord),
            },
            (None, None) => return Some(Ordering::Equal),
            _ => return None,
        }
        match (self.day, other.day) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Whether both values have identical components and precision.
    pub fn same_value(&self, other: &Date) -> bool {
        self == other
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
            }
        }
        Ok(())
    }
}

/// A time of day with hour, minute, optional second, optional millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    /// Hour 0..=23
    pub hour: u32,
    /// Minute 0..=59
    pub minute: u32,
    /// Second 0..=59, present at second precision
    pub second: Option<u32>,
    /// Milliseconds, present at millisecond precision
    pub millisecond: Option<u32>,
}

impl Time {
    /// Parse `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff` (without the `@T` sigil).
    pub fn parse(text: &str) -> Option<Time> {
        let (clock, millisecond) = match text.split_once('.') {
            Some((clock, frac)) => {
                if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                // Pad to milliseconds: ".5" means 500ms
                let padded = format!("{frac:0<3}");
                (clock, Some(padded.parse().ok()?))
            }
            None => (text, None),
        };
        let mut parts = clock.splitn(3, ':');
        let hour: u32 = parts.next()?.parse().ok()?;
        let minute: u32 = parts.next()?.parse().ok()?;
        let second = match parts.next() {
            Some(s) => Some(s.parse::<u32>().ok()?),
            None => None,
        };
        if hour > 23 || minute > 59 || second.is_some_and(|s| s > 59) {
            return None;
        }
        if millisecond.is_some() && second.is_none() {
            return None;
        }
        Some(Time {
            hour,
            minute,
            second,
            millisecond,
        })
    }

    fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            self.hour,
            self.minute,
            self.second.unwrap_or(0),
            self.millisecond.unwrap_or(0),
        )
    }

    fn from_naive(time: NaiveTime) -> Time {
        use chrono::Timelike;
        Time {
            hour: time.hour(),
            minute: time.minute(),
            second: Some(time.second()),
            millisecond: Some(time.nanosecond() / 1_000_000),
        }
    }

    /// Component-wise partial ordering with the same precision rules as
    /// [`Date::cmp_partial`].
    pub fn cmp_partial(&self, other: &Time) -> Option<Ordering> {
        match (self.hour, self.minute).cmp(&(other.hour, other.minute)) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        match (self.second, other.second) {
            (Some(a), Some(b)) => match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return Some(ord),
            },
            (None, None) => return Some(Ordering::Equal),
            _ => return None,
        }
        match (self.millisecond, other.millisecond) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)?;
        if let Some(second) = self.second {
            write!(f, ":{second:02}")?;
            if let Some(millisecond) = self.millisecond {
                write!(f, ".{millisecond:03}")?;
            }
        }
        Ok(())
    }
}

/// A date with optional time of day and optional timezone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    /// The date part
    pub date: Date,
    /// Time of day, absent when the literal stops at the `T`
    pub time: Option<Time>,
    /// Timezone offset; `None` for local/unspecified
    pub offset: Option<FixedOffset>,
}

impl DateTime {
    /// Parse the text after `@`, e.g. `2023-05-02T14:30:00.123+02:00`.
    /// The `T` must be present (a date-only literal is a [`Date`]).
    pub fn parse(text: &str) -> Option<DateTime> {
        let (date_text, rest) = text.split_once('T')?;
        let date = Date::parse(date_text)?;
        if rest.is_empty() {
            return Some(DateTime {
                date,
                time: None,
                offset: None,
            });
        }
        let (time_text, offset) = split_offset(rest);
        let offset = match offset {
            Some(offset_text) => Some(parse_offset(offset_text)?),
            None => None,
        };
        let time = if time_text.is_empty() {
            None
        } else {
            if date.day.is_none() {
                return None;
            }
            Some(Time::parse(time_text)?)
        };
        Some(DateTime { date, time, offset })
    }

    /// Promote a date to a datetime at the same precision.
    pub fn from_date(date: Date) -> DateTime {
        DateTime {
            date,
            time: None,
            offset: None,
        }
    }

    /// The instant this value denotes, when it is precise enough (a full
    /// date and a time) and carries an offset. Missing seconds count as 0.
    pub fn to_instant(&self) -> Option<chrono::DateTime<FixedOffset>> {
        let offset = self.offset?;
        let naive = NaiveDateTime::new(self.date.to_naive()?, self.time?.to_naive()?);
        offset.from_local_datetime(&naive).single()
    }

    fn to_naive(&self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(
            self.date.to_naive()?,
            self.time.and_then(Time::to_naive)?,
        ))
    }

    /// Timezone-aware ordering when both sides denote instants; otherwise
    /// component-wise with precision rules.
    pub fn cmp_partial(&self, other: &DateTime) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.to_instant(), other.to_instant()) {
            return Some(a.cmp(&b));
        }
        match self.date.cmp_partial(&other.date)? {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        match (&self.time, &other.time) {
            (Some(a), Some(b)) => a.cmp_partial(b),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T", self.date)?;
        if let Some(time) = &self.time {
            write!(f, "{time}")?;
        }
        if let Some(offset) = &self.offset {
            if offset.local_minus_utc() == 0 {
                write!(f, "Z")?;
            } else {
                write!(f, "{offset}")?;
            }
        }
        Ok(())
    }
}

fn split_offset(text: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = text.strip_suffix('Z') {
        return (stripped, Some("Z"));
    }
    // A '+' always starts an offset; '-' only when positioned as one
    // (HH:MM:SS.fff is at most 12 chars, offsets are the trailing 6).
    if let Some(pos) = text.rfind(['+', '-']) {
        if text.len() - pos == 6 && text.as_bytes().get(pos + 3) == Some(&b':') {
            return (&text[..pos], Some(&text[pos..]));
        }
    }
    (text, None)
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let (hours, minutes) = text[1..].split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Calendar duration units usable in date/time arithmetic. Unquoted
/// calendar keywords and the matching UCUM codes both normalize here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl CalendarUnit {
    /// Recognize a calendar keyword (`year`, `months`, ...) or UCUM time
    /// code (`a`, `mo`, `wk`, `d`, `h`, `min`, `s`, `ms`).
    pub fn parse(unit: &str) -> Option<CalendarUnit> {
        match unit {
            "year" | "years" | "a" => Some(CalendarUnit::Year),
            "month" | "months" | "mo" => Some(CalendarUnit::Month),
            "week" | "weeks" | "wk" => Some(CalendarUnit::Week),
            "day" | "days" | "d" => Some(CalendarUnit::Day),
            "hour" | "hours" | "h" => Some(CalendarUnit::Hour),
            "minute" | "minutes" | "min" => Some(CalendarUnit::Minute),
            "second" | "seconds" | "s" => Some(CalendarUnit::Second),
            "millisecond" | "milliseconds" | "ms" => Some(CalendarUnit::Millisecond),
            _ => None,
        }
    }

    /// Canonical singular keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            CalendarUnit::Year => "year",
            CalendarUnit::Month => "month",
            CalendarUnit::Week => "week",
            CalendarUnit::Day => "day",
            CalendarUnit::Hour => "hour",
            CalendarUnit::Minute => "minute",
            CalendarUnit::Second => "second",
            CalendarUnit::Millisecond => "millisecond",
        }
    }
}

/// Add `amount` of `unit` to a date. Fractional amounts truncate toward
/// zero. Returns `None` when the date lacks the precision the unit needs
/// or the result leaves the supported range.
pub fn date_add(date: &Date, amount: Decimal, unit: CalendarUnit) -> Option<Date> {
    let amount = amount.trunc().to_i64()?;
    match unit {
        CalendarUnit::Year => {
            let year = date.year.checked_add(i32::try_from(amount).ok()?)?;
            match date.to_naive() {
                Some(naive) => {
                    let shifted = shift_months(naive, amount.checked_mul(12)?)?;
                    Some(Date::from_naive(shifted))
                }
                None => Some(Date { year, ..*date }),
            }
        }
        CalendarUnit::Month => match date.to_naive() {
            Some(naive) => Some(Date::from_naive(shift_months(naive, amount)?)),
            None => {
                let month = date.month?;
                let total = i64::from(date.year) * 12 + i64::from(month) - 1 + amount;
                let year = i32::try_from(total.div_euclid(12)).ok()?;
                let month = u32::try_from(total.rem_euclid(12) + 1).ok()?;
                Some(Date {
                    year,
                    month: Some(month),
                    day: None,
                })
            }
        },
        CalendarUnit::Week => {
            let naive = date.to_naive()?;
            Some(Date::from_naive(
                naive.checked_add_signed(Duration::weeks(amount))?,
            ))
        }
        CalendarUnit::Day => {
            let naive = date.to_naive()?;
            Some(Date::from_naive(
                naive.checked_add_signed(Duration::days(amount))?,
            ))
        }
        // Sub-day arithmetic needs a time component
        _ => None,
    }
}

/// Add `amount` of `unit` to a datetime, threading the offset through.
pub fn datetime_add(datetime: &DateTime, amount: Decimal, unit: CalendarUnit) -> Option<DateTime> {
    match unit {
        CalendarUnit::Year | CalendarUnit::Month | CalendarUnit::Week | CalendarUnit::Day => {
            let date = date_add(&datetime.date, amount, unit)?;
            Some(DateTime { date, ..*datetime })
        }
        _ => {
            let amount = amount.trunc().to_i64()?;
            let naive = datetime.to_naive()?;
            let duration = match unit {
                CalendarUnit::Hour => Duration::hours(amount),
                CalendarUnit::Minute => Duration::minutes(amount),
                CalendarUnit::Second => Duration::seconds(amount),
                CalendarUnit::Millisecond => Duration::milliseconds(amount),
                _ => unreachable!(),
            };
            let shifted = naive.checked_add_signed(duration)?;
            Some(DateTime {
                date: Date::from_naive(shifted.date()),
                time: Some(Time::from_naive(shifted.time())),
                offset: datetime.offset,
            })
        }
    }
}

/// Add `amount` of `unit` to a time of day, wrapping around midnight.
pub fn time_add(time: &Time, amount: Decimal, unit: CalendarUnit) -> Option<Time> {
    let amount = amount.trunc().to_i64()?;
    let naive = time.to_naive()?;
    let duration = match unit {
        CalendarUnit::Hour => Duration::hours(amount % 24),
        CalendarUnit::Minute => Duration::minutes(amount),
        CalendarUnit::Second => Duration::seconds(amount),
        CalendarUnit::Millisecond => Duration::milliseconds(amount),
        _ => return None,
    };
    let shifted = naive.overflowing_add_signed(duration).0;
    let mut result = Time::from_naive(shifted);
    if time.second.is_none() {
        result.second = None;
        result.millisecond = None;
    } else if time.millisecond.is_none() {
        result.millisecond = None;
    }
    Some(result)
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let months_u32 = u32::try_from(months.abs()).ok()?;
    if months >= 0 {
        date.checked_add_months(Months::new(months_u32))
    } else {
        date.checked_sub_months(Months::new(months_u32))
    }
}
