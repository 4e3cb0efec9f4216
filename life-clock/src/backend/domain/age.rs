//! Age calculation.
//!
//! Turns a birth instant and an observation instant into an [`AgeBreakdown`].
//! Two independent views are produced:
//!
//! - **Calendar breakdown**: years/months/days by field subtraction with a
//!   single borrow from the month preceding `now`'s month.
//! - **Flat counters**: total milliseconds, days and weeks by plain duration
//!   division, with no calendar awareness.
//!
//! The two are never reconciled with each other.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use shared::{AgeBreakdown, BirthInstant};

pub const MILLIS_PER_DAY: i64 = 86_400_000;
pub const DAYS_PER_WEEK: i64 = 7;

/// Compute the age of someone born at `birth`, observed at `now`.
///
/// The calendar fields and time-of-day are read in `now`'s timezone. A birth
/// after `now` yields an all-zero breakdown.
pub fn compute_age<Tz: TimeZone>(birth: &DateTime<Tz>, now: &DateTime<Tz>) -> AgeBreakdown {
    let total_milliseconds = now
        .clone()
        .signed_duration_since(birth.clone())
        .num_milliseconds();

    if total_milliseconds < 0 {
        return AgeBreakdown::default();
    }

    let total_days = total_milliseconds / MILLIS_PER_DAY;
    let total_weeks = total_days / DAYS_PER_WEEK;

    let birth = birth.with_timezone(&now.timezone());
    let (years, months, days) = calendar_difference(
        (birth.year(), birth.month(), birth.day()),
        (now.year(), now.month(), now.day()),
    );

    AgeBreakdown {
        years,
        months,
        days,
        hours: now.hour(),
        minutes: now.minute(),
        seconds: now.second(),
        // nanosecond() exceeds 1e9 during a leap second
        milliseconds: (now.nanosecond() % 1_000_000_000) / 1_000_000,
        total_days,
        total_weeks,
        total_milliseconds,
    }
}

/// Age of `birth` at `now`, with both read in the observer's local timezone
pub fn compute_age_local(birth: &BirthInstant, now: DateTime<Utc>) -> AgeBreakdown {
    compute_age_in(birth, now, &Local)
}

/// Age of `birth` at `now`, with both read in `tz`
pub fn compute_age_in<Tz: TimeZone>(birth: &BirthInstant, now: DateTime<Utc>, tz: &Tz) -> AgeBreakdown {
    let birth = birth.resolve(tz);
    let now = now.with_timezone(tz);
    compute_age(&birth, &now)
}

/// Year/month/day difference between two calendar dates.
///
/// A negative day delta borrows the length of the month before `to`'s month,
/// once; a negative month delta then borrows twelve months from the years.
fn calendar_difference(from: (i32, u32, u32), to: (i32, u32, u32)) -> (i32, i32, i32) {
    let (from_year, from_month, from_day) = from;
    let (to_year, to_month, to_day) = to;

    let mut years = to_year - from_year;
    let mut months = to_month as i32 - from_month as i32;
    let mut days = to_day as i32 - from_day as i32;

    if days < 0 {
        months -= 1;
        let (prev_year, prev_month) = if to_month == 1 {
            (to_year - 1, 12)
        } else {
            (to_year, to_month - 1)
        };
        days += days_in_month(prev_year, prev_month) as i32;
    }

    if months < 0 {
        years -= 1;
        months += 12;
    }

    (years, months, days)
}

/// Number of days in `month` (1-12) of `year`
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}
