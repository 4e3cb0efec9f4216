//! Bulk schedule import.
//!
//! One milestone per line, e.g. `03/04 - 1 -4 - ASE`:
//! - the line must start with `M/D` (one or two digits each)
//! - the title is the text after the last `-`, or the whole line if there is none
//! - the hour is the first number following a `-`; 1 to 6 are read as afternoon
//! - the year is the current one, moved forward a year when the date would be
//!   more than 60 days in the past

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Dates further back than this roll into next year
pub const ROLLOVER_DAYS: i64 = 60;

static DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})").expect("date prefix pattern to compile"));
static HOUR_AFTER_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*(\d{1,2})").expect("hour pattern to compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledItem {
    pub title: String,
    /// Wall-clock time in the importer's timezone
    pub target: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub items: Vec<ScheduledItem>,
    /// Non-blank lines that could not be turned into a milestone
    pub skipped: Vec<String>,
}

pub fn parse_schedule(text: &str, now: NaiveDateTime) -> ParsedSchedule {
    let mut schedule = ParsedSchedule::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, now) {
            Some(item) => schedule.items.push(item),
            None => {
                debug!("Skipping schedule line: {:?}", line);
                schedule.skipped.push(line.trim().to_string());
            }
        }
    }
    schedule
}

/// Parse one schedule line relative to `now`
pub fn parse_line(line: &str, now: NaiveDateTime) -> Option<ScheduledItem> {
    let line = line.trim();
    let captures = DATE_PREFIX.captures(line)?;
    let month: u32 = captures[1].parse().ok()?;
    let day: u32 = captures[2].parse().ok()?;

    let title = match line.rsplit_once('-') {
        Some((_, last)) => last.trim(),
        None => line,
    };
    if title.is_empty() {
        return None;
    }

    let hour = match HOUR_AFTER_DASH.captures(line) {
        Some(found) => afternoon_hour(found[1].parse().ok()?),
        None => 0,
    };
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;

    let year = now.year();
    let mut target = NaiveDate::from_ymd_opt(year, month, day)?.and_time(time);
    if target < now - Duration::days(ROLLOVER_DAYS) {
        // Feb 29 into a common year lands on Mar 1
        let next = NaiveDate::from_ymd_opt(year + 1, month, day).or_else(|| NaiveDate::from_ymd_opt(year + 1, 3, 1))?;
        target = next.and_time(time);
    }

    Some(ScheduledItem {
        title: title.to_string(),
        target,
    })
}

/// Class schedules rarely start before 7am, so 1 to 6 mean pm
fn afternoon_hour(hour: u32) -> u32 {
    if (1..=6).contains(&hour) {
        hour + 12
    } else {
        hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_full_schedule_line() {
        let item = parse_line("03/04 - 1 -4 - ASE", at(2024, 2, 1, 9)).unwrap();
        assert_eq!(item.title, "ASE");
        assert_eq!(item.target, at(2024, 3, 4, 13));
    }

    #[test]
    fn test_morning_hours_are_kept() {
        let item = parse_line("3/4 - 9 - 11 - Calculus", at(2024, 2, 1, 9)).unwrap();
        assert_eq!(item.target, at(2024, 3, 4, 9));

        let item = parse_line("3/4 - 12 - Lunch talk", at(2024, 2, 1, 9)).unwrap();
        assert_eq!(item.target, at(2024, 3, 4, 12));
    }

    #[test]
    fn test_line_without_dash_uses_whole_line_and_midnight() {
        let item = parse_line("12/25 Christmas", at(2024, 2, 1, 9)).unwrap();
        assert_eq!(item.title, "12/25 Christmas");
        assert_eq!(item.target, at(2024, 12, 25, 0));
    }

    #[test]
    fn test_old_dates_roll_into_next_year() {
        let now = at(2024, 12, 15, 10);
        assert_eq!(parse_line("1/10 - 9 - Exam", now).unwrap().target, at(2025, 1, 10, 9));

        // within the 60 day window stays in this year
        assert_eq!(parse_line("11/1 - Review", now).unwrap().target, at(2024, 11, 1, 0));
    }

    #[test]
    fn test_leap_day_rollover_lands_on_march_first() {
        let item = parse_line("2/29 - Leap", at(2024, 6, 1, 0)).unwrap();
        assert_eq!(item.target, at(2025, 3, 1, 0));
    }

    #[test]
    fn test_unusable_lines_are_skipped() {
        let now = at(2024, 2, 1, 9);
        assert_eq!(parse_line("Meeting notes - Tuesday", now), None);
        assert_eq!(parse_line("13/40 - Nope", now), None);
        assert_eq!(parse_line("5/1 - 30 - Late", now), None);
        assert_eq!(parse_line("5/1 - 9 -", now), None);
    }

    #[test]
    fn test_parse_schedule_collects_items_and_skips() {
        let text = "03/04 - 1 -4 - ASE\n\n  \nno date here\n3/11 - 2 - 5 - Lab\r\n";
        let schedule = parse_schedule(text, at(2024, 2, 1, 9));

        let titles: Vec<_> = schedule.items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["ASE", "Lab"]);
        assert_eq!(schedule.items[1].target, at(2024, 3, 11, 14));
        assert_eq!(schedule.skipped, vec!["no date here".to_string()]);
    }
}
