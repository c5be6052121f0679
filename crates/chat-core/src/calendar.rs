//! Calendar features derived from naive message timestamps.
//!
//! [`Weekday`] and [`Month`] are ordered enums so that grouped statistics
//! sort in calendar order (Monday first, January first) rather than
//! alphabetically.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Weekday ───────────────────────────────────────────────────────────────────

/// Day of the week, ordered Monday through Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All weekdays in calendar order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// English name, e.g. `"Monday"`.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Month ─────────────────────────────────────────────────────────────────────

/// Month of the year, ordered January through December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
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
    /// All months in calendar order.
    pub const ALL: [Month; 12] = [
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

    /// Month for a 1-based month number; `None` outside `1..=12`.
    pub fn from_number(n: u32) -> Option<Self> {
        n.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    /// English name, e.g. `"January"`.
    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Derivations ───────────────────────────────────────────────────────────────

/// Year plus zero-padded Sunday-start week of the year (`"%Y-%U"`).
///
/// Days before the first Sunday of the year fall in week `00`.
pub fn week_label(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%U").to_string()
}

/// Weekday of a timestamp.
pub fn weekday_of(dt: &NaiveDateTime) -> Weekday {
    dt.weekday().into()
}

/// Month of a timestamp.
pub fn month_of(dt: &NaiveDateTime) -> Month {
    // chrono guarantees month() is in 1..=12
    Month::from_number(dt.month()).unwrap_or(Month::January)
}

/// Hour of day, `0..=23`.
pub fn hour_of(dt: &NaiveDateTime) -> u32 {
    dt.hour()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // ── ordering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_weekday_order_is_monday_first() {
        let mut days = vec![Weekday::Sunday, Weekday::Wednesday, Weekday::Monday];
        days.sort();
        assert_eq!(
            days,
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Sunday]
        );
    }

    #[test]
    fn test_month_order_is_calendar_order() {
        assert!(Month::January < Month::February);
        assert!(Month::November < Month::December);
        let mut months = vec![Month::December, Month::April, Month::August];
        months.sort();
        assert_eq!(months, vec![Month::April, Month::August, Month::December]);
    }

    // ── Month::from_number ───────────────────────────────────────────────────

    #[test]
    fn test_month_from_number() {
        assert_eq!(Month::from_number(1), Some(Month::January));
        assert_eq!(Month::from_number(12), Some(Month::December));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    // ── derivations ──────────────────────────────────────────────────────────

    #[test]
    fn test_weekday_of() {
        // 21 June 2020 was a Sunday
        assert_eq!(weekday_of(&at(2020, 6, 21, 23, 39)), Weekday::Sunday);
        assert_eq!(weekday_of(&at(2020, 6, 22, 7, 0)), Weekday::Monday);
    }

    #[test]
    fn test_month_and_hour_of() {
        let dt = at(2020, 6, 21, 23, 39);
        assert_eq!(month_of(&dt), Month::June);
        assert_eq!(hour_of(&dt), 23);
    }

    #[test]
    fn test_week_label_sunday_start() {
        // 2020-01-01 is a Wednesday, before the first Sunday: week 00
        assert_eq!(week_label(&at(2020, 1, 1, 0, 0)), "2020-00");
        // 2020-01-05 is the first Sunday: week 01
        assert_eq!(week_label(&at(2020, 1, 5, 0, 0)), "2020-01");
        // Saturday 2020-06-20 and Sunday 2020-06-21 are in different weeks
        assert_eq!(week_label(&at(2020, 6, 20, 12, 0)), "2020-24");
        assert_eq!(week_label(&at(2020, 6, 21, 12, 0)), "2020-25");
    }

    // ── serde ────────────────────────────────────────────────────────────────

    #[test]
    fn test_weekday_serializes_as_name() {
        let json = serde_json::to_string(&Weekday::Thursday).unwrap();
        assert_eq!(json, r#""Thursday""#);
        let back: Weekday = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Weekday::Thursday);
    }

    #[test]
    fn test_month_display() {
        assert_eq!(Month::September.to_string(), "September");
        assert_eq!(Weekday::Friday.to_string(), "Friday");
    }
}
