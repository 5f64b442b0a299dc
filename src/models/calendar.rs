//! Weekdays, wall-clock windows and period date pools.
//!
//! # Time Model
//! Dates and times are naive: they are interpreted in the single timezone
//! configured by the caller (see [`PlannerConfig`](crate::config::PlannerConfig)).
//! No entry carries its own offset.
//!
//! # Windows
//! A [`TimeWindow`] is a half-open interval of wall-clock time within one day.
//! Sessions that run past midnight never fit inside a window.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Day of week, serialized as lower-case English (`monday` … `sunday`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
    /// All seven days in canonical (ISO) order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    /// Lower-case English name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
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

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| format!("unknown weekday '{s}'"))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time from hour and minute; out-of-range input yields midnight.
pub(crate) fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// A wall-clock interval [start, end) within a single day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveTime,
    /// Interval end (exclusive).
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Creates a new window. Callers validate `end > start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Builds a window from hour/minute pairs; `None` if either is out of range.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self::new(
            NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        ))
    }

    /// Whether the window is non-empty.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Whether a time of day falls within this window.
    #[inline]
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether a session of `duration_minutes` starting at `start` lies
    /// entirely inside the window without crossing midnight.
    pub fn fits(&self, start: NaiveTime, duration_minutes: i64) -> bool {
        if !self.contains(start) {
            return false;
        }
        let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(duration_minutes));
        wrapped == 0 && end <= self.end
    }
}

/// Dates within `[start, end]` grouped by weekday, ascending.
///
/// Only weekdays in `allowed` get a pool; an empty `allowed` admits all seven.
/// This is the date pool the allocator draws from.
pub fn date_pool(start: NaiveDate, end: NaiveDate, allowed: &[Weekday]) -> Vec<(Weekday, Vec<NaiveDate>)> {
    let mut pools: Vec<(Weekday, Vec<NaiveDate>)> = Weekday::ALL
        .iter()
        .filter(|d| allowed.is_empty() || allowed.contains(d))
        .map(|&d| (d, Vec::new()))
        .collect();

    let mut date = start;
    while date <= end {
        let day = Weekday::of(date);
        if let Some((_, dates)) = pools.iter_mut().find(|(d, _)| *d == day) {
            dates.push(date);
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    pools
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_weekday_parse_and_display() {
        assert_eq!("Monday".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert_eq!(" sunday ".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert!("mon".parse::<Weekday>().is_err());
        assert_eq!(Weekday::Friday.to_string(), "friday");
    }

    #[test]
    fn test_weekday_serde_lowercase() {
        let json = serde_json::to_string(&Weekday::Wednesday).unwrap();
        assert_eq!(json, "\"wednesday\"");
        let back: Weekday = serde_json::from_str("\"thursday\"").unwrap();
        assert_eq!(back, Weekday::Thursday);
    }

    #[test]
    fn test_weekday_of_date() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(Weekday::of(d), Weekday::Monday);
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let w = TimeWindow::new(t(8, 0), t(20, 0));
        assert!(w.contains(t(8, 0)));
        assert!(w.contains(t(19, 59)));
        assert!(!w.contains(t(20, 0)));
        assert!(!w.contains(t(7, 59)));
    }

    #[test]
    fn test_window_fits() {
        let w = TimeWindow::new(t(8, 0), t(20, 0));
        assert!(w.fits(t(18, 30), 90));
        assert!(!w.fits(t(19, 0), 90));
        // Crossing midnight never fits
        let all_day = TimeWindow::new(t(0, 0), t(23, 59));
        assert!(!all_day.fits(t(22, 0), 8 * 60));
    }

    #[test]
    fn test_window_validity() {
        assert!(TimeWindow::from_hm((9, 0), (17, 0)).unwrap().is_valid());
        assert!(!TimeWindow::from_hm((17, 0), (9, 0)).unwrap().is_valid());
        assert!(TimeWindow::from_hm((25, 0), (9, 0)).is_none());
    }

    #[test]
    fn test_date_pool_groups_by_weekday() {
        // 2026-10-12 is a Monday; two full weeks.
        let start = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let pools = date_pool(start, end, &[Weekday::Monday, Weekday::Friday]);

        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].0, Weekday::Monday);
        assert_eq!(
            pools[0].1,
            vec![start, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()]
        );
        assert_eq!(pools[1].0, Weekday::Friday);
        assert_eq!(pools[1].1.len(), 2);
    }

    #[test]
    fn test_date_pool_empty_allowed_means_all() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let pools = date_pool(start, end, &[]);
        assert_eq!(pools.len(), 7);
        assert!(pools.iter().all(|(_, dates)| dates.len() == 1));
    }

    #[test]
    fn test_date_pool_inverted_period_is_empty() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let pools = date_pool(start, end, &[]);
        assert!(pools.iter().all(|(_, dates)| dates.is_empty()));
    }
}
