//! Slot candidate ranking.
//!
//! # Algorithm
//!
//! 1. Take the demand's historical slots from [`Analytics`], already ranked
//!    by mean success score (stable, ties keep first-seen order).
//! 2. Drop slots on weekdays the constraints do not allow. Shift targets
//!    keep only slots at their template's start time.
//! 3. Append one synthetic fallback slot (score 0.5) per allowed weekday at
//!    the anchor time (preferred window start, or the shift start) unless
//!    that exact slot is already present.
//! 4. Re-rank the whole list. The sort is stable, so on equal scores
//!    historical slots stay ahead of fallbacks, and a slot scoring below
//!    0.5 sinks behind them.
//!
//! A key without history therefore still yields one candidate per allowed
//! weekday, and a key whose favourite slot is exhausted can move on to
//! another day.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::Analytics;
use crate::models::{ConstraintSet, DemandTarget, Weekday};

/// Score given to synthetic slots.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// A scored (weekday, time) slot for one demand key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub demand_key: String,
    /// Sum of success scores of the sessions held in this slot.
    pub score: f64,
    pub sample_count: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl SlotCandidate {
    /// A synthetic slot with a neutral score.
    pub fn fallback(demand_key: impl Into<String>, weekday: Weekday, time: NaiveTime) -> Self {
        Self {
            weekday,
            time,
            demand_key: demand_key.into(),
            score: NEUTRAL_SCORE,
            sample_count: 1,
            location: None,
            label: Some(format!("{weekday} {} (default)", time.format("%H:%M"))),
        }
    }

    /// Ranking key: `score / sample_count`.
    #[inline]
    pub fn mean_score(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.score / f64::from(self.sample_count)
        }
    }

    /// Whether this slot has no historical backing.
    pub fn is_fallback(&self) -> bool {
        self.label.as_deref().is_some_and(|l| l.ends_with("(default)"))
    }
}

/// Stable descending sort by mean score.
pub(crate) fn rank(candidates: &mut [SlotCandidate]) {
    candidates.sort_by(|a, b| {
        b.mean_score()
            .partial_cmp(&a.mean_score())
            .unwrap_or(Ordering::Equal)
    });
}

/// Turns analytics into ranked candidate lists.
#[derive(Debug, Clone, Copy)]
pub struct SlotScorer<'a> {
    constraints: &'a ConstraintSet,
}

impl<'a> SlotScorer<'a> {
    pub fn new(constraints: &'a ConstraintSet) -> Self {
        Self { constraints }
    }

    /// Ranked candidates for one target.
    pub fn candidates(&self, target: &DemandTarget, analytics: &Analytics) -> Vec<SlotCandidate> {
        let anchor = target
            .shift
            .map(|s| s.start)
            .unwrap_or_else(|| self.constraints.preferred_window().start);

        let mut ranked: Vec<SlotCandidate> = analytics
            .per_demand
            .get(&target.demand_key)
            .map(|stats| stats.slots.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|c| self.constraints.allows_weekday(c.weekday))
            .filter(|c| target.shift.is_none() || c.time == anchor)
            .cloned()
            .collect();

        let days: Vec<Weekday> = if self.constraints.allowed_weekdays().is_empty() {
            Weekday::ALL.to_vec()
        } else {
            self.constraints.allowed_weekdays().to_vec()
        };

        for day in days {
            if !ranked.iter().any(|c| c.weekday == day && c.time == anchor) {
                ranked.push(SlotCandidate::fallback(&target.demand_key, day, anchor));
            }
        }

        rank(&mut ranked);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constraints, ConstraintsUpdate, HistoryEntry, SessionStatus, ShiftTemplate};
    use crate::scheduler::AnalyticsBuilder;
    use chrono::NaiveDate;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn session(key: &str, day: u32, h: u32, attendance: u32) -> HistoryEntry {
        let date = NaiveDate::from_ymd_opt(2026, 9, day).unwrap();
        HistoryEntry::new(format!("{key}-{day}-{h}"), key, date, t(h), attendance, 10, SessionStatus::Held)
    }

    fn constraint_set(days: &[&str]) -> ConstraintSet {
        let update = ConstraintsUpdate {
            allowed_weekdays: Some(days.iter().map(|d| d.to_string()).collect()),
            ..ConstraintsUpdate::default()
        };
        ConstraintSet::new(Constraints::default().apply(&update).unwrap()).unwrap()
    }

    #[test]
    fn test_no_history_synthesizes_one_slot_per_weekday() {
        let set = constraint_set(&["monday", "wednesday"]);
        let analytics = AnalyticsBuilder::new().build(&[]);
        let c = SlotScorer::new(&set).candidates(&DemandTarget::new("course", 1), &analytics);

        assert_eq!(c.len(), 2);
        assert_eq!(c[0].weekday, Weekday::Monday);
        assert_eq!(c[1].weekday, Weekday::Wednesday);
        assert!(c.iter().all(|s| s.time == t(8) && s.is_fallback()));
        assert!((c[0].mean_score() - NEUTRAL_SCORE).abs() < 1e-10);
    }

    #[test]
    fn test_history_ranks_before_fallbacks() {
        // 2026-09-07 is a Monday, 2026-09-08 a Tuesday.
        let history = vec![session("course", 7, 9, 9), session("course", 8, 10, 6)];
        let set = constraint_set(&["monday", "tuesday"]);
        let analytics = AnalyticsBuilder::new().build(&history);
        let c = SlotScorer::new(&set).candidates(&DemandTarget::new("course", 1), &analytics);

        assert_eq!(c[0].weekday, Weekday::Monday);
        assert_eq!(c[0].time, t(9));
        assert!(!c[0].is_fallback());
        assert_eq!(c[1].time, t(10));
        // Both weekdays still get an 08:00 fallback.
        assert_eq!(c.len(), 4);
        assert!(c[2..].iter().all(SlotCandidate::is_fallback));
    }

    #[test]
    fn test_disallowed_weekday_history_is_dropped() {
        let history = vec![session("course", 12, 9, 10)]; // Saturday
        let set = constraint_set(&["monday"]);
        let analytics = AnalyticsBuilder::new().build(&history);
        let c = SlotScorer::new(&set).candidates(&DemandTarget::new("course", 1), &analytics);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].weekday, Weekday::Monday);
    }

    #[test]
    fn test_shift_target_pins_to_template_start() {
        let history = vec![session("nurse", 7, 9, 9), session("nurse", 7, 6, 5)];
        let set = constraint_set(&["monday"]);
        let analytics = AnalyticsBuilder::new().build(&history);
        let target = DemandTarget::new("nurse", 1).with_shift(ShiftTemplate::new(t(6), t(14)));
        let c = SlotScorer::new(&set).candidates(&target, &analytics);

        assert_eq!(c.len(), 1);
        assert_eq!(c[0].time, t(6));
        assert!(!c[0].is_fallback());
    }

    #[test]
    fn test_poor_history_sinks_below_fallbacks() {
        // Monday 10:00 was cancelled twice with one of ten seats taken.
        let mut history = Vec::new();
        for day in [7, 14] {
            let date = NaiveDate::from_ymd_opt(2026, 9, day).unwrap();
            history.push(HistoryEntry::new(
                format!("c-{day}"),
                "course",
                date,
                t(10),
                1,
                10,
                SessionStatus::Cancelled,
            ));
        }
        let set = constraint_set(&["monday", "tuesday"]);
        let analytics = AnalyticsBuilder::new().build(&history);
        let c = SlotScorer::new(&set).candidates(&DemandTarget::new("course", 1), &analytics);

        assert_eq!(c.len(), 3);
        assert!(c[0].is_fallback());
        assert!(c[1].is_fallback());
        assert_eq!((c[2].weekday, c[2].time), (Weekday::Monday, t(10)));
        assert!(c.windows(2).all(|w| w[0].mean_score() >= w[1].mean_score()));
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let mut c = vec![
            SlotCandidate::fallback("a", Weekday::Friday, t(8)),
            SlotCandidate::fallback("a", Weekday::Monday, t(8)),
        ];
        rank(&mut c);
        assert_eq!(c[0].weekday, Weekday::Friday);
    }
}
