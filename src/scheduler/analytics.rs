//! History analytics.
//!
//! Reduces the history log into overall and per-demand statistics plus a
//! ranked list of popular slots. Analytics bias allocation through the
//! scorer; they never constrain it.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Average attendance | Mean attendance over all sessions |
//! | Cancellation rate | Cancelled sessions / all sessions |
//! | Average fill rate | Mean `attendance / capacity` (per demand) |
//! | Slot score | Sum of success scores of sessions in a slot |
//!
//! Slots are tracked twice: per demand key (the scorer's input) and per
//! (weekday, time) across all demands (the popular slots).
//!
//! # Algorithm
//! One pass over the history. Accumulators are kept in first-seen order so
//! that the stable sort on mean slot score breaks ties deterministically.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::scorer::{rank, SlotCandidate};
use crate::models::{HistoryEntry, Weekday};

/// Default number of popular slots reported.
pub const DEFAULT_POPULAR_SLOT_LIMIT: usize = 6;

/// Statistics for one demand key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandStats {
    pub sessions: usize,
    pub avg_attendance: f64,
    pub avg_fill_rate: f64,
    pub cancellation_rate: f64,
    /// All slots of this demand, ranked by mean score.
    pub slots: Vec<SlotCandidate>,
}

/// A (weekday, time) slot scored across every demand held in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularSlot {
    pub weekday: Weekday,
    pub time: NaiveTime,
    /// Sum of success scores of the sessions held in this slot.
    pub score: f64,
    pub sample_count: u32,
    /// Demand keys seen in this slot, first-seen order.
    pub demand_keys: Vec<String>,
}

impl PopularSlot {
    pub fn mean_score(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.score / f64::from(self.sample_count)
        }
    }
}

/// Aggregated history statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub total_sessions: usize,
    pub avg_attendance: f64,
    pub cancellation_rate: f64,
    /// Best slots across all demands, truncated to the configured limit.
    pub popular_slots: Vec<PopularSlot>,
    pub per_demand: BTreeMap<String, DemandStats>,
}

impl Analytics {
    /// Whether no history contributed.
    pub fn is_empty(&self) -> bool {
        self.total_sessions == 0
    }
}

#[derive(Default)]
struct Counters {
    sessions: usize,
    attendance: u64,
    fill: f64,
    cancelled: usize,
}

impl Counters {
    fn add(&mut self, entry: &HistoryEntry) {
        self.sessions += 1;
        self.attendance += u64::from(entry.attendance);
        self.fill += entry.fill_rate;
        if entry.is_cancelled() {
            self.cancelled += 1;
        }
    }

    fn mean(&self, total: f64) -> f64 {
        if self.sessions == 0 {
            0.0
        } else {
            total / self.sessions as f64
        }
    }
}

/// Builds [`Analytics`] from history.
#[derive(Debug, Clone)]
pub struct AnalyticsBuilder {
    popular_slot_limit: usize,
}

impl Default for AnalyticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsBuilder {
    pub fn new() -> Self {
        Self {
            popular_slot_limit: DEFAULT_POPULAR_SLOT_LIMIT,
        }
    }

    /// Sets how many popular slots are reported.
    pub fn with_popular_slot_limit(mut self, limit: usize) -> Self {
        self.popular_slot_limit = limit;
        self
    }

    /// Computes analytics in a single pass. Empty history yields zeros.
    pub fn build(&self, history: &[HistoryEntry]) -> Analytics {
        let mut overall = Counters::default();
        let mut demands: Vec<(String, Counters)> = Vec::new();
        let mut demand_index: HashMap<&str, usize> = HashMap::new();
        let mut slots: Vec<SlotCandidate> = Vec::new();
        let mut slot_index: HashMap<(&str, Weekday, NaiveTime), usize> = HashMap::new();
        let mut popular: Vec<PopularSlot> = Vec::new();
        let mut popular_index: HashMap<(Weekday, NaiveTime), usize> = HashMap::new();

        for entry in history {
            overall.add(entry);

            let d = *demand_index
                .entry(entry.demand_key.as_str())
                .or_insert_with(|| {
                    demands.push((entry.demand_key.clone(), Counters::default()));
                    demands.len() - 1
                });
            demands[d].1.add(entry);

            let key = (entry.demand_key.as_str(), entry.weekday, entry.time);
            let s = *slot_index.entry(key).or_insert_with(|| {
                slots.push(SlotCandidate {
                    weekday: entry.weekday,
                    time: entry.time,
                    demand_key: entry.demand_key.clone(),
                    score: 0.0,
                    sample_count: 0,
                    location: None,
                    label: Some(format!("{} {}", entry.weekday, entry.time.format("%H:%M"))),
                });
                slots.len() - 1
            });
            let slot = &mut slots[s];
            slot.score += entry.success_score;
            slot.sample_count += 1;
            if slot.location.is_none() {
                slot.location = entry.location.clone();
            }

            let p = *popular_index
                .entry((entry.weekday, entry.time))
                .or_insert_with(|| {
                    popular.push(PopularSlot {
                        weekday: entry.weekday,
                        time: entry.time,
                        score: 0.0,
                        sample_count: 0,
                        demand_keys: Vec::new(),
                    });
                    popular.len() - 1
                });
            let slot = &mut popular[p];
            slot.score += entry.success_score;
            slot.sample_count += 1;
            if !slot.demand_keys.contains(&entry.demand_key) {
                slot.demand_keys.push(entry.demand_key.clone());
            }
        }

        rank(&mut slots);
        popular.sort_by(|a, b| {
            b.mean_score()
                .partial_cmp(&a.mean_score())
                .unwrap_or(Ordering::Equal)
        });
        popular.truncate(self.popular_slot_limit);

        let per_demand = demands
            .into_iter()
            .map(|(key, c)| {
                let stats = DemandStats {
                    sessions: c.sessions,
                    avg_attendance: c.mean(c.attendance as f64),
                    avg_fill_rate: c.mean(c.fill),
                    cancellation_rate: c.mean(c.cancelled as f64),
                    slots: slots
                        .iter()
                        .filter(|s| s.demand_key == key)
                        .cloned()
                        .collect(),
                };
                (key, stats)
            })
            .collect();

        Analytics {
            total_sessions: overall.sessions,
            avg_attendance: overall.mean(overall.attendance as f64),
            cancellation_rate: overall.mean(overall.cancelled as f64),
            popular_slots: popular,
            per_demand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use chrono::NaiveDate;

    fn session(key: &str, day: u32, h: u32, attendance: u32, status: SessionStatus) -> HistoryEntry {
        let date = NaiveDate::from_ymd_opt(2026, 9, day).unwrap();
        let time = NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        HistoryEntry::new(format!("{key}-{day}-{h}"), key, date, time, attendance, 10, status)
    }

    #[test]
    fn test_empty_history_is_all_zero() {
        let a = AnalyticsBuilder::new().build(&[]);
        assert!(a.is_empty());
        assert_eq!(a.avg_attendance, 0.0);
        assert_eq!(a.cancellation_rate, 0.0);
        assert!(a.popular_slots.is_empty());
        assert!(a.per_demand.is_empty());
    }

    #[test]
    fn test_slot_mean_score() {
        // Two Monday 09:00 sessions at 8/10 and 9/10.
        let history = vec![
            session("course", 7, 9, 8, SessionStatus::Held),
            session("course", 14, 9, 9, SessionStatus::Held),
        ];
        let a = AnalyticsBuilder::new().build(&history);
        let slot = &a.per_demand["course"].slots[0];
        assert_eq!(slot.sample_count, 2);
        assert!((slot.mean_score() - 0.85).abs() < 1e-10);
        assert!((a.avg_attendance - 8.5).abs() < 1e-10);
    }

    #[test]
    fn test_cancellation_rate_and_fill() {
        let history = vec![
            session("course", 7, 9, 5, SessionStatus::Held),
            session("course", 8, 9, 0, SessionStatus::Cancelled),
            session("event", 9, 18, 10, SessionStatus::Waitlist),
            session("event", 10, 18, 10, SessionStatus::Held),
        ];
        let a = AnalyticsBuilder::new().build(&history);
        assert_eq!(a.total_sessions, 4);
        assert!((a.cancellation_rate - 0.25).abs() < 1e-10);

        let course = &a.per_demand["course"];
        assert_eq!(course.sessions, 2);
        assert!((course.cancellation_rate - 0.5).abs() < 1e-10);
        assert!((course.avg_fill_rate - 0.25).abs() < 1e-10);

        let event = &a.per_demand["event"];
        assert!((event.avg_fill_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_popular_slots_ranked_and_truncated() {
        let history: Vec<HistoryEntry> = (0..8)
            .map(|h| session("course", 7, 8 + h, h, SessionStatus::Held))
            .collect();
        let a = AnalyticsBuilder::new().with_popular_slot_limit(3).build(&history);
        assert_eq!(a.popular_slots.len(), 3);
        assert_eq!(a.popular_slots[0].time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert!(a.popular_slots[0].mean_score() >= a.popular_slots[1].mean_score());
        // Per-demand slot lists are never truncated.
        assert_eq!(a.per_demand["course"].slots.len(), 8);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let history = vec![
            session("course", 10, 9, 7, SessionStatus::Held), // Thursday
            session("course", 7, 9, 7, SessionStatus::Held),  // Monday
        ];
        let a = AnalyticsBuilder::new().build(&history);
        let slots = &a.per_demand["course"].slots;
        assert_eq!(slots[0].weekday, Weekday::Thursday);
        assert_eq!(slots[1].weekday, Weekday::Monday);
    }

    #[test]
    fn test_slot_location_from_history() {
        let history = vec![
            session("course", 7, 9, 7, SessionStatus::Held),
            session("course", 14, 9, 7, SessionStatus::Held).with_location("Hall"),
        ];
        let a = AnalyticsBuilder::new().build(&history);
        assert_eq!(a.per_demand["course"].slots[0].location.as_deref(), Some("Hall"));
    }

    #[test]
    fn test_popular_slots_merge_demands() {
        // Monday 09:00 hosts a course and an exam; Monday 10:00 only an exam.
        let history = vec![
            session("course", 7, 9, 8, SessionStatus::Held),
            session("exam", 14, 9, 6, SessionStatus::Held),
            session("exam", 14, 10, 9, SessionStatus::Held),
        ];
        let a = AnalyticsBuilder::new().build(&history);

        assert_eq!(a.popular_slots.len(), 2);
        let nine = a
            .popular_slots
            .iter()
            .find(|s| s.time == NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .unwrap();
        assert_eq!(nine.sample_count, 2);
        assert!((nine.mean_score() - 0.7).abs() < 1e-10);
        assert_eq!(nine.demand_keys, vec!["course", "exam"]);
        assert_eq!(a.popular_slots[0].demand_keys, vec!["exam"]); // 0.9 beats 0.7

        // Per-demand lists stay separate.
        assert_eq!(a.per_demand["course"].slots.len(), 1);
        assert_eq!(a.per_demand["exam"].slots.len(), 2);
    }
}
