//! Plan (solution) model.
//!
//! A plan is the ordered set of entries committed by one planning run,
//! together with a coverage report stating how far each demand target
//! was satisfied. A new run replaces the whole plan.
//!
//! Conflict reports describe problems found in a plan. They are purely
//! diagnostic and never stored as authoritative state.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Weekday;

/// One committed session or shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub demand_key: String,
    pub title: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Always before `end`.
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Mean success score of the slot the entry was placed in.
    pub score: f64,
    /// Demand key whose commit propagated this entry (linked groups).
    #[serde(default)]
    pub linked_from: Option<String>,
}

impl PlanEntry {
    /// Creates an entry. Returns `None` unless `end > start`.
    pub fn new(
        demand_key: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        score: f64,
    ) -> Option<Self> {
        if end <= start {
            return None;
        }
        let date = start.date();
        Some(Self {
            demand_key: demand_key.into(),
            title: title.into(),
            date,
            weekday: Weekday::of(date),
            start,
            end,
            location: None,
            employee_id: None,
            employee_name: None,
            score,
            linked_from: None,
        })
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_employee(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.employee_id = Some(id.into());
        self.employee_name = Some(name.into());
        self
    }

    pub fn linked_from(mut self, key: impl Into<String>) -> Self {
        self.linked_from = Some(key.into());
        self
    }

    /// Duration in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open interval overlap.
    #[inline]
    pub fn overlaps(&self, other: &PlanEntry) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether both entries name the same location.
    pub fn shares_location(&self, other: &PlanEntry) -> bool {
        matches!((&self.location, &other.location), (Some(a), Some(b)) if a == b)
    }

    /// Whether both entries are staffed by the same employee.
    pub fn shares_employee(&self, other: &PlanEntry) -> bool {
        matches!((&self.employee_id, &other.employee_id), (Some(a), Some(b)) if a == b)
    }
}

/// The output of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    /// Sorted by start ascending.
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    /// Creates an empty plan for a period.
    pub fn for_period(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period_start: Some(start),
            period_end: Some(end),
            entries: Vec::new(),
        }
    }

    /// Entries for one demand key.
    pub fn entries_for(&self, demand_key: &str) -> Vec<&PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.demand_key == demand_key)
            .collect()
    }

    /// Entries staffed by one employee, in plan order.
    pub fn entries_for_employee(&self, employee_id: &str) -> Vec<&PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.employee_id.as_deref() == Some(employee_id))
            .collect()
    }

    /// Stable sort by start time.
    pub fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.start);
    }
}

/// How a planning run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Every quota was met.
    Satisfied,
    /// Every target received entries, but demand exceeded available slots.
    Partial,
    /// Some target could not be placed at all, or the pass guard fired.
    Stalled,
}

/// Progress for one demand target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandProgress {
    pub demand_key: String,
    pub required: u32,
    pub scheduled: u32,
    pub shortfall: u32,
}

impl DemandProgress {
    pub fn new(demand_key: impl Into<String>, required: u32, scheduled: u32) -> Self {
        Self {
            demand_key: demand_key.into(),
            required,
            scheduled,
            shortfall: required.saturating_sub(scheduled),
        }
    }

    pub fn is_met(&self) -> bool {
        self.shortfall == 0
    }
}

/// Coverage report returned alongside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub scheduled_count: usize,
    pub per_demand_progress: Vec<DemandProgress>,
    pub status: PlanStatus,
    /// Allocation passes executed.
    pub passes: u32,
}

impl Coverage {
    /// Progress for one demand key.
    pub fn progress_for(&self, demand_key: &str) -> Option<&DemandProgress> {
        self.per_demand_progress
            .iter()
            .find(|p| p.demand_key == demand_key)
    }

    /// Total missing entries across all targets.
    pub fn total_shortfall(&self) -> u32 {
        self.per_demand_progress.iter().map(|p| p.shortfall).sum()
    }
}

/// Classification of plan conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Two overlapping entries at the same location.
    Location,
    /// Two overlapping entries staffed by the same employee.
    Employee,
    /// More overlapping entries than the parallel limit allows.
    ParallelLimit,
}

/// A diagnostic about one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Index of the offending entry in the validated list.
    pub entry_index: usize,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub message: String,
    /// Index of the entry it conflicts with, when pairwise.
    pub related_entry: Option<usize>,
}

impl ConflictReport {
    /// Creates a location conflict between two entries.
    pub fn location(entry_index: usize, related: usize, message: impl Into<String>) -> Self {
        Self {
            entry_index,
            conflict_type: ConflictType::Location,
            message: message.into(),
            related_entry: Some(related),
        }
    }

    /// Creates an employee double-booking conflict.
    pub fn employee(entry_index: usize, related: usize, message: impl Into<String>) -> Self {
        Self {
            entry_index,
            conflict_type: ConflictType::Employee,
            message: message.into(),
            related_entry: Some(related),
        }
    }

    /// Creates a parallel-limit conflict.
    pub fn parallel_limit(entry_index: usize, message: impl Into<String>) -> Self {
        Self {
            entry_index,
            conflict_type: ConflictType::ParallelLimit,
            message: message.into(),
            related_entry: None,
        }
    }

    /// The unordered pair of entries involved, if pairwise.
    pub fn pair(&self) -> Option<(usize, usize)> {
        self.related_entry
            .map(|r| (self.entry_index.min(r), self.entry_index.max(r)))
    }
}
