//! Demand targets and session durations.
//!
//! A demand target is a quota the allocator must fill within a planning
//! period: "three courses", "two exams", "five night shifts for nurses".
//!
//! # Durations
//! Session length is data, not code: [`DemandKind`] is a closed set and
//! [`DurationTable`] maps each kind to minutes. Duty shifts carry a
//! [`ShiftTemplate`] whose own start/end wins over the table.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Kind of session being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DemandKind {
    /// Regular course session.
    #[default]
    Course,
    /// Intensive course session.
    Intense,
    /// Event (long-form session).
    Event,
    /// Exam, typically linked to a course.
    Exam,
    /// Duty roster shift.
    Shift,
}

impl DemandKind {
    /// Infers the kind from a demand key. Unknown keys are courses.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "intense" | "intensive" => DemandKind::Intense,
            "event" => DemandKind::Event,
            "exam" => DemandKind::Exam,
            "shift" => DemandKind::Shift,
            _ => DemandKind::Course,
        }
    }
}

/// Session length per [`DemandKind`] in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationTable {
    pub course: u32,
    pub intense: u32,
    pub event: u32,
    pub exam: u32,
    pub shift: u32,
}

impl Default for DurationTable {
    fn default() -> Self {
        Self {
            course: 90,
            intense: 120,
            event: 180,
            exam: 90,
            shift: 480,
        }
    }
}

impl DurationTable {
    /// Minutes for a kind; never zero.
    pub fn minutes(&self, kind: DemandKind) -> u32 {
        let m = match kind {
            DemandKind::Course => self.course,
            DemandKind::Intense => self.intense,
            DemandKind::Event => self.event,
            DemandKind::Exam => self.exam,
            DemandKind::Shift => self.shift,
        };
        m.max(1)
    }
}

/// Fixed start/end of a duty shift.
///
/// An end at or before the start wraps past midnight into the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftTemplate {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Shift length in minutes, wrapping past midnight.
    pub fn duration_minutes(&self) -> i64 {
        let raw = (self.end - self.start).num_minutes();
        if raw > 0 {
            raw
        } else {
            raw + Duration::days(1).num_minutes()
        }
    }

    /// Whether the shift ends on the following day.
    pub fn wraps_midnight(&self) -> bool {
        self.end <= self.start
    }
}

/// A quota to fill: `required_count` sessions of `demand_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandTarget {
    /// Course type or role/shift key. Matches `HistoryEntry::demand_key`.
    pub demand_key: String,
    /// Number of sessions to schedule.
    pub required_count: u32,
    /// Display title for plan entries. Empty = the demand key.
    #[serde(default)]
    pub title: String,
    /// Session kind. Inferred from the key when omitted.
    #[serde(default)]
    pub kind: Option<DemandKind>,
    /// Employee role that staffs this demand. `None` = the demand key.
    #[serde(default)]
    pub role: Option<String>,
    /// Fixed shift hours (duty rostering).
    #[serde(default)]
    pub shift: Option<ShiftTemplate>,
    /// Location override; otherwise taken from the chosen slot's history.
    #[serde(default)]
    pub location: Option<String>,
}

impl DemandTarget {
    /// Creates a target with no staffing or shift details.
    pub fn new(demand_key: impl Into<String>, required_count: u32) -> Self {
        Self {
            demand_key: demand_key.into(),
            required_count,
            title: String::new(),
            kind: None,
            role: None,
            shift: None,
            location: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_kind(mut self, kind: DemandKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets a shift template; the kind becomes [`DemandKind::Shift`].
    pub fn with_shift(mut self, shift: ShiftTemplate) -> Self {
        self.shift = Some(shift);
        self.kind = Some(DemandKind::Shift);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Effective kind.
    pub fn kind(&self) -> DemandKind {
        self.kind
            .unwrap_or_else(|| DemandKind::from_key(&self.demand_key))
    }

    /// Effective title.
    pub fn title(&self) -> &str {
        if self.title.is_empty() {
            &self.demand_key
        } else {
            &self.title
        }
    }

    /// Role an employee must hold to staff this demand.
    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or(&self.demand_key)
    }

    /// Session length in minutes.
    pub fn duration_minutes(&self, table: &DurationTable) -> i64 {
        match &self.shift {
            Some(shift) => shift.duration_minutes(),
            None => i64::from(table.minutes(self.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_kind_from_key() {
        assert_eq!(DemandKind::from_key("event"), DemandKind::Event);
        assert_eq!(DemandKind::from_key("Intense"), DemandKind::Intense);
        assert_eq!(DemandKind::from_key("yoga-basics"), DemandKind::Course);
    }

    #[test]
    fn test_duration_table_defaults() {
        let table = DurationTable::default();
        assert_eq!(table.minutes(DemandKind::Event), 180);
        assert_eq!(table.minutes(DemandKind::Intense), 120);
        assert_eq!(table.minutes(DemandKind::Course), 90);
    }

    #[test]
    fn test_duration_table_never_zero() {
        let table = DurationTable {
            course: 0,
            ..DurationTable::default()
        };
        assert_eq!(table.minutes(DemandKind::Course), 1);
    }

    #[test]
    fn test_shift_wraps_midnight() {
        let night = ShiftTemplate::new(t(22, 0), t(6, 0));
        assert!(night.wraps_midnight());
        assert_eq!(night.duration_minutes(), 8 * 60);

        let day = ShiftTemplate::new(t(6, 0), t(14, 0));
        assert!(!day.wraps_midnight());
        assert_eq!(day.duration_minutes(), 8 * 60);
    }

    #[test]
    fn test_target_effective_fields() {
        let table = DurationTable::default();
        let target = DemandTarget::new("event", 2);
        assert_eq!(target.kind(), DemandKind::Event);
        assert_eq!(target.title(), "event");
        assert_eq!(target.role(), "event");
        assert_eq!(target.duration_minutes(&table), 180);

        let shift = DemandTarget::new("night", 1)
            .with_title("Night duty")
            .with_role("nurse")
            .with_shift(ShiftTemplate::new(t(22, 0), t(6, 0)));
        assert_eq!(shift.kind(), DemandKind::Shift);
        assert_eq!(shift.title(), "Night duty");
        assert_eq!(shift.role(), "nurse");
        assert_eq!(shift.duration_minutes(&table), 480);
    }

    #[test]
    fn test_target_deserializes_with_defaults() {
        let target: DemandTarget =
            serde_json::from_str(r#"{"demand_key":"intense","required_count":3}"#).unwrap();
        assert_eq!(target.required_count, 3);
        assert_eq!(target.kind(), DemandKind::Intense);
        assert!(target.shift.is_none());
    }
}
