//! Employee availability snapshots.
//!
//! The employee directory, absence calendar and booking ledger are
//! external systems. The allocator receives read-only snapshots of them
//! for the duration of one planning run.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Weekday;

/// An employee who can staff sessions or shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeAvailability {
    /// Unique employee identifier.
    pub employee_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Roles this employee can staff (demand keys or role names).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Contracted hours per ISO week.
    pub weekly_capacity_hours: u32,
    /// Slots the employee prefers; tried before other employees.
    #[serde(default)]
    pub preferred_slots: Vec<PreferredSlot>,
    /// Weekdays the employee never works.
    #[serde(default)]
    pub unavailable_weekdays: Vec<Weekday>,
}

/// A weekday, optionally narrowed to a start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredSlot {
    pub weekday: Weekday,
    #[serde(default)]
    pub time: Option<NaiveTime>,
}

impl PreferredSlot {
    /// Whether a session on `weekday` at `time` matches this preference.
    pub fn matches(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.weekday == weekday && self.time.map_or(true, |t| t == time)
    }
}

impl EmployeeAvailability {
    /// Creates an employee with the given weekly capacity and no roles.
    pub fn new(employee_id: impl Into<String>, weekly_capacity_hours: u32) -> Self {
        Self {
            employee_id: employee_id.into(),
            name: String::new(),
            roles: Vec::new(),
            weekly_capacity_hours,
            preferred_slots: Vec::new(),
            unavailable_weekdays: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_preferred(mut self, weekday: Weekday, time: Option<NaiveTime>) -> Self {
        self.preferred_slots.push(PreferredSlot { weekday, time });
        self
    }

    pub fn unavailable_on(mut self, weekday: Weekday) -> Self {
        if !self.unavailable_weekdays.contains(&weekday) {
            self.unavailable_weekdays.push(weekday);
        }
        self
    }

    /// Whether this employee can staff `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether this employee works on `weekday` at all.
    pub fn works_on(&self, weekday: Weekday) -> bool {
        !self.unavailable_weekdays.contains(&weekday)
    }

    /// Whether `weekday`/`time` is one of the employee's preferred slots.
    pub fn prefers(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.preferred_slots.iter().any(|p| p.matches(weekday, time))
    }
}

/// A leave period from the absence directory (inclusive dates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub employee_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Only approved absences block assignment.
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

impl Absence {
    /// An approved absence.
    pub fn new(employee_id: impl Into<String>, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            from,
            to,
            approved: true,
        }
    }

    /// Whether this absence blocks `employee_id` for `[start, end)`.
    ///
    /// Every date the interval touches counts, so an overnight shift is
    /// blocked by an absence starting the next morning. An interval ending
    /// exactly at midnight does not touch the following date.
    pub fn blocks(&self, employee_id: &str, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if !self.approved || self.employee_id != employee_id {
            return false;
        }
        let last = if end > start {
            (end - Duration::nanoseconds(1)).date()
        } else {
            start.date()
        };
        self.from <= last && start.date() <= self.to
    }
}

/// An existing commitment from the booking ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub employee_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Booking {
    pub fn new(employee_id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            employee_id: employee_id.into(),
            start,
            end,
        }
    }
}
