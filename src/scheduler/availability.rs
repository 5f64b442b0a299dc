//! Employee availability resolution.
//!
//! # Algorithm
//!
//! Employees are tried in a stable order: those who list the slot among
//! their preferred slots first, then the rest, snapshot order otherwise.
//! The first employee passing every check wins (first match, not
//! load-balanced):
//!
//! 1. Holds the role.
//! 2. Works on the weekday.
//! 3. Has no approved absence on any date the session touches.
//! 4. Has no overlapping booking or run commitment (half-open overlap).
//! 5. Stays within `weekly_capacity_hours` for the ISO week, and within
//!    `max_hours_per_week` unless overtime is allowed.
//! 6. Keeps `min_rest_hours` to every other commitment on either side,
//!    unless overtime is allowed.
//!
//! Commitments made during a run are tracked here and discarded with the
//! resolver; each run starts from the booking snapshot.

use chrono::{Datelike, Duration, NaiveDateTime};
use std::collections::HashMap;
use tracing::trace;

use crate::models::{Absence, Booking, ConstraintSet, EmployeeAvailability, Weekday};

type Interval = (NaiveDateTime, NaiveDateTime);

/// Finds employees for candidate slots.
#[derive(Debug)]
pub struct AvailabilityResolver<'a> {
    employees: &'a [EmployeeAvailability],
    absences: &'a [Absence],
    constraints: &'a ConstraintSet,
    /// Booked or committed intervals per employee.
    commitments: HashMap<&'a str, Vec<Interval>>,
}

impl<'a> AvailabilityResolver<'a> {
    /// Seeds commitments from the booking ledger snapshot.
    pub fn new(
        employees: &'a [EmployeeAvailability],
        absences: &'a [Absence],
        bookings: &'a [Booking],
        constraints: &'a ConstraintSet,
    ) -> Self {
        let mut commitments: HashMap<&'a str, Vec<Interval>> = HashMap::new();
        for booking in bookings {
            if booking.end > booking.start {
                commitments
                    .entry(booking.employee_id.as_str())
                    .or_default()
                    .push((booking.start, booking.end));
            }
        }
        Self {
            employees,
            absences,
            constraints,
            commitments,
        }
    }

    /// The first employee able to staff `role` for `duration_minutes` from
    /// `start`, or `None`.
    pub fn resolve(
        &self,
        role: &str,
        start: NaiveDateTime,
        duration_minutes: i64,
    ) -> Option<&'a EmployeeAvailability> {
        let end = start + Duration::minutes(duration_minutes);
        let weekday = Weekday::of(start.date());
        let time = start.time();

        let preferred = self.employees.iter().filter(|e| e.prefers(weekday, time));
        let others = self.employees.iter().filter(|e| !e.prefers(weekday, time));

        preferred
            .chain(others)
            .find(|employee| self.qualifies(employee, role, start, end))
    }

    /// Records a commitment made during this run.
    pub fn commit(&mut self, employee: &'a EmployeeAvailability, start: NaiveDateTime, end: NaiveDateTime) {
        self.commitments
            .entry(employee.employee_id.as_str())
            .or_default()
            .push((start, end));
    }

    fn qualifies(
        &self,
        employee: &EmployeeAvailability,
        role: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> bool {
        let id = employee.employee_id.as_str();
        let date = start.date();

        if !employee.has_role(role) || !employee.works_on(Weekday::of(date)) {
            return false;
        }
        if self.absences.iter().any(|a| a.blocks(id, start, end)) {
            trace!(employee = id, %date, "absent");
            return false;
        }

        let committed = self.commitments.get(id).map(Vec::as_slice).unwrap_or_default();
        if committed.iter().any(|&(s, e)| start < e && end > s) {
            return false;
        }

        let week = start.iso_week();
        let used: i64 = committed
            .iter()
            .filter(|(s, _)| s.iso_week() == week)
            .map(|(s, e)| (*e - *s).num_minutes())
            .sum();
        let total = used + (end - start).num_minutes();
        if total > i64::from(employee.weekly_capacity_hours) * 60 {
            trace!(employee = id, total, "weekly capacity exhausted");
            return false;
        }

        if self.constraints.allow_overtime() {
            return true;
        }
        if total > i64::from(self.constraints.max_hours_per_week()) * 60 {
            return false;
        }

        let rest = Duration::hours(i64::from(self.constraints.min_rest_hours()));
        committed.iter().all(|&(s, e)| {
            let gap = if e <= start { start - e } else { s - end };
            gap >= rest
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constraints, ConstraintsUpdate};
    use chrono::{NaiveDate, NaiveTime};

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn set(update: ConstraintsUpdate) -> ConstraintSet {
        ConstraintSet::new(Constraints::default().apply(&update).unwrap()).unwrap()
    }

    fn nurse(id: &str, hours: u32) -> EmployeeAvailability {
        EmployeeAvailability::new(id, hours)
            .with_name(id)
            .with_role("nurse")
    }

    #[test]
    fn test_role_and_weekday() {
        let c = set(ConstraintsUpdate::default());
        let employees = vec![
            EmployeeAvailability::new("D1", 40).with_role("doctor"),
            nurse("N1", 40).unavailable_on(Weekday::Monday),
            nurse("N2", 40),
        ];
        let r = AvailabilityResolver::new(&employees, &[], &[], &c);
        // 2026-10-12 is a Monday.
        assert_eq!(r.resolve("nurse", at(12, 9), 480).unwrap().employee_id, "N2");
        assert_eq!(r.resolve("nurse", at(13, 9), 480).unwrap().employee_id, "N1");
        assert!(r.resolve("porter", at(13, 9), 480).is_none());
    }

    #[test]
    fn test_preferred_employee_first() {
        let c = set(ConstraintsUpdate::default());
        let employees = vec![
            nurse("N1", 40),
            nurse("N2", 40).with_preferred(Weekday::Monday, Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap())),
        ];
        let r = AvailabilityResolver::new(&employees, &[], &[], &c);
        assert_eq!(r.resolve("nurse", at(12, 9), 60).unwrap().employee_id, "N2");
        assert_eq!(r.resolve("nurse", at(12, 10), 60).unwrap().employee_id, "N1");
    }

    #[test]
    fn test_approved_absence_blocks() {
        let c = set(ConstraintsUpdate::default());
        let employees = vec![nurse("N1", 40)];
        let d = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let absences = vec![Absence::new("N1", d, d)];
        let r = AvailabilityResolver::new(&employees, &absences, &[], &c);
        assert!(r.resolve("nurse", at(12, 9), 60).is_none());
        assert!(r.resolve("nurse", at(13, 9), 60).is_some());
        // A night shift from the 11th runs into the absent day.
        assert!(r.resolve("nurse", at(11, 22), 480).is_none());
    }

    #[test]
    fn test_booking_overlap_and_rest() {
        let c = set(ConstraintsUpdate {
            min_rest_hours: Some(11),
            ..ConstraintsUpdate::default()
        });
        let employees = vec![nurse("N1", 40)];
        let bookings = vec![Booking::new("N1", at(12, 6), at(12, 14))];
        let r = AvailabilityResolver::new(&employees, &[], &bookings, &c);

        assert!(r.resolve("nurse", at(12, 10), 60).is_none()); // overlap
        assert!(r.resolve("nurse", at(12, 22), 480).is_none()); // 8h rest
        assert!(r.resolve("nurse", at(13, 1), 480).is_some()); // 11h rest
    }

    #[test]
    fn test_overtime_lifts_rest_and_global_cap() {
        let c = set(ConstraintsUpdate {
            allow_overtime: Some(true),
            ..ConstraintsUpdate::default()
        });
        let employees = vec![nurse("N1", 60)];
        let bookings = vec![Booking::new("N1", at(12, 6), at(12, 14))];
        let r = AvailabilityResolver::new(&employees, &[], &bookings, &c);
        assert!(r.resolve("nurse", at(12, 14), 480).is_some());
    }

    #[test]
    fn test_weekly_capacity_counts_run_commitments() {
        let c = set(ConstraintsUpdate::default());
        let employees = vec![nurse("N1", 16)];
        let mut r = AvailabilityResolver::new(&employees, &[], &[], &c);

        for day in [12, 13] {
            let start = at(day, 6);
            let e = r.resolve("nurse", start, 480).unwrap();
            r.commit(e, start, start + Duration::hours(8));
        }
        assert!(r.resolve("nurse", at(14, 6), 480).is_none());
        // Next ISO week starts fresh.
        assert!(r.resolve("nurse", at(19, 6), 480).is_some());
    }

    #[test]
    fn test_global_weekly_cap() {
        let c = set(ConstraintsUpdate {
            max_hours_per_week: Some(8),
            ..ConstraintsUpdate::default()
        });
        let employees = vec![nurse("N1", 40)];
        let mut r = AvailabilityResolver::new(&employees, &[], &[], &c);
        let start = at(12, 6);
        let e = r.resolve("nurse", start, 480).unwrap();
        r.commit(e, start, start + Duration::hours(8));
        assert!(r.resolve("nurse", at(13, 6), 60).is_none());
    }
}
