//! Input validation and plan conflict detection.
//!
//! Two concerns live here:
//!
//! - **Request validation** ([`validate_request`]) checks a planning request
//!   before any state is touched. Errors are collected, not short-circuited:
//!   - Blank or duplicate demand keys
//!   - Zero-length shift templates
//!   - Inverted planning periods
//!   - Blank or duplicate employee ids
//! - **Conflict validation** ([`validate_entry`], [`validate_plan`]) is a
//!   read-only diagnostic pass over plan entries. It reports location
//!   double-booking, employee double-booking, and parallel-limit violations.
//!   It never mutates or rejects a plan.
//!
//! # Algorithm
//! Two entries overlap when `e.start < o.end && e.end > o.start`.
//!
//! Pair conflicts: each overlap that shares a location yields a `location`
//! conflict and each that shares an employee yields an `employee` conflict.
//! [`validate_plan`] checks entry `i` against `entries[..i]`, so each
//! conflicting pair is reported exactly once, keyed by the later index.
//!
//! Parallel limit: for every entry, the peak number of sessions running at
//! once inside its interval is counted against all other entries. When the
//! peak exceeds the limit, the entry gets one `parallel_limit` conflict.
//! The set of flagged entries does not depend on input order.
//!
//! Complexity is O(n³) worst case in the number of entries, O(n²) when
//! overlaps are sparse.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::models::{ConflictReport, DemandTarget, EmployeeAvailability, PlanEntry};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same identifier.
    DuplicateId,
    /// A required identifier (demand key, employee id) is missing.
    MissingIdentifier,
    /// A time window ends at or before its start.
    InvalidTimeWindow,
    /// A shift template has zero length.
    InvalidShift,
    /// The planning period ends before it starts.
    InvalidPeriod,
    /// A weekday list names no recognizable weekday.
    UnknownWeekday,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a planning request.
///
/// Checks:
/// 1. `period_start <= period_end`
/// 2. Every target has a non-blank demand key
/// 3. No two targets share a demand key
/// 4. Shift templates have a start different from their end
/// 5. Every employee has a non-blank id, and ids are unique
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_request(
    targets: &[DemandTarget],
    employees: &[EmployeeAvailability],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> ValidationResult {
    let mut errors = Vec::new();

    if period_end < period_start {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidPeriod,
            format!("Planning period ends before it starts ({period_start} - {period_end})"),
        ));
    }

    let mut keys = HashSet::new();
    for (i, target) in targets.iter().enumerate() {
        let key = target.demand_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingIdentifier,
                format!("Demand target #{i} has no demand key"),
            ));
            continue;
        }
        if !keys.insert(key) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate demand key: {key}"),
            ));
        }
        if let Some(shift) = &target.shift {
            if shift.start == shift.end {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidShift,
                    format!("Shift template for '{key}' starts and ends at {}", shift.start),
                ));
            }
        }
    }

    let mut employee_ids = HashSet::new();
    for (i, employee) in employees.iter().enumerate() {
        let id = employee.employee_id.trim();
        if id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingIdentifier,
                format!("Employee #{i} has no id"),
            ));
        } else if !employee_ids.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate employee ID: {id}"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a candidate entry against an existing plan.
///
/// The candidate is reported at index `existing.len()`, i.e. the position it
/// would take if appended.
pub fn validate_entry(
    candidate: &PlanEntry,
    existing: &[PlanEntry],
    max_parallel: usize,
) -> Vec<ConflictReport> {
    let index = existing.len();
    let mut reports = pair_conflicts(index, candidate, existing);
    reports.extend(parallel_conflict(index, candidate, existing, max_parallel));
    reports
}

/// Checks every entry of a plan.
///
/// Reports are ordered by entry index, then by related index.
pub fn validate_plan(entries: &[PlanEntry], max_parallel: usize) -> Vec<ConflictReport> {
    entries
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| {
            let mut reports = pair_conflicts(i, entry, &entries[..i]);
            let others = entries
                .iter()
                .enumerate()
                .filter(move |&(j, _)| j != i)
                .map(|(_, other)| other);
            reports.extend(parallel_conflict(i, entry, others, max_parallel));
            reports
        })
        .collect()
}

/// Groups conflict reports by the entry they concern.
pub fn group_by_entry(reports: &[ConflictReport]) -> BTreeMap<usize, Vec<ConflictReport>> {
    let mut grouped: BTreeMap<usize, Vec<ConflictReport>> = BTreeMap::new();
    for report in reports {
        grouped
            .entry(report.entry_index)
            .or_default()
            .push(report.clone());
        if let Some(related) = report.related_entry {
            grouped.entry(related).or_default().push(report.clone());
        }
    }
    grouped
}

fn pair_conflicts(index: usize, entry: &PlanEntry, earlier: &[PlanEntry]) -> Vec<ConflictReport> {
    let mut reports = Vec::new();

    for (j, other) in earlier.iter().enumerate() {
        if !entry.overlaps(other) {
            continue;
        }
        if entry.shares_location(other) {
            reports.push(ConflictReport::location(
                index,
                j,
                format!(
                    "Location '{}' is double-booked by entry {j} ({} - {})",
                    entry.location.as_deref().unwrap_or_default(),
                    other.start.time(),
                    other.end.time()
                ),
            ));
        }
        if entry.shares_employee(other) {
            reports.push(ConflictReport::employee(
                index,
                j,
                format!(
                    "Employee '{}' is double-booked by entry {j}",
                    entry.employee_id.as_deref().unwrap_or_default()
                ),
            ));
        }
    }

    reports
}

fn parallel_conflict<'e>(
    index: usize,
    entry: &PlanEntry,
    others: impl IntoIterator<Item = &'e PlanEntry>,
    max_parallel: usize,
) -> Option<ConflictReport> {
    let allowed = max_parallel.max(1);
    let peak = peak_concurrency(entry, others);
    (peak > allowed).then(|| {
        ConflictReport::parallel_limit(
            index,
            format!(
                "{peak} parallel sessions on {} exceed the limit of {allowed}",
                entry.date
            ),
        )
    })
}

/// Most sessions running at once, `entry` included, at any instant of its
/// interval.
fn peak_concurrency<'e>(entry: &PlanEntry, others: impl IntoIterator<Item = &'e PlanEntry>) -> usize {
    let overlapping: Vec<&PlanEntry> = others.into_iter().filter(|o| entry.overlaps(o)).collect();

    // Concurrency only rises where a session starts.
    std::iter::once(entry.start)
        .chain(
            overlapping
                .iter()
                .map(|o| o.start)
                .filter(|&start| start > entry.start),
        )
        .map(|instant| {
            1 + overlapping
                .iter()
                .filter(|o| o.start <= instant && instant < o.end)
                .count()
        })
        .max()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictType, ShiftTemplate};
    use chrono::{Duration, NaiveDateTime, NaiveTime};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn entry(key: &str, start: NaiveDateTime, minutes: i64) -> PlanEntry {
        PlanEntry::new(key, key, start, start + Duration::minutes(minutes), 0.5).unwrap()
    }

    fn of_kind(reports: &[ConflictReport], kind: ConflictType) -> usize {
        reports.iter().filter(|r| r.conflict_type == kind).count()
    }

    #[test]
    fn test_valid_request() {
        let targets = vec![DemandTarget::new("course", 2), DemandTarget::new("exam", 1)];
        let employees = vec![EmployeeAvailability::new("E1", 40)];
        assert!(validate_request(&targets, &employees, day(12), day(18)).is_ok());
    }

    #[test]
    fn test_duplicate_demand_key() {
        let targets = vec![DemandTarget::new("course", 2), DemandTarget::new("course", 1)];
        let errors = validate_request(&targets, &[], day(12), day(18)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_missing_identifiers() {
        let targets = vec![DemandTarget::new("  ", 1)];
        let employees = vec![EmployeeAvailability::new("", 40)];
        let errors = validate_request(&targets, &employees, day(12), day(18)).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::MissingIdentifier)
                .count(),
            2
        );
    }

    #[test]
    fn test_zero_length_shift() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let targets = vec![DemandTarget::new("nurse", 1).with_shift(ShiftTemplate::new(nine, nine))];
        let errors = validate_request(&targets, &[], day(12), day(18)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidShift));
    }

    #[test]
    fn test_multiple_errors() {
        let targets = vec![DemandTarget::new("", 1), DemandTarget::new("a", 1)];
        let employees = vec![
            EmployeeAvailability::new("E1", 40),
            EmployeeAvailability::new("E1", 20),
        ];
        let errors = validate_request(&targets, &employees, day(18), day(12)).unwrap_err();
        assert!(errors.len() >= 3);
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidPeriod));
    }

    #[test]
    fn test_location_conflict_only_once() {
        // Same location, overlapping, different employees.
        let entries = vec![
            entry("a", at(12, 9, 0), 90)
                .with_location(Some("Hall".into()))
                .with_employee("E1", "Ada"),
            entry("b", at(12, 10, 0), 90)
                .with_location(Some("Hall".into()))
                .with_employee("E2", "Bo"),
        ];
        let reports = validate_plan(&entries, 2);
        assert_eq!(of_kind(&reports, ConflictType::Location), 1);
        assert_eq!(of_kind(&reports, ConflictType::Employee), 0);
        assert_eq!(of_kind(&reports, ConflictType::ParallelLimit), 0);
        assert_eq!(reports[0].entry_index, 1);
        assert_eq!(reports[0].related_entry, Some(0));
    }

    #[test]
    fn test_employee_conflict() {
        let entries = vec![
            entry("a", at(12, 9, 0), 90).with_employee("E1", "Ada"),
            entry("b", at(12, 9, 30), 60).with_employee("E1", "Ada"),
        ];
        let reports = validate_plan(&entries, 5);
        assert_eq!(of_kind(&reports, ConflictType::Employee), 1);
        assert_eq!(of_kind(&reports, ConflictType::Location), 0);
    }

    #[test]
    fn test_parallel_limit_exceeded_not_reached() {
        let entries = vec![
            entry("a", at(12, 9, 0), 90),
            entry("b", at(12, 9, 0), 90),
            entry("c", at(12, 9, 0), 90),
        ];
        // Two parallel at limit two is fine; three flag every participant.
        let reports = validate_plan(&entries, 2);
        assert_eq!(of_kind(&reports, ConflictType::ParallelLimit), 3);
        assert!(reports.iter().all(|r| r.message.contains("3 parallel")));

        assert!(validate_plan(&entries[..2], 2).is_empty());
    }

    #[test]
    fn test_touching_entries_do_not_conflict() {
        let entries = vec![
            entry("a", at(12, 9, 0), 60).with_location(Some("Hall".into())),
            entry("b", at(12, 10, 0), 60).with_location(Some("Hall".into())),
        ];
        assert!(validate_plan(&entries, 1).is_empty());
    }

    #[test]
    fn test_validate_entry_against_plan() {
        let existing = vec![
            entry("a", at(12, 9, 0), 90).with_location(Some("Hall".into())),
            entry("b", at(13, 9, 0), 90).with_location(Some("Hall".into())),
        ];
        let candidate = entry("c", at(12, 9, 30), 60).with_location(Some("Hall".into()));
        let reports = validate_entry(&candidate, &existing, 1);
        assert_eq!(of_kind(&reports, ConflictType::Location), 1);
        assert_eq!(of_kind(&reports, ConflictType::ParallelLimit), 1);
        assert!(reports.iter().all(|r| r.entry_index == 2));
    }

    #[test]
    fn test_group_by_entry() {
        let entries = vec![
            entry("a", at(12, 9, 0), 90).with_location(Some("Hall".into())),
            entry("b", at(12, 9, 0), 90).with_location(Some("Hall".into())),
        ];
        let reports = validate_plan(&entries, 1);
        let grouped = group_by_entry(&reports);
        assert_eq!(grouped.len(), 2);
        // location (from either side) + own parallel_limit
        assert_eq!(grouped[&0].len(), 2);
        assert_eq!(grouped[&1].len(), 2);
    }

    #[test]
    fn test_conflict_pairs_are_order_independent() {
        let mut rng = StdRng::seed_from_u64(7);
        let locations = ["Hall", "Lab", "Studio"];

        for _ in 0..50 {
            let n = rng.random_range(2..8);
            let entries: Vec<PlanEntry> = (0..n)
                .map(|i| {
                    let start = at(12, rng.random_range(8..12), 0);
                    let loc = locations[rng.random_range(0..locations.len())];
                    entry(&format!("k{i}"), start, rng.random_range(30..150))
                        .with_location(Some(loc.into()))
                })
                .collect();

            let pairs = |list: &[PlanEntry]| {
                let mut out: Vec<(String, String)> = validate_plan(list, 10)
                    .iter()
                    .filter(|r| r.conflict_type == ConflictType::Location)
                    .filter_map(|r| {
                        let a = &list[r.entry_index].demand_key;
                        let b = &list[r.related_entry?].demand_key;
                        Some(if a < b {
                            (a.clone(), b.clone())
                        } else {
                            (b.clone(), a.clone())
                        })
                    })
                    .collect();
                out.sort();
                out
            };

            let mut shuffled = entries.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(pairs(&entries), pairs(&shuffled));
        }
    }

    #[test]
    fn test_parallel_limit_counts_peak_not_pairs() {
        // A spans B and C, but B and C never run together.
        let entries = vec![
            entry("a", at(12, 9, 0), 180),
            entry("b", at(12, 9, 0), 60),
            entry("c", at(12, 11, 0), 60),
        ];
        for order in [[0, 1, 2], [1, 2, 0], [2, 0, 1]] {
            let list: Vec<PlanEntry> = order.iter().map(|&i| entries[i].clone()).collect();
            assert_eq!(of_kind(&validate_plan(&list, 2), ConflictType::ParallelLimit), 0);
        }

        let crowded = vec![
            entry("a", at(12, 9, 0), 180),
            entry("b", at(12, 9, 0), 60),
            entry("c", at(12, 9, 30), 60),
        ];
        let reports = validate_plan(&crowded, 2);
        assert_eq!(of_kind(&reports, ConflictType::ParallelLimit), 3);
    }

    #[test]
    fn test_parallel_limit_is_order_independent() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let n = rng.random_range(2..9);
            let entries: Vec<PlanEntry> = (0..n)
                .map(|i| {
                    let start = at(12, rng.random_range(8..12), 30 * rng.random_range(0..2));
                    entry(&format!("k{i}"), start, rng.random_range(30..180))
                })
                .collect();
            let limit = rng.random_range(1..4);

            let flagged = |list: &[PlanEntry]| {
                let mut keys: Vec<String> = validate_plan(list, limit)
                    .iter()
                    .filter(|r| r.conflict_type == ConflictType::ParallelLimit)
                    .map(|r| list[r.entry_index].demand_key.clone())
                    .collect();
                keys.sort();
                keys
            };

            let mut shuffled = entries.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(flagged(&entries), flagged(&shuffled));
        }
    }
}
