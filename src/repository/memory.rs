//! In-memory repository implementations.
//!
//! Backed by `parking_lot::RwLock`; cheap to clone behind an `Arc` and safe
//! to share across threads. Suitable for tests and single-process use.

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use std::collections::VecDeque;

use super::{
    AbsenceRepository, BookingRepository, ConstraintsRepository, EmployeeRepository,
    HistoryRepository, PlanRepository, RepositoryError, RepositoryResult, Versioned,
};
use crate::models::{Absence, Booking, Constraints, EmployeeAvailability, HistoryEntry, Plan};

/// Default number of history entries retained.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// Bounded history log; the oldest entries are dropped past the cap.
#[derive(Debug)]
pub struct InMemoryHistory {
    entries: RwLock<VecDeque<HistoryEntry>>,
    cap: usize,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl InMemoryHistory {
    /// Creates an empty log. A cap of 0 is treated as 1.
    pub fn new(cap: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            cap: cap.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl HistoryRepository for InMemoryHistory {
    fn append(&self, entry: HistoryEntry) -> RepositoryResult<()> {
        let mut entries = self.entries.write();
        entries.push_back(entry);
        while entries.len() > self.cap {
            entries.pop_front();
        }
        Ok(())
    }

    fn all(&self) -> RepositoryResult<Vec<HistoryEntry>> {
        Ok(self.entries.read().iter().cloned().collect())
    }
}

/// A version-checked cell shared by the constraint and plan stores.
#[derive(Debug)]
struct VersionedCell<T> {
    entity: &'static str,
    state: RwLock<Versioned<T>>,
}

impl<T: Clone> VersionedCell<T> {
    fn new(entity: &'static str, value: T) -> Self {
        Self {
            entity,
            state: RwLock::new(Versioned::new(0, value)),
        }
    }

    fn load(&self) -> Versioned<T> {
        self.state.read().clone()
    }

    fn save(&self, value: T, expected_version: u64) -> RepositoryResult<Versioned<T>> {
        let mut state = self.state.write();
        if state.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                entity: self.entity,
                expected: expected_version,
                actual: state.version,
            });
        }
        *state = Versioned::new(state.version + 1, value);
        Ok(state.clone())
    }
}

/// Constraint store; starts at version 0 with default constraints.
#[derive(Debug)]
pub struct InMemoryConstraints {
    cell: VersionedCell<Constraints>,
}

impl Default for InMemoryConstraints {
    fn default() -> Self {
        Self::new(Constraints::default())
    }
}

impl InMemoryConstraints {
    pub fn new(initial: Constraints) -> Self {
        Self {
            cell: VersionedCell::new("constraints", initial),
        }
    }
}

impl ConstraintsRepository for InMemoryConstraints {
    fn load(&self) -> RepositoryResult<Versioned<Constraints>> {
        Ok(self.cell.load())
    }

    fn save(
        &self,
        constraints: Constraints,
        expected_version: u64,
    ) -> RepositoryResult<Versioned<Constraints>> {
        self.cell.save(constraints, expected_version)
    }
}

/// Plan store; starts at version 0 with an empty plan.
#[derive(Debug)]
pub struct InMemoryPlans {
    cell: VersionedCell<Plan>,
}

impl Default for InMemoryPlans {
    fn default() -> Self {
        Self {
            cell: VersionedCell::new("plan", Plan::default()),
        }
    }
}

impl PlanRepository for InMemoryPlans {
    fn load(&self) -> RepositoryResult<Versioned<Plan>> {
        Ok(self.cell.load())
    }

    fn save(&self, plan: Plan, expected_version: u64) -> RepositoryResult<Versioned<Plan>> {
        self.cell.save(plan, expected_version)
    }
}

/// Employee, absence and booking snapshots in one place.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    employees: RwLock<Vec<EmployeeAvailability>>,
    absences: RwLock<Vec<Absence>>,
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the employee list.
    pub fn set_employees(&self, employees: Vec<EmployeeAvailability>) {
        *self.employees.write() = employees;
    }

    pub fn add_absence(&self, absence: Absence) {
        self.absences.write().push(absence);
    }

    pub fn add_booking(&self, booking: Booking) {
        self.bookings.write().push(booking);
    }
}

impl EmployeeRepository for InMemoryDirectory {
    fn employees(&self) -> RepositoryResult<Vec<EmployeeAvailability>> {
        Ok(self.employees.read().clone())
    }
}

impl AbsenceRepository for InMemoryDirectory {
    fn absences(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<Absence>> {
        Ok(self
            .absences
            .read()
            .iter()
            .filter(|a| a.from <= to && a.to >= from)
            .cloned()
            .collect())
    }
}

impl BookingRepository for InMemoryDirectory {
    fn bookings(&self, from: NaiveDateTime, to: NaiveDateTime) -> RepositoryResult<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .iter()
            .filter(|b| b.start < to && b.end > from)
            .cloned()
            .collect())
    }
}
