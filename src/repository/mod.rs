//! Repository interfaces for planner state and external snapshots.
//!
//! The planner never talks to a storage backend directly. Each concern has a
//! focused trait so implementations can be swapped or faked in tests:
//!
//! - [`HistoryRepository`]: bounded append-only log of past sessions
//! - [`ConstraintsRepository`]: versioned constraint configuration
//! - [`PlanRepository`]: versioned current plan
//! - [`EmployeeRepository`], [`AbsenceRepository`], [`BookingRepository`]:
//!   read-only snapshots of the external directories
//!
//! # Optimistic Concurrency
//!
//! Constraint and plan saves carry the version the caller last read. A save
//! against any other version fails with [`RepositoryError::VersionConflict`]
//! and leaves the stored value untouched. A successful save bumps the version
//! by one. The initial version is 0.
//!
//! In-memory implementations live in [`memory`].

mod error;
pub mod memory;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::{InMemoryConstraints, InMemoryDirectory, InMemoryHistory, InMemoryPlans};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Absence, Booking, Constraints, EmployeeAvailability, HistoryEntry, Plan};

/// A stored value with its version token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }
}

/// Past session log.
pub trait HistoryRepository: Send + Sync {
    /// Appends an entry, dropping the oldest entries past the cap.
    fn append(&self, entry: HistoryEntry) -> RepositoryResult<()>;

    /// All entries, oldest first.
    fn all(&self) -> RepositoryResult<Vec<HistoryEntry>>;
}

/// Constraint configuration storage.
pub trait ConstraintsRepository: Send + Sync {
    fn load(&self) -> RepositoryResult<Versioned<Constraints>>;

    /// Stores `constraints` if the stored version equals `expected_version`.
    fn save(
        &self,
        constraints: Constraints,
        expected_version: u64,
    ) -> RepositoryResult<Versioned<Constraints>>;
}

/// Current plan storage.
pub trait PlanRepository: Send + Sync {
    fn load(&self) -> RepositoryResult<Versioned<Plan>>;

    /// Replaces the plan if the stored version equals `expected_version`.
    fn save(&self, plan: Plan, expected_version: u64) -> RepositoryResult<Versioned<Plan>>;
}

/// Employee directory snapshot.
pub trait EmployeeRepository: Send + Sync {
    fn employees(&self) -> RepositoryResult<Vec<EmployeeAvailability>>;
}

/// Absence directory snapshot.
pub trait AbsenceRepository: Send + Sync {
    /// Absences overlapping `[from, to]`.
    fn absences(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<Absence>>;
}

/// Booking ledger snapshot.
pub trait BookingRepository: Send + Sync {
    /// Bookings overlapping `[from, to)`.
    fn bookings(&self, from: NaiveDateTime, to: NaiveDateTime) -> RepositoryResult<Vec<Booking>>;
}
