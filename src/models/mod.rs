//! Planning domain models.
//!
//! Provides the data types exchanged with the planner: history records,
//! demand targets, constraints, employee snapshots, and the resulting
//! plan with its coverage and conflict reports. All types are plain data
//! and serialize to JSON.
//!
//! # Domain Mappings
//!
//! | slot-planner | Course planning | Duty rostering |
//! |--------------|-----------------|----------------|
//! | DemandTarget | Course type quota | Role × shift template quota |
//! | HistoryEntry | Past session | Past shift |
//! | EmployeeAvailability | Instructor | Staff member |
//! | PlanEntry | Scheduled session | Assigned shift |

pub(crate) mod calendar;
mod constraints;
mod demand;
mod employee;
mod history;
mod plan;

pub use calendar::{date_pool, TimeWindow, Weekday};
pub use constraints::{
    ConstraintSet, Constraints, ConstraintsUpdate, LocationConstraint, LocationConstraintUpdate,
};
pub use demand::{DemandKind, DemandTarget, DurationTable, ShiftTemplate};
pub use employee::{Absence, Booking, EmployeeAvailability, PreferredSlot};
pub use history::{HistoryEntry, RawHistoryRecord, SessionStatus};
pub use plan::{
    ConflictReport, ConflictType, Coverage, DemandProgress, Plan, PlanEntry, PlanStatus,
};
