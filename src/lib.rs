//! History-driven slot planning for course schedules and duty rosters.
//!
//! Turns past session outcomes into slot preferences, greedily assigns
//! calendar slots to demand quotas under hard constraints, and reports
//! conflicts in the resulting plan.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `HistoryEntry`, `DemandTarget`,
//!   `Constraints`, `EmployeeAvailability`, `Plan`, `ConflictReport`
//! - **`scheduler`**: `AnalyticsBuilder`, `SlotScorer`,
//!   `AvailabilityResolver` and the greedy `Allocator`
//! - **`validation`**: Request checks and plan conflict detection
//! - **`repository`**: Storage and directory interfaces with in-memory
//!   implementations
//! - **`service`**: The `Planner` facade exposing the external operations
//! - **`config`**, **`logging`**, **`error`**: Ambient plumbing
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use slot_planner::models::{DemandTarget, RawHistoryRecord};
//! use slot_planner::repository::InMemoryDirectory;
//! use slot_planner::{PlanRequest, Planner, PlannerConfig};
//!
//! let planner = Planner::in_memory(PlannerConfig::default(), Arc::new(InMemoryDirectory::new()));
//! planner.import_history(RawHistoryRecord {
//!     demand_key: Some("course".into()),
//!     date: Some("2026-10-05".into()),
//!     time: Some("09:00".into()),
//!     attendance: 9,
//!     capacity: 10,
//!     ..RawHistoryRecord::default()
//! })?;
//!
//! let start = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
//! let out = planner.generate_plan(PlanRequest::new(start, end, vec![DemandTarget::new("course", 1)]))?;
//! assert_eq!(out.plan.entries[0].start.format("%a %H:%M").to_string(), "Mon 09:00");
//! # Ok::<(), slot_planner::Error>(())
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod validation;

pub use config::PlannerConfig;
pub use error::{Error, Result};
pub use service::{GeneratedPlan, PlanRequest, Planner, Repositories};
