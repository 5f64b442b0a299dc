//! Analytics, slot scoring, staffing and greedy allocation.
//!
//! Data flows one way through this module:
//!
//! ```text
//! history ─▶ AnalyticsBuilder ─▶ SlotScorer ─▶ Allocator ─▶ Plan + Coverage
//!                                                 │
//!                                   AvailabilityResolver
//! ```
//!
//! # Algorithm
//!
//! `Allocator` is a greedy, pass-based heuristic: each pass gives every
//! under-quota demand target one placement in its best feasible slot. It is
//! not optimal, but it is deterministic and always terminates.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"

mod allocator;
mod analytics;
mod availability;
mod scorer;

pub use allocator::{Allocation, AllocationRequest, Allocator, DEFAULT_MAX_PASSES};
pub use analytics::{
    Analytics, AnalyticsBuilder, DemandStats, PopularSlot, DEFAULT_POPULAR_SLOT_LIMIT,
};
pub use availability::AvailabilityResolver;
pub use scorer::{SlotCandidate, SlotScorer, NEUTRAL_SCORE};
