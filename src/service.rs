//! Planner service: the external operations.
//!
//! | Operation | Reads | Writes |
//! |-----------|-------|--------|
//! | [`Planner::import_history`] | constraints | history |
//! | [`Planner::save_constraints`] | constraints | constraints (version-checked) |
//! | [`Planner::generate_plan`] | everything | plan (version-checked) |
//! | [`Planner::validate_plan`] | nothing | nothing |
//!
//! All inputs are validated before any repository is written. A planning
//! run reads full snapshots up front and computes entirely in memory.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::error::{Error, Result};
use crate::models::{
    ConflictReport, ConstraintSet, Constraints, ConstraintsUpdate, Coverage, DemandTarget,
    HistoryEntry, Plan, PlanEntry, RawHistoryRecord,
};
use crate::repository::{
    AbsenceRepository, BookingRepository, ConstraintsRepository, EmployeeRepository,
    HistoryRepository, InMemoryConstraints, InMemoryDirectory, InMemoryHistory, InMemoryPlans,
    PlanRepository, Versioned,
};
use crate::scheduler::{AllocationRequest, Allocator, Analytics, AnalyticsBuilder};
use crate::validation::{self, ValidationError, ValidationErrorKind};

/// Booking snapshots reach this far beyond the period so that weekly hours
/// and rest periods at the edges see their neighbours.
const BOOKING_MARGIN_DAYS: u64 = 7;

/// Injected storage and directory interfaces.
#[derive(Clone)]
pub struct Repositories {
    pub history: Arc<dyn HistoryRepository>,
    pub constraints: Arc<dyn ConstraintsRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub employees: Arc<dyn EmployeeRepository>,
    pub absences: Arc<dyn AbsenceRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    /// In-memory stores around a shared directory.
    pub fn in_memory(history_cap: usize, directory: Arc<InMemoryDirectory>) -> Self {
        Self {
            history: Arc::new(InMemoryHistory::new(history_cap)),
            constraints: Arc::new(InMemoryConstraints::default()),
            plans: Arc::new(InMemoryPlans::default()),
            employees: directory.clone(),
            absences: directory.clone(),
            bookings: directory,
        }
    }
}

/// Input of [`Planner::generate_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub targets: Vec<DemandTarget>,
    /// Merged over the stored constraints for this run only.
    #[serde(default)]
    pub constraints_override: Option<ConstraintsUpdate>,
    /// Plan version the caller last read. Defaults to the version current
    /// when the run starts.
    #[serde(default)]
    pub base_version: Option<u64>,
}

impl PlanRequest {
    pub fn new(period_start: NaiveDate, period_end: NaiveDate, targets: Vec<DemandTarget>) -> Self {
        Self {
            period_start,
            period_end,
            targets,
            constraints_override: None,
            base_version: None,
        }
    }

    pub fn with_override(mut self, update: ConstraintsUpdate) -> Self {
        self.constraints_override = Some(update);
        self
    }

    pub fn with_base_version(mut self, version: u64) -> Self {
        self.base_version = Some(version);
        self
    }
}

/// Output of [`Planner::generate_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub plan: Plan,
    pub coverage: Coverage,
    /// Analytics recomputed from current history.
    pub analytics: Analytics,
    /// Conflicts found in the new plan. Informational only.
    pub conflicts: Vec<ConflictReport>,
    /// Version under which the plan was stored.
    pub version: u64,
}

/// The scheduling service.
pub struct Planner {
    config: PlannerConfig,
    repos: Repositories,
}

impl Planner {
    pub fn new(config: PlannerConfig, repos: Repositories) -> Self {
        Self { config, repos }
    }

    /// A planner over in-memory stores.
    pub fn in_memory(config: PlannerConfig, directory: Arc<InMemoryDirectory>) -> Self {
        let repos = Repositories::in_memory(config.history_cap, directory);
        Self::new(config, repos)
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Normalizes a raw record and appends it to the history log.
    pub fn import_history(&self, raw: RawHistoryRecord) -> Result<HistoryEntry> {
        self.import_history_at(raw, Utc::now().naive_utc())
    }

    /// Like [`import_history`](Self::import_history) with an explicit "now"
    /// for unreadable dates.
    pub fn import_history_at(&self, raw: RawHistoryRecord, now: NaiveDateTime) -> Result<HistoryEntry> {
        let default_time = self.repos.constraints.load()?.value.preferred_window.start;
        let entry = raw.normalize(now, default_time).map_err(Error::invalid)?;
        self.repos.history.append(entry.clone())?;
        debug!(id = %entry.id, demand = %entry.demand_key, "History entry imported");
        Ok(entry)
    }

    /// Merges `update` into the stored constraints.
    ///
    /// # Errors
    /// - `Validation` when the version token is missing or the merged
    ///   constraints are invalid
    /// - `VersionConflict` when the token is stale
    pub fn save_constraints(&self, update: ConstraintsUpdate) -> Result<Versioned<Constraints>> {
        let version = update.version.ok_or_else(|| {
            Error::invalid(ValidationError::new(
                ValidationErrorKind::MissingIdentifier,
                "Constraints update has no version",
            ))
        })?;

        let current = self.repos.constraints.load()?;
        if current.version != version {
            return Err(Error::VersionConflict {
                entity: "constraints",
                expected: version,
                actual: current.version,
            });
        }

        let next = current.value.apply(&update).map_err(Error::invalid)?;
        let saved = self.repos.constraints.save(next, version)?;
        info!(version = saved.version, "Constraints saved");
        Ok(saved)
    }

    /// Runs analytics, scoring and allocation, then stores the plan.
    ///
    /// Unsatisfiable demand is not an error; see [`Coverage`].
    pub fn generate_plan(&self, request: PlanRequest) -> Result<GeneratedPlan> {
        let employees = self.repos.employees.employees()?;
        validation::validate_request(
            &request.targets,
            &employees,
            request.period_start,
            request.period_end,
        )
        .map_err(Error::Validation)?;

        let stored = self.repos.constraints.load()?.value;
        let constraints = match &request.constraints_override {
            Some(update) => stored.apply(update).map_err(Error::invalid)?,
            None => stored,
        };
        let set = ConstraintSet::new(constraints).map_err(Error::invalid)?;

        let base_version = match request.base_version {
            Some(v) => v,
            None => self.repos.plans.load()?.version,
        };

        let analytics = self.analytics()?;
        // Overnight sessions on the last day reach into the next one.
        let absence_end = request
            .period_end
            .checked_add_days(Days::new(1))
            .unwrap_or(request.period_end);
        let absences = self
            .repos
            .absences
            .absences(request.period_start, absence_end)?;
        let (from, to) = booking_window(request.period_start, request.period_end);
        let bookings = self.repos.bookings.bookings(from, to)?;

        let allocation_request =
            AllocationRequest::new(request.period_start, request.period_end, request.targets)
                .with_employees(employees)
                .with_absences(absences)
                .with_bookings(bookings);

        let allocation = Allocator::new(&set)
            .with_durations(self.config.durations)
            .with_max_passes(self.config.max_passes)
            .allocate(&allocation_request, &analytics);

        let conflicts = validation::validate_plan(&allocation.plan.entries, set.max_parallel());
        let saved = self.repos.plans.save(allocation.plan, base_version)?;

        info!(
            version = saved.version,
            scheduled = allocation.coverage.scheduled_count,
            status = ?allocation.coverage.status,
            conflicts = conflicts.len(),
            "Plan generated"
        );

        Ok(GeneratedPlan {
            plan: saved.value,
            coverage: allocation.coverage,
            analytics,
            conflicts,
            version: saved.version,
        })
    }

    /// Read-only conflict check, independent of generation.
    pub fn validate_plan(&self, entries: &[PlanEntry], max_parallel: usize) -> Vec<ConflictReport> {
        validation::validate_plan(entries, max_parallel)
    }

    /// Stored constraints with their version.
    pub fn constraints(&self) -> Result<Versioned<Constraints>> {
        Ok(self.repos.constraints.load()?)
    }

    /// Stored plan with its version.
    pub fn current_plan(&self) -> Result<Versioned<Plan>> {
        Ok(self.repos.plans.load()?)
    }

    /// Analytics over the current history.
    pub fn analytics(&self) -> Result<Analytics> {
        let history = self.repos.history.all()?;
        Ok(AnalyticsBuilder::new()
            .with_popular_slot_limit(self.config.popular_slot_limit)
            .build(&history))
    }
}

fn booking_window(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let from = start
        .checked_sub_days(Days::new(BOOKING_MARGIN_DAYS))
        .unwrap_or(start);
    let to = end
        .checked_add_days(Days::new(BOOKING_MARGIN_DAYS + 1))
        .unwrap_or(end);
    (from.and_time(NaiveTime::MIN), to.and_time(NaiveTime::MIN))
}
