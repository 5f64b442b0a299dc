//! Greedy slot allocator.
//!
//! # Algorithm
//!
//! 1. Rank candidate slots per target ([`SlotScorer`]) and build the date
//!    pool: every date of the period on an allowed weekday.
//! 2. Run passes while some target is under quota. Each pass gives every
//!    open target one placement attempt:
//!    a. walk its candidates in rank order; for each, walk the weekday's
//!       dates ascending, skipping dates where `(key, date, time)` is used;
//!    b. reject starts outside the preferred window, sessions outside the
//!       daylight window when required, dates where `max_parallel_per_slot`
//!       committed entries already overlap, and location violations (a
//!       location rule, else `default_location_capacity` when set);
//!    c. resolve an employee; when assignment is required, skip on failure;
//!    d. commit the first feasible date and propagate companions to linked
//!       demand keys at the same start.
//!    A target with no feasible placement is closed for the rest of the run.
//! 3. Stop when a pass commits nothing or the pass guard fires.
//! 4. Sort entries by start (stable).
//!
//! # Complexity
//! O(p · t · c · d · n) where p=passes, t=targets, c=candidates,
//! d=dates per weekday, n=committed entries.
//!
//! Greedy and not optimal: an early placement is never revisited.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::{Analytics, AvailabilityResolver, SlotCandidate, SlotScorer};
use crate::models::{
    date_pool, Absence, Booking, ConstraintSet, Coverage, DemandKind, DemandProgress,
    DemandTarget, DurationTable, EmployeeAvailability, Plan, PlanEntry, PlanStatus, Weekday,
};

/// Default upper bound on allocation passes.
pub const DEFAULT_MAX_PASSES: u32 = 500;

/// Input container for one planning run.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// First day of the period (inclusive).
    pub period_start: NaiveDate,
    /// Last day of the period (inclusive).
    pub period_end: NaiveDate,
    pub targets: Vec<DemandTarget>,
    /// Employee directory snapshot.
    pub employees: Vec<EmployeeAvailability>,
    /// Absence directory snapshot.
    pub absences: Vec<Absence>,
    /// Booking ledger snapshot.
    pub bookings: Vec<Booking>,
}

impl AllocationRequest {
    /// Creates a request without staffing data.
    pub fn new(period_start: NaiveDate, period_end: NaiveDate, targets: Vec<DemandTarget>) -> Self {
        Self {
            period_start,
            period_end,
            targets,
            employees: Vec::new(),
            absences: Vec::new(),
            bookings: Vec::new(),
        }
    }

    pub fn with_employees(mut self, employees: Vec<EmployeeAvailability>) -> Self {
        self.employees = employees;
        self
    }

    pub fn with_absences(mut self, absences: Vec<Absence>) -> Self {
        self.absences = absences;
        self
    }

    pub fn with_bookings(mut self, bookings: Vec<Booking>) -> Self {
        self.bookings = bookings;
        self
    }
}

/// Result of a planning run.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub plan: Plan,
    pub coverage: Coverage,
}

/// Greedy allocator.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use slot_planner::models::{ConstraintSet, Constraints, DemandTarget, PlanStatus};
/// use slot_planner::scheduler::{AllocationRequest, Allocator, AnalyticsBuilder};
///
/// let constraints = ConstraintSet::new(Constraints::default()).unwrap();
/// let start = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
/// let request = AllocationRequest::new(start, end, vec![DemandTarget::new("course", 3)]);
///
/// let analytics = AnalyticsBuilder::new().build(&[]);
/// let allocation = Allocator::new(&constraints).allocate(&request, &analytics);
/// assert_eq!(allocation.plan.entries.len(), 3);
/// assert_eq!(allocation.coverage.status, PlanStatus::Satisfied);
/// ```
#[derive(Debug, Clone)]
pub struct Allocator<'a> {
    constraints: &'a ConstraintSet,
    durations: DurationTable,
    max_passes: u32,
}

impl<'a> Allocator<'a> {
    pub fn new(constraints: &'a ConstraintSet) -> Self {
        Self {
            constraints,
            durations: DurationTable::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Sets session durations per kind.
    pub fn with_durations(mut self, durations: DurationTable) -> Self {
        self.durations = durations;
        self
    }

    /// Sets the pass guard.
    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Runs the allocation. Never fails; unmet demand shows in the coverage.
    pub fn allocate(&self, request: &AllocationRequest, analytics: &Analytics) -> Allocation {
        let scorer = SlotScorer::new(self.constraints);
        let states = request
            .targets
            .iter()
            .map(|t| TargetState {
                candidates: scorer.candidates(t, analytics),
                duration: t.duration_minutes(&self.durations),
                remaining: t.required_count,
                committed: 0,
                exhausted: false,
            })
            .collect();

        let mut index = HashMap::new();
        for (i, t) in request.targets.iter().enumerate() {
            index.entry(t.demand_key.as_str()).or_insert(i);
        }

        let mut run = Run {
            constraints: self.constraints,
            durations: &self.durations,
            targets: &request.targets,
            states,
            index,
            pools: date_pool(
                request.period_start,
                request.period_end,
                self.constraints.allowed_weekdays(),
            )
            .into_iter()
            .collect(),
            entries: Vec::new(),
            used: HashSet::new(),
            resolver: AvailabilityResolver::new(
                &request.employees,
                &request.absences,
                &request.bookings,
                self.constraints,
            ),
        };

        info!(
            targets = request.targets.len(),
            employees = request.employees.len(),
            period_start = %request.period_start,
            period_end = %request.period_end,
            "Allocation started"
        );

        let mut passes = 0u32;
        let mut guard_hit = false;
        while run.has_open_targets() {
            if passes >= self.max_passes {
                warn!(passes, "Allocation pass guard reached");
                guard_hit = true;
                break;
            }
            passes += 1;

            let mut progress = 0usize;
            for i in 0..run.states.len() {
                if !run.is_open(i) {
                    continue;
                }
                match run.place(i) {
                    Some(committed) => progress += committed,
                    None => {
                        debug!(
                            demand = %request.targets[i].demand_key,
                            remaining = run.states[i].remaining,
                            "No feasible slot left"
                        );
                        run.states[i].exhausted = true;
                    }
                }
            }
            if progress == 0 {
                break;
            }
        }

        let mut plan = Plan::for_period(request.period_start, request.period_end);
        plan.entries = run.entries;
        plan.sort();

        let per_demand_progress: Vec<DemandProgress> = request
            .targets
            .iter()
            .zip(&run.states)
            .map(|(t, s)| DemandProgress::new(&t.demand_key, t.required_count, s.committed))
            .collect();

        let status = if per_demand_progress.iter().all(DemandProgress::is_met) {
            PlanStatus::Satisfied
        } else if guard_hit
            || per_demand_progress
                .iter()
                .any(|p| !p.is_met() && p.scheduled == 0)
        {
            PlanStatus::Stalled
        } else {
            PlanStatus::Partial
        };

        let coverage = Coverage {
            scheduled_count: plan.entries.len(),
            per_demand_progress,
            status,
            passes,
        };
        info!(
            scheduled = coverage.scheduled_count,
            shortfall = coverage.total_shortfall(),
            passes,
            status = ?status,
            "Allocation finished"
        );

        Allocation { plan, coverage }
    }
}

struct TargetState {
    candidates: Vec<SlotCandidate>,
    duration: i64,
    remaining: u32,
    committed: u32,
    exhausted: bool,
}

/// Mutable state of one allocation run.
struct Run<'r> {
    constraints: &'r ConstraintSet,
    durations: &'r DurationTable,
    targets: &'r [DemandTarget],
    states: Vec<TargetState>,
    /// First target index per demand key.
    index: HashMap<&'r str, usize>,
    pools: HashMap<Weekday, Vec<NaiveDate>>,
    entries: Vec<PlanEntry>,
    used: HashSet<(String, NaiveDate, NaiveTime)>,
    resolver: AvailabilityResolver<'r>,
}

impl<'r> Run<'r> {
    fn is_open(&self, i: usize) -> bool {
        let s = &self.states[i];
        s.remaining > 0 && !s.exhausted
    }

    fn has_open_targets(&self) -> bool {
        (0..self.states.len()).any(|i| self.is_open(i))
    }

    /// One placement attempt. Returns the number of entries committed
    /// (the placement plus its companions), or `None` if nothing fits.
    fn place(&mut self, i: usize) -> Option<usize> {
        let targets = self.targets;
        let target = &targets[i];
        let duration = self.states[i].duration;

        for c in 0..self.states[i].candidates.len() {
            let candidate = &self.states[i].candidates[c];
            let (weekday, time, score) = (candidate.weekday, candidate.time, candidate.mean_score());
            let location = target.location.clone().or_else(|| candidate.location.clone());

            if !self.time_fits(time, duration) {
                continue;
            }
            let Some(dates) = self.pools.get(&weekday).cloned() else {
                continue;
            };

            for date in dates {
                if self.used.contains(&(target.demand_key.clone(), date, time)) {
                    continue;
                }
                let start = date.and_time(time);
                let end = start + Duration::minutes(duration);
                if !self.has_capacity(start, end, location.as_deref()) {
                    continue;
                }

                let staff = self.resolver.resolve(target.role(), start, duration);
                if staff.is_none() && self.constraints.require_employee_assignment() {
                    debug!(demand = %target.demand_key, %start, "No employee available");
                    continue;
                }

                let Some(mut entry) =
                    PlanEntry::new(&target.demand_key, target.title(), start, end, score)
                else {
                    continue;
                };
                entry = entry.with_location(location.clone());
                if let Some(employee) = staff {
                    self.resolver.commit(employee, start, end);
                    entry = entry.with_employee(&employee.employee_id, display_name(employee));
                }

                self.record(Some(i), entry);
                let companions = self.propagate(target, start, score, location);
                return Some(1 + companions);
            }
        }

        None
    }

    /// Commits companion entries for keys linked to `origin`.
    fn propagate(
        &mut self,
        origin: &'r DemandTarget,
        start: NaiveDateTime,
        score: f64,
        location: Option<String>,
    ) -> usize {
        let constraints = self.constraints;
        let targets = self.targets;
        let (date, time) = (start.date(), start.time());
        let mut added = 0;

        for key in constraints.linked(&origin.demand_key) {
            if self.used.contains(&(key.clone(), date, time)) {
                continue;
            }
            let companion = self.index.get(key.as_str()).map(|&j| (j, &targets[j]));
            let (duration, title, role, loc) = match companion {
                Some((j, t)) => {
                    if self.states[j].remaining == 0 {
                        continue;
                    }
                    (
                        self.states[j].duration,
                        t.title().to_string(),
                        t.role().to_string(),
                        t.location.clone().or_else(|| location.clone()),
                    )
                }
                None => (
                    i64::from(self.durations.minutes(DemandKind::from_key(key))),
                    key.clone(),
                    key.clone(),
                    location.clone(),
                ),
            };

            let end = start + Duration::minutes(duration);
            if !self.has_capacity(start, end, loc.as_deref()) {
                debug!(demand = %key, linked_from = %origin.demand_key, "Companion does not fit");
                continue;
            }
            let Some(mut entry) = PlanEntry::new(key, title, start, end, score) else {
                continue;
            };
            entry = entry.with_location(loc).linked_from(&origin.demand_key);

            if constraints.staff_linked_entries() {
                match self.resolver.resolve(&role, start, duration) {
                    Some(employee) => {
                        self.resolver.commit(employee, start, end);
                        entry = entry.with_employee(&employee.employee_id, display_name(employee));
                    }
                    None if constraints.require_employee_assignment() => continue,
                    None => {}
                }
            }

            self.record(companion.map(|(j, _)| j), entry);
            added += 1;
        }

        added
    }

    fn record(&mut self, target: Option<usize>, entry: PlanEntry) {
        self.used
            .insert((entry.demand_key.clone(), entry.date, entry.start.time()));
        if let Some(j) = target {
            let state = &mut self.states[j];
            state.remaining = state.remaining.saturating_sub(1);
            state.committed += 1;
        }
        self.entries.push(entry);
    }

    fn time_fits(&self, time: NaiveTime, duration: i64) -> bool {
        if !self.constraints.preferred_window().contains(time) {
            return false;
        }
        !self.constraints.require_daylight() || self.constraints.daylight_window().fits(time, duration)
    }

    /// Parallel and location limits against committed entries.
    ///
    /// A location without a rule is capped by `default_location_capacity`,
    /// or not at all when that is unset.
    fn has_capacity(&self, start: NaiveDateTime, end: NaiveDateTime, location: Option<&str>) -> bool {
        let overlapping: Vec<&PlanEntry> = self
            .entries
            .iter()
            .filter(|e| e.start < end && e.end > start)
            .collect();
        if overlapping.len() >= self.constraints.max_parallel() {
            return false;
        }

        let Some(loc) = location else {
            return true;
        };
        let limit = match self.constraints.location_rule(loc) {
            Some(rule) if !rule.allows(Weekday::of(start.date())) => return false,
            Some(rule) => rule.max_concurrent as usize,
            None => match self.constraints.default_location_capacity() {
                Some(capacity) => capacity as usize,
                None => return true,
            },
        };
        let at_location = overlapping
            .iter()
            .filter(|e| e.location.as_deref() == Some(loc))
            .count();
        at_location < limit
    }
}

fn display_name(employee: &EmployeeAvailability) -> &str {
    if employee.name.is_empty() {
        employee.employee_id.as_str()
    } else {
        employee.name.as_str()
    }
}
