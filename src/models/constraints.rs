//! Planning constraints.
//!
//! [`Constraints`] is the stored configuration. It changes only through
//! [`Constraints::apply`], which merges a [`ConstraintsUpdate`] and
//! normalizes the result:
//!
//! - `max_parallel_per_slot ≥ 1`, `max_hours_per_week ∈ [8, 168]`,
//!   `min_rest_hours ≥ 1`, `max_concurrent ≥ 1`,
//!   `default_location_capacity` unset or `≥ 1`
//! - weekday names lower-cased, unknown names dropped, deduplicated,
//!   canonical order; an empty list means "no restriction"
//! - a non-empty list in which no name parses is rejected rather than
//!   read as "no restriction"
//! - time windows must be non-empty
//! - linked groups deduplicated; groups with fewer than two members dropped
//!
//! [`ConstraintSet`] is the read-only view the allocator works with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::calendar::clock;
use super::{TimeWindow, Weekday};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Per-location limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConstraint {
    pub location: String,
    /// Weekdays the location may be used. Empty = any day.
    #[serde(default)]
    pub allowed_weekdays: Vec<Weekday>,
    /// Maximum overlapping sessions at this location.
    pub max_concurrent: u32,
}

impl LocationConstraint {
    /// Whether the location may be used on `day`.
    pub fn allows(&self, day: Weekday) -> bool {
        self.allowed_weekdays.is_empty() || self.allowed_weekdays.contains(&day)
    }
}

/// Stored planning constraints (always normalized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Weekdays sessions may be placed on. Empty = any day.
    pub allowed_weekdays: Vec<Weekday>,
    /// Sessions must start inside this window.
    pub preferred_window: TimeWindow,
    /// Sessions must lie inside this window when `require_daylight`.
    pub daylight_window: TimeWindow,
    pub require_daylight: bool,
    /// Maximum overlapping sessions on one date.
    pub max_parallel_per_slot: u32,
    /// Skip slots for which no employee can be found.
    pub require_employee_assignment: bool,
    pub location_constraints: Vec<LocationConstraint>,
    /// Concurrent sessions allowed at a location without a rule.
    /// `None` leaves such locations unlimited.
    #[serde(default)]
    pub default_location_capacity: Option<u32>,
    /// Demand keys co-scheduled at the same slot.
    pub linked_demand_groups: Vec<Vec<String>>,
    pub max_hours_per_week: u32,
    pub min_rest_hours: u32,
    /// Lifts the rest-period and global weekly-hours checks.
    pub allow_overtime: bool,
    /// Resolve staff separately for linked companion entries.
    pub staff_linked_entries: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            allowed_weekdays: vec![
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
            ],
            preferred_window: TimeWindow::new(clock(8, 0), clock(20, 0)),
            daylight_window: TimeWindow::new(clock(7, 0), clock(19, 0)),
            require_daylight: false,
            max_parallel_per_slot: 1,
            require_employee_assignment: false,
            location_constraints: Vec::new(),
            default_location_capacity: None,
            linked_demand_groups: Vec::new(),
            max_hours_per_week: 40,
            min_rest_hours: 11,
            allow_overtime: false,
            staff_linked_entries: false,
        }
    }
}

/// Partial update of [`Constraints`].
///
/// Unset fields keep their prior value. Numeric fields are signed so that
/// out-of-range input is clamped instead of failing to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsUpdate {
    /// Version the caller last read. Required when saving.
    pub version: Option<u64>,
    pub allowed_weekdays: Option<Vec<String>>,
    pub preferred_window: Option<TimeWindow>,
    pub daylight_window: Option<TimeWindow>,
    pub require_daylight: Option<bool>,
    pub max_parallel_per_slot: Option<i64>,
    pub require_employee_assignment: Option<bool>,
    pub location_constraints: Option<Vec<LocationConstraintUpdate>>,
    /// A value of zero or less clears the limit.
    pub default_location_capacity: Option<i64>,
    pub linked_demand_groups: Option<Vec<Vec<String>>>,
    pub max_hours_per_week: Option<i64>,
    pub min_rest_hours: Option<i64>,
    pub allow_overtime: Option<bool>,
    pub staff_linked_entries: Option<bool>,
}

/// Un-normalized location rule inside a [`ConstraintsUpdate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConstraintUpdate {
    pub location: String,
    pub allowed_weekdays: Vec<String>,
    pub max_concurrent: i64,
}

impl ConstraintsUpdate {
    /// An update carrying only a version token.
    pub fn at_version(version: u64) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }
}

impl Constraints {
    /// Merges `update` over `self` and normalizes the result.
    ///
    /// # Errors
    /// An empty time window, a location rule without a location name, or a
    /// weekday list in which no name is recognized. `self` is never modified.
    pub fn apply(&self, update: &ConstraintsUpdate) -> Result<Constraints, ValidationError> {
        let mut next = self.clone();

        if let Some(days) = &update.allowed_weekdays {
            next.allowed_weekdays = parse_weekdays(days)?;
        }
        if let Some(w) = update.preferred_window {
            next.preferred_window = w;
        }
        if let Some(w) = update.daylight_window {
            next.daylight_window = w;
        }
        if let Some(v) = update.require_daylight {
            next.require_daylight = v;
        }
        if let Some(v) = update.max_parallel_per_slot {
            next.max_parallel_per_slot = clamp_u32(v, 1, u32::MAX);
        }
        if let Some(v) = update.require_employee_assignment {
            next.require_employee_assignment = v;
        }
        if let Some(rules) = &update.location_constraints {
            next.location_constraints = rules
                .iter()
                .map(|r| {
                    let location = r.location.trim();
                    if location.is_empty() {
                        return Err(ValidationError::new(
                            ValidationErrorKind::MissingIdentifier,
                            "Location constraint has no location",
                        ));
                    }
                    Ok(LocationConstraint {
                        location: location.to_string(),
                        allowed_weekdays: parse_weekdays(&r.allowed_weekdays)?,
                        max_concurrent: clamp_u32(r.max_concurrent, 1, u32::MAX),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Some(v) = update.default_location_capacity {
            next.default_location_capacity = (v > 0).then(|| clamp_u32(v, 1, u32::MAX));
        }
        if let Some(groups) = &update.linked_demand_groups {
            next.linked_demand_groups = groups.clone();
        }
        if let Some(v) = update.max_hours_per_week {
            next.max_hours_per_week = clamp_u32(v, 8, 168);
        }
        if let Some(v) = update.min_rest_hours {
            next.min_rest_hours = clamp_u32(v, 1, u32::MAX);
        }
        if let Some(v) = update.allow_overtime {
            next.allow_overtime = v;
        }
        if let Some(v) = update.staff_linked_entries {
            next.staff_linked_entries = v;
        }

        next.normalize()
    }

    /// Re-applies all normalization rules.
    pub fn normalize(mut self) -> Result<Self, ValidationError> {
        for (name, window) in [
            ("preferred", &self.preferred_window),
            ("daylight", &self.daylight_window),
        ] {
            if !window.is_valid() {
                return Err(ValidationError::new(
                    ValidationErrorKind::InvalidTimeWindow,
                    format!(
                        "The {name} window must end after it starts ({} - {})",
                        window.start, window.end
                    ),
                ));
            }
        }

        self.allowed_weekdays = canonical(std::mem::take(&mut self.allowed_weekdays));
        self.max_parallel_per_slot = self.max_parallel_per_slot.max(1);
        self.max_hours_per_week = self.max_hours_per_week.clamp(8, 168);
        self.min_rest_hours = self.min_rest_hours.max(1);
        for rule in &mut self.location_constraints {
            rule.max_concurrent = rule.max_concurrent.max(1);
            rule.allowed_weekdays = canonical(std::mem::take(&mut rule.allowed_weekdays));
        }
        self.default_location_capacity = self.default_location_capacity.map(|n| n.max(1));
        self.linked_demand_groups = dedup_groups(&self.linked_demand_groups);
        Ok(self)
    }
}

/// Read-only, normalized constraints plus the linked-demand lookup.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Constraints,
    linked: HashMap<String, Vec<String>>,
}

impl ConstraintSet {
    /// Normalizes `constraints` and indexes the linked groups.
    pub fn new(constraints: Constraints) -> Result<Self, ValidationError> {
        let constraints = constraints.normalize()?;
        let mut linked: HashMap<String, Vec<String>> = HashMap::new();
        for group in &constraints.linked_demand_groups {
            for key in group {
                let partners = linked.entry(key.clone()).or_default();
                for other in group {
                    if other != key && !partners.contains(other) {
                        partners.push(other.clone());
                    }
                }
            }
        }
        Ok(Self {
            constraints,
            linked,
        })
    }

    /// The underlying normalized constraints.
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn allowed_weekdays(&self) -> &[Weekday] {
        &self.constraints.allowed_weekdays
    }

    /// Whether sessions may be placed on `day`.
    pub fn allows_weekday(&self, day: Weekday) -> bool {
        self.constraints.allowed_weekdays.is_empty()
            || self.constraints.allowed_weekdays.contains(&day)
    }

    pub fn preferred_window(&self) -> TimeWindow {
        self.constraints.preferred_window
    }

    pub fn daylight_window(&self) -> TimeWindow {
        self.constraints.daylight_window
    }

    pub fn require_daylight(&self) -> bool {
        self.constraints.require_daylight
    }

    pub fn max_parallel(&self) -> usize {
        self.constraints.max_parallel_per_slot as usize
    }

    pub fn require_employee_assignment(&self) -> bool {
        self.constraints.require_employee_assignment
    }

    pub fn location_rule(&self, location: &str) -> Option<&LocationConstraint> {
        self.constraints
            .location_constraints
            .iter()
            .find(|r| r.location == location)
    }

    pub fn default_location_capacity(&self) -> Option<u32> {
        self.constraints.default_location_capacity
    }

    /// Demand keys linked to `key`, in group order.
    pub fn linked(&self, key: &str) -> &[String] {
        self.linked.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn max_hours_per_week(&self) -> u32 {
        self.constraints.max_hours_per_week
    }

    pub fn min_rest_hours(&self) -> u32 {
        self.constraints.min_rest_hours
    }

    pub fn allow_overtime(&self) -> bool {
        self.constraints.allow_overtime
    }

    pub fn staff_linked_entries(&self) -> bool {
        self.constraints.staff_linked_entries
    }
}

fn parse_weekdays(names: &[String]) -> Result<Vec<Weekday>, ValidationError> {
    let days: Vec<Weekday> = names
        .iter()
        .filter_map(|name| match name.parse::<Weekday>() {
            Ok(day) => Some(day),
            Err(reason) => {
                warn!(%reason, "Dropping unknown weekday from constraints");
                None
            }
        })
        .collect();
    if days.is_empty() && !names.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::UnknownWeekday,
            format!("No recognized weekday in {names:?}"),
        ));
    }
    Ok(canonical(days))
}

fn canonical(mut days: Vec<Weekday>) -> Vec<Weekday> {
    days.sort();
    days.dedup();
    days
}

fn dedup_groups(groups: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = Vec::new();
    for group in groups {
        let mut members: Vec<String> = Vec::new();
        for key in group {
            let key = key.trim();
            if !key.is_empty() && !members.iter().any(|m| m == key) {
                members.push(key.to_string());
            }
        }
        if members.len() < 2 {
            continue;
        }
        let mut sorted = members.clone();
        sorted.sort();
        let duplicate = out.iter().any(|existing| {
            let mut e = existing.clone();
            e.sort();
            e == sorted
        });
        if !duplicate {
            out.push(members);
        }
    }
    out
}

fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}
