//! Historical session records.
//!
//! History is the only input to analytics. Records are normalized once on
//! import and never modified afterwards.
//!
//! # Success Score
//! `success_score = clamp(0, 1, fill_rate + penalty)` where the penalty is
//! −0.6 for a cancelled session, +0.15 for a waitlisted one, 0 otherwise.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Weekday;
use crate::validation::{ValidationError, ValidationErrorKind};

const CANCELLED_PENALTY: f64 = -0.6;
const WAITLIST_BONUS: f64 = 0.15;

/// Outcome of a past session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Held,
    Cancelled,
    Waitlist,
}

impl SessionStatus {
    fn adjustment(&self) -> f64 {
        match self {
            SessionStatus::Held => 0.0,
            SessionStatus::Cancelled => CANCELLED_PENALTY,
            SessionStatus::Waitlist => WAITLIST_BONUS,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "held" | "completed" | "done" => Some(SessionStatus::Held),
            "cancelled" | "canceled" => Some(SessionStatus::Cancelled),
            "waitlist" | "waitlisted" => Some(SessionStatus::Waitlist),
            _ => None,
        }
    }
}

/// A normalized past session or shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Course type or role the session belonged to.
    pub demand_key: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub location: Option<String>,
    pub attendance: u32,
    /// Always ≥ 1.
    pub capacity: u32,
    pub status: SessionStatus,
    /// attendance / capacity.
    pub fill_rate: f64,
    /// In [0, 1].
    pub success_score: f64,
}

impl HistoryEntry {
    /// Builds an entry from already-typed values.
    ///
    /// Capacity is clamped to at least 1; derived scores are computed here.
    pub fn new(
        id: impl Into<String>,
        demand_key: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
        attendance: u32,
        capacity: u32,
        status: SessionStatus,
    ) -> Self {
        let capacity = capacity.max(1);
        let fill_rate = f64::from(attendance) / f64::from(capacity);
        let success_score = (fill_rate + status.adjustment()).clamp(0.0, 1.0);
        Self {
            id: id.into(),
            demand_key: demand_key.into(),
            date,
            weekday: Weekday::of(date),
            time,
            location: None,
            attendance,
            capacity,
            status,
            fill_rate,
            success_score,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Whether the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == SessionStatus::Cancelled
    }
}

/// An import row before normalization.
///
/// Every field is optional so that a malformed row can still be accepted;
/// only a missing demand key is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHistoryRecord {
    pub id: Option<String>,
    pub demand_key: Option<String>,
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`.
    pub time: Option<String>,
    pub location: Option<String>,
    pub attendance: i64,
    pub capacity: i64,
    pub status: Option<String>,
}

impl RawHistoryRecord {
    /// Normalizes into a [`HistoryEntry`].
    ///
    /// Unparseable dates fall back to `now`'s date and unparseable times to
    /// `default_time`; both are logged as data-quality warnings. Capacity is
    /// clamped to ≥ 1 and attendance to ≥ 0.
    ///
    /// # Errors
    /// A missing or blank demand key.
    pub fn normalize(
        self,
        now: NaiveDateTime,
        default_time: NaiveTime,
    ) -> Result<HistoryEntry, ValidationError> {
        let demand_key = match self.demand_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => {
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingIdentifier,
                    "History record has no demand key",
                ))
            }
        };

        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let date = match self.date.as_deref().map(|s| s.trim().parse::<NaiveDate>()) {
            Some(Ok(d)) => d,
            other => {
                warn!(
                    record = %id,
                    raw = ?self.date,
                    parse_failed = matches!(other, Some(Err(_))),
                    "data-quality: history date unreadable, using today"
                );
                now.date()
            }
        };

        let time = match self.time.as_deref().map(parse_time) {
            Some(Ok(t)) => t,
            _ => {
                warn!(
                    record = %id,
                    raw = ?self.time,
                    "data-quality: history time unreadable, using window start"
                );
                default_time
            }
        };

        let status = match self.status.as_deref() {
            None => SessionStatus::Held,
            Some(raw) => SessionStatus::parse(raw).unwrap_or_else(|| {
                warn!(
                    record = %id,
                    raw,
                    "data-quality: unknown session status, treating as held"
                );
                SessionStatus::Held
            }),
        };

        let attendance = u32::try_from(self.attendance.max(0)).unwrap_or(u32::MAX);
        let capacity = u32::try_from(self.capacity.max(1)).unwrap_or(u32::MAX);

        let mut entry = HistoryEntry::new(id, demand_key, date, time, attendance, capacity, status);
        entry.location = self.location.filter(|l| !l.trim().is_empty());
        Ok(entry)
    }
}

/// `HH:MM:SS` or `HH:MM`.
fn parse_time(raw: &str) -> chrono::ParseResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
}
