// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::repository::StoreError;
use crate::time::{self, TimeParseError};

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// Recurring weekly availability window published by a professional.
/// Rules are soft-disabled via `active` rather than deleted so historical
/// bookings keep their referential context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day_of_week: u8, // 0 = Sunday .. 6 = Saturday
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i64,
    pub active: bool,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub service_type: String,
}

impl AvailabilityRule {
    pub fn start_minutes(&self) -> u32 {
        time::naive_time_minutes(self.start_time)
    }

    pub fn end_minutes(&self) -> u32 {
        time::naive_time_minutes(self.end_time)
    }

    /// Active and inside the effective date range on the given date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.active
            && self.effective_from <= date
            && self.effective_until.map_or(true, |until| until >= date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutScope {
    /// Applies to every professional in the organization.
    Organization,
    /// Applies only to the professional in `professional_id`.
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutKind {
    Holiday,
    Recess,
    Unforeseen,
    Other,
}

/// One-off exclusion window. Absolute timestamps, not times of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackoutPeriod {
    pub id: Uuid,
    pub scope: BlackoutScope,
    pub professional_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub kind: BlackoutKind,
    pub reason: Option<String>,
}

impl BlackoutPeriod {
    pub fn applies_to(&self, professional_id: Uuid) -> bool {
        match self.scope {
            BlackoutScope::Organization => true,
            BlackoutScope::Professional => self.professional_id == Some(professional_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Terminal statuses are excluded from conflict checks and accept no
    /// further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }

    /// Statuses that occupy the professional's calendar.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A booked interval on a professional's calendar.
///
/// Invariant: per professional, the appointments with an active status have
/// pairwise non-overlapping `[starts_at, ends_at)` intervals. The store's
/// `insert` enforces this atomically; see `repository::AppointmentStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub student_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        time::duration_minutes(self.starts_at, self.ends_at)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.student_id == user_id || self.professional_id == user_id
    }
}

/// Per-professional scheduling policy. A missing record means the documented
/// defaults apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub professional_id: Uuid,
    pub auto_confirm: bool,
    pub min_advance_minutes: i64,
    pub reminder_lead_minutes: i64,
    pub default_meeting_link: Option<String>,
    pub confirmation_message: Option<String>,
}

impl SchedulingConfig {
    pub fn default_for(professional_id: Uuid) -> Self {
        Self {
            professional_id,
            auto_confirm: false,
            min_advance_minutes: 60,
            reminder_lead_minutes: 1440,
            default_meeting_link: None,
            confirmation_message: None,
        }
    }
}

/// Engine-wide validation limits, as opposed to the per-professional
/// `SchedulingConfig`.
#[derive(Debug, Clone)]
pub struct SchedulingPolicy {
    pub min_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub min_cancel_notice_hours: i64,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            min_duration_minutes: 15,
            max_duration_minutes: 120,
            min_cancel_notice_hours: 2,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// The candidate interval submitted to the validation pipeline.
#[derive(Debug, Clone, Copy)]
pub struct BookingCandidate {
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub professional_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotListResponse {
    pub slots: Vec<DateTime<Utc>>,
    pub slot_duration_minutes: i64,
}

/// Availability rule as submitted by the professional; times arrive as
/// `"HH:MM"` strings and are rejected here, at configuration time, so a
/// malformed rule can never reach the booking flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertRuleRequest {
    pub id: Option<Uuid>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub slot_duration_minutes: i64,
    pub active: bool,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub service_type: Option<String>,
}

impl UpsertRuleRequest {
    pub fn into_rule(self, professional_id: Uuid) -> Result<AvailabilityRule, SchedulingError> {
        if self.day_of_week > 6 {
            return Err(SchedulingError::InvalidRule(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        let start_minutes = time::time_to_minutes(&self.start_time)?;
        let end_minutes = time::time_to_minutes(&self.end_time)?;

        if start_minutes >= end_minutes {
            return Err(SchedulingError::InvalidRule(
                "start_time must be before end_time".to_string(),
            ));
        }
        if self.slot_duration_minutes <= 0 {
            return Err(SchedulingError::InvalidRule(
                "slot_duration_minutes must be positive".to_string(),
            ));
        }

        let start_time = time::naive_time_from_minutes(start_minutes)
            .ok_or_else(|| TimeParseError(self.start_time.clone()))?;
        let end_time = time::naive_time_from_minutes(end_minutes)
            .ok_or_else(|| TimeParseError(self.end_time.clone()))?;

        Ok(AvailabilityRule {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            professional_id,
            day_of_week: self.day_of_week,
            start_time,
            end_time,
            slot_duration_minutes: self.slot_duration_minutes,
            active: self.active,
            effective_from: self.effective_from,
            effective_until: self.effective_until,
            service_type: self.service_type.unwrap_or_else(|| "mentoring".to_string()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlackoutRequest {
    pub scope: BlackoutScope,
    pub professional_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub kind: BlackoutKind,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfigRequest {
    pub auto_confirm: Option<bool>,
    pub min_advance_minutes: Option<i64>,
    pub reminder_lead_minutes: Option<i64>,
    pub default_meeting_link: Option<String>,
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilters {
    pub status: Option<Vec<AppointmentStatus>>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
}

/// Status mutation applied through `AppointmentStore::update_status`. Only
/// the lifecycle manager builds these.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: Option<AppointmentStatus>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub meeting_link: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StatusUpdate {
    fn default() -> Self {
        Self {
            status: None,
            confirmed_at: None,
            meeting_link: None,
            cancelled_by: None,
            cancellation_reason: None,
            updated_at: Utc::now(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Validation rejections. Each carries a stable machine-readable reason code
/// alongside the human-readable message; callers surface both and the UI is
/// expected to offer a different slot rather than blindly retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingRejection {
    #[error("Appointments must be booked at least {min_advance_minutes} minutes in advance")]
    AdvanceNoticeTooShort { min_advance_minutes: i64 },

    #[error("Appointment duration must be between {min} and {max} minutes")]
    DurationOutOfBounds { min: i64, max: i64 },

    #[error("The requested time is outside the professional's availability")]
    OutsideAvailability,

    #[error("The requested time falls within a blocked period")]
    Blocked,

    #[error("The requested slot is already booked")]
    SlotAlreadyBooked,
}

impl BookingRejection {
    pub fn reason_code(&self) -> &'static str {
        match self {
            BookingRejection::AdvanceNoticeTooShort { .. } => "advance_notice_too_short",
            BookingRejection::DurationOutOfBounds { .. } => "duration_out_of_bounds",
            BookingRejection::OutsideAvailability => "outside_availability",
            BookingRejection::Blocked => "blocked_period",
            BookingRejection::SlotAlreadyBooked => "slot_already_booked",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Rejected(#[from] BookingRejection),

    #[error("Appointment is already {0} and cannot be modified")]
    AlreadyTerminal(AppointmentStatus),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Cancellations require at least {min_hours} hours notice")]
    CancellationNoticeTooShort { min_hours: i64 },

    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid availability rule: {0}")]
    InvalidRule(String),

    #[error(transparent)]
    TimeParse(#[from] TimeParseError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SchedulingError::NotFound,
            other => SchedulingError::Store(other),
        }
    }
}
