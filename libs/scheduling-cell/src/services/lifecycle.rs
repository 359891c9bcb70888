// libs/scheduling-cell/src/services/lifecycle.rs
//
// Appointment lifecycle: the only writer of appointment records.
//
//   Pending   -> Confirmed | Cancelled | Completed
//   Confirmed -> Cancelled | Completed
//   Cancelled -> (terminal)
//   Completed -> (terminal)

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingCandidate, BookingRejection,
    SchedulingConfig, SchedulingError, SchedulingPolicy, StatusUpdate,
};
use crate::repository::{SchedulingStores, StoreError};
use crate::services::validation::ValidationPipeline;

/// Whether an appointment starting at `starts_at` may still be cancelled at
/// `now`, given the minimum notice. The boundary itself is too late: an
/// appointment exactly `min_hours` away can no longer be cancelled.
pub fn can_cancel(starts_at: DateTime<Utc>, now: DateTime<Utc>, min_hours: i64) -> bool {
    starts_at > now + Duration::hours(min_hours)
}

fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed) | (Pending, Cancelled) | (Pending, Completed)
            | (Confirmed, Cancelled)
            | (Confirmed, Completed)
    )
}

pub struct LifecycleManager {
    stores: SchedulingStores,
    pipeline: ValidationPipeline,
    policy: SchedulingPolicy,
}

impl LifecycleManager {
    pub fn new(stores: SchedulingStores) -> Self {
        let policy = SchedulingPolicy::default();
        Self {
            pipeline: ValidationPipeline::with_policy(stores.clone(), policy.clone()),
            stores,
            policy,
        }
    }

    async fn config_for(&self, professional_id: Uuid) -> Result<SchedulingConfig, SchedulingError> {
        Ok(self
            .stores
            .configs
            .get(professional_id)
            .await?
            .unwrap_or_else(|| SchedulingConfig::default_for(professional_id)))
    }

    pub async fn create(
        &self,
        student_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        self.create_at(student_id, request, Utc::now()).await
    }

    /// Validate the candidate and persist the appointment. The store insert
    /// has the final word on the non-overlap invariant; losing that race
    /// yields the same rejection as a conflict seen during validation.
    pub async fn create_at(
        &self,
        student_id: Uuid,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let config = self.config_for(request.professional_id).await?;
        let candidate = BookingCandidate {
            professional_id: request.professional_id,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
        };
        self.pipeline.validate_at(candidate, &config, now).await?;

        let (status, confirmed_at, meeting_link) = if config.auto_confirm {
            (
                AppointmentStatus::Confirmed,
                Some(now),
                config.default_meeting_link.clone(),
            )
        } else {
            (AppointmentStatus::Pending, None, None)
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            student_id,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            status,
            meeting_link,
            notes: request.notes,
            cancellation_reason: None,
            cancelled_by: None,
            confirmed_at,
            reminder_sent: false,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = match self.stores.appointments.insert(appointment).await {
            Ok(created) => created,
            Err(StoreError::Conflict) => {
                debug!(
                    professional_id = %request.professional_id,
                    "insert lost a concurrent booking race"
                );
                return Err(BookingRejection::SlotAlreadyBooked.into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            appointment_id = %created.id,
            professional_id = %created.professional_id,
            status = %created.status,
            "appointment created"
        );
        Ok(created)
    }

    pub async fn confirm(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.confirm_at(id, Utc::now()).await
    }

    pub async fn confirm_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.stores.appointments.get(id).await?;
        self.ensure_transition(&appointment, AppointmentStatus::Confirmed)?;

        // Fall back to the professional's standing link when the appointment
        // was booked without one.
        let meeting_link = if appointment.meeting_link.is_none() {
            self.config_for(appointment.professional_id)
                .await?
                .default_meeting_link
        } else {
            None
        };

        let confirmed = self
            .stores
            .appointments
            .update_status(
                id,
                StatusUpdate {
                    status: Some(AppointmentStatus::Confirmed),
                    confirmed_at: Some(now),
                    meeting_link,
                    updated_at: now,
                    ..StatusUpdate::default()
                },
            )
            .await?;

        info!(appointment_id = %id, "appointment confirmed");
        Ok(confirmed)
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        cancelled_by: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        self.cancel_at(id, cancelled_by, reason, Utc::now()).await
    }

    /// Cancellation requires the minimum notice; a terminal appointment is
    /// rejected without touching its first-cancel metadata.
    pub async fn cancel_at(
        &self,
        id: Uuid,
        cancelled_by: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.stores.appointments.get(id).await?;
        self.ensure_transition(&appointment, AppointmentStatus::Cancelled)?;

        if !can_cancel(appointment.starts_at, now, self.policy.min_cancel_notice_hours) {
            return Err(SchedulingError::CancellationNoticeTooShort {
                min_hours: self.policy.min_cancel_notice_hours,
            });
        }

        let cancelled = self
            .stores
            .appointments
            .update_status(
                id,
                StatusUpdate {
                    status: Some(AppointmentStatus::Cancelled),
                    cancelled_by: Some(cancelled_by),
                    cancellation_reason: reason,
                    updated_at: now,
                    ..StatusUpdate::default()
                },
            )
            .await?;

        info!(appointment_id = %id, %cancelled_by, "appointment cancelled");
        Ok(cancelled)
    }

    pub async fn complete(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.complete_at(id, Utc::now()).await
    }

    pub async fn complete_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.stores.appointments.get(id).await?;
        self.ensure_transition(&appointment, AppointmentStatus::Completed)?;

        let completed = self
            .stores
            .appointments
            .update_status(
                id,
                StatusUpdate {
                    status: Some(AppointmentStatus::Completed),
                    updated_at: now,
                    ..StatusUpdate::default()
                },
            )
            .await?;

        info!(appointment_id = %id, "appointment completed");
        Ok(completed)
    }

    fn ensure_transition(
        &self,
        appointment: &Appointment,
        to: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        if appointment.status.is_terminal() {
            return Err(SchedulingError::AlreadyTerminal(appointment.status));
        }
        if !transition_allowed(appointment.status, to) {
            return Err(SchedulingError::InvalidTransition {
                from: appointment.status,
                to,
            });
        }
        Ok(())
    }
}
