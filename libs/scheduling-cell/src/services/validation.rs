// libs/scheduling-cell/src/services/validation.rs
//
// The single booking-validation pipeline. Every path that admits an
// appointment runs these stages in this order, short-circuiting on the
// first failure:
//
//   1. minimum advance notice
//   2. duration bounds
//   3. availability containment
//   4. blackout overlap
//   5. appointment conflict
//
// A pass is advisory only: the conflict stage reads a snapshot, and the
// store's atomic `insert` has the final word on the non-overlap invariant.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{BookingCandidate, BookingRejection, SchedulingConfig, SchedulingError,
    SchedulingPolicy};
use crate::repository::SchedulingStores;
use crate::time::{day_of_week, duration_minutes, minutes_of_day};

pub struct ValidationPipeline {
    stores: SchedulingStores,
    policy: SchedulingPolicy,
}

impl ValidationPipeline {
    pub fn new(stores: SchedulingStores) -> Self {
        Self::with_policy(stores, SchedulingPolicy::default())
    }

    pub fn with_policy(stores: SchedulingStores, policy: SchedulingPolicy) -> Self {
        Self { stores, policy }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub async fn validate(
        &self,
        candidate: BookingCandidate,
        config: &SchedulingConfig,
    ) -> Result<(), SchedulingError> {
        self.validate_at(candidate, config, Utc::now()).await
    }

    /// Deterministic entry point: `now` is the reference clock for the
    /// advance-notice stage.
    pub async fn validate_at(
        &self,
        candidate: BookingCandidate,
        config: &SchedulingConfig,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        self.check_advance_notice(&candidate, config, now)?;
        self.check_duration(&candidate)?;
        self.check_availability(&candidate).await?;
        self.check_blackouts(&candidate).await?;
        self.check_conflicts(&candidate).await?;

        debug!(
            professional_id = %candidate.professional_id,
            starts_at = %candidate.starts_at,
            "booking candidate passed validation"
        );
        Ok(())
    }

    fn check_advance_notice(
        &self,
        candidate: &BookingCandidate,
        config: &SchedulingConfig,
        now: DateTime<Utc>,
    ) -> Result<(), BookingRejection> {
        let earliest = now + Duration::minutes(config.min_advance_minutes);
        if candidate.starts_at < earliest {
            debug!(
                professional_id = %candidate.professional_id,
                "rejected: starts before the {} minute advance window",
                config.min_advance_minutes
            );
            return Err(BookingRejection::AdvanceNoticeTooShort {
                min_advance_minutes: config.min_advance_minutes,
            });
        }
        Ok(())
    }

    fn check_duration(&self, candidate: &BookingCandidate) -> Result<(), BookingRejection> {
        let duration = duration_minutes(candidate.starts_at, candidate.ends_at);
        if duration < self.policy.min_duration_minutes
            || duration > self.policy.max_duration_minutes
        {
            return Err(BookingRejection::DurationOutOfBounds {
                min: self.policy.min_duration_minutes,
                max: self.policy.max_duration_minutes,
            });
        }
        Ok(())
    }

    /// Full containment: the candidate must fit entirely inside ONE rule
    /// window on the matching weekday. Partial overlap with a window is a
    /// rejection, as is an interval crossing midnight.
    async fn check_availability(&self, candidate: &BookingCandidate) -> Result<(), SchedulingError> {
        let date = candidate.starts_at.date_naive();
        if candidate.ends_at.date_naive() != date {
            return Err(BookingRejection::OutsideAvailability.into());
        }

        let weekday = day_of_week(date);
        let start_min = minutes_of_day(candidate.starts_at);
        let end_min = minutes_of_day(candidate.ends_at);

        let rules = self
            .stores
            .rules
            .list_active_rules(candidate.professional_id, date)
            .await?;

        let contained = rules.iter().any(|rule| {
            rule.day_of_week == weekday
                && start_min >= rule.start_minutes()
                && end_min <= rule.end_minutes()
        });

        if !contained {
            debug!(
                professional_id = %candidate.professional_id,
                %date,
                "rejected: no availability window contains the candidate"
            );
            return Err(BookingRejection::OutsideAvailability.into());
        }
        Ok(())
    }

    async fn check_blackouts(&self, candidate: &BookingCandidate) -> Result<(), SchedulingError> {
        let blocking = self
            .stores
            .blackouts
            .list_applicable(
                candidate.professional_id,
                candidate.starts_at,
                candidate.ends_at,
            )
            .await?;

        if !blocking.is_empty() {
            debug!(
                professional_id = %candidate.professional_id,
                "rejected: candidate intersects {} blackout period(s)",
                blocking.len()
            );
            return Err(BookingRejection::Blocked.into());
        }
        Ok(())
    }

    async fn check_conflicts(&self, candidate: &BookingCandidate) -> Result<(), SchedulingError> {
        let conflicting = self
            .stores
            .appointments
            .list_active_for_professional(
                candidate.professional_id,
                candidate.starts_at,
                candidate.ends_at,
            )
            .await?;

        if !conflicting.is_empty() {
            return Err(BookingRejection::SlotAlreadyBooked.into());
        }
        Ok(())
    }
}
