// libs/scheduling-cell/src/repository/memory.rs
//
// In-memory store used by the test suites and local development. The whole
// state sits behind one mutex, so `insert` naturally gets the single-writer
// serialization the appointment-store contract demands: the overlap re-check
// and the write happen inside the same critical section.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentFilters, AvailabilityRule, BlackoutPeriod, SchedulingConfig,
    StatusUpdate,
};
use crate::repository::{
    AppointmentStore, AvailabilityRuleStore, BlackoutStore, SchedulingConfigStore, StoreError,
};
use crate::time::overlaps;

#[derive(Default)]
struct Inner {
    rules: Vec<AvailabilityRule>,
    blackouts: Vec<BlackoutPeriod>,
    appointments: Vec<Appointment>,
    configs: HashMap<Uuid, SchedulingConfig>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicked test; propagate the panic.
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl AvailabilityRuleStore for MemoryStore {
    async fn list_active_rules(
        &self,
        professional_id: Uuid,
        on_date: NaiveDate,
    ) -> Result<Vec<AvailabilityRule>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .rules
            .iter()
            .filter(|r| r.professional_id == professional_id && r.applies_on(on_date))
            .cloned()
            .collect())
    }

    async fn list_rules(&self, professional_id: Uuid) -> Result<Vec<AvailabilityRule>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .rules
            .iter()
            .filter(|r| r.professional_id == professional_id)
            .cloned()
            .collect())
    }

    async fn upsert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError> {
        let mut inner = self.lock();
        match inner.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule.clone(),
            None => inner.rules.push(rule.clone()),
        }
        Ok(rule)
    }

    async fn delete_rule(&self, professional_id: Uuid, rule_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let before = inner.rules.len();
        inner
            .rules
            .retain(|r| !(r.id == rule_id && r.professional_id == professional_id));
        if inner.rules.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl BlackoutStore for MemoryStore {
    async fn list_applicable(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BlackoutPeriod>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .blackouts
            .iter()
            .filter(|b| {
                b.applies_to(professional_id)
                    && overlaps(b.starts_at, b.ends_at, range_start, range_end)
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, blackout: BlackoutPeriod) -> Result<BlackoutPeriod, StoreError> {
        let mut inner = self.lock();
        inner.blackouts.push(blackout.clone());
        Ok(blackout)
    }

    async fn delete(&self, blackout_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let before = inner.blackouts.len();
        inner.blackouts.retain(|b| b.id != blackout_id);
        if inner.blackouts.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn list_active_for_professional(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| {
                a.professional_id == professional_id
                    && a.status.is_active()
                    && overlaps(a.starts_at, a.ends_at, range_start, range_end)
            })
            .cloned()
            .collect())
    }

    async fn list_for_professional(
        &self,
        professional_id: Uuid,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.lock();
        let mut result: Vec<Appointment> = inner
            .appointments
            .iter()
            .filter(|a| a.professional_id == professional_id)
            .filter(|a| {
                filters
                    .status
                    .as_ref()
                    .map_or(true, |statuses| statuses.contains(&a.status))
            })
            .filter(|a| filters.date_start.map_or(true, |from| a.starts_at >= from))
            .filter(|a| filters.date_end.map_or(true, |to| a.starts_at <= to))
            .cloned()
            .collect();
        result.sort_by_key(|a| a.starts_at);
        Ok(result)
    }

    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.lock();
        let mut result: Vec<Appointment> = inner
            .appointments
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        Ok(result)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let inner = self.lock();
        inner
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut inner = self.lock();

        let conflict = inner.appointments.iter().any(|existing| {
            existing.professional_id == appointment.professional_id
                && existing.status.is_active()
                && overlaps(
                    existing.starts_at,
                    existing.ends_at,
                    appointment.starts_at,
                    appointment.ends_at,
                )
        });

        if conflict {
            debug!(
                "insert rejected: overlapping interval for professional {}",
                appointment.professional_id
            );
            return Err(StoreError::Conflict);
        }

        inner.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.lock();
        let appointment = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(status) = update.status {
            appointment.status = status;
        }
        if let Some(confirmed_at) = update.confirmed_at {
            appointment.confirmed_at = Some(confirmed_at);
        }
        if let Some(meeting_link) = update.meeting_link {
            appointment.meeting_link = Some(meeting_link);
        }
        if let Some(cancelled_by) = update.cancelled_by {
            appointment.cancelled_by = Some(cancelled_by);
        }
        if let Some(reason) = update.cancellation_reason {
            appointment.cancellation_reason = Some(reason);
        }
        appointment.updated_at = update.updated_at;

        Ok(appointment.clone())
    }
}

#[async_trait]
impl SchedulingConfigStore for MemoryStore {
    async fn get(&self, professional_id: Uuid) -> Result<Option<SchedulingConfig>, StoreError> {
        let inner = self.lock();
        Ok(inner.configs.get(&professional_id).cloned())
    }

    async fn upsert(&self, config: SchedulingConfig) -> Result<SchedulingConfig, StoreError> {
        let mut inner = self.lock();
        inner.configs.insert(config.professional_id, config.clone());
        Ok(config)
    }
}
