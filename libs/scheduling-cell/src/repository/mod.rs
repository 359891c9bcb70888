// libs/scheduling-cell/src/repository/mod.rs
//
// Store traits consumed by the engine. The engine borrows these through
// `Arc<dyn …>` and never owns the persistence layer; the non-overlap
// invariant is enforced at this boundary, not by the validation pre-check.

pub mod memory;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentFilters, AvailabilityRule, BlackoutPeriod, SchedulingConfig,
    StatusUpdate,
};
use crate::repository::memory::MemoryStore;
use crate::repository::supabase::SupabaseSchedulingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// The insert lost against a concurrent booking for an overlapping
    /// interval. Callers translate this into the same rejection as a
    /// conflict detected at read time.
    #[error("conflicting appointment interval")]
    Conflict,

    #[error("store error: {0}")]
    Database(String),
}

#[async_trait]
pub trait AvailabilityRuleStore: Send + Sync {
    /// Rules where `active`, `effective_from <= on_date` and
    /// `effective_until` is unset or `>= on_date`. A day may carry multiple
    /// disjoint windows; no ordering is guaranteed.
    async fn list_active_rules(
        &self,
        professional_id: Uuid,
        on_date: NaiveDate,
    ) -> Result<Vec<AvailabilityRule>, StoreError>;

    async fn list_rules(&self, professional_id: Uuid) -> Result<Vec<AvailabilityRule>, StoreError>;

    async fn upsert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError>;

    async fn delete_rule(&self, professional_id: Uuid, rule_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BlackoutStore: Send + Sync {
    /// Organization-scoped entries plus the professional's own, intersecting
    /// the half-open range.
    async fn list_applicable(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BlackoutPeriod>, StoreError>;

    async fn insert(&self, blackout: BlackoutPeriod) -> Result<BlackoutPeriod, StoreError>;

    async fn delete(&self, blackout_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments with an active status (pending or confirmed) whose
    /// interval intersects the range. Source of truth for conflict checks.
    async fn list_active_for_professional(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn list_for_professional(
        &self,
        professional_id: Uuid,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError>;

    /// Persist a new appointment. MUST be atomic with respect to the
    /// non-overlap invariant: of two concurrent inserts with overlapping
    /// intervals for the same professional, at most one may succeed; the
    /// loser gets `StoreError::Conflict`. A failed or timed-out insert
    /// leaves no partial record.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError>;
}

#[async_trait]
pub trait SchedulingConfigStore: Send + Sync {
    /// `None` means the professional has no record and the documented
    /// defaults apply.
    async fn get(&self, professional_id: Uuid) -> Result<Option<SchedulingConfig>, StoreError>;

    async fn upsert(&self, config: SchedulingConfig) -> Result<SchedulingConfig, StoreError>;
}

/// The four stores the engine composes, bundled for injection.
#[derive(Clone)]
pub struct SchedulingStores {
    pub rules: Arc<dyn AvailabilityRuleStore>,
    pub blackouts: Arc<dyn BlackoutStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub configs: Arc<dyn SchedulingConfigStore>,
}

impl SchedulingStores {
    pub fn supabase(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseSchedulingStore::new(Arc::new(SupabaseClient::new(
            config,
        ))));
        Self {
            rules: store.clone(),
            blackouts: store.clone(),
            appointments: store.clone(),
            configs: store,
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            rules: store.clone(),
            blackouts: store.clone(),
            appointments: store.clone(),
            configs: store,
        }
    }
}
