// libs/scheduling-cell/src/lib.rs
//
// Appointment scheduling and availability engine: recurring weekly
// availability rules, blackout periods, slot generation and the booking
// lifecycle. Persistence is reached only through the repository traits in
// `repository`; handlers sit on top of the services and never touch a store
// directly.

pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;
pub mod time;

use std::sync::Arc;

use shared_config::AppConfig;

use crate::repository::SchedulingStores;
use crate::services::lifecycle::LifecycleManager;
use crate::services::slots::SlotGenerator;

/// Shared state for the scheduling routes: the injected stores plus the two
/// service entry points built on them.
pub struct SchedulingCell {
    pub stores: SchedulingStores,
    pub lifecycle: LifecycleManager,
    pub slots: SlotGenerator,
}

impl SchedulingCell {
    pub fn new(stores: SchedulingStores) -> Self {
        Self {
            lifecycle: LifecycleManager::new(stores.clone()),
            slots: SlotGenerator::new(stores.clone()),
            stores,
        }
    }

    /// Production wiring: all four stores backed by the Supabase REST API.
    pub fn supabase(config: &AppConfig) -> Self {
        Self::new(SchedulingStores::supabase(config))
    }

    /// In-memory wiring for tests and local development.
    pub fn in_memory() -> Self {
        Self::new(SchedulingStores::in_memory())
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
