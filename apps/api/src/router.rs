use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::SchedulingCell;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let cell = SchedulingCell::supabase(&state).into_shared();

    Router::new()
        .route("/", get(|| async { "MentorHub scheduling API is running!" }))
        .nest("/appointments", scheduling_routes(cell, state))
}
