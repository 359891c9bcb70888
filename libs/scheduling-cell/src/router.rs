// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::SchedulingCell;

pub fn scheduling_routes(cell: Arc<SchedulingCell>, config: Arc<AppConfig>) -> Router {
    // Every scheduling operation requires a bearer token; role and ownership
    // checks happen in the handlers.
    let protected_routes = Router::new()
        // Booking and lifecycle
        .route("/", post(handlers::book_appointment))
        .route("/slots", get(handlers::get_available_slots))
        .route("/mine", get(handlers::get_my_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        // Calendar listings
        .route(
            "/professionals/{professional_id}",
            get(handlers::get_professional_appointments),
        )
        // Weekly availability management
        .route(
            "/availability/{professional_id}",
            get(handlers::get_availability),
        )
        .route("/availability", put(handlers::upsert_availability))
        .route(
            "/availability/rules/{rule_id}",
            delete(handlers::delete_availability),
        )
        // Blackout periods
        .route("/blackouts", get(handlers::list_blackouts))
        .route("/blackouts", post(handlers::create_blackout))
        .route("/blackouts/{blackout_id}", delete(handlers::delete_blackout))
        // Per-professional scheduling config
        .route(
            "/config/{professional_id}",
            get(handlers::get_scheduling_config),
        )
        .route("/config", put(handlers::update_scheduling_config))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    protected_routes.with_state(cell)
}
