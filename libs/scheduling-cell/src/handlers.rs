// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentFilters, AppointmentStatus, BlackoutPeriod, BlackoutScope,
    BookAppointmentRequest, CancelAppointmentRequest, CreateBlackoutRequest, SchedulingConfig,
    SchedulingError, SlotQuery, UpdateConfigRequest, UpsertRuleRequest,
};
use crate::SchedulingCell;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfessionalAppointmentsQuery {
    /// Comma-separated status list, e.g. `status=pending,confirmed`.
    pub status: Option<String>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BlackoutListQuery {
    pub professional_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn is_admin(user: &User) -> bool {
    user.role.as_deref() == Some("admin")
}

fn map_scheduling_error(err: SchedulingError) -> AppError {
    match err {
        SchedulingError::Rejected(rejection) => AppError::Rejection {
            reason: rejection.reason_code(),
            message: rejection.to_string(),
        },
        SchedulingError::AlreadyTerminal(_) | SchedulingError::InvalidTransition { .. } => {
            AppError::Conflict(err.to_string())
        }
        SchedulingError::CancellationNoticeTooShort { .. } => AppError::BadRequest(err.to_string()),
        SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SchedulingError::InvalidRule(_) | SchedulingError::TimeParse(_) => {
            AppError::BadRequest(err.to_string())
        }
        SchedulingError::Store(store) => AppError::Database(store.to_string()),
    }
}

fn parse_status_filter(raw: &str) -> Result<Vec<AppointmentStatus>, AppError> {
    raw.split(',')
        .map(|part| match part.trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(AppError::BadRequest(format!(
                "Unknown appointment status: {}",
                other
            ))),
        })
        .collect()
}

// ==============================================================================
// BOOKING AND LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let student_id = caller_id(&user)?;

    let appointment = cell
        .lifecycle
        .create(student_id, request)
        .await
        .map_err(map_scheduling_error)?;

    let message = match appointment.status {
        AppointmentStatus::Confirmed => "Appointment booked and confirmed",
        _ => "Appointment booked and awaiting confirmation",
    };

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(cell): State<Arc<SchedulingCell>>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let response = cell
        .slots
        .slots_for_date(query.professional_id, query.date)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "professional_id": query.professional_id,
        "date": query.date,
        "slots": response.slots,
        "slot_duration_minutes": response.slot_duration_minutes
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    let appointment = cell
        .stores
        .appointments
        .get(appointment_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    if !appointment.involves(caller) && !is_admin(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    let appointment = cell
        .stores
        .appointments
        .get(appointment_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    if appointment.professional_id != caller && !is_admin(&user) {
        return Err(AppError::Forbidden(
            "Only the professional can confirm an appointment".to_string(),
        ));
    }

    let confirmed = cell
        .lifecycle
        .confirm(appointment_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": confirmed,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    let appointment = cell
        .stores
        .appointments
        .get(appointment_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    if !appointment.involves(caller) && !is_admin(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to cancel this appointment".to_string(),
        ));
    }

    let cancelled = cell
        .lifecycle
        .cancel(appointment_id, caller, request.reason)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    let appointment = cell
        .stores
        .appointments
        .get(appointment_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    if appointment.professional_id != caller && !is_admin(&user) {
        return Err(AppError::Forbidden(
            "Only the professional can complete an appointment".to_string(),
        ));
    }

    let completed = cell
        .lifecycle
        .complete(appointment_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": completed,
        "message": "Appointment completed"
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    let appointments = cell
        .stores
        .appointments
        .list_for_student(caller)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_professional_appointments(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<ProfessionalAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    if professional_id != caller && !is_admin(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to view this professional's calendar".to_string(),
        ));
    }

    let filters = AppointmentFilters {
        status: query.status.as_deref().map(parse_status_filter).transpose()?,
        date_start: query.date_start,
        date_end: query.date_end,
    };

    let appointments = cell
        .stores
        .appointments
        .list_for_professional(professional_id, &filters)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

// ==============================================================================
// AVAILABILITY RULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(cell): State<Arc<SchedulingCell>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let rules = cell
        .stores
        .rules
        .list_rules(professional_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": rules
    })))
}

/// Bulk upsert of the caller's own weekly availability. Malformed times and
/// inverted windows are rejected before anything is written.
#[axum::debug_handler]
pub async fn upsert_availability(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Json(requests): Json<Vec<UpsertRuleRequest>>,
) -> Result<Json<Value>, AppError> {
    let professional_id = caller_id(&user)?;

    let rules = requests
        .into_iter()
        .map(|request| request.into_rule(professional_id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_scheduling_error)?;

    let mut saved = Vec::with_capacity(rules.len());
    for rule in rules {
        let rule = cell
            .stores
            .rules
            .upsert_rule(rule)
            .await
            .map_err(SchedulingError::from)
            .map_err(map_scheduling_error)?;
        saved.push(rule);
    }

    Ok(Json(json!({
        "success": true,
        "availability": saved,
        "message": "Availability updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(rule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let professional_id = caller_id(&user)?;

    cell.stores
        .rules
        .delete_rule(professional_id, rule_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability rule deleted"
    })))
}

// ==============================================================================
// BLACKOUT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blackouts(
    State(cell): State<Arc<SchedulingCell>>,
    Query(query): Query<BlackoutListQuery>,
) -> Result<Json<Value>, AppError> {
    let blackouts = cell
        .stores
        .blackouts
        .list_applicable(query.professional_id, query.from, query.to)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "blackouts": blackouts
    })))
}

#[axum::debug_handler]
pub async fn create_blackout(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlackoutRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;

    if request.ends_at <= request.starts_at {
        return Err(AppError::BadRequest(
            "Blackout must end after it starts".to_string(),
        ));
    }

    let professional_id = match request.scope {
        BlackoutScope::Organization => {
            if !is_admin(&user) {
                return Err(AppError::Forbidden(
                    "Only admins can create organization-wide blackouts".to_string(),
                ));
            }
            None
        }
        BlackoutScope::Professional => {
            let target = request.professional_id.unwrap_or(caller);
            if target != caller && !is_admin(&user) {
                return Err(AppError::Forbidden(
                    "Not authorized to block another professional's calendar".to_string(),
                ));
            }
            Some(target)
        }
    };

    let blackout = BlackoutPeriod {
        id: Uuid::new_v4(),
        scope: request.scope,
        professional_id,
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        kind: request.kind,
        reason: request.reason,
    };

    let created = cell
        .stores
        .blackouts
        .insert(blackout)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "blackout": created,
        "message": "Blackout period created"
    })))
}

#[axum::debug_handler]
pub async fn delete_blackout(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Path(blackout_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !is_admin(&user) && user.role.as_deref() != Some("professional") {
        return Err(AppError::Forbidden(
            "Not authorized to delete blackout periods".to_string(),
        ));
    }

    cell.stores
        .blackouts
        .delete(blackout_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Blackout period deleted"
    })))
}

// ==============================================================================
// SCHEDULING CONFIG HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_scheduling_config(
    State(cell): State<Arc<SchedulingCell>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let config = cell
        .stores
        .configs
        .get(professional_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?
        .unwrap_or_else(|| SchedulingConfig::default_for(professional_id));

    Ok(Json(json!({
        "success": true,
        "config": config
    })))
}

/// Partial update of the caller's own scheduling config; unset fields keep
/// their current (or default) values.
#[axum::debug_handler]
pub async fn update_scheduling_config(
    State(cell): State<Arc<SchedulingCell>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateConfigRequest>,
) -> Result<Json<Value>, AppError> {
    let professional_id = caller_id(&user)?;

    if let Some(minutes) = request.min_advance_minutes {
        if minutes < 0 {
            return Err(AppError::BadRequest(
                "min_advance_minutes cannot be negative".to_string(),
            ));
        }
    }

    let mut config = cell
        .stores
        .configs
        .get(professional_id)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?
        .unwrap_or_else(|| SchedulingConfig::default_for(professional_id));

    if let Some(auto_confirm) = request.auto_confirm {
        config.auto_confirm = auto_confirm;
    }
    if let Some(minutes) = request.min_advance_minutes {
        config.min_advance_minutes = minutes;
    }
    if let Some(minutes) = request.reminder_lead_minutes {
        config.reminder_lead_minutes = minutes;
    }
    if let Some(link) = request.default_meeting_link {
        config.default_meeting_link = Some(link);
    }
    if let Some(message) = request.confirmation_message {
        config.confirmation_message = Some(message);
    }

    let saved = cell
        .stores
        .configs
        .upsert(config)
        .await
        .map_err(SchedulingError::from)
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "config": saved,
        "message": "Scheduling configuration updated"
    })))
}
