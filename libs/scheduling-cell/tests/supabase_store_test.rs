// Supabase store tests against a wiremock server: query construction, row
// parsing, and the 409-to-Conflict mapping the booking race depends on.

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{Appointment, AppointmentStatus};
use scheduling_cell::repository::{SchedulingStores, StoreError};
use shared_utils::test_utils::TestConfig;

fn appointment_row(id: Uuid, professional_id: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "professional_id": professional_id,
        "student_id": Uuid::new_v4(),
        "starts_at": "2025-03-10T10:00:00Z",
        "ends_at": "2025-03-10T10:30:00Z",
        "status": "pending",
        "meeting_link": null,
        "notes": null,
        "cancellation_reason": null,
        "cancelled_by": null,
        "confirmed_at": null,
        "reminder_sent": false,
        "reminder_sent_at": null,
        "created_at": "2025-03-09T10:00:00Z",
        "updated_at": "2025-03-09T10:00:00Z"
    })
}

fn sample_appointment(professional_id: Uuid) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        student_id: Uuid::new_v4(),
        starts_at: Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap(),
        status: AppointmentStatus::Pending,
        meeting_link: None,
        notes: None,
        cancellation_reason: None,
        cancelled_by: None,
        confirmed_at: None,
        reminder_sent: false,
        reminder_sent_at: None,
        created_at: Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn lists_active_rules_with_effective_date_filters() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("active", "eq.true"))
        .and(query_param("effective_from", "lte.2025-03-10"))
        .and(header("apikey", "test-service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "professional_id": professional_id,
            "day_of_week": 1,
            "start_time": "09:00:00",
            "end_time": "12:00:00",
            "slot_duration_minutes": 30,
            "active": true,
            "effective_from": "2025-01-01",
            "effective_until": null,
            "service_type": "mentoring"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let rules = stores
        .rules
        .list_active_rules(professional_id, chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        .await
        .unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].day_of_week, 1);
    assert_eq!(rules[0].slot_duration_minutes, 30);
}

#[tokio::test]
async fn insert_maps_conflict_status_to_store_conflict() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    // PostgREST surfaces the exclusion-constraint violation as 409.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let result = stores.appointments.insert(sample_appointment(professional_id)).await;

    assert_matches!(result, Err(StoreError::Conflict));
}

#[tokio::test]
async fn insert_returns_the_created_row() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([appointment_row(id, professional_id)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let created = stores
        .appointments
        .insert(sample_appointment(professional_id))
        .await
        .unwrap();

    assert_eq!(created.id, id);
    assert_eq!(created.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn get_with_empty_result_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let result = stores.appointments.get(Uuid::new_v4()).await;

    assert_matches!(result, Err(StoreError::NotFound));
}

#[tokio::test]
async fn active_listing_filters_by_status_and_range() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "in.(pending,confirmed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(Uuid::new_v4(), professional_id)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let appointments = stores
        .appointments
        .list_active_for_professional(
            professional_id,
            Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].professional_id, professional_id);
}

#[tokio::test]
async fn server_errors_surface_as_database_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/scheduling_configs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri());
    let stores = SchedulingStores::supabase(&config);

    let result = stores.configs.get(Uuid::new_v4()).await;

    assert_matches!(result, Err(StoreError::Database(_)));
}
