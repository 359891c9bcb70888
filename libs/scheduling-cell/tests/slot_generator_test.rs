// Slot generator tests: stepping, trailing-slot handling, advance-notice
// filtering, and exclusion of booked and blacked-out intervals.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentStatus, AvailabilityRule, BlackoutKind, BlackoutPeriod, BlackoutScope,
    SchedulingConfig,
};
use scheduling_cell::repository::SchedulingStores;
use scheduling_cell::services::slots::SlotGenerator;

// 2025-03-10 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

fn weekly_rule(
    professional_id: Uuid,
    day: u8,
    start: &str,
    end: &str,
    slot_duration_minutes: i64,
) -> AvailabilityRule {
    AvailabilityRule {
        id: Uuid::new_v4(),
        professional_id,
        day_of_week: day,
        start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        slot_duration_minutes,
        active: true,
        effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        effective_until: None,
        service_type: "mentoring".to_string(),
    }
}

fn booked(professional_id: Uuid, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        student_id: Uuid::new_v4(),
        starts_at,
        ends_at,
        status: AppointmentStatus::Pending,
        meeting_link: None,
        notes: None,
        cancellation_reason: None,
        cancelled_by: None,
        confirmed_at: None,
        reminder_sent: false,
        reminder_sent_at: None,
        created_at: starts_at - Duration::days(1),
        updated_at: starts_at - Duration::days(1),
    }
}

#[tokio::test]
async fn generates_slots_for_a_single_window() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "12:00", 30))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(8, 0))
        .await
        .unwrap();

    assert_eq!(
        slots,
        vec![at(9, 0), at(9, 30), at(10, 0), at(10, 30), at(11, 0), at(11, 30)]
    );
}

#[tokio::test]
async fn generation_is_deterministic() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "12:00", 30))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let first = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(8, 0))
        .await
        .unwrap();
    let second = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(8, 0))
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn drops_partial_trailing_slot() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    // 09:00-10:45 with 30-minute slots: 10:30 would spill past the window.
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "10:45", 30))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 0), at(9, 30), at(10, 0)]);
}

#[tokio::test]
async fn filters_slots_inside_the_advance_window() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "11:00", 30))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    // now = 08:30, advance = 60: anything before 09:30 is gone; the 09:30
    // boundary itself is still bookable.
    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(8, 30))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 30), at(10, 0), at(10, 30)]);
}

#[tokio::test]
async fn excludes_booked_slots() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "11:00", 30))
        .await
        .unwrap();
    stores
        .appointments
        .insert(booked(professional_id, at(9, 30), at(10, 0)))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 0), at(10, 0), at(10, 30)]);
}

#[tokio::test]
async fn excludes_blacked_out_slots() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "12:00", 30))
        .await
        .unwrap();
    // Organization-wide blackout 10:00-11:00.
    stores
        .blackouts
        .insert(BlackoutPeriod {
            id: Uuid::new_v4(),
            scope: BlackoutScope::Organization,
            professional_id: None,
            starts_at: at(10, 0),
            ends_at: at(11, 0),
            kind: BlackoutKind::Recess,
            reason: None,
        })
        .await
        .unwrap();
    // Professional-scoped blackout for someone else must not apply.
    stores
        .blackouts
        .insert(BlackoutPeriod {
            id: Uuid::new_v4(),
            scope: BlackoutScope::Professional,
            professional_id: Some(Uuid::new_v4()),
            starts_at: at(11, 0),
            ends_at: at(12, 0),
            kind: BlackoutKind::Unforeseen,
            reason: None,
        })
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 0), at(9, 30), at(11, 0), at(11, 30)]);
}

#[tokio::test]
async fn professional_scoped_blackout_applies_to_its_owner() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "10:00", 30))
        .await
        .unwrap();
    stores
        .blackouts
        .insert(BlackoutPeriod {
            id: Uuid::new_v4(),
            scope: BlackoutScope::Professional,
            professional_id: Some(professional_id),
            starts_at: at(9, 0),
            ends_at: at(9, 30),
            kind: BlackoutKind::Unforeseen,
            reason: Some("Dentist".to_string()),
        })
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 30)]);
}

#[tokio::test]
async fn merges_multiple_windows_sorted() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    // Inserted afternoon-first; output must still be ascending.
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "14:00", "15:00", 30))
        .await
        .unwrap();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "10:00", 30))
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert_eq!(slots, vec![at(9, 0), at(9, 30), at(14, 0), at(14, 30)]);
}

#[tokio::test]
async fn no_rules_means_no_slots() {
    let professional_id = Uuid::new_v4();
    let generator = SlotGenerator::new(SchedulingStores::in_memory());

    let slots = generator
        .generate_slots_at(professional_id, monday(), 30, 60, at(7, 0))
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn slots_for_date_resolves_duration_and_advance() {
    let professional_id = Uuid::new_v4();
    let stores = SchedulingStores::in_memory();
    stores
        .rules
        .upsert_rule(weekly_rule(professional_id, 1, "09:00", "11:00", 60))
        .await
        .unwrap();
    // Tighter advance window than the default.
    stores
        .configs
        .upsert(SchedulingConfig {
            min_advance_minutes: 120,
            ..SchedulingConfig::default_for(professional_id)
        })
        .await
        .unwrap();
    let generator = SlotGenerator::new(stores);

    let response = generator
        .slots_for_date_at(professional_id, monday(), at(8, 0))
        .await
        .unwrap();

    // Duration comes from the rule; 09:00 is inside the 2h advance window.
    assert_eq!(response.slot_duration_minutes, 60);
    assert_eq!(response.slots, vec![at(10, 0)]);
}

#[tokio::test]
async fn slots_for_date_defaults_to_thirty_minutes_without_rules() {
    let professional_id = Uuid::new_v4();
    let generator = SlotGenerator::new(SchedulingStores::in_memory());

    let response = generator
        .slots_for_date_at(professional_id, monday(), at(7, 0))
        .await
        .unwrap();

    assert_eq!(response.slot_duration_minutes, 30);
    assert!(response.slots.is_empty());
}
