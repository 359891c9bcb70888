// libs/scheduling-cell/src/repository/supabase.rs
//
// Supabase/PostgREST-backed implementation of the scheduling stores. The
// non-overlap invariant is enforced by an exclusion constraint on
// appointments (professional_id, tstzrange(starts_at, ends_at)) limited to
// active statuses; a violated constraint surfaces as HTTP 409 and is mapped
// to `StoreError::Conflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    Appointment, AppointmentFilters, AvailabilityRule, BlackoutPeriod, SchedulingConfig,
    StatusUpdate,
};
use crate::repository::{
    AppointmentStore, AvailabilityRuleStore, BlackoutStore, SchedulingConfigStore, StoreError,
};

pub struct SupabaseSchedulingStore {
    client: Arc<SupabaseClient>,
}

impl SupabaseSchedulingStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    fn return_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn upsert_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        headers
    }

    fn encode_ts(ts: DateTime<Utc>) -> String {
        urlencoding::encode(&ts.to_rfc3339()).into_owned()
    }

    fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| StoreError::Database(format!("failed to parse row: {}", e)))
    }

    fn single_row<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<T, StoreError> {
        let row = rows.into_iter().next().ok_or(StoreError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| StoreError::Database(format!("failed to parse row: {}", e)))
    }
}

fn map_err(err: SupabaseError) -> StoreError {
    if err.is_conflict() {
        return StoreError::Conflict;
    }
    if err.is_not_found() {
        return StoreError::NotFound;
    }
    // PostgREST reports exclusion/unique violations in the body; treat them
    // as conflicts even when the status is not 409.
    let text = err.to_string();
    if text.contains("23P01") || text.contains("23505") {
        return StoreError::Conflict;
    }
    StoreError::Database(text)
}

#[async_trait]
impl AvailabilityRuleStore for SupabaseSchedulingStore {
    async fn list_active_rules(
        &self,
        professional_id: Uuid,
        on_date: NaiveDate,
    ) -> Result<Vec<AvailabilityRule>, StoreError> {
        let path = format!(
            "/rest/v1/availability_rules?professional_id=eq.{}&active=eq.true&effective_from=lte.{}&or=(effective_until.is.null,effective_until.gte.{})",
            professional_id, on_date, on_date
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn list_rules(&self, professional_id: Uuid) -> Result<Vec<AvailabilityRule>, StoreError> {
        let path = format!(
            "/rest/v1/availability_rules?professional_id=eq.{}&order=day_of_week.asc,start_time.asc",
            professional_id
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn upsert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError> {
        debug!(
            "Upserting availability rule {} for professional {}",
            rule.id, rule.professional_id
        );
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability_rules",
                Some(json!(rule)),
                Some(Self::upsert_headers()),
            )
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }

    async fn delete_rule(&self, professional_id: Uuid, rule_id: Uuid) -> Result<(), StoreError> {
        let path = format!(
            "/rest/v1/availability_rules?id=eq.{}&professional_id=eq.{}",
            rule_id, professional_id
        );
        let rows: Vec<Value> = self
            .client
            .request_with_headers(Method::DELETE, &path, None, Some(Self::return_representation()))
            .await
            .map_err(map_err)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl BlackoutStore for SupabaseSchedulingStore {
    async fn list_applicable(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BlackoutPeriod>, StoreError> {
        let path = format!(
            "/rest/v1/blackout_periods?or=(scope.eq.organization,professional_id.eq.{})&starts_at=lt.{}&ends_at=gt.{}",
            professional_id,
            Self::encode_ts(range_end),
            Self::encode_ts(range_start),
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn insert(&self, blackout: BlackoutPeriod) -> Result<BlackoutPeriod, StoreError> {
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/blackout_periods",
                Some(json!(blackout)),
                Some(Self::return_representation()),
            )
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }

    async fn delete(&self, blackout_id: Uuid) -> Result<(), StoreError> {
        let path = format!("/rest/v1/blackout_periods?id=eq.{}", blackout_id);
        let rows: Vec<Value> = self
            .client
            .request_with_headers(Method::DELETE, &path, None, Some(Self::return_representation()))
            .await
            .map_err(map_err)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for SupabaseSchedulingStore {
    async fn list_active_for_professional(
        &self,
        professional_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&status=in.(pending,confirmed)&starts_at=lt.{}&ends_at=gt.{}&order=starts_at.asc",
            professional_id,
            Self::encode_ts(range_end),
            Self::encode_ts(range_start),
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn list_for_professional(
        &self,
        professional_id: Uuid,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = vec![format!("professional_id=eq.{}", professional_id)];

        if let Some(statuses) = &filters.status {
            let list = statuses
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",");
            query_parts.push(format!("status=in.({})", list));
        }
        if let Some(from) = filters.date_start {
            query_parts.push(format!("starts_at=gte.{}", Self::encode_ts(from)));
        }
        if let Some(to) = filters.date_end {
            query_parts.push(format!("starts_at=lte.{}", Self::encode_ts(to)));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=starts_at.asc",
            query_parts.join("&")
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?student_id=eq.{}&order=starts_at.desc",
            student_id
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::parse_rows(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        debug!(
            "Inserting appointment {} for professional {}",
            appointment.id, appointment.professional_id
        );
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(json!(appointment)),
                Some(Self::return_representation()),
            )
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError> {
        let mut body = serde_json::Map::new();
        if let Some(status) = update.status {
            body.insert("status".to_string(), json!(status));
        }
        if let Some(confirmed_at) = update.confirmed_at {
            body.insert("confirmed_at".to_string(), json!(confirmed_at));
        }
        if let Some(meeting_link) = update.meeting_link {
            body.insert("meeting_link".to_string(), json!(meeting_link));
        }
        if let Some(cancelled_by) = update.cancelled_by {
            body.insert("cancelled_by".to_string(), json!(cancelled_by));
        }
        if let Some(reason) = update.cancellation_reason {
            body.insert("cancellation_reason".to_string(), json!(reason));
        }
        body.insert("updated_at".to_string(), json!(update.updated_at));

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(body)),
                Some(Self::return_representation()),
            )
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }
}

#[async_trait]
impl SchedulingConfigStore for SupabaseSchedulingStore {
    async fn get(&self, professional_id: Uuid) -> Result<Option<SchedulingConfig>, StoreError> {
        let path = format!(
            "/rest/v1/scheduling_configs?professional_id=eq.{}",
            professional_id
        );
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(map_err)?;
        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| StoreError::Database(format!("failed to parse row: {}", e))),
            None => Ok(None),
        }
    }

    async fn upsert(&self, config: SchedulingConfig) -> Result<SchedulingConfig, StoreError> {
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/scheduling_configs",
                Some(json!(config)),
                Some(Self::upsert_headers()),
            )
            .await
            .map_err(map_err)?;
        Self::single_row(rows)
    }
}
