// libs/scheduling-cell/src/services/slots.rs
//
// Bookable-slot generation for a professional on a given date. The generator
// is deterministic given fixed store contents and an explicit `now`; the
// listing is advisory and a returned slot can still lose to a concurrent
// booking at insert time.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use crate::models::{SchedulingConfig, SchedulingError, SlotListResponse};
use crate::repository::SchedulingStores;
use crate::time::{day_of_week, overlaps};
use uuid::Uuid;

const DEFAULT_SLOT_DURATION_MINUTES: i64 = 30;

pub struct SlotGenerator {
    stores: SchedulingStores,
}

impl SlotGenerator {
    pub fn new(stores: SchedulingStores) -> Self {
        Self { stores }
    }

    pub async fn slots_for_date(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<SlotListResponse, SchedulingError> {
        self.slots_for_date_at(professional_id, date, Utc::now())
            .await
    }

    /// Resolves the slot duration from the day's first rule (falling back to
    /// 30 minutes) and the advance-notice window from the professional's
    /// config, then generates.
    pub async fn slots_for_date_at(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SlotListResponse, SchedulingError> {
        let config = self
            .stores
            .configs
            .get(professional_id)
            .await?
            .unwrap_or_else(|| SchedulingConfig::default_for(professional_id));

        let weekday = day_of_week(date);
        let slot_duration = self
            .stores
            .rules
            .list_active_rules(professional_id, date)
            .await?
            .iter()
            .find(|rule| rule.day_of_week == weekday && rule.slot_duration_minutes > 0)
            .map(|rule| rule.slot_duration_minutes)
            .unwrap_or(DEFAULT_SLOT_DURATION_MINUTES);

        let slots = self
            .generate_slots_at(
                professional_id,
                date,
                slot_duration,
                config.min_advance_minutes,
                now,
            )
            .await?;

        Ok(SlotListResponse {
            slots,
            slot_duration_minutes: slot_duration,
        })
    }

    /// Steps through each availability window in `slot_duration_minutes`
    /// increments, keeping only starts whose full interval fits inside the
    /// window (a partial trailing slot is dropped, never rounded), then
    /// filters out slots that start before `now + min_advance`, intersect an
    /// active appointment, or intersect a blackout period.
    pub async fn generate_slots_at(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        slot_duration_minutes: i64,
        min_advance_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, SchedulingError> {
        if slot_duration_minutes <= 0 {
            return Ok(Vec::new());
        }

        let weekday = day_of_week(date);
        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let min_allowed = now + Duration::minutes(min_advance_minutes);
        let step = slot_duration_minutes as u32;

        let rules = self
            .stores
            .rules
            .list_active_rules(professional_id, date)
            .await?;
        let appointments = self
            .stores
            .appointments
            .list_active_for_professional(professional_id, day_start, day_end)
            .await?;
        let blackouts = self
            .stores
            .blackouts
            .list_applicable(professional_id, day_start, day_end)
            .await?;

        let mut slots = Vec::new();
        for rule in rules.iter().filter(|r| r.day_of_week == weekday) {
            let mut t = rule.start_minutes();
            while t + step <= rule.end_minutes() {
                let slot_start = day_start + Duration::minutes(t as i64);
                let slot_end = slot_start + Duration::minutes(slot_duration_minutes);
                t += step;

                if slot_start < min_allowed {
                    continue;
                }
                let booked = appointments
                    .iter()
                    .any(|a| overlaps(a.starts_at, a.ends_at, slot_start, slot_end));
                if booked {
                    continue;
                }
                let blocked = blackouts
                    .iter()
                    .any(|b| overlaps(b.starts_at, b.ends_at, slot_start, slot_end));
                if blocked {
                    continue;
                }

                slots.push(slot_start);
            }
        }

        slots.sort();
        slots.dedup();

        debug!(
            %professional_id,
            %date,
            slot_duration_minutes,
            count = slots.len(),
            "generated available slots"
        );
        Ok(slots)
    }
}
