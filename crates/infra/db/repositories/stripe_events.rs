use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::{Connection, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::stripe_events},
};
use domain::{
    entities::stripe_events::{InsertStripeEventEntity, StripeEventEntity},
    repositories::stripe_events::StripeEventRepository,
    value_objects::stripe_events::EventClaim,
};

pub struct StripeEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl StripeEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl StripeEventRepository for StripeEventPostgres {
    async fn claim_event(
        &self,
        event: InsertStripeEventEntity,
        processing_lease: Duration,
    ) -> Result<EventClaim> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The unique index on stripe_event_id decides which concurrent delivery wins.
        let claim = conn.transaction::<EventClaim, diesel::result::Error, _>(|conn| {
            let inserted = insert_into(stripe_events::table)
                .values(&event)
                .on_conflict(stripe_events::stripe_event_id)
                .do_nothing()
                .execute(conn)?;

            if inserted == 1 {
                return Ok(EventClaim::Claimed);
            }

            let existing = stripe_events::table
                .filter(stripe_events::stripe_event_id.eq(&event.stripe_event_id))
                .select(StripeEventEntity::as_select())
                .for_update()
                .first::<StripeEventEntity>(conn)?;

            if existing.processed {
                return Ok(EventClaim::AlreadyProcessed);
            }

            let now = Utc::now();
            if existing.claimed_at + processing_lease > now {
                return Ok(EventClaim::InFlight);
            }

            let attempts = existing.attempts + 1;
            update(stripe_events::table.filter(stripe_events::id.eq(existing.id)))
                .set((
                    stripe_events::claimed_at.eq(now),
                    stripe_events::attempts.eq(attempts),
                ))
                .execute(conn)?;

            Ok(EventClaim::Reclaimed { attempts })
        })?;

        Ok(claim)
    }

    async fn mark_processed(&self, stripe_event_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            stripe_events::table
                .filter(stripe_events::stripe_event_id.eq(stripe_event_id))
                .filter(stripe_events::processed.eq(false)),
        )
        .set((
            stripe_events::processed.eq(true),
            stripe_events::processed_at.eq(Some(Utc::now())),
            stripe_events::last_error.eq::<Option<String>>(None),
        ))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn record_failure(&self, stripe_event_id: &str, error: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(stripe_events::table.filter(stripe_events::stripe_event_id.eq(stripe_event_id)))
            .set(stripe_events::last_error.eq(Some(error)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn list_replayable(
        &self,
        processing_lease: Duration,
        limit: i64,
    ) -> Result<Vec<StripeEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let lease_expired_before = Utc::now() - processing_lease;

        let events = stripe_events::table
            .filter(stripe_events::processed.eq(false))
            .filter(stripe_events::claimed_at.lt(lease_expired_before))
            .order(stripe_events::claimed_at.asc())
            .limit(limit)
            .select(StripeEventEntity::as_select())
            .load::<StripeEventEntity>(&mut conn)?;

        Ok(events)
    }
}
