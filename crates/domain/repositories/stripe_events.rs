use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use mockall::automock;

use crate::domain::{
    entities::stripe_events::{InsertStripeEventEntity, StripeEventEntity},
    value_objects::stripe_events::EventClaim,
};

/// Append-only log of received provider events, keyed by provider event id.
#[automock]
#[async_trait]
pub trait StripeEventRepository {
    /// Atomically records the event (unprocessed) or reports why it must not be processed now.
    async fn claim_event(
        &self,
        event: InsertStripeEventEntity,
        processing_lease: Duration,
    ) -> Result<EventClaim>;

    async fn mark_processed(&self, stripe_event_id: &str) -> Result<()>;

    async fn record_failure(&self, stripe_event_id: &str, error: &str) -> Result<()>;

    /// Unprocessed events whose claim lease expired, oldest first.
    async fn list_replayable(
        &self,
        processing_lease: Duration,
        limit: i64,
    ) -> Result<Vec<StripeEventEntity>>;
}
