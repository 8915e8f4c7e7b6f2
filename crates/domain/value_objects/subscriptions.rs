use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::{plans::PlanEntity, user_subscriptions::UserSubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

/// What happened to a subscription snapshot handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    /// The stored row already reflects a newer event.
    Stale {
        stored_event_at: DateTime<Utc>,
    },
    /// The stored row is canceled; a canceled subscription never becomes current again.
    Terminated,
}

/// Locked state of an existing subscription row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubscriptionState {
    pub status: String,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Returns why an incoming snapshot must be discarded, or `None` when it may be written.
pub fn discard_reason(
    stored: Option<&StoredSubscriptionState>,
    incoming_status: &str,
    incoming_event_at: Option<DateTime<Utc>>,
) -> Option<SnapshotOutcome> {
    let stored = stored?;

    if stored.status == SubscriptionStatus::Canceled.as_str() && incoming_status != stored.status {
        return Some(SnapshotOutcome::Terminated);
    }

    match stored.last_event_at {
        Some(stored_event_at) if is_stale_event(Some(stored_event_at), incoming_event_at) => {
            Some(SnapshotOutcome::Stale { stored_event_at })
        }
        _ => None,
    }
}

/// An event is stale only when both timestamps are known and the incoming one is strictly older.
pub fn is_stale_event(
    stored_event_at: Option<DateTime<Utc>>,
    incoming_event_at: Option<DateTime<Utc>>,
) -> bool {
    matches!(
        (stored_event_at, incoming_event_at),
        (Some(stored), Some(incoming)) if incoming < stored
    )
}

/// `last_event_at` after applying an event: never moves backwards.
pub fn merge_event_at(
    stored_event_at: Option<DateTime<Utc>>,
    incoming_event_at: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (stored_event_at, incoming_event_at) {
        (Some(stored), Some(incoming)) => Some(stored.max(incoming)),
        (stored, incoming) => incoming.or(stored),
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i32,
    pub currency: String,
    pub monthly_minutes: i32,
    pub api_calls_limit: i32,
    pub features: Vec<String>,
    pub stripe_price_id: Option<String>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            price_minor: value.price_minor,
            currency: value.currency,
            monthly_minutes: value.monthly_minutes,
            api_calls_limit: value.api_calls_limit,
            features: value.features,
            stripe_price_id: value.stripe_price_id,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CurrentSubscriptionDto {
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub trial_end: Option<DateTime<Utc>>,
    pub plan: Option<PlanDto>,
}

impl CurrentSubscriptionDto {
    pub fn from_entity(
        subscription: UserSubscriptionEntity,
        status: SubscriptionStatus,
        plan: Option<PlanEntity>,
    ) -> Self {
        Self {
            stripe_subscription_id: subscription.stripe_subscription_id,
            status,
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
            trial_end: subscription.trial_end,
            plan: plan.map(PlanDto::from),
        }
    }
}
