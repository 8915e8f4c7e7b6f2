use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::user_subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = user_subscriptions)]
pub struct UserSubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub plan_id: Option<Uuid>,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full snapshot written on every subscription event. Nullable markers are
/// written as NULL when absent so the row always mirrors the latest event.
#[derive(Debug, Clone, Insertable, AsChangeset, PartialEq)]
#[diesel(table_name = user_subscriptions)]
#[diesel(treat_none_as_null = true)]
pub struct UpsertUserSubscriptionEntity {
    pub user_id: Uuid,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub plan_id: Option<Uuid>,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
