use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::stripe_events;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = stripe_events)]
pub struct StripeEventEntity {
    pub id: Uuid,
    pub stripe_event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = stripe_events)]
pub struct InsertStripeEventEntity {
    pub stripe_event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub attempts: i32,
    pub received_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
}
