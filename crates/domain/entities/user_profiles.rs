use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::user_profiles;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = user_profiles)]
pub struct UserProfileEntity {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub plan_type: String,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub monthly_limit_minutes: i32,
    pub stripe_customer_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Billing-derived profile columns. `None` leaves the column untouched.
#[derive(Debug, Clone, AsChangeset, PartialEq)]
#[diesel(table_name = user_profiles)]
pub struct ProfileBillingMirror {
    pub plan_type: String,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub monthly_limit_minutes: i32,
}
