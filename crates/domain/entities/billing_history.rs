use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::billing_history;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = billing_history)]
pub struct BillingHistoryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub status: String,
    pub stripe_invoice_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub invoice_url: Option<String>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = billing_history)]
pub struct InsertBillingHistoryEntity {
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub status: String,
    pub stripe_invoice_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub invoice_url: Option<String>,
    pub payment_date: DateTime<Utc>,
}
