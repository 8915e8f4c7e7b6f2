use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const CUSTOMER_CREATED: &str = "customer.created";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

/// Webhook envelope. Only `data.object` is type specific.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn from_value(payload: serde_json::Value) -> Result<Self> {
        serde_json::from_value(payload).context("invalid stripe event envelope")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(timestamp_to_datetime)
    }
}

pub fn timestamp_to_datetime(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

/// A reference that Stripe sends either as a bare id or as an expanded object.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExpandableId {
    Id(String),
    Object { id: String },
}

impl ExpandableId {
    pub fn id(&self) -> &str {
        match self {
            ExpandableId::Id(id) => id,
            ExpandableId::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: ExpandableId,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    pub trial_start: Option<i64>,
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: Option<String>,
    pub price: Option<StripePrice>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    /// Period start, falling back to the first item on newer API versions.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.first_item().and_then(|item| item.current_period_start))
    }

    /// Period end, falling back to the first item on newer API versions.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|item| item.current_period_end))
    }

    pub fn price_id(&self) -> Option<&str> {
        self.first_item()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }

    pub fn first_item_id(&self) -> Option<&str> {
        self.first_item().and_then(|item| item.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: ExpandableId,
    pub amount_paid: Option<i64>,
    pub amount_due: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub payment_intent: Option<ExpandableId>,
    pub hosted_invoice_url: Option<String>,
}

/// `data.object` decoded by event type.
#[derive(Debug, Clone)]
pub enum StripeEventPayload {
    CustomerCreated(StripeCustomer),
    SubscriptionUpserted(StripeSubscription),
    SubscriptionDeleted(StripeSubscription),
    InvoicePaymentSucceeded(StripeInvoice),
    InvoicePaymentFailed(StripeInvoice),
    Unhandled,
}

fn decode_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T> {
    T::deserialize(&event.data.object)
        .with_context(|| format!("invalid {} payload for event {}", event.type_, event.id))
}

impl StripeEventPayload {
    pub fn decode(event: &StripeEvent) -> Result<Self> {
        let payload = match event.type_.as_str() {
            CUSTOMER_CREATED => Self::CustomerCreated(decode_object(event)?),
            SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => {
                Self::SubscriptionUpserted(decode_object(event)?)
            }
            SUBSCRIPTION_DELETED => Self::SubscriptionDeleted(decode_object(event)?),
            INVOICE_PAYMENT_SUCCEEDED => Self::InvoicePaymentSucceeded(decode_object(event)?),
            INVOICE_PAYMENT_FAILED => Self::InvoicePaymentFailed(decode_object(event)?),
            _ => Self::Unhandled,
        };

        Ok(payload)
    }
}
