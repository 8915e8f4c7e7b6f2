use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::billing_history::BillingHistoryEntity,
    value_objects::plans::{DEFAULT_MONTHLY_MINUTES, FREE_PLAN_TYPE},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UsageLimitsDto {
    pub monthly_minutes: i32,
    pub plan_type: String,
}

impl Default for UsageLimitsDto {
    fn default() -> Self {
        Self {
            monthly_minutes: DEFAULT_MONTHLY_MINUTES,
            plan_type: FREE_PLAN_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BillingHistoryDto {
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub status: String,
    pub stripe_invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub payment_date: DateTime<Utc>,
}

impl From<BillingHistoryEntity> for BillingHistoryDto {
    fn from(value: BillingHistoryEntity) -> Self {
        Self {
            amount: value.amount,
            currency: value.currency,
            description: value.description,
            status: value.status,
            stripe_invoice_id: value.stripe_invoice_id,
            invoice_url: value.invoice_url,
            payment_date: value.payment_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub price_id: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CreateCheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CreateCustomerResponse {
    pub customer_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PortalResponse {
    pub portal_url: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ManageSubscriptionAction {
    Cancel,
    Reactivate,
    ChangePlan,
}

#[derive(Debug, Deserialize)]
pub struct ManageSubscriptionRequest {
    pub action: ManageSubscriptionAction,
    pub subscription_id: String,
    pub new_price_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ManageSubscriptionResponse {
    pub success: bool,
    pub subscription: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct BillingHistoryQuery {
    pub limit: Option<i64>,
}
