//! Shared builders for use case tests.

use billing_core::{
    domain::entities::{
        plans::PlanEntity, user_profiles::UserProfileEntity,
        user_subscriptions::UserSubscriptionEntity,
    },
    payments::{
        stripe_events::{StripeInvoice, StripeSubscription},
        webhook_signature::compute_signature,
    },
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn basic_profile() -> UserProfileEntity {
    UserProfileEntity {
        id: Uuid::new_v4(),
        email: "ada@example.com".to_string(),
        full_name: Some("Ada Lovelace".to_string()),
        plan_type: "free".to_string(),
        subscription_status: None,
        current_period_end: None,
        monthly_limit_minutes: 1000,
        stripe_customer_id: Some("cus_1".to_string()),
        updated_at: Utc::now(),
    }
}

pub fn pro_plan() -> PlanEntity {
    PlanEntity {
        id: Uuid::new_v4(),
        name: "Pro".to_string(),
        price_minor: 4900,
        currency: "usd".to_string(),
        monthly_minutes: 6000,
        api_calls_limit: 10_000,
        features: vec!["priority_support".to_string()],
        stripe_price_id: Some("price_pro".to_string()),
        is_active: true,
    }
}

pub fn active_subscription(user_id: Uuid, plan_id: Option<Uuid>) -> UserSubscriptionEntity {
    let now = Utc::now();
    UserSubscriptionEntity {
        id: Uuid::new_v4(),
        user_id,
        stripe_subscription_id: "sub_1".to_string(),
        stripe_customer_id: "cus_1".to_string(),
        plan_id,
        status: "active".to_string(),
        current_period_start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        current_period_end: Utc.timestamp_opt(1_702_592_000, 0).unwrap(),
        cancel_at_period_end: false,
        canceled_at: None,
        trial_start: None,
        trial_end: None,
        last_event_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn trialing_subscription_json() -> Value {
    json!({
        "id": "sub_1",
        "object": "subscription",
        "customer": "cus_1",
        "status": "trialing",
        "cancel_at_period_end": false,
        "canceled_at": null,
        "trial_start": 1_700_000_000,
        "trial_end": 1_700_604_800,
        "items": { "data": [{
            "id": "si_1",
            "price": { "id": "price_pro" },
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_702_592_000
        }]}
    })
}

pub fn subscription_from_json(raw: Value) -> StripeSubscription {
    serde_json::from_value(raw).unwrap()
}

pub fn invoice_json() -> Value {
    json!({
        "id": "in_1",
        "object": "invoice",
        "customer": "cus_1",
        "amount_paid": 4900,
        "amount_due": 4900,
        "currency": "usd",
        "description": null,
        "payment_intent": "pi_1",
        "hosted_invoice_url": "https://invoice.stripe.com/i/in_1"
    })
}

pub fn invoice_from_json(raw: Value) -> StripeInvoice {
    serde_json::from_value(raw).unwrap()
}

pub fn event_json(id: &str, type_: &str, created: i64, object: Value) -> Value {
    json!({
        "id": id,
        "object": "event",
        "type": type_,
        "created": created,
        "livemode": false,
        "data": { "object": object }
    })
}

/// Body plus a valid `stripe-signature` header for it, signed now.
pub fn signed(body: &Value) -> (Vec<u8>, String) {
    let payload = serde_json::to_vec(body).unwrap();
    let timestamp = Utc::now().timestamp();
    let signature = compute_signature(WEBHOOK_SECRET, timestamp, &payload).unwrap();
    (payload, format!("t={timestamp},v1={signature}"))
}
