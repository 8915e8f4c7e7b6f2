use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use billing_core::{
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            billing_history::BillingHistoryPostgres, plans::PlanPostgres,
            stripe_events::StripeEventPostgres, user_profiles::UserProfilePostgres,
            user_subscriptions::UserSubscriptionPostgres,
        },
    },
    payments::webhook_signature::WebhookSignatureVerifier,
};
use serde_json::json;
use tracing::debug;

use crate::{
    config::config_model::{EventProcessing, Stripe},
    usecases::{
        billing_ledger::BillingLedgerWriter, customer_linker::CustomerLinker,
        plan_resolver::PlanResolver, subscription_reconciler::SubscriptionReconciler,
        webhook_dispatcher::WebhookDispatcher,
    },
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Wires the dispatcher onto Postgres-backed stores.
pub fn build_dispatcher(
    db_pool: Arc<PgPoolSquad>,
    stripe: &Stripe,
    event_processing: &EventProcessing,
) -> WebhookDispatcher {
    let profile_repo = Arc::new(UserProfilePostgres::new(Arc::clone(&db_pool)));
    let plan_resolver = Arc::new(PlanResolver::new(Arc::new(PlanPostgres::new(Arc::clone(
        &db_pool,
    )))));

    let reconciler = SubscriptionReconciler::new(
        profile_repo.clone(),
        Arc::new(UserSubscriptionPostgres::new(Arc::clone(&db_pool))),
        plan_resolver,
    );
    let ledger = BillingLedgerWriter::new(
        profile_repo.clone(),
        Arc::new(BillingHistoryPostgres::new(Arc::clone(&db_pool))),
    );
    let customer_linker = CustomerLinker::new(profile_repo);

    WebhookDispatcher::new(
        WebhookSignatureVerifier::new(
            stripe.webhook_secret.clone(),
            stripe.webhook_tolerance_seconds,
        ),
        Arc::new(StripeEventPostgres::new(Arc::clone(&db_pool))),
        Arc::new(reconciler),
        Arc::new(ledger),
        Arc::new(customer_linker),
        chrono::Duration::seconds(event_processing.processing_lease_seconds),
    )
}

pub fn routes(dispatcher: Arc<WebhookDispatcher>) -> Router {
    Router::new()
        .route("/", post(receive_stripe_webhook))
        .with_state(dispatcher)
}

// The raw body is taken as bytes; the signature covers the exact payload.
pub async fn receive_stripe_webhook(
    State(dispatcher): State<Arc<WebhookDispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match dispatcher.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            debug!(outcome = ?outcome, "stripe_webhooks: delivery acknowledged");
            (StatusCode::OK, Json(json!({ "received": true }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}
