use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    usecases::{
        billing_account::{BillingAccountUseCase, CheckoutSettings},
        errors::BillingError,
    },
};
use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use billing_core::{
    domain::value_objects::billing::{
        BillingHistoryQuery, CreateCheckoutRequest, ManageSubscriptionRequest,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            billing_history::BillingHistoryPostgres, plans::PlanPostgres,
            user_profiles::UserProfilePostgres, user_subscriptions::UserSubscriptionPostgres,
        },
    },
    payments::stripe_client::StripeClient,
};
use serde_json::json;
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Router {
    let billing_usecase = BillingAccountUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserProfilePostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserSubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(BillingHistoryPostgres::new(Arc::clone(&db_pool))),
        Arc::new(StripeClient::new(config.stripe.secret_key.clone())),
        CheckoutSettings {
            dashboard_base_url: config.dashboard.base_url.clone(),
            trial_period_days: config.stripe.trial_period_days,
        },
    );

    routes_with(Arc::new(billing_usecase))
}

pub fn routes_with(billing_usecase: Arc<BillingAccountUseCase>) -> Router {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscription", get(current_subscription))
        .route("/usage-limits", get(usage_limits))
        .route("/history", get(billing_history))
        .route("/customer", post(create_customer))
        .route("/checkout", post(create_checkout_session))
        .route("/portal", post(create_portal_session))
        .route("/subscription/manage", post(manage_subscription))
        .with_state(billing_usecase)
}

fn respond<T: serde::Serialize>(result: Result<T, BillingError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_plans(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    _auth: AuthUser,
) -> Response {
    respond(
        billing_usecase
            .list_plans()
            .await
            .map(|plans| json!({ "plans": plans })),
    )
}

pub async fn current_subscription(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
) -> Response {
    respond(
        billing_usecase
            .current_subscription(auth.user_id)
            .await
            .map(|subscription| json!({ "subscription": subscription })),
    )
}

pub async fn usage_limits(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
) -> Response {
    Json(billing_usecase.usage_limits(auth.user_id).await).into_response()
}

pub async fn billing_history(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
    Query(query): Query<BillingHistoryQuery>,
) -> Response {
    respond(
        billing_usecase
            .billing_history(auth.user_id, query.limit)
            .await
            .map(|history| json!({ "history": history })),
    )
}

pub async fn create_customer(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
) -> Response {
    respond(billing_usecase.create_customer(auth.user_id).await)
}

pub async fn create_checkout_session(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> Response {
    respond(
        billing_usecase
            .create_checkout_session(auth.user_id, request)
            .await,
    )
}

pub async fn create_portal_session(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
) -> Response {
    respond(billing_usecase.create_portal_session(auth.user_id).await)
}

pub async fn manage_subscription(
    State(billing_usecase): State<Arc<BillingAccountUseCase>>,
    auth: AuthUser,
    Json(request): Json<ManageSubscriptionRequest>,
) -> Response {
    respond(
        billing_usecase
            .manage_subscription(auth.user_id, request)
            .await,
    )
}
