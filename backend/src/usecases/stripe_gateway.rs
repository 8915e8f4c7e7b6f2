use anyhow::Result as AnyResult;
use async_trait::async_trait;
use billing_core::payments::{
    stripe_client::{CheckoutSession, CheckoutSessionParams, StripeClient},
    stripe_events::StripeSubscription,
};
use uuid::Uuid;

/// Outbound calls to the payment processor's management API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<String>,
        user_id: Uuid,
    ) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<CheckoutSession>;

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AnyResult<String>;

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> AnyResult<serde_json::Value>;

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
    ) -> AnyResult<serde_json::Value>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<String>,
        user_id: Uuid,
    ) -> AnyResult<String> {
        self.create_customer(email, name.as_deref(), user_id).await
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<CheckoutSession> {
        self.create_checkout_session(params).await
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AnyResult<String> {
        self.create_billing_portal_session(customer_id, return_url)
            .await
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> AnyResult<serde_json::Value> {
        self.set_cancel_at_period_end(subscription_id, cancel_at_period_end)
            .await
    }

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
    ) -> AnyResult<serde_json::Value> {
        self.change_subscription_price(subscription_id, item_id, price_id)
            .await
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }
}
