use anyhow::Result;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use super::stripe_events::StripeSubscription;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub customer_id: String,
    pub price_id: String,
    pub user_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_period_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.clone()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.clone()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.clone()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.clone()),
            context = %context,
            "stripe_client: api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    async fn post_form(
        &self,
        path: &str,
        body: &[(String, String)],
        context: &str,
    ) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(body)
            .send()
            .await?;

        Self::ensure_success(resp, context).await
    }

    /// https://stripe.com/docs/api/customers/create
    pub async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        user_id: Uuid,
    ) -> Result<String> {
        let mut body = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[supabase_user_id]".to_string(), user_id.to_string()),
        ];
        if let Some(name) = name.filter(|name| !name.trim().is_empty()) {
            body.push(("name".to_string(), name.to_string()));
        }

        let resp = self.post_form("customers", &body, "create customer").await?;

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Subscription-mode Checkout Session. https://stripe.com/docs/api/checkout/sessions/create
    pub async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CheckoutSession> {
        let user_id = params.user_id.to_string();

        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer".to_string(), params.customer_id),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), params.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), params.success_url),
            ("cancel_url".to_string(), params.cancel_url),
        ];

        if let Some(days) = params.trial_period_days.filter(|days| *days > 0) {
            body.push((
                "subscription_data[trial_period_days]".to_string(),
                days.to_string(),
            ));
        }

        body.push(("metadata[user_id]".to_string(), user_id.clone()));
        body.push(("subscription_data[metadata][user_id]".to_string(), user_id));

        let resp = self
            .post_form("checkout/sessions", &body, "create checkout session")
            .await?;

        let session: CheckoutSession = resp.json().await?;
        Ok(session)
    }

    /// https://stripe.com/docs/api/customer_portal/sessions/create
    pub async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String> {
        let body = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        let resp = self
            .post_form("billing_portal/sessions", &body, "create billing portal session")
            .await?;

        #[derive(Deserialize)]
        struct PortalResp {
            url: String,
        }

        let parsed: PortalResp = resp.json().await?;
        Ok(parsed.url)
    }

    /// Sets or clears `cancel_at_period_end`; returns the updated subscription as sent by Stripe.
    pub async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<serde_json::Value> {
        let body = vec![(
            "cancel_at_period_end".to_string(),
            cancel_at_period_end.to_string(),
        )];

        let resp = self
            .post_form(
                &format!("subscriptions/{subscription_id}"),
                &body,
                "update subscription cancel_at_period_end",
            )
            .await?;

        Ok(resp.json().await?)
    }

    /// Swaps the price on one subscription item, prorating the difference.
    pub async fn change_subscription_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
    ) -> Result<serde_json::Value> {
        let body = vec![
            ("items[0][id]".to_string(), item_id.to_string()),
            ("items[0][price]".to_string(), price_id.to_string()),
            (
                "proration_behavior".to_string(),
                "create_prorations".to_string(),
            ),
        ];

        let resp = self
            .post_form(
                &format!("subscriptions/{subscription_id}"),
                &body,
                "change subscription price",
            )
            .await?;

        Ok(resp.json().await?)
    }

    /// https://stripe.com/docs/api/subscriptions/retrieve
    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let resp = self
            .http
            .get(self.url(&format!("subscriptions/{subscription_id}")))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_is_joined_without_duplicate_slashes() {
        let client = StripeClient::new("sk_test".to_string()).with_api_base("http://localhost:12111/v1/");
        assert_eq!(
            client.url("/subscriptions/sub_1"),
            "http://localhost:12111/v1/subscriptions/sub_1"
        );

        let client = StripeClient::new("sk_test".to_string());
        assert_eq!(client.url("customers"), "https://api.stripe.com/v1/customers");
    }
}
