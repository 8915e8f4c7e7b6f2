use billing_core::{
    domain::{
        entities::user_profiles::UserProfileEntity,
        repositories::{
            billing_history::BillingHistoryRepository, plans::PlanRepository,
            user_profiles::UserProfileRepository,
            user_subscriptions::UserSubscriptionRepository,
        },
        value_objects::{
            billing::{
                BillingHistoryDto, CreateCheckoutRequest, CreateCheckoutResponse,
                CreateCustomerResponse, ManageSubscriptionAction, ManageSubscriptionRequest,
                ManageSubscriptionResponse, PortalResponse, UsageLimitsDto,
            },
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{CurrentSubscriptionDto, PlanDto},
        },
    },
    payments::stripe_client::CheckoutSessionParams,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{BillingError, BillingResult},
    stripe_gateway::StripeGateway,
};

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub dashboard_base_url: String,
    pub trial_period_days: u32,
}

impl CheckoutSettings {
    fn success_url(&self) -> String {
        format!(
            "{}/Dashboard.html?session_id={{CHECKOUT_SESSION_ID}}",
            self.dashboard_base_url
        )
    }

    fn billing_page_url(&self) -> String {
        format!("{}/Dashboard.html?page=billing", self.dashboard_base_url)
    }
}

pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(limit) if limit > 0 => limit.min(MAX_HISTORY_LIMIT),
        _ => DEFAULT_HISTORY_LIMIT,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Billing operations the dashboard triggers for the signed-in user.
pub struct BillingAccountUseCase {
    plan_repo: Arc<dyn PlanRepository + Send + Sync>,
    profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
    subscription_repo: Arc<dyn UserSubscriptionRepository + Send + Sync>,
    billing_history_repo: Arc<dyn BillingHistoryRepository + Send + Sync>,
    stripe: Arc<dyn StripeGateway + Send + Sync>,
    settings: CheckoutSettings,
}

impl BillingAccountUseCase {
    pub fn new(
        plan_repo: Arc<dyn PlanRepository + Send + Sync>,
        profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
        subscription_repo: Arc<dyn UserSubscriptionRepository + Send + Sync>,
        billing_history_repo: Arc<dyn BillingHistoryRepository + Send + Sync>,
        stripe: Arc<dyn StripeGateway + Send + Sync>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            plan_repo,
            profile_repo,
            subscription_repo,
            billing_history_repo,
            stripe,
            settings,
        }
    }

    pub async fn list_plans(&self) -> BillingResult<Vec<PlanDto>> {
        let plans = self.plan_repo.list_active_plans().await.map_err(|err| {
            error!(db_error = ?err, "billing_account: failed to list active plans");
            BillingError::Dependency(err)
        })?;

        info!(plan_count = plans.len(), "billing_account: active plans loaded");
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn current_subscription(
        &self,
        user_id: Uuid,
    ) -> BillingResult<Option<CurrentSubscriptionDto>> {
        let Some(subscription) = self
            .subscription_repo
            .find_current_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing_account: failed to load subscription");
                BillingError::Dependency(err)
            })?
        else {
            info!(%user_id, "billing_account: no current subscription");
            return Ok(None);
        };

        let status = SubscriptionStatus::from_str(&subscription.status).ok_or_else(|| {
            BillingError::Dependency(anyhow::anyhow!(
                "stored subscription has unknown status: {}",
                subscription.status
            ))
        })?;

        let plan = match subscription.plan_id {
            Some(plan_id) => self.plan_repo.find_by_id(plan_id).await.map_err(|err| {
                error!(%user_id, %plan_id, db_error = ?err, "billing_account: failed to load plan");
                BillingError::Dependency(err)
            })?,
            None => None,
        };

        Ok(Some(CurrentSubscriptionDto::from_entity(
            subscription,
            status,
            plan,
        )))
    }

    /// Never fails; degrades to free-tier limits.
    pub async fn usage_limits(&self, user_id: Uuid) -> UsageLimitsDto {
        match self.profile_repo.find_by_id(user_id).await {
            Ok(Some(profile)) => UsageLimitsDto {
                monthly_minutes: profile.monthly_limit_minutes,
                plan_type: profile.plan_type,
            },
            Ok(None) => {
                warn!(%user_id, "billing_account: profile missing, using free limits");
                UsageLimitsDto::default()
            }
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "billing_account: failed to read profile, using free limits"
                );
                UsageLimitsDto::default()
            }
        }
    }

    pub async fn billing_history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> BillingResult<Vec<BillingHistoryDto>> {
        let limit = clamp_history_limit(limit);
        let entries = self
            .billing_history_repo
            .list_for_user(user_id, limit)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing_account: failed to list billing history");
                BillingError::Dependency(err)
            })?;

        Ok(entries.into_iter().map(BillingHistoryDto::from).collect())
    }

    async fn load_profile(&self, user_id: Uuid) -> BillingResult<UserProfileEntity> {
        self.profile_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing_account: failed to load profile");
                BillingError::Dependency(err)
            })?
            .ok_or_else(|| BillingError::NotFound("profile".to_string()))
    }

    /// Returns the profile's customer id, creating the customer when missing.
    async fn ensure_customer(&self, profile: &UserProfileEntity) -> BillingResult<(String, bool)> {
        if let Some(customer_id) = profile.stripe_customer_id.clone() {
            return Ok((customer_id, false));
        }

        let customer_id = self
            .stripe
            .create_customer(&profile.email, profile.full_name.clone(), profile.id)
            .await?;

        self.profile_repo
            .set_stripe_customer_id(profile.id, &customer_id)
            .await
            .map_err(|err| {
                error!(
                    user_id = %profile.id,
                    customer_id = %customer_id,
                    db_error = ?err,
                    "billing_account: failed to store new customer id"
                );
                BillingError::Dependency(err)
            })?;

        info!(
            user_id = %profile.id,
            customer_id = %customer_id,
            "billing_account: customer created"
        );

        Ok((customer_id, true))
    }

    pub async fn create_customer(&self, user_id: Uuid) -> BillingResult<CreateCustomerResponse> {
        let profile = self.load_profile(user_id).await?;
        let (customer_id, created) = self.ensure_customer(&profile).await?;

        let message = if created {
            "Customer created successfully"
        } else {
            "Customer already exists"
        };

        Ok(CreateCustomerResponse {
            customer_id,
            message: message.to_string(),
        })
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        request: CreateCheckoutRequest,
    ) -> BillingResult<CreateCheckoutResponse> {
        let price_id = non_blank(request.price_id)
            .ok_or_else(|| BillingError::Validation("price_id is required".to_string()))?;

        let profile = self.load_profile(user_id).await?;
        let (customer_id, _) = self.ensure_customer(&profile).await?;

        let params = CheckoutSessionParams {
            customer_id: customer_id.clone(),
            price_id: price_id.clone(),
            user_id,
            success_url: non_blank(request.success_url)
                .unwrap_or_else(|| self.settings.success_url()),
            cancel_url: non_blank(request.cancel_url)
                .unwrap_or_else(|| self.settings.billing_page_url()),
            trial_period_days: Some(self.settings.trial_period_days),
        };

        let session = self.stripe.create_checkout_session(params).await?;
        let checkout_url = session.url.ok_or_else(|| {
            BillingError::Dependency(anyhow::anyhow!("checkout session has no URL"))
        })?;

        info!(
            %user_id,
            customer_id = %customer_id,
            price_id = %price_id,
            session_id = %session.id,
            "billing_account: checkout session created"
        );

        Ok(CreateCheckoutResponse {
            checkout_url,
            session_id: session.id,
        })
    }

    pub async fn create_portal_session(&self, user_id: Uuid) -> BillingResult<PortalResponse> {
        let profile = self.load_profile(user_id).await?;
        let customer_id = profile
            .stripe_customer_id
            .ok_or_else(|| BillingError::NotFound("billing customer".to_string()))?;

        let portal_url = self
            .stripe
            .create_billing_portal_session(&customer_id, &self.settings.billing_page_url())
            .await?;

        info!(%user_id, customer_id = %customer_id, "billing_account: portal session created");
        Ok(PortalResponse { portal_url })
    }

    /// Forwards the change to Stripe only; the resulting webhooks update local state.
    pub async fn manage_subscription(
        &self,
        user_id: Uuid,
        request: ManageSubscriptionRequest,
    ) -> BillingResult<ManageSubscriptionResponse> {
        let subscription_id = request.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(BillingError::Validation(
                "subscription_id is required".to_string(),
            ));
        }

        let owned = self
            .subscription_repo
            .find_by_stripe_subscription_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%user_id, subscription_id, db_error = ?err, "billing_account: failed to load subscription");
                BillingError::Dependency(err)
            })?
            .filter(|subscription| subscription.user_id == user_id);

        if owned.is_none() {
            warn!(
                %user_id,
                subscription_id,
                "billing_account: subscription not owned by caller"
            );
            return Err(BillingError::NotFound("subscription".to_string()));
        }

        let subscription = match request.action {
            ManageSubscriptionAction::Cancel => {
                self.stripe
                    .set_cancel_at_period_end(subscription_id, true)
                    .await?
            }
            ManageSubscriptionAction::Reactivate => {
                self.stripe
                    .set_cancel_at_period_end(subscription_id, false)
                    .await?
            }
            ManageSubscriptionAction::ChangePlan => {
                let new_price_id = non_blank(request.new_price_id).ok_or_else(|| {
                    BillingError::Validation("new_price_id is required for change_plan".to_string())
                })?;

                let current = self.stripe.retrieve_subscription(subscription_id).await?;
                let item_id = current.first_item_id().ok_or_else(|| {
                    BillingError::Dependency(anyhow::anyhow!(
                        "subscription {subscription_id} has no items"
                    ))
                })?;

                self.stripe
                    .change_subscription_price(subscription_id, item_id, &new_price_id)
                    .await?
            }
        };

        info!(
            %user_id,
            subscription_id,
            action = ?request.action,
            "billing_account: subscription change forwarded"
        );

        Ok(ManageSubscriptionResponse {
            success: true,
            subscription,
        })
    }
}
