use billing_core::{
    domain::{
        entities::{
            user_profiles::{ProfileBillingMirror, UserProfileEntity},
            user_subscriptions::UpsertUserSubscriptionEntity,
        },
        repositories::{
            user_profiles::UserProfileRepository,
            user_subscriptions::UserSubscriptionRepository,
        },
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            plans::{DEFAULT_MONTHLY_MINUTES, FREE_PLAN_TYPE},
            subscriptions::SnapshotOutcome,
        },
    },
    payments::stripe_events::{StripeSubscription, timestamp_to_datetime},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    errors::{BillingError, BillingResult},
    plan_resolver::PlanResolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// A newer event was already applied, or the subscription was already canceled.
    Stale,
    UnknownCustomer,
}

pub struct SubscriptionReconciler {
    profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
    subscription_repo: Arc<dyn UserSubscriptionRepository + Send + Sync>,
    plan_resolver: Arc<PlanResolver>,
}

fn to_datetime(seconds: i64, field: &str) -> BillingResult<DateTime<Utc>> {
    timestamp_to_datetime(seconds)
        .ok_or_else(|| BillingError::Validation(format!("{field} is out of range")))
}

fn optional_datetime(seconds: Option<i64>, field: &str) -> BillingResult<Option<DateTime<Utc>>> {
    seconds.map(|seconds| to_datetime(seconds, field)).transpose()
}

impl SubscriptionReconciler {
    pub fn new(
        profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
        subscription_repo: Arc<dyn UserSubscriptionRepository + Send + Sync>,
        plan_resolver: Arc<PlanResolver>,
    ) -> Self {
        Self {
            profile_repo,
            subscription_repo,
            plan_resolver,
        }
    }

    async fn find_owner(&self, customer_id: &str) -> BillingResult<Option<UserProfileEntity>> {
        let owner = self
            .profile_repo
            .find_by_stripe_customer_id(customer_id)
            .await
            .map_err(|err| {
                error!(
                    customer_id,
                    db_error = ?err,
                    "subscription_reconciler: failed to look up customer owner"
                );
                BillingError::Dependency(err)
            })?;

        if owner.is_none() {
            warn!(
                customer_id,
                "subscription_reconciler: no profile linked to customer, skipping"
            );
        }

        Ok(owner)
    }

    /// Applies a created/updated subscription snapshot to the subscription row and the
    /// owner's profile.
    pub async fn reconcile(
        &self,
        subscription: &StripeSubscription,
        event_created: Option<DateTime<Utc>>,
    ) -> BillingResult<ReconcileOutcome> {
        let customer_id = subscription.customer.id();
        let subscription_id = subscription.id.as_str();

        let Some(owner) = self.find_owner(customer_id).await? else {
            return Ok(ReconcileOutcome::UnknownCustomer);
        };

        let status = SubscriptionStatus::from_stripe(&subscription.status).ok_or_else(|| {
            BillingError::Validation(format!(
                "unsupported subscription status: {}",
                subscription.status
            ))
        })?;

        let period_start = subscription.period_start().ok_or_else(|| {
            BillingError::Validation("subscription has no current_period_start".to_string())
        })?;
        let period_end = subscription.period_end().ok_or_else(|| {
            BillingError::Validation("subscription has no current_period_end".to_string())
        })?;
        let current_period_start = to_datetime(period_start, "current_period_start")?;
        let current_period_end = to_datetime(period_end, "current_period_end")?;

        let resolved = self
            .plan_resolver
            .resolve_by_price(subscription.price_id())
            .await?;

        let upsert = UpsertUserSubscriptionEntity {
            user_id: owner.id,
            stripe_subscription_id: subscription_id.to_string(),
            stripe_customer_id: customer_id.to_string(),
            plan_id: resolved.plan_id(),
            status: status.as_str().to_string(),
            current_period_start,
            current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
            canceled_at: optional_datetime(subscription.canceled_at, "canceled_at")?,
            trial_start: optional_datetime(subscription.trial_start, "trial_start")?,
            trial_end: optional_datetime(subscription.trial_end, "trial_end")?,
            last_event_at: event_created,
            updated_at: Utc::now(),
        };

        let mirror = ProfileBillingMirror {
            plan_type: resolved.plan_type(),
            subscription_status: Some(status.as_str().to_string()),
            current_period_end: Some(current_period_end),
            monthly_limit_minutes: resolved.monthly_minutes(),
        };

        let outcome = self
            .subscription_repo
            .apply_snapshot(upsert, mirror, event_created)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    user_id = %owner.id,
                    db_error = ?err,
                    "subscription_reconciler: failed to apply subscription snapshot"
                );
                BillingError::Dependency(err)
            })?;

        match outcome {
            SnapshotOutcome::Applied => {
                info!(
                    subscription_id,
                    user_id = %owner.id,
                    %status,
                    plan_type = %resolved.plan_type(),
                    "subscription_reconciler: subscription reconciled"
                );
                Ok(ReconcileOutcome::Applied)
            }
            SnapshotOutcome::Stale { stored_event_at } => {
                info!(
                    subscription_id,
                    user_id = %owner.id,
                    %stored_event_at,
                    event_created = ?event_created,
                    "subscription_reconciler: discarding out-of-order event"
                );
                Ok(ReconcileOutcome::Stale)
            }
            SnapshotOutcome::Terminated => {
                info!(
                    subscription_id,
                    user_id = %owner.id,
                    %status,
                    "subscription_reconciler: subscription already canceled, discarding event"
                );
                Ok(ReconcileOutcome::Stale)
            }
        }
    }

    /// Cancellation path. Terminal, so applied regardless of event ordering.
    pub async fn cancel(
        &self,
        subscription: &StripeSubscription,
        event_created: Option<DateTime<Utc>>,
    ) -> BillingResult<ReconcileOutcome> {
        let customer_id = subscription.customer.id();
        let subscription_id = subscription.id.as_str();

        let Some(owner) = self.find_owner(customer_id).await? else {
            return Ok(ReconcileOutcome::UnknownCustomer);
        };

        let canceled_at = optional_datetime(subscription.canceled_at, "canceled_at")?
            .unwrap_or_else(Utc::now);

        // Deleted objects normally carry their last period; the cancellation time stands in.
        let period_bound = |seconds: Option<i64>, field: &str| {
            optional_datetime(seconds, field).map(|bound| bound.unwrap_or(canceled_at))
        };

        let tombstone = UpsertUserSubscriptionEntity {
            user_id: owner.id,
            stripe_subscription_id: subscription_id.to_string(),
            stripe_customer_id: customer_id.to_string(),
            plan_id: None,
            status: SubscriptionStatus::Canceled.as_str().to_string(),
            current_period_start: period_bound(subscription.period_start(), "current_period_start")?,
            current_period_end: period_bound(subscription.period_end(), "current_period_end")?,
            cancel_at_period_end: subscription.cancel_at_period_end,
            canceled_at: Some(canceled_at),
            trial_start: optional_datetime(subscription.trial_start, "trial_start")?,
            trial_end: optional_datetime(subscription.trial_end, "trial_end")?,
            last_event_at: event_created,
            updated_at: Utc::now(),
        };

        let mirror = ProfileBillingMirror {
            plan_type: FREE_PLAN_TYPE.to_string(),
            subscription_status: Some(SubscriptionStatus::Canceled.as_str().to_string()),
            current_period_end: None,
            monthly_limit_minutes: DEFAULT_MONTHLY_MINUTES,
        };

        self.subscription_repo
            .apply_deletion(tombstone, mirror, event_created)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    user_id = %owner.id,
                    db_error = ?err,
                    "subscription_reconciler: failed to apply subscription deletion"
                );
                BillingError::Dependency(err)
            })?;

        info!(
            subscription_id,
            user_id = %owner.id,
            %canceled_at,
            "subscription_reconciler: subscription canceled, profile downgraded"
        );

        Ok(ReconcileOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fixtures::{
        basic_profile, pro_plan, subscription_from_json, trialing_subscription_json,
    };
    use billing_core::domain::repositories::{
        plans::MockPlanRepository, user_profiles::MockUserProfileRepository,
        user_subscriptions::MockUserSubscriptionRepository,
    };
    use chrono::TimeZone;
    use mockall::predicate::eq;
    use serde_json::json;

    fn reconciler(
        profile_repo: MockUserProfileRepository,
        subscription_repo: MockUserSubscriptionRepository,
        plan_repo: MockPlanRepository,
    ) -> SubscriptionReconciler {
        SubscriptionReconciler::new(
            Arc::new(profile_repo),
            Arc::new(subscription_repo),
            Arc::new(PlanResolver::new(Arc::new(plan_repo))),
        )
    }

    fn profile_repo_with_owner(owner: UserProfileEntity) -> MockUserProfileRepository {
        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_stripe_customer_id()
            .with(eq("cus_1"))
            .returning(move |_| Ok(Some(owner.clone())));
        profile_repo
    }

    #[tokio::test]
    async fn trialing_subscription_converges_profile_to_plan() {
        let owner = basic_profile();
        let owner_id = owner.id;
        let plan = pro_plan();
        let plan_id = plan.id;
        let event_created = Utc.timestamp_opt(1_700_000_100, 0).single();

        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_stripe_price_id()
            .with(eq("price_pro"))
            .returning(move |_| Ok(Some(plan.clone())));

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_snapshot()
            .withf(move |upsert, mirror, created| {
                upsert.user_id == owner_id
                    && upsert.stripe_subscription_id == "sub_1"
                    && upsert.stripe_customer_id == "cus_1"
                    && upsert.plan_id == Some(plan_id)
                    && upsert.status == "trialing"
                    && upsert.current_period_start.timestamp() == 1_700_000_000
                    && upsert.current_period_end.timestamp() == 1_702_592_000
                    && upsert.trial_end.map(|t| t.timestamp()) == Some(1_700_604_800)
                    && upsert.canceled_at.is_none()
                    && mirror.plan_type == "pro"
                    && mirror.subscription_status.as_deref() == Some("trialing")
                    && mirror.monthly_limit_minutes == 6000
                    && mirror.current_period_end.map(|t| t.timestamp()) == Some(1_702_592_000)
                    && *created == event_created
            })
            .times(1)
            .returning(|_, _, _| Ok(SnapshotOutcome::Applied));

        let reconciler = reconciler(profile_repo_with_owner(owner), subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        let outcome = reconciler
            .reconcile(&subscription, event_created)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied);
    }

    #[tokio::test]
    async fn unknown_price_still_upserts_with_basic_fallback() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_stripe_price_id()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_snapshot()
            .withf(|upsert, mirror, _| {
                upsert.plan_id.is_none()
                    && mirror.plan_type == "basic"
                    && mirror.monthly_limit_minutes == DEFAULT_MONTHLY_MINUTES
            })
            .times(1)
            .returning(|_, _, _| Ok(SnapshotOutcome::Applied));

        let reconciler =
            reconciler(profile_repo_with_owner(basic_profile()), subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        let outcome = reconciler.reconcile(&subscription, None).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);
    }

    #[tokio::test]
    async fn unknown_customer_touches_nothing() {
        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_stripe_customer_id()
            .returning(|_| Ok(None));

        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_stripe_price_id().times(0);

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo.expect_apply_snapshot().times(0);
        subscription_repo.expect_apply_deletion().times(0);

        let reconciler = reconciler(profile_repo, subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        assert_eq!(
            reconciler.reconcile(&subscription, None).await.unwrap(),
            ReconcileOutcome::UnknownCustomer
        );
        assert_eq!(
            reconciler.cancel(&subscription, None).await.unwrap(),
            ReconcileOutcome::UnknownCustomer
        );
    }

    #[tokio::test]
    async fn stale_snapshot_is_reported_not_failed() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_stripe_price_id()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_snapshot()
            .times(1)
            .returning(|_, _, _| {
                Ok(SnapshotOutcome::Stale {
                    stored_event_at: Utc::now(),
                })
            });

        let reconciler =
            reconciler(profile_repo_with_owner(basic_profile()), subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        let outcome = reconciler
            .reconcile(&subscription, Utc.timestamp_opt(1, 0).single())
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Stale);
    }

    #[tokio::test]
    async fn unsupported_status_is_a_validation_error() {
        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo.expect_apply_snapshot().times(0);

        let reconciler = reconciler(
            profile_repo_with_owner(basic_profile()),
            subscription_repo,
            MockPlanRepository::new(),
        );

        let mut raw = trialing_subscription_json();
        raw["status"] = json!("mystery");
        let subscription = subscription_from_json(raw);

        let err = reconciler.reconcile(&subscription, None).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_period_is_a_validation_error() {
        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo.expect_apply_snapshot().times(0);

        let reconciler = reconciler(
            profile_repo_with_owner(basic_profile()),
            subscription_repo,
            MockPlanRepository::new(),
        );

        let subscription = subscription_from_json(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "items": { "data": [{ "price": { "id": "price_pro" } }] }
        }));

        let err = reconciler.reconcile(&subscription, None).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn deletion_downgrades_profile_and_cancels_row() {
        let owner = basic_profile();
        let owner_id = owner.id;

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_deletion()
            .withf(move |tombstone, mirror, _| {
                tombstone.user_id == owner_id
                    && tombstone.stripe_subscription_id == "sub_1"
                    && tombstone.stripe_customer_id == "cus_1"
                    && tombstone.status == "canceled"
                    && tombstone.canceled_at.map(|t| t.timestamp()) == Some(1_701_000_000)
                    && tombstone.current_period_start.timestamp() == 1_700_000_000
                    && tombstone.current_period_end.timestamp() == 1_702_592_000
                    && mirror.plan_type == FREE_PLAN_TYPE
                    && mirror.subscription_status.as_deref() == Some("canceled")
                    && mirror.monthly_limit_minutes == DEFAULT_MONTHLY_MINUTES
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let reconciler = reconciler(
            profile_repo_with_owner(owner),
            subscription_repo,
            MockPlanRepository::new(),
        );

        let mut raw = trialing_subscription_json();
        raw["status"] = json!("canceled");
        raw["canceled_at"] = json!(1_701_000_000);
        let subscription = subscription_from_json(raw);

        let outcome = reconciler.cancel(&subscription, None).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);
    }

    #[tokio::test]
    async fn deletion_without_canceled_at_uses_processing_time() {
        let before = Utc::now();

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_deletion()
            .withf(move |tombstone, _, _| {
                tombstone.canceled_at.is_some_and(|canceled_at| canceled_at >= before)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let reconciler = reconciler(
            profile_repo_with_owner(basic_profile()),
            subscription_repo,
            MockPlanRepository::new(),
        );
        let subscription = subscription_from_json(trialing_subscription_json());

        reconciler.cancel(&subscription, None).await.unwrap();
    }

    #[tokio::test]
    async fn deletion_without_period_falls_back_to_cancellation_time() {
        let created = Utc.timestamp_opt(1_701_000_050, 0).single();

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_deletion()
            .withf(move |tombstone, _, event_created| {
                tombstone.current_period_start.timestamp() == 1_701_000_000
                    && tombstone.current_period_end.timestamp() == 1_701_000_000
                    && tombstone.last_event_at == created
                    && *event_created == created
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let reconciler = reconciler(
            profile_repo_with_owner(basic_profile()),
            subscription_repo,
            MockPlanRepository::new(),
        );
        let subscription = subscription_from_json(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "canceled",
            "canceled_at": 1_701_000_000,
            "items": { "data": [] }
        }));

        let outcome = reconciler.cancel(&subscription, created).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);
    }

    #[tokio::test]
    async fn creation_after_deletion_is_discarded() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_stripe_price_id()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_snapshot()
            .times(1)
            .returning(|_, _, _| Ok(SnapshotOutcome::Terminated));

        let reconciler =
            reconciler(profile_repo_with_owner(basic_profile()), subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        let outcome = reconciler
            .reconcile(&subscription, Utc.timestamp_opt(1_700_000_000, 0).single())
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Stale);
    }

    #[tokio::test]
    async fn storage_failure_is_a_dependency_error() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_stripe_price_id()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockUserSubscriptionRepository::new();
        subscription_repo
            .expect_apply_snapshot()
            .returning(|_, _, _| Err(anyhow::anyhow!("deadlock detected")));

        let reconciler =
            reconciler(profile_repo_with_owner(basic_profile()), subscription_repo, plan_repo);
        let subscription = subscription_from_json(trialing_subscription_json());

        let err = reconciler.reconcile(&subscription, None).await.unwrap_err();
        assert!(matches!(err, BillingError::Dependency(_)));
    }
}
