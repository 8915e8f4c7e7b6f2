use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        user_profiles::ProfileBillingMirror,
        user_subscriptions::{UpsertUserSubscriptionEntity, UserSubscriptionEntity},
    },
    value_objects::subscriptions::SnapshotOutcome,
};

#[automock]
#[async_trait]
pub trait UserSubscriptionRepository {
    /// Upserts the subscription row keyed by provider subscription id and mirrors the
    /// billing fields onto the owner's profile, both in one transaction. Snapshots from
    /// an event strictly older than the stored `last_event_at` are discarded.
    async fn apply_snapshot(
        &self,
        subscription: UpsertUserSubscriptionEntity,
        profile_mirror: ProfileBillingMirror,
        event_created: Option<DateTime<Utc>>,
    ) -> Result<SnapshotOutcome>;

    /// Marks the subscription canceled and downgrades the owner's profile in one
    /// transaction. When no row exists yet the canceled `tombstone` is inserted, so a
    /// creation delivered after the deletion cannot revive it.
    async fn apply_deletion(
        &self,
        tombstone: UpsertUserSubscriptionEntity,
        profile_mirror: ProfileBillingMirror,
        event_created: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Latest `active` or `trialing` subscription of the user.
    async fn find_current_for_user(&self, user_id: Uuid)
    -> Result<Option<UserSubscriptionEntity>>;

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<UserSubscriptionEntity>>;
}
