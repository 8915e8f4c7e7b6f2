use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{Connection, OptionalExtension, PgConnection, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{user_profiles, user_subscriptions},
    },
};
use domain::{
    entities::{
        user_profiles::ProfileBillingMirror,
        user_subscriptions::{UpsertUserSubscriptionEntity, UserSubscriptionEntity},
    },
    repositories::user_subscriptions::UserSubscriptionRepository,
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        subscriptions::{
            SnapshotOutcome, StoredSubscriptionState, discard_reason, merge_event_at,
        },
    },
};

pub struct UserSubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserSubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Locks the subscription row (if any) and returns its ordering state.
fn lock_stored_state(
    conn: &mut PgConnection,
    stripe_subscription_id: &str,
) -> QueryResult<Option<StoredSubscriptionState>> {
    let stored = user_subscriptions::table
        .filter(user_subscriptions::stripe_subscription_id.eq(stripe_subscription_id))
        .select((user_subscriptions::status, user_subscriptions::last_event_at))
        .for_update()
        .first::<(String, Option<DateTime<Utc>>)>(conn)
        .optional()?;

    Ok(stored.map(|(status, last_event_at)| StoredSubscriptionState {
        status,
        last_event_at,
    }))
}

fn current_statuses() -> [&'static str; 2] {
    [
        SubscriptionStatus::Active.as_str(),
        SubscriptionStatus::Trialing.as_str(),
    ]
}

#[async_trait]
impl UserSubscriptionRepository for UserSubscriptionPostgres {
    async fn apply_snapshot(
        &self,
        subscription: UpsertUserSubscriptionEntity,
        profile_mirror: ProfileBillingMirror,
        event_created: Option<DateTime<Utc>>,
    ) -> Result<SnapshotOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<SnapshotOutcome, diesel::result::Error, _>(|conn| {
            let stored = lock_stored_state(conn, &subscription.stripe_subscription_id)?;

            if let Some(outcome) =
                discard_reason(stored.as_ref(), &subscription.status, event_created)
            {
                return Ok(outcome);
            }

            let mut subscription = subscription;
            subscription.last_event_at = merge_event_at(
                stored.and_then(|stored| stored.last_event_at),
                event_created,
            );

            insert_into(user_subscriptions::table)
                .values(&subscription)
                .on_conflict(user_subscriptions::stripe_subscription_id)
                .do_update()
                .set(&subscription)
                .execute(conn)?;

            update(user_profiles::table.filter(user_profiles::id.eq(subscription.user_id)))
                .set((&profile_mirror, user_profiles::updated_at.eq(Utc::now())))
                .execute(conn)?;

            Ok(SnapshotOutcome::Applied)
        })?;

        Ok(outcome)
    }

    async fn apply_deletion(
        &self,
        tombstone: UpsertUserSubscriptionEntity,
        profile_mirror: ProfileBillingMirror,
        event_created: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            let stored = lock_stored_state(conn, &tombstone.stripe_subscription_id)?;
            let now = Utc::now();

            match stored {
                Some(stored) => {
                    update(user_subscriptions::table.filter(
                        user_subscriptions::stripe_subscription_id
                            .eq(&tombstone.stripe_subscription_id),
                    ))
                    .set((
                        user_subscriptions::status.eq(SubscriptionStatus::Canceled.as_str()),
                        user_subscriptions::canceled_at.eq(tombstone.canceled_at),
                        user_subscriptions::last_event_at
                            .eq(merge_event_at(stored.last_event_at, event_created)),
                        user_subscriptions::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                }
                None => {
                    let mut tombstone = tombstone.clone();
                    tombstone.last_event_at = event_created;
                    insert_into(user_subscriptions::table)
                        .values(&tombstone)
                        .execute(conn)?;
                }
            }

            update(user_profiles::table.filter(user_profiles::id.eq(tombstone.user_id)))
                .set((&profile_mirror, user_profiles::updated_at.eq(now)))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn find_current_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserSubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = user_subscriptions::table
            .filter(user_subscriptions::user_id.eq(user_id))
            .filter(user_subscriptions::status.eq_any(current_statuses()))
            .order(user_subscriptions::current_period_end.desc())
            .select(UserSubscriptionEntity::as_select())
            .first::<UserSubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<UserSubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = user_subscriptions::table
            .filter(user_subscriptions::stripe_subscription_id.eq(stripe_subscription_id))
            .select(UserSubscriptionEntity::as_select())
            .first::<UserSubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }
}
