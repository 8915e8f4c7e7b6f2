use billing_core::{
    domain::{
        entities::user_profiles::UserProfileEntity,
        repositories::user_profiles::UserProfileRepository,
    },
    payments::stripe_events::StripeCustomer,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{BillingError, BillingResult};

/// Metadata key set on customers this service creates.
pub const SUPABASE_USER_ID_METADATA: &str = "supabase_user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked(Uuid),
    AlreadyLinked(Uuid),
    /// The owner or the customer is already linked elsewhere; nothing was changed.
    Conflict(Uuid),
    UnknownOwner,
}

/// Handles `customer.created` by storing the customer id on the owner's profile.
pub struct CustomerLinker {
    profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
}

impl CustomerLinker {
    pub fn new(profile_repo: Arc<dyn UserProfileRepository + Send + Sync>) -> Self {
        Self { profile_repo }
    }

    async fn find_owner(&self, customer: &StripeCustomer) -> anyhow::Result<Option<UserProfileEntity>> {
        let metadata_user_id = customer
            .metadata
            .get(SUPABASE_USER_ID_METADATA)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

        if let Some(user_id) = metadata_user_id {
            if let Some(profile) = self.profile_repo.find_by_id(user_id).await? {
                return Ok(Some(profile));
            }
        }

        match customer.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => self.profile_repo.find_by_email(email).await,
            _ => Ok(None),
        }
    }

    pub async fn link(&self, customer: &StripeCustomer) -> BillingResult<LinkOutcome> {
        let customer_id = customer.id.as_str();

        let owner = self.find_owner(customer).await.map_err(|err| {
            error!(
                customer_id,
                db_error = ?err,
                "customer_linker: failed to look up customer owner"
            );
            BillingError::Dependency(err)
        })?;

        let Some(owner) = owner else {
            warn!(
                customer_id,
                "customer_linker: no profile matches customer, skipping"
            );
            return Ok(LinkOutcome::UnknownOwner);
        };

        if owner.stripe_customer_id.as_deref() == Some(customer_id) {
            info!(
                customer_id,
                user_id = %owner.id,
                "customer_linker: customer already linked"
            );
            return Ok(LinkOutcome::AlreadyLinked(owner.id));
        }

        if let Some(existing) = owner.stripe_customer_id.as_deref() {
            warn!(
                customer_id,
                existing_customer_id = existing,
                user_id = %owner.id,
                "customer_linker: profile already linked to another customer, keeping it"
            );
            return Ok(LinkOutcome::Conflict(owner.id));
        }

        let holder = self
            .profile_repo
            .find_by_stripe_customer_id(customer_id)
            .await
            .map_err(|err| {
                error!(
                    customer_id,
                    db_error = ?err,
                    "customer_linker: failed to look up current customer holder"
                );
                BillingError::Dependency(err)
            })?;

        if let Some(holder) = holder.filter(|holder| holder.id != owner.id) {
            warn!(
                customer_id,
                user_id = %owner.id,
                holder_id = %holder.id,
                "customer_linker: customer already linked to another profile, skipping"
            );
            return Ok(LinkOutcome::Conflict(owner.id));
        }

        self.profile_repo
            .set_stripe_customer_id(owner.id, customer_id)
            .await
            .map_err(|err| {
                error!(
                    customer_id,
                    user_id = %owner.id,
                    db_error = ?err,
                    "customer_linker: failed to store customer id"
                );
                BillingError::Dependency(err)
            })?;

        info!(
            customer_id,
            user_id = %owner.id,
            "customer_linker: customer linked to profile"
        );

        Ok(LinkOutcome::Linked(owner.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fixtures::basic_profile;
    use billing_core::domain::repositories::user_profiles::MockUserProfileRepository;
    use mockall::predicate::eq;
    use std::collections::HashMap;

    fn customer(email: Option<&str>, user_id: Option<Uuid>) -> StripeCustomer {
        let mut metadata = HashMap::new();
        if let Some(user_id) = user_id {
            metadata.insert(SUPABASE_USER_ID_METADATA.to_string(), user_id.to_string());
        }
        StripeCustomer {
            id: "cus_new".to_string(),
            email: email.map(str::to_string),
            name: None,
            metadata,
        }
    }

    #[tokio::test]
    async fn links_by_metadata_user_id() {
        let mut profile = basic_profile();
        profile.stripe_customer_id = None;
        let user_id = profile.id;

        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(profile.clone())));
        profile_repo.expect_find_by_email().times(0);
        profile_repo
            .expect_find_by_stripe_customer_id()
            .with(eq("cus_new"))
            .returning(|_| Ok(None));
        profile_repo
            .expect_set_stripe_customer_id()
            .with(eq(user_id), eq("cus_new"))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(Some("ada@example.com"), Some(user_id)))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Linked(user_id));
    }

    #[tokio::test]
    async fn falls_back_to_email() {
        let mut profile = basic_profile();
        profile.stripe_customer_id = None;
        let user_id = profile.id;

        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_email()
            .with(eq("ada@example.com"))
            .returning(move |_| Ok(Some(profile.clone())));
        profile_repo
            .expect_find_by_stripe_customer_id()
            .returning(|_| Ok(None));
        profile_repo
            .expect_set_stripe_customer_id()
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(Some("ada@example.com"), None))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Linked(user_id));
    }

    #[tokio::test]
    async fn already_linked_profile_is_not_rewritten() {
        let mut profile = basic_profile();
        profile.stripe_customer_id = Some("cus_new".to_string());
        let user_id = profile.id;

        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(profile.clone())));
        profile_repo.expect_set_stripe_customer_id().times(0);

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(Some("ada@example.com"), None))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::AlreadyLinked(user_id));
    }

    #[tokio::test]
    async fn profile_linked_to_other_customer_is_kept() {
        let profile = basic_profile();
        let user_id = profile.id;

        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(profile.clone())));
        profile_repo.expect_set_stripe_customer_id().times(0);

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(Some("ada@example.com"), None))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Conflict(user_id));
    }

    #[tokio::test]
    async fn customer_held_by_other_profile_is_acknowledged_without_write() {
        let mut profile = basic_profile();
        profile.stripe_customer_id = None;
        let user_id = profile.id;

        let mut holder = basic_profile();
        holder.id = Uuid::new_v4();
        holder.stripe_customer_id = Some("cus_new".to_string());

        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(profile.clone())));
        profile_repo
            .expect_find_by_stripe_customer_id()
            .with(eq("cus_new"))
            .returning(move |_| Ok(Some(holder.clone())));
        profile_repo.expect_set_stripe_customer_id().times(0);

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(Some("ada@example.com"), None))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Conflict(user_id));
    }

    #[tokio::test]
    async fn customer_without_email_or_owner_is_a_no_op() {
        let mut profile_repo = MockUserProfileRepository::new();
        profile_repo.expect_find_by_email().times(0);
        profile_repo.expect_set_stripe_customer_id().times(0);

        let outcome = CustomerLinker::new(Arc::new(profile_repo))
            .link(&customer(None, None))
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::UnknownOwner);
    }
}
