use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::user_profiles::UserProfileEntity;

#[automock]
#[async_trait]
pub trait UserProfileRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserProfileEntity>>;

    async fn find_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserProfileEntity>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfileEntity>>;

    async fn set_stripe_customer_id(&self, user_id: Uuid, stripe_customer_id: &str) -> Result<()>;
}
