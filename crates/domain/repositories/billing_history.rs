use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::billing_history::{BillingHistoryEntity, InsertBillingHistoryEntity};

#[automock]
#[async_trait]
pub trait BillingHistoryRepository {
    async fn append(&self, entry: InsertBillingHistoryEntity) -> Result<Uuid>;
    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<BillingHistoryEntity>>;
}
