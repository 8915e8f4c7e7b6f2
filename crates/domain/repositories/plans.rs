use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::plans::PlanEntity;

#[automock]
#[async_trait]
pub trait PlanRepository {
    async fn find_by_stripe_price_id(&self, stripe_price_id: &str) -> Result<Option<PlanEntity>>;
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;
    async fn list_active_plans(&self) -> Result<Vec<PlanEntity>>;
}
