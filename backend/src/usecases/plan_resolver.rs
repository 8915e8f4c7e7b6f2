use anyhow::Result;
use billing_core::domain::{
    entities::plans::PlanEntity,
    repositories::plans::PlanRepository,
    value_objects::plans::{DEFAULT_MONTHLY_MINUTES, FALLBACK_PLAN_TYPE},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Plan a subscription event resolves to. A missing catalog entry is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub plan: Option<PlanEntity>,
}

impl ResolvedPlan {
    pub fn plan_id(&self) -> Option<Uuid> {
        self.plan.as_ref().map(|plan| plan.id)
    }

    pub fn plan_type(&self) -> String {
        self.plan
            .as_ref()
            .map(PlanEntity::plan_type)
            .unwrap_or_else(|| FALLBACK_PLAN_TYPE.to_string())
    }

    pub fn monthly_minutes(&self) -> i32 {
        self.plan
            .as_ref()
            .map(PlanEntity::monthly_minutes_or_default)
            .unwrap_or(DEFAULT_MONTHLY_MINUTES)
    }
}

/// Maps a provider price id onto the local plan catalog.
pub struct PlanResolver {
    plan_repo: Arc<dyn PlanRepository + Send + Sync>,
}

impl PlanResolver {
    pub fn new(plan_repo: Arc<dyn PlanRepository + Send + Sync>) -> Self {
        Self { plan_repo }
    }

    pub async fn resolve_by_price(&self, price_id: Option<&str>) -> Result<ResolvedPlan> {
        let Some(price_id) = price_id.map(str::trim).filter(|id| !id.is_empty()) else {
            warn!("plan_resolver: subscription carries no price, using fallback plan");
            return Ok(ResolvedPlan { plan: None });
        };

        let plan = self.plan_repo.find_by_stripe_price_id(price_id).await?;

        match &plan {
            Some(plan) => debug!(
                price_id,
                plan_id = %plan.id,
                plan_name = %plan.name,
                "plan_resolver: price resolved"
            ),
            None => warn!(
                price_id,
                "plan_resolver: no plan for price, using fallback plan"
            ),
        }

        Ok(ResolvedPlan { plan })
    }
}
