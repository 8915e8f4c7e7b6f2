use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscription_plans};
use domain::{
    entities::plans::{PlanEntity, PlanRow},
    repositories::plans::PlanRepository,
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    // Inactive plans still resolve: existing subscriptions keep referencing them.
    async fn find_by_stripe_price_id(&self, stripe_price_id: &str) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = subscription_plans::table
            .filter(subscription_plans::stripe_price_id.eq(stripe_price_id))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        Ok(row.map(PlanEntity::from))
    }

    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = subscription_plans::table
            .filter(subscription_plans::id.eq(plan_id))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        Ok(row.map(PlanEntity::from))
    }

    async fn list_active_plans(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscription_plans::table
            .filter(subscription_plans::is_active.eq(true))
            .order(subscription_plans::price_minor.asc())
            .select(PlanRow::as_select())
            .load::<PlanRow>(&mut conn)?;

        Ok(rows.into_iter().map(PlanEntity::from).collect())
    }
}
