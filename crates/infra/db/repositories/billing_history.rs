use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::billing_history},
};
use domain::{
    entities::billing_history::{BillingHistoryEntity, InsertBillingHistoryEntity},
    repositories::billing_history::BillingHistoryRepository,
};

pub struct BillingHistoryPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BillingHistoryPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingHistoryRepository for BillingHistoryPostgres {
    async fn append(&self, entry: InsertBillingHistoryEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entry_id = insert_into(billing_history::table)
            .values(&entry)
            .returning(billing_history::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(entry_id)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<BillingHistoryEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entries = billing_history::table
            .filter(billing_history::user_id.eq(user_id))
            .order(billing_history::payment_date.desc())
            .limit(limit)
            .select(BillingHistoryEntity::as_select())
            .load::<BillingHistoryEntity>(&mut conn)?;

        Ok(entries)
    }
}
