use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_profiles},
};
use domain::{
    entities::user_profiles::UserProfileEntity,
    repositories::user_profiles::UserProfileRepository,
};

diesel::define_sql_function! {
    fn lower(value: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

pub struct UserProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserProfileRepository for UserProfilePostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let profile = user_profiles::table
            .filter(user_profiles::id.eq(user_id))
            .select(UserProfileEntity::as_select())
            .first::<UserProfileEntity>(&mut conn)
            .optional()?;

        Ok(profile)
    }

    async fn find_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let profile = user_profiles::table
            .filter(user_profiles::stripe_customer_id.eq(stripe_customer_id))
            .select(UserProfileEntity::as_select())
            .first::<UserProfileEntity>(&mut conn)
            .optional()?;

        Ok(profile)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let profile = user_profiles::table
            .filter(lower(user_profiles::email).eq(email.trim().to_lowercase()))
            .select(UserProfileEntity::as_select())
            .first::<UserProfileEntity>(&mut conn)
            .optional()?;

        Ok(profile)
    }

    async fn set_stripe_customer_id(&self, user_id: Uuid, stripe_customer_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(user_profiles::table.filter(user_profiles::id.eq(user_id)))
            .set((
                user_profiles::stripe_customer_id.eq(Some(stripe_customer_id)),
                user_profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
