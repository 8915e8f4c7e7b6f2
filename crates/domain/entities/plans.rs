use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::plans::{DEFAULT_MONTHLY_MINUTES, FALLBACK_PLAN_TYPE},
    infra::db::postgres::schema::subscription_plans,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i32,
    pub currency: String,
    pub monthly_minutes: i32,
    pub api_calls_limit: i32,
    pub features: Vec<String>,
    pub stripe_price_id: Option<String>,
    pub is_active: bool,
}

impl PlanEntity {
    /// Label mirrored onto `user_profiles.plan_type`.
    pub fn plan_type(&self) -> String {
        let label = self.name.trim().to_lowercase();
        if label.is_empty() {
            FALLBACK_PLAN_TYPE.to_string()
        } else {
            label
        }
    }

    pub fn monthly_minutes_or_default(&self) -> i32 {
        if self.monthly_minutes > 0 {
            self.monthly_minutes
        } else {
            DEFAULT_MONTHLY_MINUTES
        }
    }
}

/// Raw row used for Diesel queries. Features stay as JSON and are parsed into a list.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i32,
    pub currency: String,
    pub monthly_minutes: i32,
    pub api_calls_limit: i32,
    pub features: serde_json::Value,
    pub stripe_price_id: Option<String>,
    pub is_active: bool,
}

impl From<PlanRow> for PlanEntity {
    fn from(value: PlanRow) -> Self {
        let features = serde_json::from_value(value.features).unwrap_or_default();

        Self {
            id: value.id,
            name: value.name,
            price_minor: value.price_minor,
            currency: value.currency,
            monthly_minutes: value.monthly_minutes,
            api_calls_limit: value.api_calls_limit,
            features,
            stripe_price_id: value.stripe_price_id,
            is_active: value.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(name: &str, features: serde_json::Value) -> PlanRow {
        PlanRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_minor: 4900,
            currency: "usd".to_string(),
            monthly_minutes: 0,
            api_calls_limit: 10_000,
            features,
            stripe_price_id: Some("price_pro".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn plan_type_is_lowercased_name() {
        let plan = PlanEntity::from(row("Professional", json!([])));
        assert_eq!(plan.plan_type(), "professional");
    }

    #[test]
    fn blank_name_falls_back_to_basic() {
        let plan = PlanEntity::from(row("  ", json!([])));
        assert_eq!(plan.plan_type(), "basic");
    }

    #[test]
    fn malformed_features_become_empty_list() {
        let plan = PlanEntity::from(row("Pro", json!({"not": "a list"})));
        assert!(plan.features.is_empty());

        let plan = PlanEntity::from(row("Pro", json!(["Priority support", "API access"])));
        assert_eq!(plan.features, vec!["Priority support", "API access"]);
    }

    #[test]
    fn zero_quota_uses_default_minutes() {
        let plan = PlanEntity::from(row("Pro", json!([])));
        assert_eq!(plan.monthly_minutes_or_default(), DEFAULT_MONTHLY_MINUTES);
    }
}
