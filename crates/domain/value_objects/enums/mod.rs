pub mod billing_statuses;
pub mod subscription_statuses;
