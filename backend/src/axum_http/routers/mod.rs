pub mod billing;
pub mod stripe_webhooks;
