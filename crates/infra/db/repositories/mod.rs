pub mod billing_history;
pub mod plans;
pub mod stripe_events;
pub mod user_profiles;
pub mod user_subscriptions;
