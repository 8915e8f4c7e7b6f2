pub mod billing;
pub mod enums;
pub mod plans;
pub mod stripe_events;
pub mod subscriptions;
