pub mod stripe_client;
pub mod stripe_events;
pub mod webhook_signature;
