pub mod billing_account;
pub mod billing_ledger;
pub mod customer_linker;
pub mod errors;
pub mod plan_resolver;
pub mod stripe_gateway;
pub mod subscription_reconciler;
pub mod webhook_dispatcher;

#[cfg(test)]
pub(crate) mod fixtures;
