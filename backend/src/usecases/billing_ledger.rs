use bigdecimal::BigDecimal;
use billing_core::{
    domain::{
        entities::billing_history::InsertBillingHistoryEntity,
        repositories::{
            billing_history::BillingHistoryRepository, user_profiles::UserProfileRepository,
        },
        value_objects::enums::billing_statuses::BillingStatus,
    },
    payments::stripe_events::{ExpandableId, StripeInvoice},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{BillingError, BillingResult};

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Recorded(Uuid),
    UnknownCustomer,
}

/// Minor currency units to major units, two decimal places.
pub fn minor_to_major(amount_minor: i64) -> BigDecimal {
    (BigDecimal::from(amount_minor) / BigDecimal::from(100)).with_scale(2)
}

pub fn normalize_currency(currency: Option<&str>) -> String {
    currency
        .map(str::trim)
        .filter(|currency| !currency.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Appends one billing history line per paid or failed invoice. Never updates rows.
pub struct BillingLedgerWriter {
    profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
    billing_history_repo: Arc<dyn BillingHistoryRepository + Send + Sync>,
}

impl BillingLedgerWriter {
    pub fn new(
        profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
        billing_history_repo: Arc<dyn BillingHistoryRepository + Send + Sync>,
    ) -> Self {
        Self {
            profile_repo,
            billing_history_repo,
        }
    }

    pub async fn record_invoice(
        &self,
        invoice: &StripeInvoice,
        status: BillingStatus,
    ) -> BillingResult<LedgerOutcome> {
        let customer_id = invoice.customer.id();
        let invoice_id = invoice.id.as_str();

        let owner = self
            .profile_repo
            .find_by_stripe_customer_id(customer_id)
            .await
            .map_err(|err| {
                error!(
                    customer_id,
                    invoice_id,
                    db_error = ?err,
                    "billing_ledger: failed to look up customer owner"
                );
                BillingError::Dependency(err)
            })?;

        let Some(owner) = owner else {
            warn!(
                customer_id,
                invoice_id,
                "billing_ledger: no profile linked to customer, skipping"
            );
            return Ok(LedgerOutcome::UnknownCustomer);
        };

        let amount_minor = match status {
            BillingStatus::Paid => invoice.amount_paid,
            BillingStatus::Failed => invoice.amount_due,
        }
        .unwrap_or(0);

        let description = invoice
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .unwrap_or(status.default_description())
            .to_string();

        let payment_intent_id = match status {
            BillingStatus::Paid => invoice.payment_intent.as_ref().map(ExpandableId::id),
            BillingStatus::Failed => None,
        };

        let entry = InsertBillingHistoryEntity {
            user_id: owner.id,
            amount: minor_to_major(amount_minor),
            currency: normalize_currency(invoice.currency.as_deref()),
            description,
            status: status.as_str().to_string(),
            stripe_invoice_id: Some(invoice_id.to_string()),
            stripe_payment_intent_id: payment_intent_id.map(str::to_string),
            invoice_url: invoice.hosted_invoice_url.clone(),
            payment_date: Utc::now(),
        };

        let entry_id = self
            .billing_history_repo
            .append(entry)
            .await
            .map_err(|err| {
                error!(
                    invoice_id,
                    user_id = %owner.id,
                    db_error = ?err,
                    "billing_ledger: failed to append billing history"
                );
                BillingError::Dependency(err)
            })?;

        info!(
            invoice_id,
            user_id = %owner.id,
            %status,
            amount_minor,
            "billing_ledger: billing history recorded"
        );

        Ok(LedgerOutcome::Recorded(entry_id))
    }
}
