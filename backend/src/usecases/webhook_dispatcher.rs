use billing_core::{
    domain::{
        entities::stripe_events::InsertStripeEventEntity,
        repositories::stripe_events::StripeEventRepository,
        value_objects::{enums::billing_statuses::BillingStatus, stripe_events::EventClaim},
    },
    payments::{
        stripe_events::{StripeEvent, StripeEventPayload},
        webhook_signature::WebhookSignatureVerifier,
    },
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    billing_ledger::BillingLedgerWriter,
    customer_linker::CustomerLinker,
    errors::{BillingError, BillingResult},
    subscription_reconciler::SubscriptionReconciler,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Processed,
    Duplicate,
    InFlight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub scanned: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Verifies, deduplicates, routes and completes inbound provider events.
pub struct WebhookDispatcher {
    verifier: WebhookSignatureVerifier,
    event_repo: Arc<dyn StripeEventRepository + Send + Sync>,
    reconciler: Arc<SubscriptionReconciler>,
    ledger: Arc<BillingLedgerWriter>,
    customer_linker: Arc<CustomerLinker>,
    processing_lease: Duration,
}

impl WebhookDispatcher {
    pub fn new(
        verifier: WebhookSignatureVerifier,
        event_repo: Arc<dyn StripeEventRepository + Send + Sync>,
        reconciler: Arc<SubscriptionReconciler>,
        ledger: Arc<BillingLedgerWriter>,
        customer_linker: Arc<CustomerLinker>,
        processing_lease: Duration,
    ) -> Self {
        Self {
            verifier,
            event_repo,
            reconciler,
            ledger,
            customer_linker,
            processing_lease,
        }
    }

    /// Entry point for a signed delivery.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> BillingResult<DispatchOutcome> {
        let signature = signature.unwrap_or_default();
        if let Err(err) = self
            .verifier
            .verify(payload, signature, Utc::now().timestamp())
        {
            warn!(reason = %err, "webhook_dispatcher: rejected unauthenticated delivery");
            return Err(BillingError::Authentication);
        }

        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|err| BillingError::Validation(format!("invalid JSON body: {err}")))?;
        let event = StripeEvent::from_value(raw.clone())
            .map_err(|err| BillingError::Validation(format!("{err:#}")))?;

        info!(
            event_id = %event.id,
            event_type = %event.type_,
            "webhook_dispatcher: event received"
        );

        let claim = self.claim(&event, raw).await?;
        match claim {
            EventClaim::AlreadyProcessed => {
                info!(
                    event_id = %event.id,
                    "webhook_dispatcher: duplicate event, already processed"
                );
                return Ok(DispatchOutcome::Duplicate);
            }
            EventClaim::InFlight => {
                info!(
                    event_id = %event.id,
                    "webhook_dispatcher: event is being processed by another delivery"
                );
                return Ok(DispatchOutcome::InFlight);
            }
            EventClaim::Reclaimed { attempts } => {
                info!(
                    event_id = %event.id,
                    attempts,
                    "webhook_dispatcher: retrying previously failed event"
                );
            }
            EventClaim::Claimed => {}
        }

        self.process_claimed(&event).await?;
        Ok(DispatchOutcome::Processed)
    }

    /// Re-runs stored events whose processing lease expired without completion.
    pub async fn replay_pending(&self, batch_size: i64) -> BillingResult<ReplaySummary> {
        let pending = self
            .event_repo
            .list_replayable(self.processing_lease, batch_size)
            .await?;

        let mut summary = ReplaySummary {
            scanned: pending.len(),
            ..ReplaySummary::default()
        };

        for stored in pending {
            let event = match StripeEvent::from_value(stored.payload.clone()) {
                Ok(event) => event,
                Err(err) => {
                    error!(
                        event_id = %stored.stripe_event_id,
                        error = %err,
                        "webhook_dispatcher: stored payload is not a valid event"
                    );
                    self.record_failure(&stored.stripe_event_id, &format!("{err:#}"))
                        .await;
                    summary.failed += 1;
                    continue;
                }
            };

            let claim = match self.claim(&event, stored.payload).await {
                Ok(claim) => claim,
                Err(err) => {
                    error!(
                        event_id = %event.id,
                        error = %err,
                        "webhook_dispatcher: failed to re-claim stored event"
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            if !claim.should_process() {
                summary.skipped += 1;
                continue;
            }

            match self.process_claimed(&event).await {
                Ok(()) => summary.processed += 1,
                Err(_) => summary.failed += 1,
            }
        }

        if summary.scanned > 0 {
            info!(
                scanned = summary.scanned,
                processed = summary.processed,
                skipped = summary.skipped,
                failed = summary.failed,
                "webhook_dispatcher: replay batch finished"
            );
        }

        Ok(summary)
    }

    async fn claim(&self, event: &StripeEvent, raw: serde_json::Value) -> BillingResult<EventClaim> {
        let now = Utc::now();
        let insert = InsertStripeEventEntity {
            stripe_event_id: event.id.clone(),
            event_type: event.type_.clone(),
            payload: raw,
            processed: false,
            attempts: 1,
            received_at: now,
            claimed_at: now,
        };

        self.event_repo
            .claim_event(insert, self.processing_lease)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    db_error = ?err,
                    "webhook_dispatcher: failed to record event"
                );
                BillingError::Dependency(err)
            })
    }

    /// Routes a claimed event and records the result on the stored row.
    async fn process_claimed(&self, event: &StripeEvent) -> BillingResult<()> {
        if let Err(err) = self.route(event).await {
            error!(
                event_id = %event.id,
                event_type = %event.type_,
                error = %err,
                "webhook_dispatcher: handler failed, event left unprocessed"
            );
            self.record_failure(&event.id, &err.to_string()).await;
            return Err(err);
        }

        self.event_repo
            .mark_processed(&event.id)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    db_error = ?err,
                    "webhook_dispatcher: failed to mark event processed"
                );
                BillingError::Dependency(err)
            })?;

        info!(
            event_id = %event.id,
            event_type = %event.type_,
            "webhook_dispatcher: event processed"
        );

        Ok(())
    }

    async fn record_failure(&self, event_id: &str, message: &str) {
        if let Err(err) = self.event_repo.record_failure(event_id, message).await {
            error!(
                event_id,
                db_error = ?err,
                "webhook_dispatcher: failed to record handler error"
            );
        }
    }

    async fn route(&self, event: &StripeEvent) -> BillingResult<()> {
        let payload = StripeEventPayload::decode(event)
            .map_err(|err| BillingError::Validation(format!("{err:#}")))?;
        let event_created = event.created_at();

        match payload {
            StripeEventPayload::CustomerCreated(customer) => {
                self.customer_linker.link(&customer).await?;
            }
            StripeEventPayload::SubscriptionUpserted(subscription) => {
                self.reconciler
                    .reconcile(&subscription, event_created)
                    .await?;
            }
            StripeEventPayload::SubscriptionDeleted(subscription) => {
                self.reconciler.cancel(&subscription, event_created).await?;
            }
            StripeEventPayload::InvoicePaymentSucceeded(invoice) => {
                self.ledger
                    .record_invoice(&invoice, BillingStatus::Paid)
                    .await?;
            }
            StripeEventPayload::InvoicePaymentFailed(invoice) => {
                self.ledger
                    .record_invoice(&invoice, BillingStatus::Failed)
                    .await?;
            }
            StripeEventPayload::Unhandled => {
                info!(
                    event_id = %event.id,
                    event_type = %event.type_,
                    "webhook_dispatcher: unhandled event type acknowledged"
                );
            }
        }

        Ok(())
    }
}
