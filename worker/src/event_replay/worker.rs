use anyhow::Result;
use backend::{
    config::config_model::EventProcessing,
    usecases::webhook_dispatcher::{ReplaySummary, WebhookDispatcher},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info};

/// Periodically re-runs stored events that never completed.
pub async fn run(dispatcher: Arc<WebhookDispatcher>, settings: EventProcessing) -> Result<()> {
    info!(
        interval_seconds = settings.replay_interval_seconds,
        batch_size = settings.replay_batch_size,
        "event_replay: starting worker loop"
    );

    loop {
        if let Err(e) = replay_batch(&dispatcher, settings.replay_batch_size).await {
            error!(error = %e, "event_replay: error while replaying pending events");
        }

        tokio::time::sleep(Duration::from_secs(settings.replay_interval_seconds)).await;
    }
}

/// One tick; the dispatcher logs the batch summary itself.
pub async fn replay_batch(dispatcher: &WebhookDispatcher, batch_size: i64) -> Result<ReplaySummary> {
    let summary = dispatcher.replay_pending(batch_size).await?;

    if summary.scanned == 0 {
        debug!("event_replay: no pending events");
    }

    Ok(summary)
}
