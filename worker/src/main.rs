use anyhow::Result;
use backend::{axum_http::routers::stripe_webhooks, config::config_loader};
use billing_core::infra::db::postgres::postgres_connection;
use std::sync::Arc;
use tracing::{error, info};
use worker::event_replay;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    billing_core::observability::init_observability("worker")?;

    let dotenvy_env = config_loader::load_worker()?;
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    // Same wiring as the webhook route, so replays run the exact handlers.
    let dispatcher = Arc::new(stripe_webhooks::build_dispatcher(
        Arc::clone(&db_pool_arc),
        &dotenvy_env.stripe,
        &dotenvy_env.event_processing,
    ));

    let event_replay_loop = tokio::spawn(event_replay::worker::run(
        dispatcher,
        dotenvy_env.event_processing.clone(),
    ));

    event_replay_loop.await??;
    Ok(())
}
