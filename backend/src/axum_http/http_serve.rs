use crate::{
    auth::SupabaseJwtSecret,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use billing_core::infra::db::postgres::postgres_connection::PgPoolSquad;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub fn app(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<Router> {
    let dispatcher = routers::stripe_webhooks::build_dispatcher(
        Arc::clone(&db_pool),
        &config.stripe,
        &config.event_processing,
    );

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/billing",
            routers::billing::routes(Arc::clone(&db_pool), config),
        )
        .nest(
            "/api/v1/stripe-webhooks",
            routers::stripe_webhooks::routes(Arc::new(dispatcher)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(SupabaseJwtSecret::new(
            config.supabase.jwt_secret.clone(),
        )))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any), // TODO restrict to DASHBOARD_BASE_URL once the dashboard has a fixed origin
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let app = app(&config, db_pool)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        port = config.backend_server.port,
        stage = %config.stage,
        "backend: server is running"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "backend: failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "backend: failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("backend: received ctrl+C signal"),
        _ = terminate => info!("backend: received terminate signal"),
    }
}
