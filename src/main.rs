use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use stockflow as app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = app::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        app::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let state = app::AppState::new(Arc::new(db_pool), cfg.clone());
    let router = app::build_router(state);

    // Bind and serve
    let ip = cfg
        .host
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid host address '{}'", cfg.host))?;
    let addr = SocketAddr::new(ip, cfg.port);
    info!(
        environment = %cfg.environment,
        window_days = cfg.alert_window_days,
        "stockflow listening on http://{}",
        addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("stockflow shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
