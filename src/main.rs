use anyhow::Result;
use tracing::{info, warn};
use weather_predictor::{api, config, controller, database, telemetry};

use config::Config;
use database::Database;
use telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "failed to read .env");
        }
    }

    let cfg = Config::load()?;

    let db = Database::new(&cfg.history.database()).await?;
    let app_state = controller::AppState::new(cfg.clone(), &db)?;

    if cfg.training.train_on_startup {
        let engine = app_state.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.train().await {
                warn!(error = %e, "startup training failed, will retry on first request");
            }
        });
    }

    let app = api::router(app_state, &cfg);
    let addr = cfg.server.socket_addr()?;
    info!(
        %addr,
        cities = cfg.training.reference_cities.len(),
        "starting weather predictor"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    db.close().await;
    info!("shutdown complete");
    Ok(())
}
