use anyhow::Result;
use ev_battery_twin::{api, config::Config, controller, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let cfg = Config::load()?;
    telemetry::init_tracing(&cfg.logging);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0 - the twin API will be reachable from the network");
    }

    let state = controller::AppState::new(cfg.clone());
    let engine = controller::spawn_engine_task(state.clone());
    let app = api::router(state.clone(), &cfg);

    info!(
        %addr,
        export_dir = %cfg.export.dir.display(),
        ambient_c = cfg.session.ambient_temp_c,
        "starting EV battery twin"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    engine.abort();
    controller::shutdown(&state).await;

    warn!("shutdown complete");
    Ok(())
}
