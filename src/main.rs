use focus_flow::detector::DetectionSource;
use focus_flow::detector::mock::ScriptedSource;
use focus_flow::detector::replay::ReplaySource;
use focus_flow::driver::spawn_driver;
use focus_flow::scoring::create_model;
use focus_flow::state::SessionEngine;
use focus_flow::tracking::PersonTracker;
use focus_flow::{api, config};
use std::net::SocketAddr;
use tracing::Level;

fn init_tracing(level: &str) {
    let parsed = level.parse::<Level>();
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(parsed.as_ref().copied().unwrap_or(Level::INFO))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    if parsed.is_err() {
        tracing::warn!(level, "Unknown logging level, using info");
    }
}

/// Replay file when one is configured and readable, otherwise a source that
/// never sees anyone.
fn detection_source(config: &config::Config) -> Box<dyn DetectionSource + Send> {
    let Some(path) = config.replay_path() else {
        tracing::warn!("No replay path configured, detector will report empty frames");
        return Box::new(ScriptedSource::new(Vec::new()));
    };
    match ReplaySource::load(path, config.loop_replay()) {
        Ok(source) => {
            tracing::info!(
                path = %path.display(),
                frames = source.frame_count(),
                looping = config.loop_replay(),
                "Replay detector loaded"
            );
            Box::new(source)
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to load replay, detector will report empty frames"
            );
            Box::new(ScriptedSource::new(Vec::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(&config.logging.level);
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "focus-flow starting"
    );

    let tracker = PersonTracker::new(
        create_model(config.scoring.clone()),
        config.tracker_config(),
        config.tick_interval_ms(),
    );
    let engine = SessionEngine::new(tracker);
    let source = detection_source(&config);
    let (driver, actor) = spawn_driver(engine, source, config.driver_settings());

    let app = api::router(driver.clone());
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    driver.shutdown().await?;
    actor.await?;

    Ok(())
}
