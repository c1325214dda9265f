use crate::driver::DriverHandle;
use axum::Router;
use axum::routing::{get, post};

pub mod handlers;
pub mod responses;

pub fn router(driver: DriverHandle) -> Router {
    Router::new()
        .route("/api/display", get(handlers::get_display))
        .route("/api/events", get(handlers::get_events))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/start", post(handlers::post_start))
        .route("/api/session/stop", post(handlers::post_stop))
        .route("/api/session/reset", post(handlers::post_reset))
        .route("/api/selection", post(handlers::post_selection))
        .with_state(driver)
}
