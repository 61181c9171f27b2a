pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod rooms;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::cors::CorsLayer;

pub use config::Config;
pub use error::{GameError, GameResult};
pub use session::Coordinator;

/// Path the game client opens its socket on.
pub const SOCKET_PATH: &str = "/socket.io/";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(SOCKET_PATH, get(session::ws::socket))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
