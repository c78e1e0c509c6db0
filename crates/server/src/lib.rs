mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use docscribe_common::config::ServerAppConfig;
use docscribe_extract_audio::SpeechToText;

pub struct AppState {
    pub config: ServerAppConfig,
    pub model: Arc<dyn SpeechToText>,
}

impl AppState {
    /// State with the speech-to-text backend selected by `config`.
    pub fn new(config: ServerAppConfig) -> Self {
        let model = docscribe_extract_audio::from_settings(&config.transcription);
        Self { config, model }
    }

    pub fn with_model(config: ServerAppConfig, model: Arc<dyn SpeechToText>) -> Self {
        Self { config, model }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = match state.config.server.max_upload_mb {
        0 => DefaultBodyLimit::disable(),
        mb => DefaultBodyLimit::max(mb.saturating_mul(1024 * 1024)),
    };

    Router::new()
        .route("/api/upload", post(routes::upload))
        .route("/api/health", get(routes::health))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
