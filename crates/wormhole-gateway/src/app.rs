use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_url_handler, delete_url_handler, health_handler, redirect_handler, stats_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorten", post(create_url_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/stats/{short_code}", get(stats_handler))
                    .route("/link/{short_code}", delete(delete_url_handler)),
            )
            .route("/{short_code}", get(redirect_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
