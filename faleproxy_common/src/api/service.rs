use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::state::APIState;

use super::fetch::post_fetch;

pub fn service(state: Arc<APIState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/fetch", post(post_fetch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<Arc<APIState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("faleproxy is running. Configured host: {}", state.config.host),
    )
}
