//! HTTP API over the aggregation pipeline.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/news/refresh", post(handlers::refresh))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/article/seed-one", post(handlers::seed_one))
        .route("/api/article/force-add-one", post(handlers::force_add_one))
        .route("/api/article/:id", get(handlers::get_article))
        .route("/api/article/:id/delete", post(handlers::delete_article))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: &str) -> np_core::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "listening");
    axum::serve(listener, app)
        .await
        .map_err(np_core::Error::Io)?;
    Ok(())
}
