use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use np_core::{GeneratedContent, PublishedArticle};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::AppState;

/// Interactive endpoints give up after this long rather than hold the
/// connection open through slow generation.
const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(180);

/// Error wrapper so handlers can use `?` on store and pipeline calls.
pub struct ApiError(np_core::Error);

impl From<np_core::Error> for ApiError {
    fn from(e: np_core::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "error", "message": self.0.to_string()})),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    articles: usize,
    displayable: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let articles = state.articles.load_all().await?.len();
    let displayable = state.aggregator.displayable().await?.len();
    Ok(Json(StatusResponse {
        status: "ok",
        articles,
        displayable,
    })
    .into_response())
}

/// Kick off a full refresh in the background and acknowledge immediately.
pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tokio::spawn(async move {
        let candidates = state.reader.fetch_candidates().await;
        let trending = state.aggregator.trending_keywords().await;
        match state.processor.run_batch(candidates, &trending).await {
            Ok(published) => {
                info!(published, "background refresh finished");
                state.aggregator.invalidate().await;
            }
            Err(e) => warn!(error = %e, "background refresh failed"),
        }
    });
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "accepted"})),
    )
}

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<usize>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let view = state.aggregator.page(params.page.unwrap_or(1)).await?;
    Ok(Json(view).into_response())
}

#[derive(Serialize)]
struct ArticleView {
    article: PublishedArticle,
    content: Option<GeneratedContent>,
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(article) = state.aggregator.article(&id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"status": "not_found"})),
        )
            .into_response());
    };
    let content = state.aggregator.content(&id).await?;
    Ok(Json(ArticleView { article, content }).into_response())
}

/// Spawn `task` and wait for it at most `deadline`. On timeout the response
/// gives up with `Ok(None)` but the spawned task keeps running; a half-done
/// publish is never cancelled mid-write.
async fn await_detached<T, F>(deadline: Duration, task: F) -> Result<Option<T>, ApiError>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(task);
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) => Err(ApiError(np_core::Error::Content(format!(
            "background task failed: {}",
            e
        )))),
        Err(_) => Ok(None),
    }
}

/// Add one article row without generated content. It becomes visible once a
/// later pipeline run processes it.
pub async fn seed_one(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let outcome = await_detached(INTERACTIVE_TIMEOUT, async move {
        let candidates = state.reader.fetch_candidates().await;
        let trending = state.aggregator.trending_keywords().await;
        let target = state.articles.load_all().await?.len() + 1;
        np_pipeline::seed_articles(
            state.articles.clone(),
            state.generator.clone(),
            candidates,
            &trending,
            target,
        )
        .await
    })
    .await?;
    match outcome {
        Some(Ok(added)) if added > 0 => {
            Ok(Json(serde_json::json!({"status": "ok", "added": added})).into_response())
        }
        Some(Ok(_)) => Ok(Json(serde_json::json!({"status": "none"})).into_response()),
        Some(Err(e)) => Err(ApiError(e)),
        None => Ok((
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({
                "status": "error",
                "message": "seed timed out, still running in the background"
            })),
        )
            .into_response()),
    }
}

/// Publish exactly one article right now, reprocessing an existing one if
/// everything has been seen before.
pub async fn force_add_one(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let outcome = await_detached(INTERACTIVE_TIMEOUT, async move {
        let candidates = state.reader.fetch_candidates().await;
        let trending = state.aggregator.trending_keywords().await;
        let result = state.processor.force_add_one(candidates, &trending).await;
        // Invalidate inside the task so a publish that outlives the caller
        // still refreshes the snapshot.
        if matches!(result, Ok(Some(_))) {
            state.aggregator.invalidate().await;
        }
        result
    })
    .await?;
    match outcome {
        Some(Ok(Some(id))) => {
            Ok(Json(serde_json::json!({"status": "ok", "id": id})).into_response())
        }
        Some(Ok(None)) => Ok(Json(serde_json::json!({"status": "none"})).into_response()),
        Some(Err(e)) => Err(ApiError(e)),
        None => Ok((
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({
                "status": "error",
                "message": "generation timed out, still running in the background"
            })),
        )
            .into_response()),
    }
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let had_content = state.contents.delete_content(&id).await?;
    let had_article = state.articles.delete_article(&id).await?;
    if !had_article && !had_content {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"status": "not_found"})),
        )
            .into_response());
    }
    state.aggregator.invalidate().await;
    info!(id, "article deleted");
    Ok(Json(serde_json::json!({"status": "deleted"})).into_response())
}
