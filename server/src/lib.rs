use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::get, Json, Router};
use parking_lot::Mutex;
use retrieval_core::config::DataPaths;
use retrieval_core::tokenizer::StemLanguage;
use retrieval_core::{DocId, SearchError, SearchHit, Searcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Keep only the first `k` hits; all hits when absent. Must be at least 1.
    pub k: Option<usize>,
}
fn default_model() -> String { "vector".into() }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub model: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

/// The engine is single-threaded: every call goes through this one lock.
#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<Mutex<Searcher>>,
}

/// Load the normalizer and vector model from `paths` and build the router.
/// The stemmer defaults to the one recorded by the index; `stem` must agree with it.
/// A missing stop-word list is fatal; a missing model only disables vector search.
pub fn build_app(paths: &DataPaths, stem: Option<StemLanguage>) -> Result<Router> {
    let normalizer = paths.normalizer(stem)?;
    let searcher = Searcher::open(&paths.index, &paths.artifacts(), normalizer);
    tracing::info!(index = %paths.index.display(), vector = searcher.has_vector_model(), "search engine ready");
    Ok(router(searcher))
}

pub fn router(searcher: Searcher) -> Router {
    let app_state = AppState { searcher: Arc::new(Mutex::new(searcher)) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    if params.k == Some(0) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": { "kind": "invalid_parameter", "message": "k must be at least 1" } })),
        )
            .into_response();
    }
    let start = std::time::Instant::now();
    let searcher = state.searcher.clone();
    let (q, model) = (params.q.clone(), params.model.clone());
    let outcome = tokio::task::spawn_blocking(move || {
        let guard = searcher.lock();
        guard.search(&q, &model)
    })
    .await;

    match outcome {
        Ok(Ok(mut results)) => {
            let total_hits = results.len();
            if let Some(k) = params.k {
                results.truncate(k);
            }
            let took_s = start.elapsed().as_secs_f64();
            Json(SearchResponse { query: params.q, model: params.model, took_s, total_hits, results }).into_response()
        }
        Ok(Err(err)) => error_response(&err),
        Err(err) => internal_error(err),
    }
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Response {
    let searcher = state.searcher.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let guard = searcher.lock();
        guard.document(doc_id)
    })
    .await;
    match outcome {
        Ok(Ok(Some(doc))) => Json(serde_json::json!({
            "doc_id": doc.doc_id,
            "title": doc.title,
            "author": doc.author,
            "total_terms": doc.total_terms,
            "text": doc.raw_text,
        }))
        .into_response(),
        Ok(Ok(None)) => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": { "kind": "not_found", "message": format!("no document {doc_id}") } }))).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(err) => internal_error(err),
    }
}

fn error_response(err: &SearchError) -> Response {
    let status = match err {
        SearchError::UnknownModel(_) => StatusCode::BAD_REQUEST,
        SearchError::IndexUnavailable(_) | SearchError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    tracing::warn!(kind = err.kind(), error = %err, "query failed");
    (status, Json(serde_json::json!({ "error": { "kind": err.kind(), "message": err.to_string() } }))).into_response()
}

fn internal_error(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "search task failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": { "kind": "internal", "message": "search task failed" } }))).into_response()
}
