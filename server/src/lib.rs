use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use fieldsearch_core::persist::{load_store, IndexPaths};
use fieldsearch_core::{QueryError, ScoredHit, SearchEngine, SortSpec};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: u32,
    /// Sort field; the index default applies when absent.
    pub sort: Option<String>,
    #[serde(default = "default_desc")]
    pub desc: bool,
    /// Literal the stored text must contain; defaults to `q`.
    pub literal: Option<String>,
}
fn default_k() -> u32 {
    10
}
fn default_desc() -> bool {
    true
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    /// Hits from the relevance search before sorting and re-filtering.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Stored fields containing the literal, with each occurrence wrapped in `<em>`.
    pub highlights: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub engine: Arc<RwLock<Arc<SearchEngine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn engine(&self) -> Arc<SearchEngine> {
        Arc::clone(&self.engine.read())
    }
}

fn load_engine(index_root: &FsPath) -> Result<SearchEngine> {
    let store = load_store(&IndexPaths::new(index_root))?;
    Ok(SearchEngine::new(Arc::new(store)))
}

pub fn build_app(index_dir: String) -> Result<Router> {
    build_app_with(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    let index_root = PathBuf::from(&index_dir);
    let engine = load_engine(&index_root)?;
    let app_state = AppState {
        index_root,
        engine: Arc::new(RwLock::new(Arc::new(engine))),
        admin_token,
    };

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
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let engine = state.engine();
    let k = params.k.clamp(1, 1000);
    let literal = params.literal.as_deref().unwrap_or(&params.q);
    let sort = params
        .sort
        .as_ref()
        .map(|field| SortSpec { field: field.clone(), descending: params.desc });
    let outcome = engine
        .query_with(&params.q, k, sort.as_ref().or(engine.default_sort()), literal)
        .map_err(|e: QueryError| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let results = outcome.hits.iter().map(|hit| to_search_hit(hit, literal)).collect();
    let elapsed = start.elapsed();
    tracing::debug!(q = %params.q, total_hits = outcome.total_hits, "search served");
    Ok(Json(SearchResponse {
        query: params.q.clone(),
        took_s: elapsed.as_secs_f64(),
        total_hits: outcome.total_hits,
        results,
    }))
}

fn to_search_hit(hit: &ScoredHit, literal: &str) -> SearchHit {
    let fields = hit.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
    let highlights = hit
        .fields
        .iter()
        .filter_map(|(k, v)| {
            let text = v.as_text();
            (!literal.is_empty() && text.contains(literal))
                .then(|| (k.clone(), text.replace(literal, &format!("<em>{literal}</em>"))))
        })
        .collect();
    SearchHit { doc_id: hit.doc_id, score: hit.score, fields, highlights }
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let engine = state.engine();
    let fields = engine
        .store()
        .stored_fields(doc_id)
        .ok_or((StatusCode::NOT_FOUND, format!("doc {doc_id} not found")))?;
    let fields: serde_json::Map<String, serde_json::Value> =
        fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
    Ok(Json(serde_json::json!({ "doc_id": doc_id, "fields": fields })))
}

/// Swap in the snapshot currently on disk. In-flight searches finish on the old one.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let index_root = state.index_root.clone();
    // file read and decode stay off the async workers
    let engine = tokio::task::spawn_blocking(move || load_engine(&index_root))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("reload task failed: {e}")))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let num_docs = engine.store().num_docs();
    *state.engine.write() = Arc::new(engine);
    tracing::info!(num_docs, "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
