use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use sizelapse_core::{
    render_commit, render_svg, Error, ExtractOptions, FilterConfig, FrontChainPacker, GitCli,
    HistoryExtractor, HistoryResponse, ViewConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repo_path: PathBuf,
    pub config: Arc<ViewConfig>,
    pub options: ExtractOptions,
}

impl AppState {
    pub fn new(repo_path: PathBuf) -> Self {
        Self {
            repo_path,
            config: Arc::new(ViewConfig::default()),
            options: ExtractOptions::default(),
        }
    }

    fn extractor(&self) -> HistoryExtractor<GitCli> {
        HistoryExtractor::new(GitCli::new(&self.repo_path)).with_options(self.options)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/history", get(get_history))
        .route("/api/commits/:number/frame.svg", get(get_frame_svg))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn get_history(State(state): State<AppState>) -> (StatusCode, Json<HistoryResponse>) {
    let response = state.extractor().extract_response().await;
    let status = if response.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(response))
}

async fn get_frame_svg(
    State(state): State<AppState>,
    Path(number): Path<usize>,
    Query(filters): Query<FilterConfig>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let history = state
        .extractor()
        .extract()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let snapshot = number
        .checked_sub(1)
        .and_then(|index| history.get(index))
        .ok_or_else(|| (StatusCode::NOT_FOUND, Error::CommitNotFound(number).to_string()))?;

    let frame = render_commit(snapshot, &filters, &state.config, &FrontChainPacker);
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        render_svg(&frame, &state.config),
    ))
}
