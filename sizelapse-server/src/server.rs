use crate::api::{create_router, AppState};
use axum::response::Html;
use axum::routing::get;
use sizelapse_core::{ExtractOptions, ViewConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct SizelapseServer {
    state: AppState,
    static_dir: Option<PathBuf>,
}

impl SizelapseServer {
    pub fn new(repo_path: PathBuf, static_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        if !repo_path.is_dir() {
            anyhow::bail!("Repository path {:?} is not a directory", repo_path);
        }

        Ok(Self {
            state: AppState::new(repo_path),
            static_dir,
        })
    }

    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.state.config = Arc::new(config);
        self
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.state.options = options;
        self
    }

    pub fn repo_path(&self) -> &PathBuf {
        &self.state.repo_path
    }

    pub fn router(&self) -> axum::Router {
        let app = create_router(self.state.clone());
        let app = match &self.static_dir {
            Some(dir) => app.fallback_service(ServeDir::new(dir)),
            None => app.route("/", get(index_page)),
        };
        app.layer(CorsLayer::permissive())
    }

    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();

        info!("Server listening on {}", addr);
        info!("Repository: {:?}", self.state.repo_path);
        if let Some(dir) = &self.static_dir {
            info!("Serving static files from {:?}", dir);
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Built-in viewer, used when no static directory is configured.
const INDEX_HTML: &str = include_str!("index.html");

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}
