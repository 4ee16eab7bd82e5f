use crate::config::Config;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use snapcat_core::{BuildCatalogOperation, Catalog, Result, SnapshotStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub catalog: BuildCatalogOperation,
    pub config: Config,
}

impl ServerState {
    pub fn new(store: Arc<dyn SnapshotStore>, config: Config) -> Self {
        let catalog = BuildCatalogOperation::new(store, config.call_timeout())
            .with_metadata_concurrency(config.catalog.metadata_concurrency);
        Self { catalog, config }
    }

    pub async fn build_catalog(&self) -> Result<Catalog> {
        let request = self.config.catalog_request(chrono::Utc::now());
        let result = self.catalog.run(request).await?;
        Ok(result.catalog)
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let store = config.store_builder().build().await?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(ServerState::new(store, config));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(catalog_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn catalog_handler(State(state): State<Arc<ServerState>>) -> Response {
    let catalog = match state.build_catalog().await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Catalog build failed: {}", e);
            return error_response(e.to_string());
        }
    };

    // Serialized by hand so that `result` stays first and buckets keep their order.
    match catalog.to_json() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Catalog serialization failed: {}", e);
            error_response(e.to_string())
        }
    }
}

fn error_response(message: String) -> Response {
    let resp = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(resp)).into_response()
}
