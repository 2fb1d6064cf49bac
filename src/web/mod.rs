pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{
    models::ModelManager,
    prediction::PredictionPipeline,
    storage::{FileStorage, LocalFileStorage},
    utils::error::ClassifierError,
    Config, Result,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

/// multipart边界、字段头和文本字段的余量
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 处理器共享的应用状态，启动时构建一次
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub manager: ModelManager,
    pub pipeline: Arc<PredictionPipeline>,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub fn new(manager: ModelManager, storage: Arc<dyn FileStorage>) -> Self {
        let pipeline = Arc::new(PredictionPipeline::from_manager(&manager));
        Self {
            config: manager.config().clone(),
            manager,
            pipeline,
            storage,
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    let manager = ModelManager::load(&config)?;
    let storage = Arc::new(LocalFileStorage::new(&config.upload_dir)?);
    let state = AppState::new(manager, storage);

    let app = create_app(state)?;

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ClassifierError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /api/predict - Multipart image upload");
    tracing::info!("  GET  /api/health  - Health check");
    tracing::info!("  GET  /api/info    - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ClassifierError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClassifierError::Internal(format!("Server failed: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn create_app(state: AppState) -> Result<Router> {
    let server_config = &state.config.server_config;
    let cors = cors_layer(&state.config)?;

    let app = Router::new()
        .route("/api/predict", post(handlers::predict_handler))
        .route("/api/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        // 文件上限之外为multipart边界和字段头留出余量
        .layer(DefaultBodyLimit::max(body_limit(server_config.max_request_size)))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout,
        )))
        .layer(cors)
        .with_state(state);

    Ok(app)
}

/// multipart请求体上限：文件上限加上分帧开销
pub fn body_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_add(MULTIPART_OVERHEAD)
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    if config.server_config.cors_permissive {
        tracing::warn!("CORS: allowing any origin");
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .server_config
        .cors_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                ClassifierError::Config(format!("Invalid CORS origin {}: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    state.manager.health_check()?;
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.manager.get_stats();
    Json(json!({
        "service": "ONNX Image Classifier",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "upload": {
            "max_size": state.config.server_config.max_request_size,
            "allowed_extensions": state.config.classifier_config.allowed_extensions,
        }
    }))
}
