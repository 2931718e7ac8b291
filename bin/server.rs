// Event Enrichment Pipeline - Web Server
// REST API with Axum: POST a RawEvent, get the processed event back

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use event_enrichment::{
    init_tracing, EventPipeline, PipelineConfig, PipelineError, ProcessedEvent, RawEvent,
    TracingSink,
};

/// Environment variable for the bind address
const ADDR_ENV: &str = "EVENT_SERVER_ADDR";
/// Optional path to a pipeline config JSON file
const CONFIG_ENV: &str = "EVENT_PIPELINE_CONFIG";

/// Shared application state
#[derive(Clone)]
struct AppState {
    pipeline: Arc<EventPipeline>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Lookup(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/stages - Stage layout with modifiers
async fn get_stages(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.pipeline.describe()))
}

/// Run the pipeline on the blocking pool; resolvers may block on I/O
async fn run_pipeline(
    pipeline: Arc<EventPipeline>,
    raw: RawEvent,
) -> Result<ProcessedEvent, (StatusCode, String)> {
    match tokio::task::spawn_blocking(move || pipeline.run(raw)).await {
        Ok(Ok(processed)) => Ok(processed),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "rejecting event");
            Err((status_for(&e), e.to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "pipeline task failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "pipeline task failed".to_string()))
        }
    }
}

/// POST /api/events - Run one event through the pipeline
async fn process_event(
    State(state): State<AppState>,
    Json(raw): Json<RawEvent>,
) -> impl IntoResponse {
    match run_pipeline(Arc::clone(&state.pipeline), raw).await {
        Ok(processed) => (StatusCode::OK, Json(ApiResponse::ok(processed))).into_response(),
        Err((status, message)) => (status, Json(ApiResponse::<()>::err(message))).into_response(),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("🌐 Event Enrichment Pipeline - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let config = PipelineConfig::from_file(&path)?;
            println!("✓ Config loaded: {}", path);
            config
        }
        Err(_) => PipelineConfig::default(),
    };

    // Create shared state
    let state = AppState {
        pipeline: Arc::new(EventPipeline::from_config(&config, Arc::new(TracingSink))),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stages", get(get_stages))
        .route("/events", post(process_event))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: POST http://{}/api/events", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
