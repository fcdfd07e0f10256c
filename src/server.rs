use crate::app::interpret::excerpt;
use crate::app::submit_use_case::SubmitUseCase;
use crate::constants::{SUBMISSION_FAILED, WAITLIST_ROUTE};
use crate::domain::{GatewayResult, GatewayStatus};
use crate::error::Result;
use crate::observability::metrics;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use serde_json::Value;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub use_case: SubmitUseCase,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "waitlist-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_text() -> impl IntoResponse {
    metrics::render()
}

/// Inbound submission endpoint. Always answers with the normalized result.
async fn submit(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let result = match body {
        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => run_isolated(state.use_case, value).await,
            Err(e) => gateway_error(&e.to_string()),
        },
        Err(e) => gateway_error(&e.to_string()),
    };
    respond(result)
}

/// Run the use case on its own task so a panic becomes a `gatewayError`.
async fn run_isolated(use_case: SubmitUseCase, value: Value) -> GatewayResult {
    match tokio::spawn(async move { use_case.submit_value(&value).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!("Submission task aborted: {}", e);
            gateway_error(&e.to_string())
        }
    }
}

fn gateway_error(message: &str) -> GatewayResult {
    let result = GatewayResult::gateway_error(SUBMISSION_FAILED, excerpt(Some(message)));
    metrics::submission::completed(GatewayStatus::GatewayError);
    result
}

fn respond(result: GatewayResult) -> Response {
    let status = StatusCode::from_u16(result.status.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result.to_body())).into_response()
}

/// Create the HTTP server with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route(WAITLIST_ROUTE, post(submit))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Waitlist gateway listening on http://{}", addr);
    info!("Submissions: POST http://localhost:{}{}", port, WAITLIST_ROUTE);

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
