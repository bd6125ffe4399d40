//! HTTP API.
//!
//! Thin axum layer over `InstanceManager`: extracts the tenant id and optional
//! body, calls one manager operation and maps the outcome to a status code.
//! Store error detail is logged, never returned to callers.

use crate::error::ProvisionerError;
use crate::manager::{InstanceInfo, InstanceManager, InstanceStatus};
use crate::metrics::Metrics;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// End-to-end bound on handling a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const INVALID_TENANT_MESSAGE: &str = "invalid tenant ID: must be a valid UUID";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    manager: Arc<InstanceManager>,
    metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(manager: Arc<InstanceManager>, metrics: Arc<Metrics>) -> Self {
        Self { manager, metrics }
    }
}

/// JSON envelope returned for instance operations
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct InstanceResponse {
    pub name: String,
    pub endpoint: String,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_token: Option<String>,
}

impl InstanceResponse {
    /// Response without the gateway token
    fn summary(info: InstanceInfo) -> Self {
        Self {
            name: info.name,
            endpoint: info.endpoint,
            status: info.status,
            gateway_token: None,
        }
    }

    /// Response including the gateway token, when there is one
    fn detailed(info: InstanceInfo) -> Self {
        let gateway_token = Some(info.gateway_token.clone()).filter(|t| !t.is_empty());
        Self {
            gateway_token,
            ..Self::summary(info)
        }
    }
}

/// Optional body accepted by create
#[derive(Debug, Default, Deserialize)]
pub struct CreateInstanceRequest {
    #[serde(default)]
    pub gateway_token: Option<String>,
}

/// Error response with a caller-safe message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl AppState {
    /// Record the failure and turn it into a caller-facing error.
    ///
    /// `public_message` replaces the detail of infrastructure failures.
    fn failure(
        &self,
        operation: &'static str,
        tenant_id: &str,
        public_message: &'static str,
        err: ProvisionerError,
    ) -> ApiError {
        match err {
            ProvisionerError::InvalidTenantId(_) => {
                warn!(operation, tenant = %tenant_id, "Rejected invalid tenant ID");
                self.metrics.record(operation, "invalid");
                ApiError::new(StatusCode::BAD_REQUEST, INVALID_TENANT_MESSAGE)
            }
            ProvisionerError::UnsupportedOperation(message) => {
                self.metrics.record(operation, "unsupported");
                ApiError::new(StatusCode::NOT_IMPLEMENTED, message)
            }
            other => {
                error!(operation, tenant = %tenant_id, error = %other, "Operation failed");
                self.metrics.record(operation, "error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, public_message)
            }
        }
    }
}

/// Build the application router.
///
/// Routes:
/// - `GET /health` - liveness
/// - `GET /metrics` - Prometheus metrics
/// - `POST /tenants/{tenant_id}/instance` - create
/// - `GET /tenants/{tenant_id}/instance` - read
/// - `DELETE /tenants/{tenant_id}/instance` - delete all of the tenant's instances
/// - `POST /tenants/{tenant_id}/instance/stop` - same as delete
/// - `POST /tenants/{tenant_id}/instance/start` - always 501
///
/// Every response carries an `x-request-id` header, taken from the request
/// when the caller supplied one.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route(
            "/tenants/{tenant_id}/instance",
            post(create_instance)
                .get(get_instance)
                .delete(delete_instance),
        )
        .route("/tenants/{tenant_id}/instance/stop", post(stop_instance))
        .route("/tenants/{tenant_id}/instance/start", post(start_instance))
        .with_state(state);
    with_middleware(routes)
}

/// Shared middleware stack, outermost first: request id assignment, trace
/// span, request id echo, panic recovery, request timeout.
fn with_middleware(routes: Router) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// A panicking handler becomes a generic 500 instead of a dropped connection
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Handler panicked");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics")
                .into_response()
        }
    }
}

async fn create_instance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<InstanceResponse>), ApiError> {
    // Missing or unparseable bodies fall back to a generated token
    let request: CreateInstanceRequest = serde_json::from_slice(&body).unwrap_or_default();
    info!(tenant = %tenant_id, "CreateInstance");

    match state
        .manager
        .create_instance(&tenant_id, request.gateway_token.as_deref())
        .await
    {
        Ok(info) => {
            state.metrics.record("create", "success");
            Ok((StatusCode::CREATED, Json(InstanceResponse::summary(info))))
        }
        Err(e) => Err(state.failure("create", &tenant_id, "failed to create instance", e)),
    }
}

async fn get_instance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<InstanceResponse>, ApiError> {
    info!(tenant = %tenant_id, "GetInstance");

    match state.manager.get_instance(&tenant_id).await {
        Ok(Some(info)) => {
            state.metrics.record("get", "success");
            Ok(Json(InstanceResponse::detailed(info)))
        }
        Ok(None) => {
            state.metrics.record("get", "not_found");
            Err(ApiError::new(StatusCode::NOT_FOUND, "instance not found"))
        }
        Err(e) => Err(state.failure("get", &tenant_id, "failed to retrieve instance", e)),
    }
}

async fn delete_instance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!(tenant = %tenant_id, "DeleteInstance");

    match state.manager.delete_instance(&tenant_id).await {
        Ok(()) => {
            state.metrics.record("delete", "success");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(state.failure("delete", &tenant_id, "failed to delete instance", e)),
    }
}

async fn stop_instance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!(tenant = %tenant_id, "StopInstance");

    match state.manager.stop_instance(&tenant_id).await {
        Ok(()) => {
            state.metrics.record("stop", "success");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(state.failure("stop", &tenant_id, "failed to stop instance", e)),
    }
}

async fn start_instance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!(tenant = %tenant_id, "StartInstance");

    match state.manager.start_instance(&tenant_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(state.failure("start", &tenant_id, "failed to start instance", e)),
    }
}
