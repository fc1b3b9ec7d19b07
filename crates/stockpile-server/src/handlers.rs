use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use stockpile_api::{
    ApiError, ApiResponse, CacheStats, ComponentHealth, HealthResponse, HealthStatus,
    MessageResponse, ServiceInfo, Sourced,
};
use stockpile_core::{Product, Resource, Task};

use crate::cache::CacheError;
use crate::repository::{CachedRepository, RepositoryError};
use crate::server::AppState;

/// A resource kind exposed under `/{COLLECTION}`.
pub trait ResourceRoutes: Resource {
    /// Capitalized name used in response messages.
    const LABEL: &'static str;

    fn repository(state: &AppState) -> &CachedRepository<Self>;
}

impl ResourceRoutes for Product {
    const LABEL: &'static str = "Product";

    fn repository(state: &AppState) -> &CachedRepository<Self> {
        &state.products
    }
}

impl ResourceRoutes for Task {
    const LABEL: &'static str = "Task";

    fn repository(state: &AppState) -> &CachedRepository<Self> {
        &state.tasks
    }
}

fn label_for(kind: &str) -> &'static str {
    if kind == Product::KIND {
        Product::LABEL
    } else if kind == Task::KIND {
        Task::LABEL
    } else {
        "Resource"
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { kind, .. } => {
                ApiError::not_found(format!("{} not found", label_for(kind)))
            }
            RepositoryError::InvalidId(e) => ApiError::bad_request(format!("Invalid id: {e}")),
            RepositoryError::Invalid(e) => ApiError::bad_request(e.to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::internal(other.to_string())
            }
        }
    }
}

fn cache_unavailable(err: CacheError) -> ApiError {
    tracing::error!(error = %err, "cache admin operation failed");
    ApiError::service_unavailable(err.to_string())
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| match rejection {
        JsonRejection::BytesRejection(_)
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
        {
            ApiError::payload_too_large(rejection.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::unsupported_media_type(rejection.body_text())
        }
        _ => ApiError::bad_request(rejection.body_text()),
    })
}

// ---------------------------------------------------------------------------
// Service root
// ---------------------------------------------------------------------------

pub const ENDPOINTS: &[&str] = &[
    "GET /products",
    "GET /products/{id}",
    "POST /products",
    "PUT /products/{id}",
    "DELETE /products/{id}",
    "GET /tasks",
    "GET /tasks/{id}",
    "POST /tasks",
    "PUT /tasks/{id}",
    "DELETE /tasks/{id}",
    "GET /cache/stats",
    "DELETE /cache/clear",
    "GET /health",
    "GET /metrics",
];

pub async fn root() -> ApiResponse<ServiceInfo> {
    ApiResponse::ok(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Method not allowed")
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

pub async fn list<R: ResourceRoutes>(
    State(state): State<AppState>,
) -> Result<ApiResponse<Sourced<Vec<R>>>, ApiError> {
    let records = R::repository(&state).get_all().await?;
    Ok(ApiResponse::ok(records))
}

pub async fn read<R: ResourceRoutes>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Sourced<R>>, ApiError> {
    let record = R::repository(&state).get_by_id(&id).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn create<R: ResourceRoutes>(
    State(state): State<AppState>,
    body: Result<Json<R::Input>, JsonRejection>,
) -> Result<ApiResponse<R>, ApiError> {
    let input = json_body(body)?;
    let record = R::repository(&state).create(&input).await?;

    let location = format!("/{}/{}", R::COLLECTION, record.id());
    let mut response = ApiResponse::created(record);
    if let Ok(value) = HeaderValue::from_str(&location) {
        response = response.with_header(header::LOCATION, value);
    }
    Ok(response)
}

pub async fn update<R: ResourceRoutes>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<R::Input>, JsonRejection>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    let input = json_body(body)?;
    R::repository(&state).update(&id, &input).await?;
    Ok(ApiResponse::ok(MessageResponse::new(format!(
        "{} updated",
        R::LABEL
    ))))
}

pub async fn delete<R: ResourceRoutes>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    R::repository(&state).delete(&id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(format!(
        "{} deleted",
        R::LABEL
    ))))
}

// ---------------------------------------------------------------------------
// Cache administration
// ---------------------------------------------------------------------------

pub async fn cache_stats(
    State(state): State<AppState>,
) -> Result<ApiResponse<CacheStats>, ApiError> {
    let stats = state.cache_admin.stats().await.map_err(cache_unavailable)?;
    Ok(ApiResponse::ok(stats))
}

pub async fn cache_clear(
    State(state): State<AppState>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    state.cache_admin.clear().await.map_err(cache_unavailable)?;
    Ok(ApiResponse::ok(MessageResponse::new("Cache cleared")))
}

// ---------------------------------------------------------------------------
// Health and metrics
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let (db, cache) = futures_util::future::join(state.store.ping(), state.cache.ping()).await;

    if let Err(e) = &db {
        tracing::warn!(error = %e, "health: data store unreachable");
    }
    if let Err(e) = &cache {
        tracing::warn!(error = %e, "health: cache unreachable");
    }

    let status = HealthStatus::from_checks(db.is_ok(), cache.is_ok());
    let body = HealthResponse {
        status,
        database: ComponentHealth {
            backend: state.store.backend_name().to_string(),
            status: db.is_ok().into(),
        },
        cache: ComponentHealth {
            backend: state.cache.backend_name().to_string(),
            status: cache.is_ok().into(),
        },
    };
    ApiResponse::new(body, status.status_code())
}

pub async fn metrics() -> Response {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            body,
        )
            .into_response(),
        None => ApiError::service_unavailable("Metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_storage::StorageError;

    #[test]
    fn repository_errors_map_to_statuses() {
        let cases = [
            (
                RepositoryError::not_found("product", "1"),
                StatusCode::NOT_FOUND,
            ),
            (
                RepositoryError::from(stockpile_core::validate_id("a b").unwrap_err()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RepositoryError::from(stockpile_core::ValidationError::new("name", "empty")),
                StatusCode::BAD_REQUEST,
            ),
            (
                RepositoryError::from(StorageError::connection_error("down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn not_found_uses_resource_label() {
        let err = ApiError::from(RepositoryError::not_found("task", "1"));
        assert_eq!(err.message(), "Task not found");
    }
}
