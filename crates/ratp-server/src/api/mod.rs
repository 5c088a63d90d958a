mod dashboard;
mod shops;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use ratp_core::FilterSelection;
use ratp_dashboard::DashboardError;
use ratp_opendata::{CacheRead, CacheSettings, DatasetCache, OpenDataClient, OpenDataError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

/// One dataset cache per process, shared by every handler.
///
/// Reads go through the mutex so at most one refresh cycle runs at a time.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Mutex<DatasetCache<OpenDataClient>>>,
}

impl AppState {
    pub fn new(client: OpenDataClient, settings: CacheSettings) -> Self {
        Self {
            cache: Arc::new(Mutex::new(DatasetCache::new(client, settings))),
        }
    }

    pub(super) async fn read_dataset(&self) -> Result<CacheRead, OpenDataError> {
        self.cache.lock().await.get_dataset().await
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    dataset: &'static str,
    fetched_at: Option<DateTime<Utc>>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" | "no_data" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// `types` and `communes` query parameters, as comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub(super) struct FilterQuery {
    pub types: Option<String>,
    pub communes: Option<String>,
}

impl FilterQuery {
    pub(super) fn selection(&self) -> FilterSelection {
        FilterSelection::from_comma_lists(self.types.as_deref(), self.communes.as_deref())
    }
}

/// A refresh failed and there was no earlier dataset to show.
pub(super) fn map_upstream_error(request_id: String, error: &OpenDataError) -> ApiError {
    tracing::error!(error = %error, "dataset unavailable");
    let message = if error.is_parse() {
        format!("open data response could not be read: {error}")
    } else {
        format!("open data API could not be reached: {error}")
    };
    ApiError::new(request_id, "upstream_unavailable", message)
}

pub(super) fn map_dashboard_error(request_id: String, error: &DashboardError) -> ApiError {
    match error {
        DashboardError::EmptyDataset { .. } => {
            ApiError::new(request_id, "no_data", error.to_string())
        }
        DashboardError::Csv(_) | DashboardError::Io(_) => {
            tracing::error!(error = %error, "export failed");
            ApiError::new(request_id, "internal_error", "export failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/dashboard", get(dashboard::get_dashboard))
        .route("/api/v1/refresh", post(dashboard::refresh_dataset))
        .route("/api/v1/shops", get(shops::list_shops))
        .route("/api/v1/export.csv", get(shops::export_csv))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Reports whether a dataset is loaded, without triggering a fetch.
///
/// Never waits on the cache: while a fetch cycle holds it, the dataset is
/// reported as `refreshing`.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let snapshot = state.cache.try_lock().map(|cache| cache.snapshot());
    let data = match snapshot {
        Ok(Some(snapshot)) => HealthData {
            status: "ok",
            dataset: "loaded",
            fetched_at: Some(snapshot.fetched_at),
        },
        Ok(None) => HealthData {
            status: "ok",
            dataset: "empty",
            fetched_at: None,
        },
        Err(_) => HealthData {
            status: "ok",
            dataset: "refreshing",
            fetched_at: None,
        },
    };

    (
        StatusCode::OK,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

#[cfg(test)]
#[path = "../api_test.rs"]
mod tests;
