use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use ratp_core::ShopRow;
use ratp_dashboard::{filtered_shops, to_csv_string, RawSummary};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{
    map_dashboard_error, map_upstream_error, ApiError, ApiResponse, AppState, FilterQuery,
    ResponseMeta,
};

const EXPORT_FILE_NAME: &str = "ratp-shops.csv";

#[derive(Debug, Serialize)]
pub(super) struct ShopListData {
    pub rows: Vec<ShopRow>,
    pub source_records: usize,
    pub dropped_rows: usize,
    pub raw: RawSummary,
    pub stale: bool,
}

/// Normalized rows accepted by the filter, for the raw-data table.
pub(super) async fn list_shops(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<ShopListData>>, ApiError> {
    let read = state
        .read_dataset()
        .await
        .map_err(|e| map_upstream_error(req_id.0.clone(), &e))?;
    let shops = filtered_shops(&query.selection(), &read)
        .map_err(|e| map_dashboard_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ShopListData {
            rows: shops.rows,
            source_records: shops.source_records,
            dropped_rows: shops.dropped_rows,
            raw: shops.raw,
            stale: read.is_stale(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let read = state
        .read_dataset()
        .await
        .map_err(|e| map_upstream_error(req_id.0.clone(), &e))?;
    let shops = filtered_shops(&query.selection(), &read)
        .map_err(|e| map_dashboard_error(req_id.0.clone(), &e))?;
    let body = to_csv_string(&shops.rows).map_err(|e| map_dashboard_error(req_id.0, &e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}
