use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use ratp_dashboard::{build_view, GroupOrder, ViewOptions, ViewOutcome};
use ratp_opendata::Freshness;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_upstream_error, ApiError, ApiResponse, AppState, FilterQuery, ResponseMeta};

const MAX_TOP_COMMUNES: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub(super) struct DashboardQuery {
    pub types: Option<String>,
    pub communes: Option<String>,
    pub order: Option<String>,
    pub top: Option<usize>,
}

impl DashboardQuery {
    fn filters(&self) -> FilterQuery {
        FilterQuery {
            types: self.types.clone(),
            communes: self.communes.clone(),
        }
    }

    pub(super) fn view_options(&self) -> Result<ViewOptions, String> {
        let mut options = ViewOptions::default();
        if let Some(order) = self.order.as_deref() {
            options.order = order.parse::<GroupOrder>()?;
        }
        if let Some(top) = self.top {
            if top == 0 || top > MAX_TOP_COMMUNES {
                return Err(format!("top must be between 1 and {MAX_TOP_COMMUNES}"));
            }
            options.top_communes = top;
        }
        Ok(options)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    pub records: usize,
    pub pages_fetched: usize,
    pub truncated: bool,
    pub fetched_at: DateTime<Utc>,
    /// Set when the refetch failed and the earlier dataset was kept.
    pub notice: Option<String>,
}

pub(super) async fn get_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<ViewOutcome>>, ApiError> {
    let options = query
        .view_options()
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;
    let selection = query.filters().selection();

    let read = state
        .read_dataset()
        .await
        .map_err(|e| map_upstream_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: build_view(&selection, &read, &options),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Drops the TTL on the current dataset and refetches it.
pub(super) async fn refresh_dataset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let result = {
        let mut cache = state.cache.lock().await;
        cache.invalidate();
        cache.get_dataset().await
    };
    let read = result.map_err(|e| map_upstream_error(req_id.0.clone(), &e))?;

    let notice = match &read.freshness {
        Freshness::Stale { warning } => Some(warning.clone()),
        Freshness::Cached | Freshness::Refreshed => None,
    };

    Ok(Json(ApiResponse {
        data: RefreshData {
            records: read.snapshot.records.len(),
            pages_fetched: read.snapshot.pages_fetched,
            truncated: read.snapshot.truncated,
            fetched_at: read.snapshot.fetched_at,
            notice,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
