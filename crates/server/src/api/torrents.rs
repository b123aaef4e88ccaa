//! Torrent record listing.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use seedarr_core::{MediaManager, Torrent, TorrentStatus};

use crate::state::AppState;

/// Query parameters for listing torrents.
#[derive(Debug, Default, Deserialize)]
pub struct ListTorrentsQuery {
    /// Only records in this state (`new`, `uploaded`, ...).
    pub status: Option<String>,
    /// Only records of this media manager (`sonarr`, `radarr`).
    pub media_manager: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// List torrent records in discovery order.
pub async fn list_torrents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTorrentsQuery>,
) -> Result<Json<Vec<Torrent>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TorrentStatus>)
        .transpose()
        .map_err(bad_request)?;
    let media_manager = query
        .media_manager
        .as_deref()
        .map(str::parse::<MediaManager>)
        .transpose()
        .map_err(bad_request)?;

    let result = match status {
        Some(status) => state.store().list_by_status(status),
        None => state.store().list_all(),
    };

    let torrents = result.map_err(|e| {
        error!(error = %e, "Failed to list torrents");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(
        torrents
            .into_iter()
            .filter(|t| media_manager.is_none_or(|mm| t.media_manager == mm))
            .collect(),
    ))
}
