//! Catalog API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mediacat_core::CatalogStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /api/v1/catalog/stats
///
/// Get catalog statistics.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, impl IntoResponse> {
    let catalog = Arc::clone(state.catalog());

    let result = tokio::task::spawn_blocking(move || catalog.stats())
        .await
        .map_err(|e| e.to_string())
        .and_then(|stats| stats.map_err(|e| e.to_string()));

    match result {
        Ok(stats) => Ok(Json(stats)),
        Err(error) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error }),
        )),
    }
}
