use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::{
    controller::AppState,
    repo::{history::MAX_HISTORY_LIMIT, HistoryStats, PredictionRecord},
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub city: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<PredictionRecord>,
    pub stats: HistoryStats,
}

/// GET /history - recent predictions with overall error statistics
///
/// Returns at most `limit` records; `limit=0` yields an empty list.
pub async fn get_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let city = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let history = state.repos.history.get_history(limit, city).await?;
    let stats = state.repos.history.get_stats().await?;

    Ok(Json(HistoryResponse { history, stats }))
}
