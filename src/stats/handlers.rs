use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::{PlayerStats, RankChanges},
    service::StatsService,
};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> StatsService {
    StatsService::new(
        Arc::clone(&state.player_repository),
        Arc::clone(&state.match_repository),
    )
}

/// GET /players/:id/stats
#[instrument(name = "player_stats", skip(state, principal))]
pub async fn player_stats(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerStats>, AppError> {
    Ok(Json(service(&state).player_stats(&principal, &player_id).await?))
}

/// GET /ranking/changes
#[instrument(name = "rank_changes", skip(state, principal))]
pub async fn rank_changes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<RankChanges>, AppError> {
    Ok(Json(service(&state).rank_changes(&principal).await?))
}
