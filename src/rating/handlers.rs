use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::{RatingSummary, RecalculationSummary, XpSummary},
    service::RecalculationService,
};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RecalculateQuery {
    /// Preview by default; `dry_run=false` commits
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

fn service(state: &AppState) -> RecalculationService {
    RecalculationService::new(
        Arc::clone(&state.player_repository),
        Arc::clone(&state.match_repository),
        Arc::clone(&state.rule_repository),
        Arc::clone(&state.replay_store),
        Arc::clone(&state.audit_sink),
        Arc::clone(&state.recalc_lock),
    )
}

/// POST /settings/recalculate/rating?dry_run=
#[instrument(name = "recalculate_rating", skip(state, principal))]
pub async fn recalculate_rating(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RecalculateQuery>,
) -> Result<Json<RatingSummary>, AppError> {
    Ok(Json(
        service(&state)
            .recalculate_rating(&principal, query.dry_run)
            .await?,
    ))
}

/// POST /settings/recalculate/xp?dry_run=
#[instrument(name = "recalculate_xp", skip(state, principal))]
pub async fn recalculate_xp(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RecalculateQuery>,
) -> Result<Json<XpSummary>, AppError> {
    Ok(Json(
        service(&state)
            .recalculate_xp(&principal, query.dry_run)
            .await?,
    ))
}

/// POST /settings/recalculate/all?dry_run=
#[instrument(name = "recalculate_all", skip(state, principal))]
pub async fn recalculate_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RecalculateQuery>,
) -> Result<Json<RecalculationSummary>, AppError> {
    Ok(Json(
        service(&state)
            .recalculate_all(&principal, query.dry_run)
            .await?,
    ))
}
