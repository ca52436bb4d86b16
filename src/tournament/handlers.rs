use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

use super::{
    generator::{TournamentMode, DEFAULT_TARGET_GAMES},
    service::{TournamentResult, TournamentService},
};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct GenerateTournamentRequest {
    pub date: NaiveDate,
    pub attendees: Vec<String>,
    #[serde(default)]
    pub mode: TournamentMode,
    pub target_games: Option<usize>,
}

/// POST /tournaments/generate
#[instrument(name = "generate_tournament", skip(state, principal, request))]
pub async fn generate_tournament(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<GenerateTournamentRequest>,
) -> Result<(StatusCode, Json<TournamentResult>), AppError> {
    let service = TournamentService::new(
        Arc::clone(&state.player_repository),
        Arc::clone(&state.match_repository),
        Arc::clone(&state.month_locks),
        Arc::clone(&state.audit_sink),
    );
    let result = service
        .generate(
            &principal,
            request.date,
            &request.attendees,
            request.mode,
            request.target_games.unwrap_or(DEFAULT_TARGET_GAMES),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}
