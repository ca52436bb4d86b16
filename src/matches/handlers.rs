use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::{MatchModel, NewMatch},
    repository::MatchFilter,
    service::MatchService,
    types::{CreateMatchRequest, DaySummary, MatchEdit, MatchListQuery, RejectRequest, ScoreRequest},
};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> MatchService {
    MatchService::new(
        Arc::clone(&state.match_repository),
        Arc::clone(&state.player_repository),
        Arc::clone(&state.month_locks),
        Arc::clone(&state.audit_sink),
    )
}

/// GET /matches?date=|month=|player=
#[instrument(name = "list_matches", skip(state, principal))]
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchModel>>, AppError> {
    let filter = if let Some(date) = query.date {
        MatchFilter::Date(date)
    } else if let Some(month) = query.month {
        MatchFilter::Month(month.parse()?)
    } else if let Some(player) = query.player {
        MatchFilter::Participant(player)
    } else {
        MatchFilter::All
    };
    Ok(Json(service(&state).list_matches(&principal, &filter).await?))
}

/// GET /matches/:id
#[instrument(name = "get_match", skip(state, principal))]
pub async fn get_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
) -> Result<Json<MatchModel>, AppError> {
    Ok(Json(service(&state).get_match(&principal, match_id).await?))
}

/// GET /matches/summary/:date
#[instrument(name = "day_summary", skip(state, principal))]
pub async fn day_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DaySummary>, AppError> {
    Ok(Json(service(&state).day_summary(&principal, date).await?))
}

/// POST /matches
#[instrument(name = "create_match", skip(state, principal, request))]
pub async fn create_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchModel>), AppError> {
    let created = service(&state)
        .create_match(
            &principal,
            NewMatch {
                date: request.date,
                group_name: request.group_name,
                team1: request.team1,
                team2: request.team2,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /matches/:id
#[instrument(name = "edit_match", skip(state, principal, edit))]
pub async fn edit_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
    Json(edit): Json<MatchEdit>,
) -> Result<Json<MatchModel>, AppError> {
    Ok(Json(
        service(&state).admin_edit(&principal, match_id, edit).await?,
    ))
}

/// DELETE /matches/:id
#[instrument(name = "delete_match", skip(state, principal))]
pub async fn delete_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    service(&state).delete_match(&principal, match_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /matches/:id/submit-score
#[instrument(name = "submit_score", skip(state, principal, request))]
pub async fn submit_score(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<MatchModel>, AppError> {
    let updated = service(&state)
        .submit_score(&principal, match_id, request.score1, request.score2)
        .await?;
    Ok(Json(updated))
}

/// POST /matches/:id/approve
#[instrument(name = "approve_match", skip(state, principal))]
pub async fn approve_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
) -> Result<Json<MatchModel>, AppError> {
    Ok(Json(service(&state).approve(&principal, match_id).await?))
}

/// POST /matches/:id/reject
#[instrument(name = "reject_match", skip(state, principal, request))]
pub async fn reject_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<MatchModel>, AppError> {
    Ok(Json(
        service(&state)
            .reject(&principal, match_id, &request.reason)
            .await?,
    ))
}

/// POST /matches/:id/force-confirm
#[instrument(name = "force_confirm", skip(state, principal, request))]
pub async fn force_confirm(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<MatchModel>, AppError> {
    let updated = service(&state)
        .force_confirm(&principal, match_id, request.score1, request.score2)
        .await?;
    Ok(Json(updated))
}

/// POST /matches/:id/cancel
#[instrument(name = "cancel_match", skip(state, principal))]
pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<i64>,
) -> Result<Json<MatchModel>, AppError> {
    Ok(Json(service(&state).cancel(&principal, match_id).await?))
}
