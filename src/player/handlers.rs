use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::PlayerModel,
    service::PlayerService,
    types::{CreatePlayerRequest, PlayerListQuery, RankingQuery, SetRoleRequest, UpdatePlayerRequest},
};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

const DEFAULT_RANKING_LIMIT: usize = 20;

fn service(state: &AppState) -> PlayerService {
    PlayerService::new(
        Arc::clone(&state.player_repository),
        Arc::clone(&state.match_repository),
        Arc::clone(&state.audit_sink),
    )
}

/// POST /signup
#[instrument(name = "signup", skip(state, request), fields(player_id = %request.id))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerModel>), AppError> {
    let player = service(&state).signup(&request.id, &request.name).await?;
    info!("Signup request completed");
    Ok((StatusCode::CREATED, Json(player)))
}

/// GET /players
#[instrument(name = "list_players", skip(state, principal))]
pub async fn list_players(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PlayerListQuery>,
) -> Result<Json<Vec<PlayerModel>>, AppError> {
    Ok(Json(
        service(&state)
            .list_players(&principal, query.active_only)
            .await?,
    ))
}

/// GET /ranking
#[instrument(name = "ranking", skip(state, principal))]
pub async fn ranking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<PlayerModel>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    Ok(Json(service(&state).ranking(&principal, limit).await?))
}

/// GET /players/:id
#[instrument(name = "get_player", skip(state, principal))]
pub async fn get_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerModel>, AppError> {
    Ok(Json(service(&state).get_player(&principal, &player_id).await?))
}

/// POST /players
#[instrument(name = "add_player", skip(state, principal, request))]
pub async fn add_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerModel>), AppError> {
    let player = service(&state)
        .add_player(&principal, &request.id, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// PATCH /players/:id
#[instrument(name = "update_player", skip(state, principal, request))]
pub async fn update_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
    Json(request): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerModel>, AppError> {
    let player = service(&state)
        .update_player(&principal, &player_id, request.name, request.is_active)
        .await?;
    Ok(Json(player))
}

/// DELETE /players/:id
#[instrument(name = "delete_player", skip(state, principal))]
pub async fn delete_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<StatusCode, AppError> {
    service(&state).delete_player(&principal, &player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /players/:id/approve
#[instrument(name = "approve_signup", skip(state, principal))]
pub async fn approve_signup(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerModel>, AppError> {
    Ok(Json(
        service(&state).approve_signup(&principal, &player_id).await?,
    ))
}

/// POST /players/:id/reject
#[instrument(name = "reject_signup", skip(state, principal))]
pub async fn reject_signup(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerModel>, AppError> {
    Ok(Json(
        service(&state).reject_signup(&principal, &player_id).await?,
    ))
}

/// POST /players/:id/deactivate
#[instrument(name = "deactivate_player", skip(state, principal))]
pub async fn deactivate_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerModel>, AppError> {
    Ok(Json(service(&state).deactivate(&principal, &player_id).await?))
}

/// PUT /players/:id/role
#[instrument(name = "set_role", skip(state, principal, request))]
pub async fn set_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(player_id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<PlayerModel>, AppError> {
    Ok(Json(
        service(&state)
            .set_role(&principal, &player_id, request.role)
            .await?,
    ))
}
