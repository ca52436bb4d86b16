use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{models::MonthKey, service::MonthLockService};
use crate::auth::{authorize, Permission, Principal};
use crate::shared::{AppError, AppState};

#[derive(Debug, Serialize)]
pub struct LockedMonthsResponse {
    pub closed_months: Vec<MonthKey>,
}

fn service(state: &AppState) -> MonthLockService {
    MonthLockService::new(
        Arc::clone(&state.month_locks),
        Arc::clone(&state.audit_sink),
    )
}

/// GET /settings/months
#[instrument(name = "list_locked_months", skip(state, principal))]
pub async fn list_locked_months(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<LockedMonthsResponse>, AppError> {
    authorize(&principal, Permission::Member)?;
    let closed_months = service(&state).list_locked_months().await?;
    Ok(Json(LockedMonthsResponse { closed_months }))
}

/// POST /settings/months/:month/lock
#[instrument(name = "lock_month", skip(state, principal))]
pub async fn lock_month(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(month): Path<String>,
) -> Result<Json<LockedMonthsResponse>, AppError> {
    let closed_months = service(&state).lock_month(&principal, &month).await?;
    info!(month = %month, "Month lock request completed");
    Ok(Json(LockedMonthsResponse { closed_months }))
}

/// POST /settings/months/:month/unlock
#[instrument(name = "unlock_month", skip(state, principal))]
pub async fn unlock_month(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(month): Path<String>,
) -> Result<Json<LockedMonthsResponse>, AppError> {
    let closed_months = service(&state).unlock_month(&principal, &month).await?;
    info!(month = %month, "Month unlock request completed");
    Ok(Json(LockedMonthsResponse { closed_months }))
}
