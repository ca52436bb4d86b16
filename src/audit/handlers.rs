use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::instrument;

use super::models::AuditEntry;
use crate::auth::{authorize, Permission, Principal};
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /audit?limit=
#[instrument(name = "list_audit_log", skip(state, principal))]
pub async fn list_audit_log(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    authorize(&principal, Permission::Administer)?;
    let limit = query.limit.unwrap_or(200).clamp(1, 1000);
    Ok(Json(state.audit_sink.recent(limit).await?))
}
