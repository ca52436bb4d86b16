use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use super::{models::RuleConfig, service::RuleService};
use crate::auth::Principal;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateRulesRequest {
    pub score_rules: BTreeMap<String, i32>,
    pub tier_rules: BTreeMap<String, i32>,
}

fn service(state: &AppState) -> RuleService {
    RuleService::new(
        Arc::clone(&state.rule_repository),
        Arc::clone(&state.audit_sink),
    )
}

/// GET /settings/rules
#[instrument(name = "get_rules", skip(state, principal))]
pub async fn get_rules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<RuleConfig>, AppError> {
    Ok(Json(service(&state).get_rules(&principal).await?))
}

/// PUT /settings/rules
#[instrument(name = "update_rules", skip(state, principal, request))]
pub async fn update_rules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateRulesRequest>,
) -> Result<Json<RuleConfig>, AppError> {
    let rules = service(&state)
        .update_rules(&principal, &request.score_rules, request.tier_rules)
        .await?;
    Ok(Json(rules))
}
