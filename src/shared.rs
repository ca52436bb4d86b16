use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use crate::audit::{AuditSink, InMemoryAuditSink, PostgresAuditSink};
use crate::auth::TokenConfig;
use crate::matches::repository::{InMemoryMatchRepository, MatchRepository, PostgresMatchRepository};
use crate::month_lock::repository::{
    InMemoryMonthLockRepository, MonthLockRepository, PostgresMonthLockRepository,
};
use crate::player::repository::{
    InMemoryPlayerRepository, PlayerRepository, PostgresPlayerRepository,
};
use crate::rating::repository::{InMemoryReplayStore, PostgresReplayStore, ReplayStore};
use crate::rules::repository::{InMemoryRuleRepository, PostgresRuleRepository, RuleRepository};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    pub match_repository: Arc<dyn MatchRepository + Send + Sync>,
    pub rule_repository: Arc<dyn RuleRepository + Send + Sync>,
    pub month_locks: Arc<dyn MonthLockRepository + Send + Sync>,
    pub replay_store: Arc<dyn ReplayStore + Send + Sync>,
    pub audit_sink: Arc<dyn AuditSink + Send + Sync>,
    pub token_config: TokenConfig,
    /// Serialises rating/XP recomputation so two replays never interleave their writes.
    pub recalc_lock: Arc<AsyncMutex<()>>,
}

impl AppState {
    /// Wires every repository to its in-memory implementation.
    pub fn in_memory(token_config: TokenConfig) -> Self {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let matches = Arc::new(InMemoryMatchRepository::new());
        let replay_store = Arc::new(InMemoryReplayStore::new(players.clone(), matches.clone()));

        Self {
            player_repository: players,
            match_repository: matches,
            rule_repository: Arc::new(InMemoryRuleRepository::with_defaults()),
            month_locks: Arc::new(InMemoryMonthLockRepository::new()),
            replay_store,
            audit_sink: Arc::new(InMemoryAuditSink::new()),
            token_config,
            recalc_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn postgres(pool: sqlx::PgPool, token_config: TokenConfig) -> Self {
        Self {
            player_repository: Arc::new(PostgresPlayerRepository::new(pool.clone())),
            match_repository: Arc::new(PostgresMatchRepository::new(pool.clone())),
            rule_repository: Arc::new(PostgresRuleRepository::new(pool.clone())),
            month_locks: Arc::new(PostgresMonthLockRepository::new(pool.clone())),
            replay_store: Arc::new(PostgresReplayStore::new(pool.clone())),
            audit_sink: Arc::new(PostgresAuditSink::new(pool)),
            token_config,
            recalc_lock: Arc::new(AsyncMutex::new(())),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Only storage failures may succeed on a plain retry; everything else needs the
    /// caller to change the request or the league state first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DatabaseError(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::warn!(error = %err, "Storage operation failed");
        AppError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => {
                tracing::error!(error = %msg, "Responding with storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage failure".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED)]
    #[case(AppError::Forbidden("admin only".into()), StatusCode::FORBIDDEN)]
    #[case(AppError::Conflict("locked".into()), StatusCode::CONFLICT)]
    #[case(AppError::NotFound("match 1".into()), StatusCode::NOT_FOUND)]
    #[case(AppError::DatabaseError("conn reset".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_errors_to_status_codes(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[tokio::test]
    async fn storage_errors_do_not_leak_details() {
        let response = AppError::DatabaseError("password=hunter2".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Storage failure"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn only_storage_errors_are_retryable() {
        assert!(AppError::DatabaseError("x".into()).is_retryable());
        assert!(!AppError::Conflict("x".into()).is_retryable());
        assert!(!AppError::Forbidden("x".into()).is_retryable());
    }
}
