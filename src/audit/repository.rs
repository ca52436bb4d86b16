use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::AuditEntry;
use crate::shared::AppError;

/// Write-mostly sink for audit entries
#[async_trait]
pub trait AuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AppError>;
    /// Most recent entries first
    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError>;
}

#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AppError> {
        debug!(action = %entry.action, target_id = %entry.target_id, "Recording audit entry in memory");
        self.entries
            .lock()
            .map_err(|_| AppError::Internal)?
            .push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let entries = self.entries.lock().map_err(|_| AppError::Internal)?;
        Ok(entries
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of the audit sink
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    #[instrument(skip(self, entry), fields(action = %entry.action))]
    async fn record(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, actor, action, target_type, target_id, detail, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(entry.detail.to_string())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT id, actor, action, target_type, target_id, detail, created_at FROM audit_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let detail: String = row.get("detail");
                AuditEntry {
                    id: row.get("id"),
                    actor: row.get("actor"),
                    action: row.get("action"),
                    target_type: row.get("target_type"),
                    target_id: row.get("target_id"),
                    detail: serde_json::from_str(&detail).unwrap_or(serde_json::Value::Null),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}
