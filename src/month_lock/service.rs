use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{models::MonthKey, repository::MonthLockRepository};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal};
use crate::shared::AppError;

/// Rejects with a conflict when `month` is closed.
pub async fn ensure_open(
    locks: &(dyn MonthLockRepository + Send + Sync),
    month: &MonthKey,
) -> Result<(), AppError> {
    if locks.is_locked(month).await? {
        warn!(month = %month, "Rejected mutation against a locked month");
        return Err(AppError::Conflict(format!(
            "Month {} is locked; an admin must unlock it before its matches can change",
            month
        )));
    }
    Ok(())
}

/// Service for closing and reopening months
pub struct MonthLockService {
    repository: Arc<dyn MonthLockRepository + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
}

impl MonthLockService {
    pub fn new(
        repository: Arc<dyn MonthLockRepository + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            audit_sink,
        }
    }

    pub async fn is_month_locked(&self, month: &MonthKey) -> Result<bool, AppError> {
        self.repository.is_locked(month).await
    }

    pub async fn list_locked_months(&self) -> Result<Vec<MonthKey>, AppError> {
        Ok(self.repository.list_locked().await?.into_iter().collect())
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn lock_month(
        &self,
        principal: &Principal,
        month: &str,
    ) -> Result<Vec<MonthKey>, AppError> {
        authorize(principal, Permission::Administer)?;
        let month: MonthKey = month.parse()?;

        self.repository.lock(&month).await?;
        info!(month = %month, "Month locked");

        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&principal.id, "month.lock", "month", month.to_string(), json!({})),
        )
        .await;

        self.list_locked_months().await
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn unlock_month(
        &self,
        principal: &Principal,
        month: &str,
    ) -> Result<Vec<MonthKey>, AppError> {
        authorize(principal, Permission::Administer)?;
        let month: MonthKey = month.parse()?;

        self.repository.unlock(&month).await?;
        info!(month = %month, "Month unlocked");

        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&principal.id, "month.unlock", "month", month.to_string(), json!({})),
        )
        .await;

        self.list_locked_months().await
    }
}
