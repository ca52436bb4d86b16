use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::MonthKey;
use crate::shared::AppError;

const LOCK_KEY_PREFIX: &str = "month_lock:";

fn lock_key(month: &MonthKey) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, month)
}

/// Registry of closed months
#[async_trait]
pub trait MonthLockRepository {
    async fn is_locked(&self, month: &MonthKey) -> Result<bool, AppError>;
    async fn list_locked(&self) -> Result<BTreeSet<MonthKey>, AppError>;
    /// Idempotent: locking a closed month succeeds without change
    async fn lock(&self, month: &MonthKey) -> Result<(), AppError>;
    /// Idempotent: unlocking an open month succeeds without change
    async fn unlock(&self, month: &MonthKey) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct InMemoryMonthLockRepository {
    locked: Mutex<BTreeSet<MonthKey>>,
}

impl InMemoryMonthLockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonthLockRepository for InMemoryMonthLockRepository {
    async fn is_locked(&self, month: &MonthKey) -> Result<bool, AppError> {
        let locked = self.locked.lock().map_err(|_| AppError::Internal)?;
        Ok(locked.contains(month))
    }

    async fn list_locked(&self) -> Result<BTreeSet<MonthKey>, AppError> {
        let locked = self.locked.lock().map_err(|_| AppError::Internal)?;
        Ok(locked.clone())
    }

    #[instrument(skip(self), fields(month = %month))]
    async fn lock(&self, month: &MonthKey) -> Result<(), AppError> {
        let mut locked = self.locked.lock().map_err(|_| AppError::Internal)?;
        if !locked.insert(*month) {
            debug!("Month already locked in memory");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(month = %month))]
    async fn unlock(&self, month: &MonthKey) -> Result<(), AppError> {
        let mut locked = self.locked.lock().map_err(|_| AppError::Internal)?;
        if !locked.remove(month) {
            debug!("Month was not locked in memory");
        }
        Ok(())
    }
}

/// PostgreSQL implementation; locks live in the `settings` key-value table
pub struct PostgresMonthLockRepository {
    pool: PgPool,
}

impl PostgresMonthLockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonthLockRepository for PostgresMonthLockRepository {
    #[instrument(skip(self), fields(month = %month))]
    async fn is_locked(&self, month: &MonthKey) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS present FROM settings WHERE key = $1")
            .bind(lock_key(month))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn list_locked(&self) -> Result<BTreeSet<MonthKey>, AppError> {
        let rows = sqlx::query("SELECT key FROM settings WHERE key LIKE $1")
            .bind(format!("{}%", LOCK_KEY_PREFIX))
            .fetch_all(&self.pool)
            .await?;

        let mut months = BTreeSet::new();
        for row in rows {
            let key: String = row.get("key");
            match key.trim_start_matches(LOCK_KEY_PREFIX).parse::<MonthKey>() {
                Ok(month) => {
                    months.insert(month);
                }
                Err(_) => warn!(key = %key, "Ignoring malformed month lock entry"),
            }
        }
        Ok(months)
    }

    #[instrument(skip(self), fields(month = %month))]
    async fn lock(&self, month: &MonthKey) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(lock_key(month))
        .bind("closed")
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(month = %month))]
    async fn unlock(&self, month: &MonthKey) -> Result<(), AppError> {
        sqlx::query("DELETE FROM settings WHERE key = $1")
            .bind(lock_key(month))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
