use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::{RuleConfig, ScoreRules, TierRules};
use crate::shared::AppError;

/// Storage for the rule configuration; replacement is whole-category, last write wins
#[async_trait]
pub trait RuleRepository {
    async fn get_rules(&self) -> Result<RuleConfig, AppError>;
    async fn replace_rules(&self, rules: &RuleConfig) -> Result<(), AppError>;
}

pub struct InMemoryRuleRepository {
    rules: Mutex<RuleConfig>,
}

impl InMemoryRuleRepository {
    pub fn new(rules: RuleConfig) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleConfig::default())
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn get_rules(&self) -> Result<RuleConfig, AppError> {
        Ok(self.rules.lock().map_err(|_| AppError::Internal)?.clone())
    }

    async fn replace_rules(&self, rules: &RuleConfig) -> Result<(), AppError> {
        debug!("Replacing rule configuration in memory");
        *self.rules.lock().map_err(|_| AppError::Internal)? = rules.clone();
        Ok(())
    }
}

/// PostgreSQL implementation backed by `score_rules` and `tier_rules`
pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    #[instrument(skip(self))]
    async fn get_rules(&self) -> Result<RuleConfig, AppError> {
        let score_rows = sqlx::query("SELECT key, value FROM score_rules")
            .fetch_all(&self.pool)
            .await?;
        let score_map: BTreeMap<String, i32> = score_rows
            .into_iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect();

        let tier_rows = sqlx::query("SELECT tier_name, threshold FROM tier_rules")
            .fetch_all(&self.pool)
            .await?;
        let tier_map: BTreeMap<String, i32> = tier_rows
            .into_iter()
            .map(|row| (row.get("tier_name"), row.get("threshold")))
            .collect();

        if score_map.is_empty() {
            debug!("No stored score rules; using defaults");
        }

        Ok(RuleConfig {
            score_rules: ScoreRules::from_stored(&score_map),
            tier_rules: TierRules::from_stored(tier_map),
        })
    }

    #[instrument(skip(self, rules))]
    async fn replace_rules(&self, rules: &RuleConfig) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM score_rules").execute(&mut *tx).await?;
        for (key, value) in rules.score_rules.to_map() {
            sqlx::query("INSERT INTO score_rules (key, value) VALUES ($1, $2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM tier_rules").execute(&mut *tx).await?;
        for (name, threshold) in rules.tier_rules.thresholds() {
            sqlx::query("INSERT INTO tier_rules (tier_name, threshold) VALUES ($1, $2)")
                .bind(name)
                .bind(threshold)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Rule configuration replaced in database");
        Ok(())
    }
}
