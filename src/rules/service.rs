use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::{RuleConfig, ScoreRules, TierRules},
    repository::RuleRepository,
};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal};
use crate::shared::AppError;
use std::collections::BTreeMap;

/// Reads and replaces the rule configuration
pub struct RuleService {
    repository: Arc<dyn RuleRepository + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
}

impl RuleService {
    pub fn new(
        repository: Arc<dyn RuleRepository + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            audit_sink,
        }
    }

    pub async fn get_rules(&self, principal: &Principal) -> Result<RuleConfig, AppError> {
        authorize(principal, Permission::Member)?;
        self.repository.get_rules().await
    }

    /// Replaces both categories; callers supply the complete desired state.
    #[instrument(skip(self, principal, score_rules, tier_rules), fields(actor = %principal.id))]
    pub async fn update_rules(
        &self,
        principal: &Principal,
        score_rules: &BTreeMap<String, i32>,
        tier_rules: BTreeMap<String, i32>,
    ) -> Result<RuleConfig, AppError> {
        authorize(principal, Permission::Administer)?;

        let rules = RuleConfig {
            score_rules: ScoreRules::from_map(score_rules)?,
            tier_rules: TierRules::new(tier_rules)?,
        };

        self.repository.replace_rules(&rules).await?;
        info!(tiers = rules.tier_rules.thresholds().len(), "Rule configuration replaced");

        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(
                &principal.id,
                "rules.update",
                "rules",
                "global",
                json!({
                    "score_rules": rules.score_rules.to_map(),
                    "tier_rules": rules.tier_rules.thresholds(),
                }),
            ),
        )
        .await;

        Ok(rules)
    }
}
