use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    lifecycle::{transition, MatchAction},
    models::{validate_score, MatchModel, MatchStatus, NewMatch},
    repository::{MatchFilter, MatchRepository},
    types::{DaySummary, MatchEdit},
};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal};
use crate::month_lock::{ensure_open, repository::MonthLockRepository, MonthKey};
use crate::player::repository::PlayerRepository;
use crate::shared::AppError;
use crate::stats::daily_results;

/// Match workflow: creation, score entry, approval and the admin escape hatch
pub struct MatchService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    players: Arc<dyn PlayerRepository + Send + Sync>,
    month_locks: Arc<dyn MonthLockRepository + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
}

impl MatchService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        players: Arc<dyn PlayerRepository + Send + Sync>,
        month_locks: Arc<dyn MonthLockRepository + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
    ) -> Self {
        Self {
            matches,
            players,
            month_locks,
            audit_sink,
        }
    }

    async fn load(&self, match_id: i64) -> Result<MatchModel, AppError> {
        self.matches
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match {} not found", match_id)))
    }

    /// Loads the match and rejects when its month is locked.
    async fn load_open(&self, match_id: i64) -> Result<MatchModel, AppError> {
        let m = self.load(match_id).await?;
        ensure_open(self.month_locks.as_ref(), &m.month()).await?;
        Ok(m)
    }

    async fn ensure_roster(&self, ids: impl Iterator<Item = &String>) -> Result<(), AppError> {
        for id in ids {
            if self.players.get_player(id).await?.is_none() {
                return Err(AppError::Validation(format!("Unknown player {}", id)));
            }
        }
        Ok(())
    }

    async fn audit(&self, principal: &Principal, action: &str, match_id: i64, detail: serde_json::Value) {
        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&principal.id, action, "match", match_id.to_string(), detail),
        )
        .await;
    }

    pub async fn get_match(&self, principal: &Principal, match_id: i64) -> Result<MatchModel, AppError> {
        authorize(principal, Permission::Member)?;
        self.load(match_id).await
    }

    pub async fn list_matches(
        &self,
        principal: &Principal,
        filter: &MatchFilter,
    ) -> Result<Vec<MatchModel>, AppError> {
        authorize(principal, Permission::Member)?;
        self.matches.list_matches(filter).await
    }

    pub async fn day_summary(
        &self,
        principal: &Principal,
        date: NaiveDate,
    ) -> Result<DaySummary, AppError> {
        let matches = self.list_matches(principal, &MatchFilter::Date(date)).await?;
        let count = |status: MatchStatus| matches.iter().filter(|m| m.status == status).count();
        let roster = self.players.list_players(false).await?;
        Ok(DaySummary {
            date,
            total: matches.len(),
            done: count(MatchStatus::Done),
            pending: count(MatchStatus::Pending),
            disputed: count(MatchStatus::Disputed),
            cancelled: count(MatchStatus::Cancelled),
            players: daily_results(date, &roster, &matches),
        })
    }

    #[instrument(skip(self, principal, new_match), fields(actor = %principal.id, date = %new_match.date))]
    pub async fn create_match(
        &self,
        principal: &Principal,
        new_match: NewMatch,
    ) -> Result<MatchModel, AppError> {
        authorize(principal, Permission::Administer)?;
        ensure_open(
            self.month_locks.as_ref(),
            &MonthKey::from_date(new_match.date),
        )
        .await?;
        NewMatch::validate_teams(&new_match.team1, &new_match.team2)?;
        self.ensure_roster(new_match.team1.iter().chain(new_match.team2.iter()))
            .await?;

        let created = self.matches.insert_match(&new_match).await?;
        info!(match_id = created.id, "Match created");
        self.audit(
            principal,
            "match.create",
            created.id,
            json!({ "date": created.date, "team1": created.team1, "team2": created.team2 }),
        )
        .await;
        Ok(created)
    }

    /// Participant or admin enters a score; the match stays pending until approved.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn submit_score(
        &self,
        principal: &Principal,
        match_id: i64,
        score1: i32,
        score2: i32,
    ) -> Result<MatchModel, AppError> {
        let mut m = self.load_open(match_id).await?;
        authorize(
            principal,
            Permission::MatchParticipant {
                is_participant: m.is_participant(&principal.id),
            },
        )?;
        validate_score(score1, score2)?;
        m.status = transition(m.status, MatchAction::SubmitScore)?;

        m.score1 = Some(score1);
        m.score2 = Some(score2);
        m.input_by = Some(principal.id.clone());
        m.input_at = Some(Utc::now());
        m.dispute_reason = None;
        self.matches.update_match(&m).await?;

        info!(match_id, score1, score2, "Score submitted");
        self.audit(
            principal,
            "match.submit_score",
            match_id,
            json!({ "score1": score1, "score2": score2 }),
        )
        .await;
        Ok(m)
    }

    /// Marks the match done, making it eligible for the rating replay.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn approve(&self, principal: &Principal, match_id: i64) -> Result<MatchModel, AppError> {
        let mut m = self.load_open(match_id).await?;
        authorize(principal, Permission::Administer)?;
        let next = transition(m.status, MatchAction::Approve)?;

        match m.score() {
            None => {
                return Err(AppError::Validation(format!(
                    "Match {} has no submitted score to approve",
                    match_id
                )))
            }
            Some((s1, s2)) if s1 == s2 => {
                return Err(AppError::Validation(format!(
                    "Match {} has a tied score {}-{}; ties are not a valid result",
                    match_id, s1, s2
                )))
            }
            Some(_) => {}
        }

        m.status = next;
        m.approved_by = Some(principal.id.clone());
        m.approved_at = Some(Utc::now());
        self.matches.update_match(&m).await?;

        info!(match_id, "Match approved");
        self.audit(principal, "match.approve", match_id, json!({})).await;
        Ok(m)
    }

    #[instrument(skip(self, principal, reason), fields(actor = %principal.id))]
    pub async fn reject(
        &self,
        principal: &Principal,
        match_id: i64,
        reason: &str,
    ) -> Result<MatchModel, AppError> {
        let mut m = self.load_open(match_id).await?;
        authorize(
            principal,
            Permission::MatchParticipant {
                is_participant: m.is_participant(&principal.id),
            },
        )?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A dispute reason is required".to_string(),
            ));
        }
        m.status = transition(m.status, MatchAction::Reject)?;
        m.dispute_reason = Some(reason.to_string());
        self.matches.update_match(&m).await?;

        warn!(match_id, reason, "Match disputed");
        self.audit(principal, "match.reject", match_id, json!({ "reason": reason }))
            .await;
        Ok(m)
    }

    /// Admin mediation: records the score and approves it in one write.
    ///
    /// An admin who is also a participant may use this on their own match; the
    /// audit entry carries `self_mediated` so the overlap stays visible.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn force_confirm(
        &self,
        principal: &Principal,
        match_id: i64,
        score1: i32,
        score2: i32,
    ) -> Result<MatchModel, AppError> {
        if score1 == score2 {
            return Err(AppError::Validation(format!(
                "Cannot confirm a tied score {}-{}; ties are not a valid result",
                score1, score2
            )));
        }
        validate_score(score1, score2)?;

        let mut m = self.load_open(match_id).await?;
        authorize(principal, Permission::Administer)?;
        m.status = transition(m.status, MatchAction::ForceConfirm)?;

        let now = Utc::now();
        let self_mediated = m.is_participant(&principal.id);
        m.score1 = Some(score1);
        m.score2 = Some(score2);
        m.input_by = Some(principal.id.clone());
        m.input_at = Some(now);
        m.approved_by = Some(principal.id.clone());
        m.approved_at = Some(now);
        self.matches.update_match(&m).await?;

        if self_mediated {
            warn!(match_id, "Admin force-confirmed a match they played in");
        }
        info!(match_id, score1, score2, "Match force-confirmed");
        self.audit(
            principal,
            "match.force_confirm",
            match_id,
            json!({ "score1": score1, "score2": score2, "self_mediated": self_mediated }),
        )
        .await;
        Ok(m)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn cancel(&self, principal: &Principal, match_id: i64) -> Result<MatchModel, AppError> {
        let mut m = self.load_open(match_id).await?;
        authorize(principal, Permission::Administer)?;
        m.status = transition(m.status, MatchAction::Cancel)?;
        self.matches.update_match(&m).await?;

        info!(match_id, "Match cancelled");
        self.audit(principal, "match.cancel", match_id, json!({})).await;
        Ok(m)
    }

    /// Direct overwrite that bypasses the lifecycle table. Both the current month
    /// and, when the date moves, the target month must be open.
    #[instrument(skip(self, principal, edit), fields(actor = %principal.id))]
    pub async fn admin_edit(
        &self,
        principal: &Principal,
        match_id: i64,
        edit: MatchEdit,
    ) -> Result<MatchModel, AppError> {
        let mut m = self.load_open(match_id).await?;
        authorize(principal, Permission::Administer)?;

        if let Some(date) = edit.date {
            let target = MonthKey::from_date(date);
            if target != m.month() {
                ensure_open(self.month_locks.as_ref(), &target).await?;
            }
            m.date = date;
        }

        if edit.team1.is_some() || edit.team2.is_some() {
            let team1 = edit.team1.clone().unwrap_or_else(|| m.team1.clone());
            let team2 = edit.team2.clone().unwrap_or_else(|| m.team2.clone());
            NewMatch::validate_teams(&team1, &team2)?;
            self.ensure_roster(team1.iter().chain(team2.iter())).await?;
            m.team1 = team1;
            m.team2 = team2;
        }

        if edit.score1.is_some() || edit.score2.is_some() {
            let (Some(score1), Some(score2)) = (edit.score1.or(m.score1), edit.score2.or(m.score2))
            else {
                return Err(AppError::Validation(
                    "Both scores are required when the match has no score yet".to_string(),
                ));
            };
            validate_score(score1, score2)?;
            m.score1 = Some(score1);
            m.score2 = Some(score2);
        }

        if let Some(group_name) = edit.group_name {
            m.group_name = group_name;
        }
        if let Some(reason) = edit.dispute_reason {
            m.dispute_reason = Some(reason);
        }
        if let Some(status) = edit.status {
            if status == MatchStatus::Done {
                match m.score() {
                    Some((s1, s2)) if s1 != s2 => {}
                    _ => {
                        return Err(AppError::Validation(
                            "A done match needs a decisive score".to_string(),
                        ))
                    }
                }
                if m.status != MatchStatus::Done {
                    m.approved_by = Some(principal.id.clone());
                    m.approved_at = Some(Utc::now());
                }
            }
            m.status = status;
        }

        self.matches.update_match(&m).await?;
        info!(match_id, status = %m.status, "Match edited by admin");
        self.audit(
            principal,
            "match.admin_edit",
            match_id,
            json!({
                "date": m.date,
                "group_name": m.group_name,
                "team1": m.team1,
                "team2": m.team2,
                "score1": m.score1,
                "score2": m.score2,
                "status": m.status,
            }),
        )
        .await;
        Ok(m)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn delete_match(&self, principal: &Principal, match_id: i64) -> Result<(), AppError> {
        let m = self.load_open(match_id).await?;
        authorize(principal, Permission::Administer)?;
        self.matches.delete_match(match_id).await?;

        info!(match_id, "Match deleted");
        self.audit(
            principal,
            "match.delete",
            match_id,
            json!({ "date": m.date, "status": m.status }),
        )
        .await;
        Ok(())
    }
}
