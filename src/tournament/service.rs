use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::generator::{plan_tournament, GroupPlan, TournamentMode};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal};
use crate::matches::{repository::MatchRepository, MatchModel, NewMatch};
use crate::month_lock::{ensure_open, repository::MonthLockRepository, MonthKey};
use crate::player::repository::PlayerRepository;
use crate::shared::AppError;

pub const MAX_TARGET_GAMES: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct TournamentResult {
    pub date: NaiveDate,
    pub groups: Vec<GroupPlan>,
    pub matches: Vec<MatchModel>,
}

/// Builds a day's bracket from the attendee list and stores it as pending matches
pub struct TournamentService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    month_locks: Arc<dyn MonthLockRepository + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
}

impl TournamentService {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        month_locks: Arc<dyn MonthLockRepository + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
    ) -> Self {
        Self {
            players,
            matches,
            month_locks,
            audit_sink,
        }
    }

    #[instrument(skip(self, principal, attendees), fields(actor = %principal.id, attendees = attendees.len()))]
    pub async fn generate(
        &self,
        principal: &Principal,
        date: NaiveDate,
        attendees: &[String],
        mode: TournamentMode,
        target_games: usize,
    ) -> Result<TournamentResult, AppError> {
        authorize(principal, Permission::Administer)?;
        ensure_open(self.month_locks.as_ref(), &MonthKey::from_date(date)).await?;

        if !(1..=MAX_TARGET_GAMES).contains(&target_games) {
            return Err(AppError::Validation(format!(
                "target_games must be between 1 and {}",
                MAX_TARGET_GAMES
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = attendees.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(AppError::Validation(format!(
                "Attendee {} is listed more than once",
                dup
            )));
        }

        let mut ranked = Vec::with_capacity(attendees.len());
        for id in attendees {
            let player = self
                .players
                .get_player(id)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Unknown player {}", id)))?;
            ranked.push((player.score, player.id));
        }
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let ranked: Vec<String> = ranked.into_iter().map(|(_, id)| id).collect();

        let groups = {
            let mut rng = rand::rng();
            plan_tournament(&ranked, mode, target_games, &mut rng)?
        };
        let new_matches: Vec<NewMatch> = groups
            .iter()
            .flat_map(|group| {
                group.pairings.iter().map(move |p| NewMatch {
                    date,
                    group_name: group.label.clone(),
                    team1: p.team1.clone(),
                    team2: p.team2.clone(),
                })
            })
            .collect();

        let matches = self.matches.insert_matches(&new_matches).await?;
        info!(
            groups = groups.len(),
            matches = matches.len(),
            "Tournament generated"
        );

        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(
                &principal.id,
                "tournament.generate",
                "day",
                date.to_string(),
                json!({
                    "mode": mode,
                    "attendees": ranked,
                    "groups": groups.len(),
                    "matches": matches.len(),
                }),
            ),
        )
        .await;

        Ok(TournamentResult {
            date,
            groups,
            matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::auth::Role;
    use crate::matches::repository::{InMemoryMatchRepository, MatchFilter};
    use crate::matches::MatchStatus;
    use crate::month_lock::repository::InMemoryMonthLockRepository;
    use crate::player::repository::InMemoryPlayerRepository;
    use crate::player::PlayerModel;

    struct Fixture {
        service: TournamentService,
        matches: Arc<InMemoryMatchRepository>,
        locks: Arc<InMemoryMonthLockRepository>,
        admin: Principal,
    }

    fn fixture(scores: &[(&str, i32)]) -> Fixture {
        let players = Arc::new(InMemoryPlayerRepository::with_players(
            scores
                .iter()
                .map(|(id, score)| PlayerModel {
                    score: *score,
                    ..PlayerModel::new(id.to_string(), id.to_string())
                })
                .collect(),
        ));
        let matches = Arc::new(InMemoryMatchRepository::new());
        let locks = Arc::new(InMemoryMonthLockRepository::new());
        Fixture {
            service: TournamentService::new(
                players,
                matches.clone(),
                locks.clone(),
                Arc::new(InMemoryAuditSink::new()),
            ),
            matches,
            locks,
            admin: Principal::new("A1", "Admin", Role::Admin),
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn balanced_group_is_seeded_by_score() {
        let f = fixture(&[("W", 900), ("S", 1300), ("M1", 1100), ("M2", 1000)]);
        let result = f
            .service
            .generate(&f.admin, day(), &ids(&["W", "M2", "S", "M1"]), TournamentMode::Balanced, 4)
            .await
            .unwrap();

        assert_eq!(result.groups[0].members, ids(&["S", "M1", "M2", "W"]));
        assert_eq!(result.matches.len(), 4);
        assert_eq!(result.matches[0].team1, ids(&["S", "W"]));
        assert!(result
            .matches
            .iter()
            .all(|m| m.status == MatchStatus::Pending && m.group_name == "A"));
    }

    #[tokio::test]
    async fn locked_month_blocks_generation() {
        let f = fixture(&[("P1", 1000), ("P2", 1000), ("P3", 1000), ("P4", 1000)]);
        f.locks.lock(&"2025-06".parse().unwrap()).await.unwrap();

        let err = f
            .service
            .generate(&f.admin, day(), &ids(&["P1", "P2", "P3", "P4"]), TournamentMode::Random, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(f
            .matches
            .list_matches(&MatchFilter::All)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_and_duplicate_attendees() {
        let f = fixture(&[("P1", 1000), ("P2", 1000), ("P3", 1000), ("P4", 1000)]);
        assert!(matches!(
            f.service
                .generate(&f.admin, day(), &ids(&["P1", "P2", "P3", "X"]), TournamentMode::Random, 4)
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.service
                .generate(&f.admin, day(), &ids(&["P1", "P2", "P3", "P3"]), TournamentMode::Random, 4)
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
