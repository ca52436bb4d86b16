#![allow(dead_code)] // Test utilities may not all be used in every test

use chrono::NaiveDate;
use std::sync::Arc;

use clubleague::{
    matches::{repository::MatchRepository, types::MatchEdit},
    month_lock::MonthLockService,
    player::repository::PlayerRepository,
    tournament::TournamentService,
    MatchModel, MatchService, NewMatch, PlayerModel, PlayerService, RecalculationService,
};

use super::setup::TestSetup;

// ============================================================================
// Service Construction
// ============================================================================

impl TestSetup {
    pub fn match_service(&self) -> MatchService {
        MatchService::new(
            Arc::clone(&self.state.match_repository),
            Arc::clone(&self.state.player_repository),
            Arc::clone(&self.state.month_locks),
            Arc::clone(&self.state.audit_sink),
        )
    }

    pub fn player_service(&self) -> PlayerService {
        PlayerService::new(
            Arc::clone(&self.state.player_repository),
            Arc::clone(&self.state.match_repository),
            Arc::clone(&self.state.audit_sink),
        )
    }

    pub fn recalculation_service(&self) -> RecalculationService {
        RecalculationService::new(
            Arc::clone(&self.state.player_repository),
            Arc::clone(&self.state.match_repository),
            Arc::clone(&self.state.rule_repository),
            Arc::clone(&self.state.replay_store),
            Arc::clone(&self.state.audit_sink),
            Arc::clone(&self.state.recalc_lock),
        )
    }

    pub fn month_lock_service(&self) -> MonthLockService {
        MonthLockService::new(
            Arc::clone(&self.state.month_locks),
            Arc::clone(&self.state.audit_sink),
        )
    }

    pub fn tournament_service(&self) -> TournamentService {
        TournamentService::new(
            Arc::clone(&self.state.player_repository),
            Arc::clone(&self.state.match_repository),
            Arc::clone(&self.state.month_locks),
            Arc::clone(&self.state.audit_sink),
        )
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Admin schedules a singles or doubles match
    pub async fn schedule(&self, date: NaiveDate, team1: &[&str], team2: &[&str]) -> MatchModel {
        self.match_service()
            .create_match(
                &self.admin,
                NewMatch {
                    date,
                    group_name: "A".to_string(),
                    team1: team1.iter().map(|s| s.to_string()).collect(),
                    team2: team2.iter().map(|s| s.to_string()).collect(),
                },
            )
            .await
            .unwrap()
    }

    /// Schedules a match and drives it to done through submit and approve
    pub async fn play(
        &self,
        date: NaiveDate,
        team1: &[&str],
        team2: &[&str],
        score: (i32, i32),
    ) -> MatchModel {
        let m = self.schedule(date, team1, team2).await;
        let service = self.match_service();
        service
            .submit_score(&self.principal(team1[0]), m.id, score.0, score.1)
            .await
            .unwrap();
        service
            .approve(&self.admin, m.id)
            .await
            .unwrap()
    }

    pub async fn lock_month(&self, month: &str) {
        self.month_lock_service()
            .lock_month(&self.admin, month)
            .await
            .unwrap();
    }

    pub async fn unlock_month(&self, month: &str) {
        self.month_lock_service()
            .unlock_month(&self.admin, month)
            .await
            .unwrap();
    }

    pub async fn apply_replays(&self) {
        self.recalculation_service()
            .recalculate_all(&self.admin, false)
            .await
            .unwrap();
    }

    pub async fn edit(&self, match_id: i64, edit: MatchEdit) -> MatchModel {
        self.match_service()
            .admin_edit(&self.admin, match_id, edit)
            .await
            .unwrap()
    }

    // ============================================================================
    // State Accessors
    // ============================================================================

    pub async fn player(&self, id: &str) -> PlayerModel {
        self.state
            .player_repository
            .get_player(id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("player {} should exist", id))
    }

    pub async fn all_players(&self) -> Vec<PlayerModel> {
        self.state.player_repository.list_players(false).await.unwrap()
    }

    pub async fn stored_match(&self, id: i64) -> MatchModel {
        self.state
            .match_repository
            .get_match(id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("match {} should exist", id))
    }

    pub async fn all_matches(&self) -> Vec<MatchModel> {
        self.state
            .match_repository
            .list_matches(&clubleague::matches::repository::MatchFilter::All)
            .await
            .unwrap()
    }
}
