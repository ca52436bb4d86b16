#![allow(dead_code)] // Test utilities may not all be used in every test

use chrono::NaiveDate;

use clubleague::{
    auth::{Principal, Role, TokenConfig},
    month_lock::{repository::MonthLockRepository, MonthKey},
    player::{repository::PlayerRepository, PlayerModel},
    rules::{repository::RuleRepository, RuleConfig, ScoreRules, TierRules},
    AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub admin: Principal,
    pub token_config: TokenConfig,
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    locked_months: Vec<String>,
    score_rules: ScoreRules,
}

pub fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            locked_months: vec![],
            score_rules: ScoreRules::default(),
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_players(vec!["P1", "P2"])
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["P1", "P2", "P3", "P4"])
    }

    pub fn with_locked_month(mut self, month: &str) -> Self {
        self.locked_months.push(month.to_string());
        self
    }

    pub fn with_score_rules(mut self, score_rules: ScoreRules) -> Self {
        self.score_rules = score_rules;
        self
    }

    pub async fn build(self) -> TestSetup {
        let token_config = TokenConfig::with_secret("integration-secret", 1);
        let state = AppState::in_memory(token_config.clone());

        let admin = PlayerModel {
            role: Role::Admin,
            ..PlayerModel::new("ADMIN".to_string(), "League Admin".to_string())
        };
        state.player_repository.create_player(&admin).await.unwrap();
        for id in &self.players {
            state
                .player_repository
                .create_player(&PlayerModel::new(id.clone(), format!("Player {}", id)))
                .await
                .unwrap();
        }

        state
            .rule_repository
            .replace_rules(&RuleConfig {
                score_rules: self.score_rules,
                tier_rules: TierRules::default(),
            })
            .await
            .unwrap();

        for month in &self.locked_months {
            let month: MonthKey = month.parse().unwrap();
            state.month_locks.lock(&month).await.unwrap();
        }

        TestSetup {
            state,
            admin: Principal::new("ADMIN", "League Admin", Role::Admin),
            token_config,
        }
    }
}

impl TestSetup {
    /// Principal for a seeded member
    pub fn principal(&self, id: &str) -> Principal {
        Principal::new(id, format!("Player {}", id), Role::Player)
    }
}
