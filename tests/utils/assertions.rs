//! Test assertion helpers - fluent API for verifying league state
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::fmt::Debug;

use clubleague::{AppError, PlayerModel};

use super::setup::TestSetup;

// ============================================================================
// Error Assertions
// ============================================================================

pub fn assert_conflict<T: Debug>(result: Result<T, AppError>) {
    match result {
        Err(AppError::Conflict(_)) => {}
        other => panic!("expected a conflict, got {:?}", other),
    }
}

pub fn assert_validation<T: Debug>(result: Result<T, AppError>) {
    match result {
        Err(AppError::Validation(_)) => {}
        other => panic!("expected a validation error, got {:?}", other),
    }
}

// ============================================================================
// Player Assertions
// ============================================================================

pub struct PlayerAssertion {
    player: PlayerModel,
}

impl PlayerAssertion {
    pub async fn for_player(setup: &TestSetup, id: &str) -> Self {
        Self {
            player: setup.player(id).await,
        }
    }

    pub fn has_score(self, expected: i32) -> Self {
        assert_eq!(self.player.score, expected, "{} score", self.player.id);
        self
    }

    pub fn has_tier(self, expected: &str) -> Self {
        assert_eq!(self.player.tier, expected, "{} tier", self.player.id);
        self
    }

    pub fn has_record(self, wins: i32, matches: i32) -> Self {
        assert_eq!(
            (self.player.win_count, self.player.match_count),
            (wins, matches),
            "{} win/match count",
            self.player.id
        );
        self
    }

    pub fn has_streak(self, expected: i32) -> Self {
        assert_eq!(self.player.streak, expected, "{} streak", self.player.id);
        self
    }

    pub fn has_attendance(self, xp: i32, count: i32, consecutive: i32) -> Self {
        assert_eq!(
            (
                self.player.xp,
                self.player.attendance_count,
                self.player.consecutive_months
            ),
            (xp, count, consecutive),
            "{} xp/attendance/consecutive",
            self.player.id
        );
        self
    }
}
