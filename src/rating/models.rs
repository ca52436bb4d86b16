use serde::Serialize;
use std::collections::BTreeMap;

use crate::month_lock::MonthKey;
use crate::player::STARTING_SCORE;
use crate::rules::FLOOR_TIER;

/// Number of entries shown in a recalculation preview
pub const PREVIEW_SIZE: usize = 20;

/// Rating-derived columns of a player after a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRating {
    pub score: i32,
    pub tier: String,
    pub win_count: i32,
    pub match_count: i32,
    pub streak: i32,
}

impl Default for PlayerRating {
    fn default() -> Self {
        Self {
            score: STARTING_SCORE,
            tier: FLOOR_TIER.to_string(),
            win_count: 0,
            match_count: 0,
            streak: 0,
        }
    }
}

/// Per-member rating change of each team in one replayed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchDelta {
    pub match_id: i64,
    pub change1: i32,
    pub change2: i32,
}

/// Attendance-derived columns of a player after a replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceState {
    pub xp: i32,
    pub attendance_count: i32,
    pub consecutive_months: i32,
    pub last_attendance: Option<MonthKey>,
}

/// Everything a replay writes back, applied all-or-nothing.
/// An empty collection leaves that category untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayCommit {
    pub ratings: BTreeMap<String, PlayerRating>,
    pub match_deltas: Vec<MatchDelta>,
    pub attendance: BTreeMap<String, AttendanceState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingChange {
    pub player_id: String,
    pub name: String,
    pub old_score: i32,
    pub new_score: i32,
    pub diff: i32,
    pub tier: String,
    pub match_count: i32,
    pub win_count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub dry_run: bool,
    pub players_updated: usize,
    pub matches_replayed: usize,
    /// Every player who played at least one counted match, largest change first
    pub changes: Vec<RatingChange>,
    pub preview: Vec<RatingChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XpChange {
    pub player_id: String,
    pub name: String,
    pub old_xp: i32,
    pub new_xp: i32,
    pub attendance_count: i32,
    pub consecutive_months: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XpSummary {
    pub dry_run: bool,
    pub players_updated: usize,
    pub months_processed: usize,
    pub changes: Vec<XpChange>,
    /// Top players by recomputed xp
    pub ranking: Vec<XpChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalculationSummary {
    pub dry_run: bool,
    pub rating: RatingSummary,
    pub xp: XpSummary,
}
