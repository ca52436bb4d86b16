use chrono::NaiveDate;
use serde::Serialize;

/// Games played alongside one partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerRecord {
    pub player_id: String,
    pub name: String,
    pub games: u32,
    pub wins: u32,
    /// Truncated percentage
    pub win_rate: u32,
}

/// Opponent who beat the player most often
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RivalRecord {
    pub player_id: String,
    pub name: String,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub player_id: String,
    /// Best win rate first
    pub partners: Vec<PartnerRecord>,
    pub best_partner: Option<PartnerRecord>,
    pub rival: Option<RivalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub player_id: String,
    pub name: String,
    pub rank: usize,
    pub previous_rank: usize,
    /// Positive when the player climbed
    pub change: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChanges {
    /// Latest day with a completed match, if any
    pub date: Option<NaiveDate>,
    pub changes: Vec<RankChange>,
}

/// One player's completed matches on a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyResult {
    pub player_id: String,
    pub name: String,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    /// Sum of the stored rating changes
    pub change: i32,
}
