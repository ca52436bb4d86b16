use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::models::MatchStatus;
use crate::stats::DailyResult;

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub group_name: String,
    pub team1: Vec<String>,
    pub team2: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub score1: i32,
    pub score2: i32,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// Query string for GET /matches; at most one filter is honoured, in the order date, month, player.
#[derive(Debug, Default, Deserialize)]
pub struct MatchListQuery {
    pub date: Option<NaiveDate>,
    pub month: Option<String>,
    pub player: Option<String>,
}

/// Admin overwrite of match fields; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchEdit {
    pub date: Option<NaiveDate>,
    pub group_name: Option<String>,
    pub team1: Option<Vec<String>>,
    pub team2: Option<Vec<String>>,
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    pub status: Option<MatchStatus>,
    pub dispute_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    pub disputed: usize,
    pub cancelled: usize,
    /// Completed results per player, biggest gain first
    pub players: Vec<DailyResult>,
}
