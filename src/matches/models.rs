use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::month_lock::MonthKey;
use crate::shared::AppError;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Done,
    Disputed,
    Cancelled,
}

/// Database model for the matches table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchModel {
    pub id: i64,
    pub date: NaiveDate,
    pub group_name: String,
    pub team1: Vec<String>,
    pub team2: Vec<String>,
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    /// Rating delta applied to each member of team 1 by the last replay
    pub change1: i32,
    pub change2: i32,
    pub status: MatchStatus,
    pub input_by: Option<String>,
    pub input_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
}

impl MatchModel {
    pub fn month(&self) -> MonthKey {
        MonthKey::from_date(self.date)
    }

    pub fn participants(&self) -> impl Iterator<Item = &String> {
        self.team1.iter().chain(self.team2.iter())
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.participants().any(|id| id == player_id)
    }

    /// Submitted score, if both sides are present
    pub fn score(&self) -> Option<(i32, i32)> {
        self.score1.zip(self.score2)
    }
}

/// A match about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub date: NaiveDate,
    pub group_name: String,
    pub team1: Vec<String>,
    pub team2: Vec<String>,
}

impl NewMatch {
    /// Team shape rules shared by manual creation, admin edits and the generator.
    pub fn validate_teams(team1: &[String], team2: &[String]) -> Result<(), AppError> {
        for (label, team) in [("team1", team1), ("team2", team2)] {
            if team.is_empty() || team.len() > 2 {
                return Err(AppError::Validation(format!(
                    "{} must have one or two players, got {}",
                    label,
                    team.len()
                )));
            }
            if team.iter().any(|id| id.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "{} contains an empty player id",
                    label
                )));
            }
        }

        let mut seen: Vec<&String> = Vec::with_capacity(4);
        for id in team1.iter().chain(team2.iter()) {
            if seen.contains(&id) {
                return Err(AppError::Validation(format!(
                    "Player {} appears more than once in the match",
                    id
                )));
            }
            seen.push(id);
        }
        Ok(())
    }

    pub fn into_model(self, id: i64) -> MatchModel {
        MatchModel {
            id,
            date: self.date,
            group_name: self.group_name,
            team1: self.team1,
            team2: self.team2,
            score1: None,
            score2: None,
            change1: 0,
            change2: 0,
            status: MatchStatus::Pending,
            input_by: None,
            input_at: None,
            approved_by: None,
            approved_at: None,
            dispute_reason: None,
        }
    }
}

/// Validates a submitted score pair.
pub fn validate_score(score1: i32, score2: i32) -> Result<(), AppError> {
    if score1 < 0 || score2 < 0 {
        return Err(AppError::Validation(format!(
            "Scores must be non-negative, got {}-{}",
            score1, score2
        )));
    }
    Ok(())
}
