use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::{MatchModel, MatchStatus, NewMatch};
use crate::month_lock::MonthKey;
use crate::shared::AppError;
use chrono::NaiveDate;

/// Range scans supported by the match store
#[derive(Debug, Clone, PartialEq)]
pub enum MatchFilter {
    All,
    Status(MatchStatus),
    Date(NaiveDate),
    Month(MonthKey),
    /// Any of the four team slots
    Participant(String),
}

impl MatchFilter {
    fn matches(&self, m: &MatchModel) -> bool {
        match self {
            MatchFilter::All => true,
            MatchFilter::Status(status) => m.status == *status,
            MatchFilter::Date(date) => m.date == *date,
            MatchFilter::Month(month) => m.month() == *month,
            MatchFilter::Participant(id) => m.is_participant(id),
        }
    }
}

/// Trait for match storage. Listings are ordered by date, then id.
#[async_trait]
pub trait MatchRepository {
    async fn get_match(&self, match_id: i64) -> Result<Option<MatchModel>, AppError>;
    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchModel>, AppError>;
    async fn insert_match(&self, new_match: &NewMatch) -> Result<MatchModel, AppError>;
    /// Inserts every match or none
    async fn insert_matches(&self, new_matches: &[NewMatch]) -> Result<Vec<MatchModel>, AppError>;
    /// Overwrites every column except the id and the replay deltas
    async fn update_match(&self, updated: &MatchModel) -> Result<(), AppError>;
    async fn delete_match(&self, match_id: i64) -> Result<(), AppError>;
}

fn not_found(match_id: i64) -> AppError {
    AppError::NotFound(format!("Match {} not found", match_id))
}

/// In-memory implementation of MatchRepository for development and testing
pub struct InMemoryMatchRepository {
    matches: Mutex<BTreeMap<i64, MatchModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryMatchRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub(crate) fn rows(&self) -> &Mutex<BTreeMap<i64, MatchModel>> {
        &self.matches
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn get_match(&self, match_id: i64) -> Result<Option<MatchModel>, AppError> {
        let matches = self.matches.lock().map_err(|_| AppError::Internal)?;
        Ok(matches.get(&match_id).cloned())
    }

    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchModel>, AppError> {
        let matches = self.matches.lock().map_err(|_| AppError::Internal)?;
        let mut listed: Vec<MatchModel> = matches
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn insert_match(&self, new_match: &NewMatch) -> Result<MatchModel, AppError> {
        let mut inserted = self.insert_matches(std::slice::from_ref(new_match)).await?;
        inserted.pop().ok_or(AppError::Internal)
    }

    #[instrument(skip(self, new_matches), fields(count = new_matches.len()))]
    async fn insert_matches(&self, new_matches: &[NewMatch]) -> Result<Vec<MatchModel>, AppError> {
        let mut matches = self.matches.lock().map_err(|_| AppError::Internal)?;
        let inserted: Vec<MatchModel> = new_matches
            .iter()
            .map(|m| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                m.clone().into_model(id)
            })
            .collect();
        for m in &inserted {
            matches.insert(m.id, m.clone());
        }
        debug!("Matches inserted in memory");
        Ok(inserted)
    }

    #[instrument(skip(self, updated), fields(match_id = updated.id))]
    async fn update_match(&self, updated: &MatchModel) -> Result<(), AppError> {
        let mut matches = self.matches.lock().map_err(|_| AppError::Internal)?;
        let row = matches.get_mut(&updated.id).ok_or_else(|| not_found(updated.id))?;
        let (change1, change2) = (row.change1, row.change2);
        *row = MatchModel {
            change1,
            change2,
            ..updated.clone()
        };
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_match(&self, match_id: i64) -> Result<(), AppError> {
        let mut matches = self.matches.lock().map_err(|_| AppError::Internal)?;
        matches.remove(&match_id).ok_or_else(|| not_found(match_id))?;
        Ok(())
    }
}

/// PostgreSQL implementation of the match repository.
///
/// Teams are stored as four nullable slot columns (`team1_player1` ..
/// `team2_player2`).
pub struct PostgresMatchRepository {
    pool: PgPool,
}

impl PostgresMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const MATCH_COLUMNS: &str = "id, date, group_name, team1_player1, team1_player2, team2_player1, team2_player2, score1, score2, change1, change2, status, input_by, input_at, approved_by, approved_at, dispute_reason";

fn team_from_slots(first: Option<String>, second: Option<String>) -> Vec<String> {
    first.into_iter().chain(second).collect()
}

pub(crate) fn parse_match_row(row: &PgRow) -> Result<MatchModel, AppError> {
    let status: String = row.get("status");
    let status = MatchStatus::from_str(&status).map_err(|_| {
        AppError::DatabaseError(format!("Unknown match status '{}' in matches table", status))
    })?;

    Ok(MatchModel {
        id: row.get("id"),
        date: row.get("date"),
        group_name: row.get("group_name"),
        team1: team_from_slots(row.get("team1_player1"), row.get("team1_player2")),
        team2: team_from_slots(row.get("team2_player1"), row.get("team2_player2")),
        score1: row.get("score1"),
        score2: row.get("score2"),
        change1: row.get("change1"),
        change2: row.get("change2"),
        status,
        input_by: row.get("input_by"),
        input_at: row.get("input_at"),
        approved_by: row.get("approved_by"),
        approved_at: row.get("approved_at"),
        dispute_reason: row.get("dispute_reason"),
    })
}

async fn insert_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    new_match: &NewMatch,
) -> Result<MatchModel, AppError> {
    let row = sqlx::query(&format!(
        "INSERT INTO matches (date, group_name, team1_player1, team1_player2, team2_player1, team2_player2, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
        MATCH_COLUMNS
    ))
    .bind(new_match.date)
    .bind(&new_match.group_name)
    .bind(new_match.team1.first())
    .bind(new_match.team1.get(1))
    .bind(new_match.team2.first())
    .bind(new_match.team2.get(1))
    .bind(MatchStatus::Pending.as_ref())
    .fetch_one(&mut **tx)
    .await?;
    parse_match_row(&row)
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    #[instrument(skip(self))]
    async fn get_match(&self, match_id: i64) -> Result<Option<MatchModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_match_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchModel>, AppError> {
        let order = "ORDER BY date ASC, id ASC";
        let rows = match filter {
            MatchFilter::All => {
                sqlx::query(&format!("SELECT {} FROM matches {}", MATCH_COLUMNS, order))
                    .fetch_all(&self.pool)
                    .await?
            }
            MatchFilter::Status(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM matches WHERE status = $1 {}",
                    MATCH_COLUMNS, order
                ))
                .bind(status.as_ref())
                .fetch_all(&self.pool)
                .await?
            }
            MatchFilter::Date(date) => {
                sqlx::query(&format!(
                    "SELECT {} FROM matches WHERE date = $1 {}",
                    MATCH_COLUMNS, order
                ))
                .bind(*date)
                .fetch_all(&self.pool)
                .await?
            }
            MatchFilter::Month(month) => {
                sqlx::query(&format!(
                    "SELECT {} FROM matches WHERE to_char(date, 'YYYY-MM') = $1 {}",
                    MATCH_COLUMNS, order
                ))
                .bind(month.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            MatchFilter::Participant(player_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM matches WHERE team1_player1 = $1 OR team1_player2 = $1 \
                     OR team2_player1 = $1 OR team2_player2 = $1 {}",
                    MATCH_COLUMNS, order
                ))
                .bind(player_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(parse_match_row).collect()
    }

    #[instrument(skip(self, new_match))]
    async fn insert_match(&self, new_match: &NewMatch) -> Result<MatchModel, AppError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_in_tx(&mut tx, new_match).await?;
        tx.commit().await?;
        debug!(match_id = inserted.id, "Match inserted");
        Ok(inserted)
    }

    #[instrument(skip(self, new_matches), fields(count = new_matches.len()))]
    async fn insert_matches(&self, new_matches: &[NewMatch]) -> Result<Vec<MatchModel>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(new_matches.len());
        for new_match in new_matches {
            inserted.push(insert_in_tx(&mut tx, new_match).await?);
        }
        tx.commit().await?;
        debug!("Match batch inserted");
        Ok(inserted)
    }

    #[instrument(skip(self, updated), fields(match_id = updated.id))]
    async fn update_match(&self, updated: &MatchModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE matches SET date = $2, group_name = $3, team1_player1 = $4, team1_player2 = $5, \
             team2_player1 = $6, team2_player2 = $7, score1 = $8, score2 = $9, status = $10, \
             input_by = $11, input_at = $12, approved_by = $13, approved_at = $14, dispute_reason = $15 \
             WHERE id = $1",
        )
        .bind(updated.id)
        .bind(updated.date)
        .bind(&updated.group_name)
        .bind(updated.team1.first())
        .bind(updated.team1.get(1))
        .bind(updated.team2.first())
        .bind(updated.team2.get(1))
        .bind(updated.score1)
        .bind(updated.score2)
        .bind(updated.status.as_ref())
        .bind(&updated.input_by)
        .bind(updated.input_at)
        .bind(&updated.approved_by)
        .bind(updated.approved_at)
        .bind(&updated.dispute_reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(updated.id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_match(&self, match_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(match_id));
        }
        Ok(())
    }
}
