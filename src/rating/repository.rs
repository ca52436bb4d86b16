use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::models::ReplayCommit;
use crate::matches::repository::InMemoryMatchRepository;
use crate::player::repository::InMemoryPlayerRepository;
use crate::shared::AppError;

/// Write side of the replays: persists derived player columns and match deltas
#[async_trait]
pub trait ReplayStore {
    /// Applies the whole commit or nothing.
    async fn commit(&self, commit: &ReplayCommit) -> Result<(), AppError>;
}

/// Commits against the in-memory player and match repositories
pub struct InMemoryReplayStore {
    players: Arc<InMemoryPlayerRepository>,
    matches: Arc<InMemoryMatchRepository>,
}

impl InMemoryReplayStore {
    pub fn new(players: Arc<InMemoryPlayerRepository>, matches: Arc<InMemoryMatchRepository>) -> Self {
        Self { players, matches }
    }
}

#[async_trait]
impl ReplayStore for InMemoryReplayStore {
    #[instrument(skip(self, commit), fields(
        ratings = commit.ratings.len(),
        attendance = commit.attendance.len(),
        deltas = commit.match_deltas.len()
    ))]
    async fn commit(&self, commit: &ReplayCommit) -> Result<(), AppError> {
        let mut players = self.players.rows().lock().map_err(|_| AppError::Internal)?;
        let mut matches = self.matches.rows().lock().map_err(|_| AppError::Internal)?;

        // Validate everything before the first write
        if let Some(id) = commit
            .ratings
            .keys()
            .chain(commit.attendance.keys())
            .find(|id| !players.contains_key(*id))
        {
            warn!(player_id = %id, "Replay commit references a missing player");
            return Err(AppError::NotFound(format!("Player {} not found", id)));
        }
        if let Some(delta) = commit
            .match_deltas
            .iter()
            .find(|d| !matches.contains_key(&d.match_id))
        {
            warn!(match_id = delta.match_id, "Replay commit references a missing match");
            return Err(AppError::NotFound(format!("Match {} not found", delta.match_id)));
        }

        for (id, rating) in &commit.ratings {
            if let Some(player) = players.get_mut(id) {
                player.score = rating.score;
                player.tier = rating.tier.clone();
                player.win_count = rating.win_count;
                player.match_count = rating.match_count;
                player.streak = rating.streak;
            }
        }
        for (id, state) in &commit.attendance {
            if let Some(player) = players.get_mut(id) {
                player.xp = state.xp;
                player.attendance_count = state.attendance_count;
                player.consecutive_months = state.consecutive_months;
                player.last_attendance = state.last_attendance;
            }
        }
        for delta in &commit.match_deltas {
            if let Some(m) = matches.get_mut(&delta.match_id) {
                m.change1 = delta.change1;
                m.change2 = delta.change2;
            }
        }

        debug!("Replay committed in memory");
        Ok(())
    }
}

/// Commits in a single PostgreSQL transaction
pub struct PostgresReplayStore {
    pool: PgPool,
}

impl PostgresReplayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplayStore for PostgresReplayStore {
    #[instrument(skip(self, commit), fields(
        ratings = commit.ratings.len(),
        attendance = commit.attendance.len(),
        deltas = commit.match_deltas.len()
    ))]
    async fn commit(&self, commit: &ReplayCommit) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (id, rating) in &commit.ratings {
            let result = sqlx::query(
                "UPDATE players SET score = $2, tier = $3, win_count = $4, match_count = $5, streak = $6 WHERE id = $1",
            )
            .bind(id)
            .bind(rating.score)
            .bind(&rating.tier)
            .bind(rating.win_count)
            .bind(rating.match_count)
            .bind(rating.streak)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Player {} not found", id)));
            }
        }

        for (id, state) in &commit.attendance {
            let result = sqlx::query(
                "UPDATE players SET xp = $2, attendance_count = $3, consecutive_months = $4, last_attendance = $5 WHERE id = $1",
            )
            .bind(id)
            .bind(state.xp)
            .bind(state.attendance_count)
            .bind(state.consecutive_months)
            .bind(state.last_attendance.map(|m| m.to_string()))
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Player {} not found", id)));
            }
        }

        for delta in &commit.match_deltas {
            let result = sqlx::query("UPDATE matches SET change1 = $2, change2 = $3 WHERE id = $1")
                .bind(delta.match_id)
                .bind(delta.change1)
                .bind(delta.change2)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Match {} not found", delta.match_id)));
            }
        }

        // Dropping the transaction on any early return rolls it back
        tx.commit().await?;
        debug!("Replay committed");
        Ok(())
    }
}
