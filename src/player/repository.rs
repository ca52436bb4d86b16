use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{PlayerModel, PlayerPatch};
use crate::auth::Role;
use crate::shared::AppError;

/// Trait for player roster storage
#[async_trait]
pub trait PlayerRepository {
    async fn create_player(&self, player: &PlayerModel) -> Result<(), AppError>;
    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError>;
    /// Ordered by score descending, then id
    async fn list_players(&self, active_only: bool) -> Result<Vec<PlayerModel>, AppError>;
    async fn update_player(
        &self,
        player_id: &str,
        patch: &PlayerPatch,
    ) -> Result<PlayerModel, AppError>;
    async fn delete_player(&self, player_id: &str) -> Result<(), AppError>;
}

fn sort_for_ranking(players: &mut [PlayerModel]) {
    players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}

/// In-memory implementation of PlayerRepository for development and testing
pub struct InMemoryPlayerRepository {
    players: Mutex<HashMap<String, PlayerModel>>,
}

impl Default for InMemoryPlayerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self {
            players: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a repository with a pre-populated roster
    pub fn with_players(players: Vec<PlayerModel>) -> Self {
        let map = players.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            players: Mutex::new(map),
        }
    }

    pub(crate) fn rows(&self) -> &Mutex<HashMap<String, PlayerModel>> {
        &self.players
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn create_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        let mut players = self.players.lock().map_err(|_| AppError::Internal)?;
        if players.contains_key(&player.id) {
            warn!("Player id already registered in memory");
            return Err(AppError::Conflict(format!(
                "Player id {} is already registered",
                player.id
            )));
        }
        players.insert(player.id.clone(), player.clone());
        debug!("Player created in memory");
        Ok(())
    }

    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError> {
        let players = self.players.lock().map_err(|_| AppError::Internal)?;
        Ok(players.get(player_id).cloned())
    }

    async fn list_players(&self, active_only: bool) -> Result<Vec<PlayerModel>, AppError> {
        let players = self.players.lock().map_err(|_| AppError::Internal)?;
        let mut listed: Vec<PlayerModel> = players
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        sort_for_ranking(&mut listed);
        Ok(listed)
    }

    #[instrument(skip(self, patch))]
    async fn update_player(
        &self,
        player_id: &str,
        patch: &PlayerPatch,
    ) -> Result<PlayerModel, AppError> {
        let mut players = self.players.lock().map_err(|_| AppError::Internal)?;
        let player = players
            .get_mut(player_id)
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", player_id)))?;
        patch.apply(player);
        Ok(player.clone())
    }

    #[instrument(skip(self))]
    async fn delete_player(&self, player_id: &str) -> Result<(), AppError> {
        let mut players = self.players.lock().map_err(|_| AppError::Internal)?;
        if players.remove(player_id).is_none() {
            return Err(AppError::NotFound(format!("Player {} not found", player_id)));
        }
        Ok(())
    }
}

/// PostgreSQL implementation of the player repository
pub struct PostgresPlayerRepository {
    pool: PgPool,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PLAYER_COLUMNS: &str = "id, name, score, xp, tier, win_count, match_count, streak, is_active, role, attendance_count, consecutive_months, last_attendance, join_date";

pub(crate) fn parse_player_row(row: &PgRow) -> Result<PlayerModel, AppError> {
    let role: String = row.get("role");
    let role = Role::from_str(&role)
        .map_err(|_| AppError::DatabaseError(format!("Unknown role '{}' in players table", role)))?;
    let last_attendance: Option<String> = row.get("last_attendance");
    let last_attendance = match last_attendance {
        Some(month) => Some(month.parse().map_err(|_| {
            AppError::DatabaseError(format!("Malformed last_attendance '{}'", month))
        })?),
        None => None,
    };

    Ok(PlayerModel {
        id: row.get("id"),
        name: row.get("name"),
        score: row.get("score"),
        xp: row.get("xp"),
        tier: row.get("tier"),
        win_count: row.get("win_count"),
        match_count: row.get("match_count"),
        streak: row.get("streak"),
        is_active: row.get("is_active"),
        role,
        attendance_count: row.get("attendance_count"),
        consecutive_months: row.get("consecutive_months"),
        last_attendance,
        join_date: row.get("join_date"),
    })
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn create_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO players (id, name, score, xp, tier, win_count, match_count, streak, is_active, role, attendance_count, consecutive_months, last_attendance, join_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&player.id)
        .bind(&player.name)
        .bind(player.score)
        .bind(player.xp)
        .bind(&player.tier)
        .bind(player.win_count)
        .bind(player.match_count)
        .bind(player.streak)
        .bind(player.is_active)
        .bind(player.role.as_ref())
        .bind(player.attendance_count)
        .bind(player.consecutive_months)
        .bind(player.last_attendance.map(|m| m.to_string()))
        .bind(player.join_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Player id already registered");
            return Err(AppError::Conflict(format!(
                "Player id {} is already registered",
                player.id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM players WHERE id = $1", PLAYER_COLUMNS))
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_player_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_players(&self, active_only: bool) -> Result<Vec<PlayerModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM players WHERE ($1 = FALSE OR is_active) ORDER BY score DESC, id ASC",
            PLAYER_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_player_row).collect()
    }

    #[instrument(skip(self, patch))]
    async fn update_player(
        &self,
        player_id: &str,
        patch: &PlayerPatch,
    ) -> Result<PlayerModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE players SET name = COALESCE($2, name), is_active = COALESCE($3, is_active), role = COALESCE($4, role) \
             WHERE id = $1 RETURNING {}",
            PLAYER_COLUMNS
        ))
        .bind(player_id)
        .bind(patch.name.as_deref())
        .bind(patch.is_active)
        .bind(patch.role.map(|r| r.to_string()))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_player_row(&row),
            None => Err(AppError::NotFound(format!("Player {} not found", player_id))),
        }
    }

    #[instrument(skip(self))]
    async fn delete_player(&self, player_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Player {} not found", player_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score: i32, active: bool) -> PlayerModel {
        PlayerModel {
            score,
            is_active: active,
            ..PlayerModel::new(id.to_string(), format!("Player {}", id))
        }
    }

    #[tokio::test]
    async fn test_create_and_get_player() {
        let repo = InMemoryPlayerRepository::new();
        repo.create_player(&player("E1", 1000, true)).await.unwrap();

        let fetched = repo.get_player("E1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Player E1");
        assert!(repo.get_player("E9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_player_conflicts() {
        let repo = InMemoryPlayerRepository::new();
        repo.create_player(&player("E1", 1000, true)).await.unwrap();
        let err = repo.create_player(&player("E1", 1000, true)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_orders_by_score_then_id() {
        let repo = InMemoryPlayerRepository::with_players(vec![
            player("E3", 1020, true),
            player("E1", 1040, true),
            player("E2", 1020, true),
            player("E4", 1100, false),
        ]);

        let ids: Vec<String> = repo
            .list_players(true)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["E1", "E2", "E3"]);
        assert_eq!(repo.list_players(false).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_player() {
        let repo = InMemoryPlayerRepository::new();
        let err = repo
            .update_player("E1", &PlayerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            repo.delete_player("E1").await,
            Err(AppError::NotFound(_))
        ));
    }
}
