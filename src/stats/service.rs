use std::sync::Arc;
use tracing::{debug, instrument};

use super::calculators;
use super::models::{PlayerStats, RankChanges};
use crate::auth::{authorize, Permission, Principal};
use crate::matches::{
    repository::{MatchFilter, MatchRepository},
    MatchStatus,
};
use crate::player::repository::PlayerRepository;
use crate::shared::AppError;

/// Read-only statistics derived from the stored match history
pub struct StatsService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
}

impl StatsService {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
    ) -> Self {
        Self { players, matches }
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn player_stats(
        &self,
        principal: &Principal,
        player_id: &str,
    ) -> Result<PlayerStats, AppError> {
        authorize(principal, Permission::Member)?;
        if self.players.get_player(player_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Player {} not found", player_id)));
        }

        let players = self.players.list_players(false).await?;
        let matches = self
            .matches
            .list_matches(&MatchFilter::Participant(player_id.to_string()))
            .await?;
        debug!(matches = matches.len(), "Computing partner records");
        Ok(calculators::player_stats(player_id, &players, &matches))
    }

    /// Ranking movement of active members caused by the latest completed day
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn rank_changes(&self, principal: &Principal) -> Result<RankChanges, AppError> {
        authorize(principal, Permission::Member)?;
        let players = self.players.list_players(true).await?;
        let matches = self
            .matches
            .list_matches(&MatchFilter::Status(MatchStatus::Done))
            .await?;
        Ok(calculators::rank_changes(&players, &matches))
    }
}
