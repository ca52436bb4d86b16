use tracing::{info, instrument};

use super::{models::PlayerModel, repository::PlayerRepository};
use crate::auth::{Principal, Role, TokenConfig};
use crate::shared::AppError;

/// Makes sure the configured super admin exists and returns a fresh token for them.
/// The token is handed back to the caller and never written to the log.
#[instrument(skip(players, token_config))]
pub async fn seed_super_admin(
    players: &(dyn PlayerRepository + Send + Sync),
    token_config: &TokenConfig,
    id: &str,
    name: &str,
) -> Result<String, AppError> {
    let player = match players.get_player(id).await? {
        Some(existing) => existing,
        None => {
            let player = PlayerModel {
                role: Role::SuperAdmin,
                ..PlayerModel::new(id.to_string(), name.to_string())
            };
            players.create_player(&player).await?;
            info!(player_id = %id, "Seeded super admin");
            player
        }
    };

    if player.role != Role::SuperAdmin {
        return Err(AppError::Conflict(format!(
            "Player {} already exists with role {}",
            id, player.role
        )));
    }
    token_config.create_token(&Principal::new(&player.id, &player.name, Role::SuperAdmin))
}
