use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{PlayerModel, PlayerPatch},
    repository::PlayerRepository,
};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal, Role};
use crate::matches::repository::{MatchFilter, MatchRepository};
use crate::shared::AppError;

/// Service for roster management and signup approval
pub struct PlayerService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
}

fn validate_identity(id: &str, name: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Validation("Player id is required".to_string()));
    }
    if name.trim().is_empty() {
        return Err(AppError::Validation("Player name is required".to_string()));
    }
    Ok(())
}

impl PlayerService {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
    ) -> Self {
        Self {
            players,
            matches,
            audit_sink,
        }
    }

    async fn load(&self, player_id: &str) -> Result<PlayerModel, AppError> {
        self.players
            .get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", player_id)))
    }

    async fn audit(&self, principal: &Principal, action: &str, player_id: &str, detail: serde_json::Value) {
        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&principal.id, action, "player", player_id, detail),
        )
        .await;
    }

    pub async fn list_players(
        &self,
        principal: &Principal,
        active_only: bool,
    ) -> Result<Vec<PlayerModel>, AppError> {
        authorize(principal, Permission::Member)?;
        self.players.list_players(active_only).await
    }

    /// Active players by score, highest first
    pub async fn ranking(
        &self,
        principal: &Principal,
        limit: usize,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let mut players = self.list_players(principal, true).await?;
        players.truncate(limit);
        Ok(players)
    }

    pub async fn get_player(
        &self,
        principal: &Principal,
        player_id: &str,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::Member)?;
        self.load(player_id).await
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn add_player(
        &self,
        principal: &Principal,
        id: &str,
        name: &str,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::Administer)?;
        validate_identity(id, name)?;

        let player = PlayerModel::new(id.trim().to_string(), name.trim().to_string());
        self.players.create_player(&player).await?;
        info!(player_id = %player.id, "Player added");

        self.audit(principal, "player.add", &player.id, json!({ "name": player.name }))
            .await;
        Ok(player)
    }

    /// Self-registration; the new member waits in `pending` until an admin decides.
    #[instrument(skip(self))]
    pub async fn signup(&self, id: &str, name: &str) -> Result<PlayerModel, AppError> {
        validate_identity(id, name)?;

        let player = PlayerModel::pending(id.trim().to_string(), name.trim().to_string());
        self.players.create_player(&player).await?;
        info!(player_id = %player.id, "Signup received");

        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&player.id, "player.signup", "player", &player.id, json!({ "name": player.name })),
        )
        .await;
        Ok(player)
    }

    async fn decide_signup(
        &self,
        principal: &Principal,
        player_id: &str,
        approve: bool,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::Administer)?;
        let player = self.load(player_id).await?;
        if player.role != Role::Pending {
            return Err(AppError::Conflict(format!(
                "Player {} is not awaiting approval (role is {})",
                player_id, player.role
            )));
        }

        let patch = if approve {
            PlayerPatch {
                is_active: Some(true),
                role: Some(Role::Player),
                ..PlayerPatch::default()
            }
        } else {
            PlayerPatch {
                is_active: Some(false),
                role: Some(Role::Rejected),
                ..PlayerPatch::default()
            }
        };
        let updated = self.players.update_player(player_id, &patch).await?;

        let action = if approve { "player.approve" } else { "player.reject" };
        info!(player_id, action, "Signup decided");
        self.audit(principal, action, player_id, json!({})).await;
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn approve_signup(
        &self,
        principal: &Principal,
        player_id: &str,
    ) -> Result<PlayerModel, AppError> {
        self.decide_signup(principal, player_id, true).await
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn reject_signup(
        &self,
        principal: &Principal,
        player_id: &str,
    ) -> Result<PlayerModel, AppError> {
        self.decide_signup(principal, player_id, false).await
    }

    /// Edits name and activity; rating and attendance fields belong to the replays.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn update_player(
        &self,
        principal: &Principal,
        player_id: &str,
        name: Option<String>,
        is_active: Option<bool>,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::Administer)?;
        let name = name.map(|n| n.trim().to_string());
        if matches!(name.as_deref(), Some("")) {
            return Err(AppError::Validation("Player name is required".to_string()));
        }

        let patch = PlayerPatch {
            name,
            is_active,
            role: None,
        };
        if patch.is_empty() {
            return self.load(player_id).await;
        }
        let updated = self.players.update_player(player_id, &patch).await?;

        self.audit(
            principal,
            "player.update",
            player_id,
            json!({ "name": updated.name, "is_active": updated.is_active }),
        )
        .await;
        Ok(updated)
    }

    /// Grants or revokes admin rights; `super_admin` is never assignable here.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn set_role(
        &self,
        principal: &Principal,
        player_id: &str,
        role: Role,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::AssignRoles)?;
        if !matches!(role, Role::Player | Role::Admin) {
            return Err(AppError::Validation(format!(
                "Role {} cannot be assigned; choose player or admin",
                role
            )));
        }

        let player = self.load(player_id).await?;
        match player.role {
            Role::SuperAdmin => {
                return Err(AppError::Conflict(format!(
                    "Player {} is a super admin and cannot be reassigned",
                    player_id
                )))
            }
            Role::Pending | Role::Rejected => {
                return Err(AppError::Conflict(format!(
                    "Player {} has not been approved",
                    player_id
                )))
            }
            Role::Player | Role::Admin => {}
        }

        let updated = self
            .players
            .update_player(
                player_id,
                &PlayerPatch {
                    role: Some(role),
                    ..PlayerPatch::default()
                },
            )
            .await?;
        info!(player_id, from = %player.role, to = %role, "Role changed");
        self.audit(
            principal,
            "player.set_role",
            player_id,
            json!({ "from": player.role, "to": role }),
        )
        .await;
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn deactivate(
        &self,
        principal: &Principal,
        player_id: &str,
    ) -> Result<PlayerModel, AppError> {
        authorize(principal, Permission::Administer)?;
        let updated = self
            .players
            .update_player(
                player_id,
                &PlayerPatch {
                    is_active: Some(false),
                    ..PlayerPatch::default()
                },
            )
            .await?;
        self.audit(principal, "player.deactivate", player_id, json!({}))
            .await;
        Ok(updated)
    }

    /// Hard delete, allowed only for players who never appeared in a match.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn delete_player(&self, principal: &Principal, player_id: &str) -> Result<(), AppError> {
        authorize(principal, Permission::Administer)?;
        self.load(player_id).await?;

        let history = self
            .matches
            .list_matches(&MatchFilter::Participant(player_id.to_string()))
            .await?;
        if !history.is_empty() {
            warn!(player_id, matches = history.len(), "Refusing to delete player with history");
            return Err(AppError::Conflict(format!(
                "Player {} appears in {} match(es); deactivate instead",
                player_id,
                history.len()
            )));
        }

        self.players.delete_player(player_id).await?;
        info!(player_id, "Player deleted");
        self.audit(principal, "player.delete", player_id, json!({})).await;
        Ok(())
    }
}
