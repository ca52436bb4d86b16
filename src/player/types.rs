use serde::Deserialize;

use crate::auth::Role;

#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlayerRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<usize>,
}
