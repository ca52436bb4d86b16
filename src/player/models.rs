use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::month_lock::MonthKey;
use crate::rules::FLOOR_TIER;

/// Canonical rating every player starts a replay with
pub const STARTING_SCORE: i32 = 1000;

/// Database model for the players table.
///
/// `score`, `tier`, `win_count`, `match_count` and `streak` are written only by
/// the rating replay; `xp`, `attendance_count`, `consecutive_months` and
/// `last_attendance` only by the attendance replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerModel {
    pub id: String, // Employee id
    pub name: String,
    pub score: i32,
    pub xp: i32,
    pub tier: String,
    pub win_count: i32,
    pub match_count: i32,
    pub streak: i32,
    pub is_active: bool,
    pub role: Role,
    pub attendance_count: i32,
    pub consecutive_months: i32,
    pub last_attendance: Option<MonthKey>,
    pub join_date: NaiveDate,
}

impl PlayerModel {
    /// Admin-created member, active immediately
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            score: STARTING_SCORE,
            xp: 0,
            tier: FLOOR_TIER.to_string(),
            win_count: 0,
            match_count: 0,
            streak: 0,
            is_active: true,
            role: Role::Player,
            attendance_count: 0,
            consecutive_months: 0,
            last_attendance: None,
            join_date: Utc::now().date_naive(),
        }
    }

    /// Self-registered member awaiting approval
    pub fn pending(id: String, name: String) -> Self {
        Self {
            is_active: false,
            role: Role::Pending,
            ..Self::new(id, name)
        }
    }
}

/// Partial update of the editable profile columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub role: Option<Role>,
}

impl PlayerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none() && self.role.is_none()
    }

    pub fn apply(&self, player: &mut PlayerModel) {
        if let Some(name) = &self.name {
            player.name = name.clone();
        }
        if let Some(is_active) = self.is_active {
            player.is_active = is_active;
        }
        if let Some(role) = self.role {
            player.role = role;
        }
    }
}
