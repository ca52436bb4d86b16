use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use super::types::Principal;
use crate::shared::AppError;

/// Membership role of a league member.
///
/// `pending` and `rejected` are signup states and carry no authority. For
/// authorization `admin` and `super_admin` are equivalent except when
/// assigning roles.
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
pub enum Role {
    Pending,
    Rejected,
    Player,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Position in the authority order `pending = rejected < player < admin = super_admin`.
    pub fn authority(self) -> u8 {
        match self {
            Role::Pending | Role::Rejected => 0,
            Role::Player => 1,
            Role::Admin | Role::SuperAdmin => 2,
        }
    }

    pub fn is_admin(self) -> bool {
        self.authority() >= Role::Admin.authority()
    }
}

/// What a caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read league data or act on one's own behalf.
    Member,
    /// Enter or dispute a match score; participants and admins.
    MatchParticipant { is_participant: bool },
    /// Any administrative mutation.
    Administer,
    /// Grant or revoke admin rights.
    AssignRoles,
}

/// The single authorization gate used by every service.
pub fn authorize(principal: &Principal, permission: Permission) -> Result<(), AppError> {
    let role = principal.role;
    let allowed = match permission {
        Permission::Member => role.authority() >= Role::Player.authority(),
        Permission::MatchParticipant { is_participant } => {
            role.is_admin() || (is_participant && role.authority() >= Role::Player.authority())
        }
        Permission::Administer => role.is_admin(),
        Permission::AssignRoles => role == Role::SuperAdmin,
    };

    if allowed {
        return Ok(());
    }

    debug!(principal = %principal.id, %role, ?permission, "Authorization denied");
    let reason = match permission {
        Permission::Member => "An approved league membership is required".to_string(),
        Permission::MatchParticipant { .. } => {
            "Only match participants or admins may do this".to_string()
        }
        Permission::Administer => "Admin role required".to_string(),
        Permission::AssignRoles => "Super admin role required to assign roles".to_string(),
    };
    Err(AppError::Forbidden(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn principal(role: Role) -> Principal {
        Principal::new("E1", "Tester", role)
    }

    #[test]
    fn roles_round_trip_through_strings() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(role.as_ref()).unwrap(), role);
        }
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
        assert!(Role::from_str("owner").is_err());
    }

    #[rstest]
    #[case(Role::Pending, false)]
    #[case(Role::Rejected, false)]
    #[case(Role::Player, false)]
    #[case(Role::Admin, true)]
    #[case(Role::SuperAdmin, true)]
    fn administer_requires_admin(#[case] role: Role, #[case] allowed: bool) {
        assert_eq!(
            authorize(&principal(role), Permission::Administer).is_ok(),
            allowed
        );
    }

    #[rstest]
    #[case(Role::Player, true, true)]
    #[case(Role::Player, false, false)]
    #[case(Role::Admin, false, true)]
    #[case(Role::Pending, true, false)]
    fn participant_gate(#[case] role: Role, #[case] is_participant: bool, #[case] allowed: bool) {
        let result = authorize(
            &principal(role),
            Permission::MatchParticipant { is_participant },
        );
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn only_super_admin_assigns_roles() {
        assert!(authorize(&principal(Role::SuperAdmin), Permission::AssignRoles).is_ok());
        let err = authorize(&principal(Role::Admin), Permission::AssignRoles).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
