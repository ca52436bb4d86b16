//! Match status transitions.
//!
//! Every status change made through the match workflow goes through
//! [`transition`]. The admin edit endpoint overwrites status directly and is
//! not a transition.

use strum_macros::{AsRefStr, Display};

use super::models::MatchStatus;
use crate::shared::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MatchAction {
    SubmitScore,
    Approve,
    Reject,
    ForceConfirm,
    Cancel,
}

/// Returns the status a match moves to when `action` is applied in `from`.
pub fn transition(from: MatchStatus, action: MatchAction) -> Result<MatchStatus, AppError> {
    use MatchAction::*;
    use MatchStatus::*;

    let to = match (from, action) {
        (Pending | Disputed, SubmitScore) => Some(Pending),
        (Pending | Disputed, Approve) => Some(Done),
        (Pending | Disputed, Reject) => Some(Disputed),
        (Pending | Disputed, ForceConfirm) => Some(Done),
        (Pending | Disputed, Cancel) => Some(Cancelled),
        (Done | Cancelled, _) => None,
    };

    to.ok_or_else(|| {
        AppError::Conflict(format!(
            "Cannot {} a match that is {}; an admin edit is required",
            action.as_ref().replace('_', " "),
            from
        ))
    })
}
