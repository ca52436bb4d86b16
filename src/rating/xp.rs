//! Attendance replay.
//!
//! Every match counts regardless of status. A player earns attendance once per
//! calendar month they appear in, processed in month order.

use std::collections::{BTreeMap, BTreeSet};

use super::models::AttendanceState;
use crate::matches::MatchModel;
use crate::month_lock::MonthKey;

pub const XP_PER_ATTENDANCE: i32 = 100;
pub const XP_CONSECUTIVE_BONUS: i32 = 50;
pub const XP_MILESTONE_BONUS: i32 = 200;
/// A milestone bonus is paid on every n-th attendance
pub const MILESTONE_EVERY: i32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceReplay {
    pub states: BTreeMap<String, AttendanceState>,
    pub months_processed: usize,
}

/// Credits one month of attendance and returns the xp gained.
pub fn credit_month(state: &mut AttendanceState, month: MonthKey) -> i32 {
    let mut gain = XP_PER_ATTENDANCE;

    match state.last_attendance {
        Some(previous) if month.months_since(&previous) == 1 => {
            state.consecutive_months += 1;
            gain += XP_CONSECUTIVE_BONUS;
        }
        _ => state.consecutive_months = 1,
    }

    state.attendance_count += 1;
    if state.attendance_count % MILESTONE_EVERY == 0 {
        gain += XP_MILESTONE_BONUS;
    }

    state.xp += gain;
    state.last_attendance = Some(month);
    gain
}

/// Replays attendance for every listed player from zero.
pub fn replay_attendance<'p>(
    player_ids: impl IntoIterator<Item = &'p str>,
    matches: &[MatchModel],
) -> AttendanceReplay {
    let mut states: BTreeMap<String, AttendanceState> = player_ids
        .into_iter()
        .map(|id| (id.to_string(), AttendanceState::default()))
        .collect();

    let mut attendees_by_month: BTreeMap<MonthKey, BTreeSet<&str>> = BTreeMap::new();
    for m in matches {
        attendees_by_month
            .entry(m.month())
            .or_default()
            .extend(m.participants().map(String::as_str));
    }

    for (month, attendees) in &attendees_by_month {
        for id in attendees {
            if let Some(state) = states.get_mut(*id) {
                credit_month(state, *month);
            }
        }
    }

    AttendanceReplay {
        states,
        months_processed: attendees_by_month.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::{MatchStatus, NewMatch};
    use chrono::NaiveDate;

    fn played(id: i64, y: i32, mo: u32, d: u32, players: [&str; 2], status: MatchStatus) -> MatchModel {
        let mut m = NewMatch {
            date: NaiveDate::from_ymd_opt(y, mo, d).unwrap(),
            group_name: "A".into(),
            team1: vec![players[0].to_string()],
            team2: vec![players[1].to_string()],
        }
        .into_model(id);
        m.status = status;
        m
    }

    #[test]
    fn same_month_counts_once() {
        let history = vec![
            played(1, 2025, 6, 1, ["P1", "P2"], MatchStatus::Done),
            played(2, 2025, 6, 8, ["P1", "P3"], MatchStatus::Pending),
            played(3, 2025, 6, 22, ["P1", "P2"], MatchStatus::Cancelled),
        ];
        let replay = replay_attendance(["P1", "P2", "P3"], &history);

        let p1 = &replay.states["P1"];
        assert_eq!(p1.attendance_count, 1);
        assert_eq!(p1.xp, XP_PER_ATTENDANCE);
        assert_eq!(p1.consecutive_months, 1);
        assert_eq!(replay.months_processed, 1);
    }

    #[test]
    fn consecutive_months_and_milestone() {
        let history = vec![
            played(1, 2024, 11, 5, ["P1", "P2"], MatchStatus::Done),
            played(2, 2024, 12, 5, ["P1", "P2"], MatchStatus::Done),
            played(3, 2025, 1, 5, ["P1", "P2"], MatchStatus::Disputed),
        ];
        let replay = replay_attendance(["P1", "P2"], &history);

        let p1 = &replay.states["P1"];
        // 100, 150, 150 + 200 milestone
        assert_eq!(p1.xp, 600);
        assert_eq!(p1.consecutive_months, 3);
        assert_eq!(p1.attendance_count, 3);
        assert_eq!(p1.last_attendance.unwrap().to_string(), "2025-01");
    }

    #[test]
    fn gap_resets_consecutive_months() {
        let history = vec![
            played(1, 2025, 1, 5, ["P1", "P2"], MatchStatus::Done),
            played(2, 2025, 2, 5, ["P1", "P2"], MatchStatus::Done),
            played(3, 2025, 4, 5, ["P1", "P2"], MatchStatus::Done),
        ];
        let replay = replay_attendance(["P1"], &history);

        let p1 = &replay.states["P1"];
        assert_eq!(p1.consecutive_months, 1);
        assert_eq!(p1.xp, 100 + 150 + 100 + 200);
        assert!(!replay.states.contains_key("P2"));
    }

    #[test]
    fn players_without_matches_stay_at_zero() {
        let replay = replay_attendance(["P9"], &[]);
        assert_eq!(replay.states["P9"], AttendanceState::default());
        assert_eq!(replay.months_processed, 0);
    }
}
