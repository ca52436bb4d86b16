use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::models::{DailyResult, PartnerRecord, PlayerStats, RankChange, RankChanges, RivalRecord};
use crate::matches::{MatchModel, MatchStatus};
use crate::player::PlayerModel;

/// A completed match seen from one player's side
struct Side<'a> {
    mine: &'a [String],
    theirs: &'a [String],
    won: bool,
    change: i32,
}

/// Done matches with a decisive score; anything else never touched a rating.
fn decided(m: &MatchModel) -> Option<(i32, i32)> {
    if m.status != MatchStatus::Done {
        return None;
    }
    m.score().filter(|(s1, s2)| s1 != s2)
}

fn side<'a>(m: &'a MatchModel, player_id: &str) -> Option<Side<'a>> {
    let (s1, s2) = decided(m)?;
    if m.team1.iter().any(|id| id == player_id) {
        Some(Side {
            mine: &m.team1,
            theirs: &m.team2,
            won: s1 > s2,
            change: m.change1,
        })
    } else if m.team2.iter().any(|id| id == player_id) {
        Some(Side {
            mine: &m.team2,
            theirs: &m.team1,
            won: s2 > s1,
            change: m.change2,
        })
    } else {
        None
    }
}

fn names(players: &[PlayerModel]) -> HashMap<&str, &str> {
    players
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect()
}

/// Compares win rates exactly, then prefers the larger sample.
fn by_win_rate(a: &PartnerRecord, b: &PartnerRecord) -> Ordering {
    (u64::from(b.wins) * u64::from(a.games))
        .cmp(&(u64::from(a.wins) * u64::from(b.games)))
        .then_with(|| b.games.cmp(&a.games))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Partner and rival records over every decided match of `player_id`.
/// Only roster members are reported.
pub fn player_stats(player_id: &str, players: &[PlayerModel], matches: &[MatchModel]) -> PlayerStats {
    let roster = names(players);
    let mut partners: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    let mut rivals: BTreeMap<&str, u32> = BTreeMap::new();

    for s in matches.iter().filter_map(|m| side(m, player_id)) {
        for partner in s.mine.iter().filter(|id| id.as_str() != player_id) {
            let entry = partners.entry(partner.as_str()).or_default();
            entry.0 += 1;
            entry.1 += u32::from(s.won);
        }
        if !s.won {
            for opponent in s.theirs {
                *rivals.entry(opponent.as_str()).or_default() += 1;
            }
        }
    }

    let mut partners: Vec<PartnerRecord> = partners
        .into_iter()
        .filter_map(|(id, (games, wins))| {
            let name = roster.get(id)?;
            Some(PartnerRecord {
                player_id: id.to_string(),
                name: name.to_string(),
                games,
                wins,
                win_rate: wins * 100 / games.max(1),
            })
        })
        .collect();
    partners.sort_by(by_win_rate);

    // BTreeMap order keeps the lowest id on equal losses
    let rival = rivals
        .into_iter()
        .filter_map(|(id, losses)| Some((id, *roster.get(id)?, losses)))
        .fold(None::<RivalRecord>, |best, (id, name, losses)| match best {
            Some(b) if b.losses >= losses => Some(b),
            _ => Some(RivalRecord {
                player_id: id.to_string(),
                name: name.to_string(),
                losses,
            }),
        });

    PlayerStats {
        player_id: player_id.to_string(),
        best_partner: partners.first().cloned(),
        partners,
        rival,
    }
}

fn ranks<'a>(scores: impl Iterator<Item = (&'a str, i32)>) -> HashMap<&'a str, usize> {
    let mut ordered: Vec<(&str, i32)> = scores.collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (id, _))| (id, i + 1))
        .collect()
}

/// Current ranking against the ranking before the latest completed day.
/// The earlier scores are rebuilt by backing out that day's stored changes.
pub fn rank_changes(players: &[PlayerModel], matches: &[MatchModel]) -> RankChanges {
    let date = matches
        .iter()
        .filter(|m| decided(m).is_some())
        .map(|m| m.date)
        .max();

    let mut previous: HashMap<&str, i32> =
        players.iter().map(|p| (p.id.as_str(), p.score)).collect();
    for m in matches
        .iter()
        .filter(|m| Some(m.date) == date && decided(m).is_some())
    {
        for (team, change) in [(&m.team1, m.change1), (&m.team2, m.change2)] {
            for id in team {
                if let Some(score) = previous.get_mut(id.as_str()) {
                    *score -= change;
                }
            }
        }
    }

    let current = ranks(players.iter().map(|p| (p.id.as_str(), p.score)));
    let before = ranks(previous.iter().map(|(id, score)| (*id, *score)));

    let mut changes: Vec<RankChange> = players
        .iter()
        .filter_map(|p| {
            let rank = *current.get(p.id.as_str())?;
            let previous_rank = *before.get(p.id.as_str())?;
            Some(RankChange {
                player_id: p.id.clone(),
                name: p.name.clone(),
                rank,
                previous_rank,
                change: previous_rank as i64 - rank as i64,
            })
        })
        .collect();
    changes.sort_by_key(|c| c.rank);

    RankChanges { date, changes }
}

/// Per-player results of the decided matches played on `date`, biggest gain first.
pub fn daily_results(date: NaiveDate, players: &[PlayerModel], matches: &[MatchModel]) -> Vec<DailyResult> {
    let roster = names(players);
    let mut results: BTreeMap<&str, DailyResult> = BTreeMap::new();

    for m in matches.iter().filter(|m| m.date == date) {
        for id in m.participants() {
            let (Some(name), Some(s)) = (roster.get(id.as_str()), side(m, id)) else {
                continue;
            };
            let row = results.entry(id.as_str()).or_insert_with(|| DailyResult {
                player_id: id.clone(),
                name: name.to_string(),
                games: 0,
                wins: 0,
                losses: 0,
                change: 0,
            });
            row.games += 1;
            row.change += s.change;
            if s.won {
                row.wins += 1;
            } else {
                row.losses += 1;
            }
        }
    }

    let mut rows: Vec<DailyResult> = results.into_values().collect();
    rows.sort_by(|a, b| b.change.cmp(&a.change).then_with(|| a.player_id.cmp(&b.player_id)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::NewMatch;
    use rstest::rstest;

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn roster(ids: &[&str]) -> Vec<PlayerModel> {
        ids.iter()
            .map(|id| PlayerModel::new(id.to_string(), format!("Name {}", id)))
            .collect()
    }

    fn played(
        id: i64,
        day: u32,
        team1: &[&str],
        team2: &[&str],
        score: (i32, i32),
        changes: (i32, i32),
    ) -> MatchModel {
        let mut m = NewMatch {
            date: june(day),
            group_name: "A".into(),
            team1: team1.iter().map(|s| s.to_string()).collect(),
            team2: team2.iter().map(|s| s.to_string()).collect(),
        }
        .into_model(id);
        m.score1 = Some(score.0);
        m.score2 = Some(score.1);
        m.change1 = changes.0;
        m.change2 = changes.1;
        m.status = MatchStatus::Done;
        m
    }

    #[test]
    fn best_partner_is_highest_win_rate() {
        let players = roster(&["P1", "P2", "P3", "P4", "P5"]);
        let matches = vec![
            played(1, 1, &["P1", "P2"], &["P4", "P5"], (21, 10), (20, -20)),
            played(2, 2, &["P1", "P2"], &["P4", "P5"], (10, 21), (-20, 20)),
            played(3, 3, &["P1", "P3"], &["P4", "P5"], (21, 12), (20, -20)),
            played(4, 4, &["P1", "P3"], &["P2", "P4"], (21, 19), (20, -20)),
        ];

        let stats = player_stats("P1", &players, &matches);
        let best = stats.best_partner.unwrap();
        assert_eq!(best.player_id, "P3");
        assert_eq!((best.games, best.wins, best.win_rate), (2, 2, 100));
        assert_eq!(stats.partners[1].player_id, "P2");
        assert_eq!(stats.partners[1].win_rate, 50);

        let rival = stats.rival.unwrap();
        assert_eq!(rival.player_id, "P4");
        assert_eq!(rival.losses, 1);
    }

    #[test]
    fn rival_counts_only_losses() {
        let players = roster(&["P1", "P2", "P3"]);
        let matches = vec![
            played(1, 1, &["P1"], &["P2"], (21, 3), (25, -25)),
            played(2, 2, &["P1"], &["P2"], (21, 3), (25, -25)),
            played(3, 3, &["P1"], &["P3"], (18, 21), (-20, 20)),
        ];

        let stats = player_stats("P1", &players, &matches);
        assert_eq!(stats.rival.unwrap().player_id, "P3");
        assert!(stats.partners.is_empty());
        assert!(stats.best_partner.is_none());
    }

    #[test]
    fn undecided_matches_are_ignored() {
        let players = roster(&["P1", "P2"]);
        let mut pending = played(1, 1, &["P1"], &["P2"], (5, 21), (0, 0));
        pending.status = MatchStatus::Pending;
        let tied = played(2, 2, &["P1"], &["P2"], (21, 21), (0, 0));

        let stats = player_stats("P1", &players, &[pending, tied]);
        assert!(stats.rival.is_none());
    }

    #[rstest]
    #[case::winner("P2", 2, 1, 1)]
    #[case::climber("P3", 3, 2, 1)]
    #[case::overtaken("P1", 1, 3, -2)]
    #[case::unchanged("P4", 4, 4, 0)]
    fn rank_changes_back_out_the_latest_day(
        #[case] id: &str,
        #[case] before: usize,
        #[case] after: usize,
        #[case] change: i64,
    ) {
        let mut players = roster(&["P1", "P2", "P3", "P4"]);
        for (p, score) in players.iter_mut().zip([1040, 1060, 1050, 900]) {
            p.score = score;
        }
        let matches = vec![
            played(1, 1, &["P1"], &["P4"], (21, 10), (20, -20)),
            played(2, 8, &["P3", "P2"], &["P1", "P4"], (21, 15), (30, -30)),
        ];

        let result = rank_changes(&players, &matches);
        assert_eq!(result.date, Some(june(8)));
        let row = result.changes.iter().find(|c| c.player_id == id).unwrap();
        assert_eq!((row.previous_rank, row.rank, row.change), (before, after, change));
    }

    #[test]
    fn no_history_means_no_movement() {
        let players = roster(&["P1", "P2"]);
        let result = rank_changes(&players, &[]);
        assert_eq!(result.date, None);
        assert!(result.changes.iter().all(|c| c.change == 0));
        assert_eq!(result.changes[0].rank, 1);
    }

    #[test]
    fn daily_results_sum_the_stored_changes() {
        let players = roster(&["P1", "P2", "P3"]);
        let mut cancelled = played(4, 15, &["P1"], &["P3"], (0, 21), (0, 0));
        cancelled.status = MatchStatus::Cancelled;
        let matches = vec![
            played(1, 15, &["P1"], &["P2"], (21, 10), (25, -25)),
            played(2, 15, &["P2"], &["P1"], (21, 18), (20, -20)),
            played(3, 14, &["P1"], &["P3"], (21, 2), (25, -25)),
            cancelled,
            played(5, 15, &["P3"], &["GHOST"], (21, 5), (20, -20)),
        ];

        let rows = daily_results(june(15), &players, &matches);
        assert_eq!(rows.len(), 3);
        let p1 = rows.iter().find(|r| r.player_id == "P1").unwrap();
        assert_eq!((p1.games, p1.wins, p1.losses, p1.change), (2, 1, 1, 5));
        assert_eq!(rows[0].player_id, "P3");
        assert_eq!(rows[2].player_id, "P2");
    }
}
