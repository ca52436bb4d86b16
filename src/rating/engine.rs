//! Full-history rating replay.
//!
//! Stored player scores are never read: every replay starts each player at
//! the canonical starting score and walks the `done` matches in date, then id,
//! order.

use std::collections::BTreeMap;
use tracing::debug;

use super::models::{MatchDelta, PlayerRating};
use crate::matches::{MatchModel, MatchStatus};
use crate::player::STARTING_SCORE;
use crate::rules::RuleConfig;

/// Result of replaying the whole match history
#[derive(Debug, Clone, PartialEq)]
pub struct RatingReplay {
    pub ratings: BTreeMap<String, PlayerRating>,
    pub deltas: Vec<MatchDelta>,
}

/// Running ratings during a replay
pub struct RatingEngine<'a> {
    rules: &'a RuleConfig,
    ratings: BTreeMap<String, PlayerRating>,
}

impl<'a> RatingEngine<'a> {
    /// Starts every listed player from the canonical rating
    pub fn new<'p>(rules: &'a RuleConfig, player_ids: impl IntoIterator<Item = &'p str>) -> Self {
        let ratings = player_ids
            .into_iter()
            .map(|id| (id.to_string(), PlayerRating::default()))
            .collect();
        Self { rules, ratings }
    }

    /// Overrides a player's running rating
    pub fn seed(&mut self, player_id: &str, rating: PlayerRating) {
        self.ratings.insert(player_id.to_string(), rating);
    }

    pub fn rating(&self, player_id: &str) -> Option<&PlayerRating> {
        self.ratings.get(player_id)
    }

    /// Average running score of the roster members of a team.
    /// Ids missing from the roster are ignored; a team with none known counts as a fresh team.
    fn team_average(&self, team: &[String]) -> f64 {
        let known: Vec<i32> = team
            .iter()
            .filter_map(|id| self.ratings.get(id).map(|r| r.score))
            .collect();
        if known.is_empty() {
            return STARTING_SCORE as f64;
        }
        known.iter().map(|s| *s as f64).sum::<f64>() / known.len() as f64
    }

    /// Applies one decided match; returns `None` when it has no decisive score.
    pub fn apply(&mut self, m: &MatchModel) -> Option<MatchDelta> {
        let (score1, score2) = m.score()?;
        if score1 == score2 {
            debug!(match_id = m.id, "Skipping tied match during replay");
            return None;
        }

        let score_rules = &self.rules.score_rules;
        let team1_won = score1 > score2;
        let diff = (score1 - score2).abs();
        let (avg1, avg2) = (self.team_average(&m.team1), self.team_average(&m.team2));
        let (winner_avg, loser_avg) = if team1_won { (avg1, avg2) } else { (avg2, avg1) };

        let mut win_delta = score_rules.win;
        if diff >= score_rules.big_diff {
            win_delta += score_rules.big_win;
        }
        if loser_avg - winner_avg >= score_rules.underdog_diff as f64 {
            win_delta += score_rules.underdog;
        }
        let loss_delta = score_rules.loss;

        let (change1, change2) = if team1_won {
            (win_delta, loss_delta)
        } else {
            (loss_delta, win_delta)
        };

        for (team, won, change) in [
            (&m.team1, team1_won, change1),
            (&m.team2, !team1_won, change2),
        ] {
            for id in team {
                let Some(rating) = self.ratings.get_mut(id) else {
                    continue;
                };
                rating.score += change;
                rating.match_count += 1;
                if won {
                    rating.win_count += 1;
                    rating.streak += 1;
                } else {
                    rating.streak = 0;
                }
                rating.tier = self.rules.tier_rules.tier_for(rating.score);
            }
        }

        Some(MatchDelta {
            match_id: m.id,
            change1,
            change2,
        })
    }

    pub fn finish(self) -> BTreeMap<String, PlayerRating> {
        self.ratings
    }
}

/// Replays every `done` match in chronological order over a fresh roster.
pub fn replay_ratings<'p>(
    player_ids: impl IntoIterator<Item = &'p str>,
    matches: &[MatchModel],
    rules: &RuleConfig,
) -> RatingReplay {
    let mut counted: Vec<&MatchModel> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Done)
        .collect();
    counted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let mut engine = RatingEngine::new(rules, player_ids);
    let deltas = counted.into_iter().filter_map(|m| engine.apply(m)).collect();

    RatingReplay {
        ratings: engine.finish(),
        deltas,
    }
}
