use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::AppError;

/// Tier assigned to anyone below every threshold, and to players with no counted matches.
pub const FLOOR_TIER: &str = "Bronze";

pub const SCORE_RULE_KEYS: [&str; 6] = ["win", "loss", "underdog", "underdog_diff", "big_win", "big_diff"];

/// Score deltas and bonus thresholds applied per counted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRules {
    pub win: i32,
    pub loss: i32,
    pub underdog: i32,
    /// Minimum pre-match average rating deficit for the underdog bonus
    pub underdog_diff: i32,
    pub big_win: i32,
    /// Minimum point margin for the big-win bonus
    pub big_diff: i32,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            win: 20,
            loss: 0,
            underdog: 15,
            underdog_diff: 100,
            big_win: 5,
            big_diff: 10,
        }
    }
}

impl ScoreRules {
    /// Builds rules from a complete key/value mapping; every key is required.
    pub fn from_map(map: &BTreeMap<String, i32>) -> Result<Self, AppError> {
        if let Some(unknown) = map.keys().find(|k| !SCORE_RULE_KEYS.contains(&k.as_str())) {
            return Err(AppError::Validation(format!(
                "Unknown score rule '{}'",
                unknown
            )));
        }
        let get = |key: &str| {
            map.get(key).copied().ok_or_else(|| {
                AppError::Validation(format!("Score rule '{}' is required", key))
            })
        };
        let rules = Self {
            win: get("win")?,
            loss: get("loss")?,
            underdog: get("underdog")?,
            underdog_diff: get("underdog_diff")?,
            big_win: get("big_win")?,
            big_diff: get("big_diff")?,
        };
        if rules.underdog_diff < 0 || rules.big_diff < 0 {
            return Err(AppError::Validation(
                "Score rule thresholds 'underdog_diff' and 'big_diff' must not be negative"
                    .to_string(),
            ));
        }
        Ok(rules)
    }

    /// Lenient variant for stored rows; missing keys fall back to defaults.
    pub fn from_stored(map: &BTreeMap<String, i32>) -> Self {
        let defaults = Self::default();
        let get = |key: &str, fallback: i32| map.get(key).copied().unwrap_or(fallback);
        Self {
            win: get("win", defaults.win),
            loss: get("loss", defaults.loss),
            underdog: get("underdog", defaults.underdog),
            underdog_diff: get("underdog_diff", defaults.underdog_diff),
            big_win: get("big_win", defaults.big_win),
            big_diff: get("big_diff", defaults.big_diff),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, i32> {
        BTreeMap::from([
            ("win".to_string(), self.win),
            ("loss".to_string(), self.loss),
            ("underdog".to_string(), self.underdog),
            ("underdog_diff".to_string(), self.underdog_diff),
            ("big_win".to_string(), self.big_win),
            ("big_diff".to_string(), self.big_diff),
        ])
    }
}

/// Tier name to minimum score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierRules(BTreeMap<String, i32>);

impl Default for TierRules {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("Challenger".to_string(), 1650),
            ("Diamond".to_string(), 1550),
            ("Platinum".to_string(), 1450),
            ("Gold".to_string(), 1350),
            ("Silver".to_string(), 1200),
            (FLOOR_TIER.to_string(), 0),
        ]))
    }
}

impl TierRules {
    pub fn new(thresholds: BTreeMap<String, i32>) -> Result<Self, AppError> {
        if thresholds.is_empty() {
            return Err(AppError::Validation(
                "At least one tier threshold is required".to_string(),
            ));
        }
        for (name, threshold) in &thresholds {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Tier names must not be empty".to_string()));
            }
            if *threshold < 0 {
                return Err(AppError::Validation(format!(
                    "Tier '{}' has a negative threshold",
                    name
                )));
            }
        }
        Ok(Self(thresholds))
    }

    /// Stored rows are trusted as-is; an empty table means the defaults.
    pub fn from_stored(thresholds: BTreeMap<String, i32>) -> Self {
        if thresholds.is_empty() {
            Self::default()
        } else {
            Self(thresholds)
        }
    }

    pub fn thresholds(&self) -> &BTreeMap<String, i32> {
        &self.0
    }

    /// Highest threshold not above `score`; equal thresholds resolve to the
    /// lexicographically first name so the result is deterministic.
    pub fn tier_for(&self, score: i32) -> String {
        self.0
            .iter()
            .filter(|(_, threshold)| **threshold <= score)
            .max_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| b_name.cmp(a_name)))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| FLOOR_TIER.to_string())
    }
}

/// Both rule categories as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuleConfig {
    pub score_rules: ScoreRules,
    pub tier_rules: TierRules,
}
