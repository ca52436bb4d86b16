use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::shared::AppError;

pub const MIN_ATTENDEES: usize = 4;
pub const DEFAULT_TARGET_GAMES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentMode {
    /// Strongest and weakest partner up within groups of four
    #[default]
    Balanced,
    Random,
}

/// Two doubles teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub team1: Vec<String>,
    pub team2: Vec<String>,
}

impl Pairing {
    fn of(members: &[String], a: usize, b: usize, c: usize, d: usize) -> Self {
        Self {
            team1: vec![members[a].clone(), members[b].clone()],
            team2: vec![members[c].clone(), members[d].clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPlan {
    pub label: String,
    pub members: Vec<String>,
    pub pairings: Vec<Pairing>,
}

/// Splits `total` players into groups of 6, 5 and 4 using as few groups of
/// four as possible. Among equally good splits the one with fewer groups of
/// six wins. `None` when no split exists.
pub fn split_groups(total: usize) -> Option<Vec<usize>> {
    let mut best = None;
    let mut min_fours = total;

    for sixes in (0..=total / 6).rev() {
        let rest = total - sixes * 6;
        for fives in (0..=rest / 5).rev() {
            let rest = rest - fives * 5;
            if rest % 4 != 0 {
                continue;
            }
            let fours = rest / 4;
            if fours <= min_fours {
                min_fours = fours;
                let mut sizes = vec![6; sixes];
                sizes.extend(std::iter::repeat(5).take(fives));
                sizes.extend(std::iter::repeat(4).take(fours));
                best = Some(sizes);
            }
        }
    }
    best.filter(|sizes: &Vec<usize>| !sizes.is_empty())
}

fn average_games(matches: usize, members: usize) -> f64 {
    (matches * 4) as f64 / members as f64
}

/// Fixed rotation for a group, topped up with shuffled pairings until every
/// member averages `target` games.
pub fn random_pairings<R: Rng + ?Sized>(members: &[String], target: usize, rng: &mut R) -> Vec<Pairing> {
    let m = members;
    let mut pairings = match m.len() {
        4 => {
            let mut fixed = vec![
                Pairing::of(m, 0, 1, 2, 3),
                Pairing::of(m, 0, 2, 1, 3),
                Pairing::of(m, 0, 3, 1, 2),
            ];
            fixed.truncate(target);
            return fixed;
        }
        5 => vec![
            Pairing::of(m, 0, 1, 2, 3),
            Pairing::of(m, 0, 2, 3, 4),
            Pairing::of(m, 0, 3, 1, 4),
            Pairing::of(m, 0, 4, 1, 2),
            Pairing::of(m, 1, 3, 2, 4),
        ],
        6 => vec![
            Pairing::of(m, 0, 1, 2, 3),
            Pairing::of(m, 0, 4, 1, 5),
            Pairing::of(m, 2, 4, 3, 5),
            Pairing::of(m, 0, 2, 4, 5),
            Pairing::of(m, 1, 3, 2, 5),
            Pairing::of(m, 0, 3, 1, 4),
        ],
        _ => Vec::new(),
    };

    if m.len() < MIN_ATTENDEES {
        return pairings;
    }
    while average_games(pairings.len(), m.len()) < target as f64 {
        let mut shuffled = m.to_vec();
        shuffled.shuffle(rng);
        pairings.push(Pairing::of(&shuffled, 0, 1, 2, 3));
    }
    pairings
}

/// Members must be sorted strongest first. Groups other than four fall back
/// to the random rotation.
pub fn balanced_pairings<R: Rng + ?Sized>(members: &[String], target: usize, rng: &mut R) -> Vec<Pairing> {
    if members.len() != 4 {
        return random_pairings(members, target, rng);
    }
    let base = [
        Pairing::of(members, 0, 3, 1, 2),
        Pairing::of(members, 0, 2, 1, 3),
        Pairing::of(members, 0, 1, 2, 3),
    ];
    let needed = target * members.len() / 4;
    base.iter().cycle().take(needed).cloned().collect()
}

fn group_label(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    if index < 26 {
        letter.to_string()
    } else {
        format!("{}{}", letter, index / 26)
    }
}

/// Builds the groups and pairings for attendees sorted strongest first.
pub fn plan_tournament<R: Rng + ?Sized>(
    attendees: &[String],
    mode: TournamentMode,
    target: usize,
    rng: &mut R,
) -> Result<Vec<GroupPlan>, AppError> {
    if attendees.len() < MIN_ATTENDEES {
        return Err(AppError::Validation(format!(
            "At least {} attendees are required, got {}",
            MIN_ATTENDEES,
            attendees.len()
        )));
    }
    let sizes = split_groups(attendees.len()).ok_or_else(|| {
        AppError::Validation(format!(
            "{} attendees cannot be split into groups of 4 to 6",
            attendees.len()
        ))
    })?;

    let mut start = 0;
    let mut plans = Vec::with_capacity(sizes.len());
    for (index, size) in sizes.into_iter().enumerate() {
        let members = attendees[start..start + size].to_vec();
        start += size;
        let pairings = match mode {
            TournamentMode::Balanced => balanced_pairings(&members, target, rng),
            TournamentMode::Random => random_pairings(&members, target, rng),
        };
        plans.push(GroupPlan {
            label: group_label(index),
            members,
            pairings,
        });
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;
    use std::collections::HashMap;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{}", i)).collect()
    }

    #[rstest]
    #[case(4, Some(vec![4]))]
    #[case(5, Some(vec![5]))]
    #[case(8, Some(vec![4, 4]))]
    #[case(9, Some(vec![5, 4]))]
    #[case(10, Some(vec![5, 5]))]
    #[case(12, Some(vec![6, 6]))]
    #[case(13, Some(vec![5, 4, 4]))]
    #[case(3, None)]
    #[case(7, None)]
    fn splits_minimise_groups_of_four(#[case] total: usize, #[case] expected: Option<Vec<usize>>) {
        let mut split = split_groups(total);
        if let Some(sizes) = split.as_mut() {
            sizes.sort_unstable_by(|a, b| b.cmp(a));
        }
        assert_eq!(split, expected);
    }

    #[test]
    fn balanced_four_pairs_strongest_with_weakest() {
        let members = names(4);
        let pairings = balanced_pairings(&members, 4, &mut StdRng::seed_from_u64(1));
        assert_eq!(pairings.len(), 4);
        assert_eq!(pairings[0].team1, vec!["P1", "P4"]);
        assert_eq!(pairings[0].team2, vec!["P2", "P3"]);
        assert_eq!(pairings[3], pairings[0]);
    }

    #[rstest]
    #[case(5)]
    #[case(6)]
    fn random_rotation_reaches_target(#[case] size: usize) {
        let members = names(size);
        let pairings = random_pairings(&members, 4, &mut StdRng::seed_from_u64(7));
        assert!(average_games(pairings.len(), size) >= 4.0);

        let mut games: HashMap<&String, usize> = HashMap::new();
        for p in &pairings {
            let mut seen: Vec<&String> = p.team1.iter().chain(p.team2.iter()).collect();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), 4);
            for id in seen {
                *games.entry(id).or_default() += 1;
            }
        }
        assert_eq!(games.len(), size);
    }

    #[test]
    fn plan_labels_groups_in_order() {
        let attendees = names(9);
        let plans = plan_tournament(
            &attendees,
            TournamentMode::Balanced,
            DEFAULT_TARGET_GAMES,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].label, "A");
        assert_eq!(plans[1].label, "B");
        assert_eq!(plans[0].members.len() + plans[1].members.len(), 9);
    }

    #[test]
    fn too_few_attendees_rejected() {
        let err = plan_tournament(
            &names(3),
            TournamentMode::Random,
            DEFAULT_TARGET_GAMES,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
