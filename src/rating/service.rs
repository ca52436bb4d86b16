use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument};

use super::{
    engine::{replay_ratings, RatingReplay},
    models::{
        MatchDelta, RatingChange, RatingSummary, RecalculationSummary, ReplayCommit, XpChange,
        XpSummary, PREVIEW_SIZE,
    },
    repository::ReplayStore,
    xp::{replay_attendance, AttendanceReplay},
};
use crate::audit::{self, AuditEntry, AuditSink};
use crate::auth::{authorize, Permission, Principal};
use crate::matches::{
    repository::{MatchFilter, MatchRepository},
    MatchModel,
};
use crate::player::{repository::PlayerRepository, PlayerModel};
use crate::rules::repository::RuleRepository;
use crate::shared::AppError;

/// Runs the rating and attendance replays over the full history and stores the result
pub struct RecalculationService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    rules: Arc<dyn RuleRepository + Send + Sync>,
    replay_store: Arc<dyn ReplayStore + Send + Sync>,
    audit_sink: Arc<dyn AuditSink + Send + Sync>,
    recalc_lock: Arc<AsyncMutex<()>>,
}

fn rating_summary(players: &[PlayerModel], replay: &RatingReplay, dry_run: bool) -> RatingSummary {
    let mut changes: Vec<RatingChange> = players
        .iter()
        .filter_map(|p| {
            let rating = replay.ratings.get(&p.id)?;
            (rating.match_count > 0).then(|| RatingChange {
                player_id: p.id.clone(),
                name: p.name.clone(),
                old_score: p.score,
                new_score: rating.score,
                diff: rating.score - p.score,
                tier: rating.tier.clone(),
                match_count: rating.match_count,
                win_count: rating.win_count,
            })
        })
        .collect();
    changes.sort_by(|a, b| {
        b.diff
            .abs()
            .cmp(&a.diff.abs())
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    RatingSummary {
        dry_run,
        players_updated: replay.ratings.len(),
        matches_replayed: replay.deltas.len(),
        preview: changes.iter().take(PREVIEW_SIZE).cloned().collect(),
        changes,
    }
}

/// Replayed deltas plus zeroed deltas for every match the replay no longer counts
/// that still carries stored changes.
fn deltas_to_store(matches: &[MatchModel], replayed: Vec<MatchDelta>) -> Vec<MatchDelta> {
    let counted: HashSet<i64> = replayed.iter().map(|d| d.match_id).collect();
    let mut deltas = replayed;
    deltas.extend(
        matches
            .iter()
            .filter(|m| !counted.contains(&m.id) && (m.change1 != 0 || m.change2 != 0))
            .map(|m| MatchDelta {
                match_id: m.id,
                change1: 0,
                change2: 0,
            }),
    );
    deltas
}

fn xp_summary(players: &[PlayerModel], replay: &AttendanceReplay, dry_run: bool) -> XpSummary {
    let changes: Vec<XpChange> = players
        .iter()
        .filter_map(|p| {
            let state = replay.states.get(&p.id)?;
            (state.attendance_count > 0).then(|| XpChange {
                player_id: p.id.clone(),
                name: p.name.clone(),
                old_xp: p.xp,
                new_xp: state.xp,
                attendance_count: state.attendance_count,
                consecutive_months: state.consecutive_months,
            })
        })
        .collect();

    let mut ranking = changes.clone();
    ranking.sort_by(|a, b| b.new_xp.cmp(&a.new_xp).then_with(|| a.player_id.cmp(&b.player_id)));
    ranking.truncate(PREVIEW_SIZE);

    XpSummary {
        dry_run,
        players_updated: replay.states.len(),
        months_processed: replay.months_processed,
        changes,
        ranking,
    }
}

impl RecalculationService {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        rules: Arc<dyn RuleRepository + Send + Sync>,
        replay_store: Arc<dyn ReplayStore + Send + Sync>,
        audit_sink: Arc<dyn AuditSink + Send + Sync>,
        recalc_lock: Arc<AsyncMutex<()>>,
    ) -> Self {
        Self {
            players,
            matches,
            rules,
            replay_store,
            audit_sink,
            recalc_lock,
        }
    }

    async fn load_history(&self) -> Result<(Vec<PlayerModel>, Vec<MatchModel>), AppError> {
        let players = self.players.list_players(false).await?;
        let matches = self.matches.list_matches(&MatchFilter::All).await?;
        Ok((players, matches))
    }

    async fn audit(&self, principal: &Principal, action: &str, detail: serde_json::Value) {
        audit::record(
            self.audit_sink.as_ref(),
            AuditEntry::new(&principal.id, action, "league", "all", detail),
        )
        .await;
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn recalculate_rating(
        &self,
        principal: &Principal,
        dry_run: bool,
    ) -> Result<RatingSummary, AppError> {
        authorize(principal, Permission::Administer)?;
        let _guard = self.recalc_lock.lock().await;

        let (players, matches) = self.load_history().await?;
        let rules = self.rules.get_rules().await?;
        let replay = replay_ratings(players.iter().map(|p| p.id.as_str()), &matches, &rules);
        let summary = rating_summary(&players, &replay, dry_run);

        if !dry_run {
            self.replay_store
                .commit(&ReplayCommit {
                    ratings: replay.ratings,
                    match_deltas: deltas_to_store(&matches, replay.deltas),
                    ..ReplayCommit::default()
                })
                .await?;
            self.audit(
                principal,
                "recalculate.rating",
                json!({ "players": summary.players_updated, "matches": summary.matches_replayed }),
            )
            .await;
        }

        info!(
            dry_run,
            players = summary.players_updated,
            matches = summary.matches_replayed,
            "Rating replay finished"
        );
        Ok(summary)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn recalculate_xp(
        &self,
        principal: &Principal,
        dry_run: bool,
    ) -> Result<XpSummary, AppError> {
        authorize(principal, Permission::Administer)?;
        let _guard = self.recalc_lock.lock().await;

        let (players, matches) = self.load_history().await?;
        let replay = replay_attendance(players.iter().map(|p| p.id.as_str()), &matches);
        let summary = xp_summary(&players, &replay, dry_run);

        if !dry_run {
            self.replay_store
                .commit(&ReplayCommit {
                    attendance: replay.states,
                    ..ReplayCommit::default()
                })
                .await?;
            self.audit(
                principal,
                "recalculate.xp",
                json!({ "players": summary.players_updated, "months": summary.months_processed }),
            )
            .await;
        }

        info!(
            dry_run,
            players = summary.players_updated,
            months = summary.months_processed,
            "Attendance replay finished"
        );
        Ok(summary)
    }

    /// Both replays over one snapshot, committed together.
    #[instrument(skip(self, principal), fields(actor = %principal.id))]
    pub async fn recalculate_all(
        &self,
        principal: &Principal,
        dry_run: bool,
    ) -> Result<RecalculationSummary, AppError> {
        authorize(principal, Permission::Administer)?;
        let _guard = self.recalc_lock.lock().await;

        let (players, matches) = self.load_history().await?;
        let rules = self.rules.get_rules().await?;
        let ids = || players.iter().map(|p| p.id.as_str());
        let rating_replay = replay_ratings(ids(), &matches, &rules);
        let attendance_replay = replay_attendance(ids(), &matches);

        let summary = RecalculationSummary {
            dry_run,
            rating: rating_summary(&players, &rating_replay, dry_run),
            xp: xp_summary(&players, &attendance_replay, dry_run),
        };

        if !dry_run {
            self.replay_store
                .commit(&ReplayCommit {
                    ratings: rating_replay.ratings,
                    match_deltas: deltas_to_store(&matches, rating_replay.deltas),
                    attendance: attendance_replay.states,
                })
                .await?;
            self.audit(
                principal,
                "recalculate.all",
                json!({
                    "players": summary.rating.players_updated,
                    "matches": summary.rating.matches_replayed,
                    "months": summary.xp.months_processed,
                }),
            )
            .await;
        }

        info!(dry_run, "Full replay finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::auth::Role;
    use crate::matches::repository::InMemoryMatchRepository;
    use crate::matches::{MatchStatus, NewMatch};
    use crate::player::repository::InMemoryPlayerRepository;
    use crate::rating::repository::InMemoryReplayStore;
    use crate::rules::repository::InMemoryRuleRepository;
    use chrono::NaiveDate;

    struct Fixture {
        service: RecalculationService,
        players: Arc<InMemoryPlayerRepository>,
        matches: Arc<InMemoryMatchRepository>,
        admin: Principal,
    }

    fn fixture(ids: &[&str]) -> Fixture {
        let players = Arc::new(InMemoryPlayerRepository::with_players(
            ids.iter()
                .map(|id| PlayerModel::new(id.to_string(), id.to_string()))
                .collect(),
        ));
        let matches = Arc::new(InMemoryMatchRepository::new());
        Fixture {
            service: RecalculationService::new(
                players.clone(),
                matches.clone(),
                Arc::new(InMemoryRuleRepository::with_defaults()),
                Arc::new(InMemoryReplayStore::new(players.clone(), matches.clone())),
                Arc::new(InMemoryAuditSink::new()),
                Arc::new(AsyncMutex::new(())),
            ),
            players,
            matches,
            admin: Principal::new("A1", "Admin", Role::Admin),
        }
    }

    async fn record_done(f: &Fixture, day: u32, team1: &str, team2: &str, score: (i32, i32)) {
        let mut m = f
            .matches
            .insert_match(&NewMatch {
                date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
                group_name: "A".into(),
                team1: vec![team1.into()],
                team2: vec![team2.into()],
            })
            .await
            .unwrap();
        m.score1 = Some(score.0);
        m.score2 = Some(score.1);
        m.status = MatchStatus::Done;
        f.matches.update_match(&m).await.unwrap();
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let f = fixture(&["P1", "P2"]);
        record_done(&f, 1, "P1", "P2", (21, 5)).await;

        let summary = f.service.recalculate_rating(&f.admin, true).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.preview[0].player_id, "P1");
        assert_eq!(summary.preview[0].diff, 25);
        assert_eq!(f.players.get_player("P1").await.unwrap().unwrap().score, 1000);
        assert_eq!(f.matches.get_match(1).await.unwrap().unwrap().change1, 0);
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let f = fixture(&["P1", "P2", "P3"]);
        record_done(&f, 1, "P1", "P2", (21, 5)).await;
        record_done(&f, 2, "P3", "P1", (21, 19)).await;

        f.service.recalculate_rating(&f.admin, false).await.unwrap();
        let first = f.players.list_players(false).await.unwrap();
        let second_summary = f.service.recalculate_rating(&f.admin, false).await.unwrap();
        let second = f.players.list_players(false).await.unwrap();

        assert_eq!(first, second);
        assert!(second_summary.changes.iter().all(|c| c.diff == 0));
        assert_eq!(f.matches.get_match(1).await.unwrap().unwrap().change1, 25);
    }

    #[tokio::test]
    async fn recalculate_all_commits_both_replays() {
        let f = fixture(&["P1", "P2"]);
        record_done(&f, 1, "P1", "P2", (21, 15)).await;

        let summary = f.service.recalculate_all(&f.admin, false).await.unwrap();
        assert_eq!(summary.xp.months_processed, 1);
        assert_eq!(summary.xp.ranking.len(), 2);

        let p1 = f.players.get_player("P1").await.unwrap().unwrap();
        assert_eq!(p1.score, 1020);
        assert_eq!(p1.xp, 100);
        assert_eq!(p1.attendance_count, 1);
    }

    #[tokio::test]
    async fn match_leaving_done_loses_its_stored_changes() {
        let f = fixture(&["P1", "P2"]);
        record_done(&f, 1, "P1", "P2", (21, 5)).await;
        record_done(&f, 2, "P2", "P1", (21, 19)).await;
        f.service.recalculate_all(&f.admin, false).await.unwrap();
        assert_eq!(f.matches.get_match(1).await.unwrap().unwrap().change1, 25);

        let mut reopened = f.matches.get_match(1).await.unwrap().unwrap();
        reopened.status = MatchStatus::Disputed;
        f.matches.update_match(&reopened).await.unwrap();

        let summary = f.service.recalculate_rating(&f.admin, false).await.unwrap();
        assert_eq!(summary.matches_replayed, 1);
        let stale = f.matches.get_match(1).await.unwrap().unwrap();
        assert_eq!((stale.change1, stale.change2), (0, 0));
        assert_ne!(f.matches.get_match(2).await.unwrap().unwrap().change1, 0);
    }

    #[tokio::test]
    async fn preview_keeps_the_twenty_largest_changes() {
        let ids: Vec<String> = (1..=25).map(|i| format!("P{i:02}")).collect();
        let f = fixture(&ids.iter().map(String::as_str).collect::<Vec<_>>());
        // pair k plays k + 1 times
        let mut day = 1;
        for (pair, chunk) in ids.chunks(2).enumerate() {
            if let [winner, loser] = chunk {
                for _ in 0..=pair {
                    record_done(&f, day, winner, loser, (21, 10)).await;
                    day = day % 28 + 1;
                }
            }
        }
        record_done(&f, 1, "P25", "P01", (21, 10)).await;

        let summary = f.service.recalculate_rating(&f.admin, true).await.unwrap();
        assert_eq!(summary.changes.len(), 25);
        assert_eq!(summary.preview.len(), 20);
        assert_eq!(summary.preview[..], summary.changes[..20]);
        assert!(summary
            .changes
            .windows(2)
            .all(|w| w[0].diff.abs() >= w[1].diff.abs()));
        let smallest_shown = summary.preview[19].diff.abs();
        assert!(summary.changes[20..]
            .iter()
            .all(|c| c.diff.abs() <= smallest_shown));
    }

    #[tokio::test]
    async fn xp_dry_run_leaves_attendance_untouched() {
        let f = fixture(&["P1", "P2"]);
        record_done(&f, 1, "P1", "P2", (21, 15)).await;
        let before = f.players.get_player("P1").await.unwrap().unwrap();

        let summary = f.service.recalculate_xp(&f.admin, true).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.changes.iter().find(|c| c.player_id == "P1").unwrap().new_xp, 100);

        let after = f.players.get_player("P1").await.unwrap().unwrap();
        assert_eq!(after.xp, before.xp);
        assert_eq!(after.attendance_count, before.attendance_count);
        assert_eq!(after.last_attendance, before.last_attendance);
        assert_eq!(after.attendance_count, 0);
    }

    #[tokio::test]
    async fn players_cannot_recalculate() {
        let f = fixture(&["P1"]);
        let player = Principal::new("P1", "P1", Role::Player);
        assert!(matches!(
            f.service.recalculate_xp(&player, true).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
