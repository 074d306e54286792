// Single-writer session: applies one user action at a time to the
// tournament and persists it before the in-memory copy changes.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::error::{Result, TournamentError};
use crate::fixture::Match;
use crate::knockout::StageEvent;
use crate::score::ScoreEntry;
use crate::store::TournamentStore;
use crate::team::Team;
use crate::tournament::{Tournament, TournamentConfig};

/// Outcome of a score submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub updated: Match,
    pub events: Vec<StageEvent>,
}

pub struct TournamentSession<S: TournamentStore> {
    store: S,
    tournament: Tournament,
}

impl<S: TournamentStore> TournamentSession<S> {
    /// Start a fresh tournament and persist it, replacing any stored one.
    pub fn create(store: S, name: &str, config: TournamentConfig) -> Result<Self> {
        let tournament = Tournament::new(name.trim(), config)?;
        store
            .persist_tournament(&tournament)
            .context("failed to save new tournament")?;
        info!("Created tournament '{}' ({})", tournament.name, tournament.id);
        Ok(TournamentSession { store, tournament })
    }

    /// Resume the stored tournament, if there is one.
    pub fn restore(store: S) -> Result<Option<Self>> {
        let loaded = store
            .load_tournament()
            .context("failed to load tournament")?;
        Ok(loaded.map(|tournament| {
            info!("Restored tournament '{}' ({})", tournament.name, tournament.id);
            TournamentSession { store, tournament }
        }))
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn add_team(&mut self, name: &str) -> Result<Team> {
        let mut next = self.tournament.clone();
        let team = next.add_team(name)?;
        self.commit(next, |store, t| {
            store
                .persist_team_added(&t.id, &team)
                .context("failed to save new team")
        })?;
        info!("Team '{}' added", team.name);
        Ok(team)
    }

    pub fn remove_team(&mut self, team_id: &str) -> Result<Team> {
        let mut next = self.tournament.clone();
        let team = next.remove_team(team_id)?;
        self.commit(next, |store, t| {
            store
                .persist_team_removed(&t.id, &team.id)
                .context("failed to save team removal")
        })?;
        info!("Team '{}' removed", team.name);
        Ok(team)
    }

    /// Generate the league schedule and open the tournament.
    pub fn start(&mut self) -> Result<()> {
        self.start_with(Utc::now(), &mut rand::thread_rng())
    }

    pub fn start_with<R: Rng + ?Sized>(&mut self, start: DateTime<Utc>, rng: &mut R) -> Result<()> {
        let mut next = self.tournament.clone();
        next.start_with(start, rng)?;
        self.commit(next, |store, t| {
            store
                .persist_tournament(t)
                .context("failed to save league schedule")
        })
    }

    /// Enter or replace a match result from raw user input.
    pub fn submit_score(
        &mut self,
        match_id: &str,
        team1: &ScoreEntry,
        team2: &ScoreEntry,
        batting_first: &str,
    ) -> Result<ScoreOutcome> {
        let m = self.tournament.require_match(match_id)?;
        let cap = self.tournament.overs_cap_for(m);

        let mut next = self.tournament.clone();
        let events = next.record_score(match_id, team1.to_score(cap), team2.to_score(cap), batting_first)?;
        let updated = next.require_match(match_id)?.clone();
        let champion_before = self.tournament.champion().map(|t| t.id.clone());

        self.commit(next, |store, t| {
            let saved = if events.is_empty() {
                store.persist_match_update(&t.id, &updated)
            } else {
                store.persist_tournament(t)
            };
            saved.context("failed to save match result")
        })?;

        for event in &events {
            info!("Stage event: {:?}", event);
        }
        if let Some(champion) = self.tournament.champion() {
            if champion_before.as_deref() != Some(champion.id.as_str()) {
                info!("Champion: {}", champion.name);
            }
        }
        Ok(ScoreOutcome { updated, events })
    }

    /// Schedule the next Super Duper Over for a tied knockout match.
    pub fn create_super_duper_over(&mut self, parent_match_id: &str) -> Result<Match> {
        let mut next = self.tournament.clone();
        let sdo = next.add_super_duper_over(parent_match_id)?;
        self.commit(next, |store, t| {
            store
                .persist_match_update(&t.id, &sdo)
                .context("failed to save Super Duper Over")
        })?;
        Ok(sdo)
    }

    /// Drop the stored tournament and begin again with an empty one.
    pub fn reset(&mut self) -> Result<()> {
        let fresh = Tournament::new(self.tournament.name.clone(), self.tournament.config.clone())?;
        self.commit(fresh, |store, t| {
            store
                .reset_tournament(t)
                .context("failed to save reset tournament")
        })?;
        info!("Tournament reset");
        Ok(())
    }

    /// Persist `next` through `persist`, then make it current. On failure
    /// the in-memory tournament is left as it was.
    fn commit<F>(&mut self, next: Tournament, persist: F) -> Result<()>
    where
        F: FnOnce(&S, &Tournament) -> anyhow::Result<()>,
    {
        if let Err(e) = persist(&self.store, &next) {
            warn!("Persistence failed: {:#}", e);
            return Err(TournamentError::Persistence(e));
        }
        self.tournament = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MatchKind;
    use crate::store::SqliteStore;
    use crate::tournament::{Stage, TournamentStatus};
    use anyhow::anyhow;
    use chrono::TimeZone;
    use crease_core::db::Database;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Wraps a real store and fails every write once `fail` is set.
    struct FlakyStore {
        inner: SqliteStore,
        fail: Cell<bool>,
    }

    impl FlakyStore {
        fn check(&self) -> anyhow::Result<()> {
            if self.fail.get() {
                Err(anyhow!("disk full"))
            } else {
                Ok(())
            }
        }
    }

    impl TournamentStore for FlakyStore {
        fn load_tournament(&self) -> anyhow::Result<Option<Tournament>> {
            self.inner.load_tournament()
        }
        fn persist_tournament(&self, t: &Tournament) -> anyhow::Result<()> {
            self.check()?;
            self.inner.persist_tournament(t)
        }
        fn persist_team_added(&self, id: &str, team: &Team) -> anyhow::Result<()> {
            self.check()?;
            self.inner.persist_team_added(id, team)
        }
        fn persist_team_removed(&self, id: &str, team_id: &str) -> anyhow::Result<()> {
            self.check()?;
            self.inner.persist_team_removed(id, team_id)
        }
        fn persist_match_update(&self, id: &str, m: &Match) -> anyhow::Result<()> {
            self.check()?;
            self.inner.persist_match_update(id, m)
        }
        fn reset_tournament(&self, fresh: &Tournament) -> anyhow::Result<()> {
            self.check()?;
            self.inner.reset_tournament(fresh)
        }
    }

    fn config() -> TournamentConfig {
        TournamentConfig {
            matches_per_team_pair: 1,
            ..TournamentConfig::default()
        }
    }

    fn session() -> TournamentSession<SqliteStore> {
        TournamentSession::create(SqliteStore::in_memory().unwrap(), "Session Cup", config()).unwrap()
    }

    fn flaky_session() -> TournamentSession<FlakyStore> {
        let store = FlakyStore {
            inner: SqliteStore::in_memory().unwrap(),
            fail: Cell::new(false),
        };
        TournamentSession::create(store, "Flaky Cup", config()).unwrap()
    }

    fn start(s: &mut TournamentSession<impl TournamentStore>) {
        let when = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        s.start_with(when, &mut StdRng::seed_from_u64(9)).unwrap();
    }

    fn entry(runs: &str) -> ScoreEntry {
        ScoreEntry::new(runs, "4", "20")
    }

    /// A store backed by a fresh database file under the temp dir.
    fn file_store(name: &str) -> (SqliteStore, PathBuf) {
        let path = std::env::temp_dir().join(format!("crease_{name}_{}.db", uuid::Uuid::new_v4()));
        let db = Database::open(path.to_str().unwrap()).unwrap();
        (SqliteStore::new(Arc::new(db)), path)
    }

    /// Break history writes from outside the store's own connection.
    fn drop_history_table(path: &Path) {
        rusqlite::Connection::open(path)
            .unwrap()
            .execute_batch("DROP TABLE match_history")
            .unwrap();
    }

    fn remove_db(path: &Path) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    #[test]
    fn actions_persist_and_restore() {
        let mut s = session();
        s.add_team("Lions").unwrap();
        s.add_team("Tigers").unwrap();
        s.add_team("Bears").unwrap();
        start(&mut s);

        let m = s.tournament().matches[0].clone();
        s.submit_score(&m.id, &entry("150"), &entry("140"), &m.team1.id)
            .unwrap();

        let store = s.store().clone();
        let restored = TournamentSession::restore(store).unwrap().unwrap();
        let t = restored.tournament();
        assert_eq!(t.teams.len(), 3);
        assert_eq!(t.status, TournamentStatus::Ongoing);
        assert_eq!(t.find_match(&m.id).unwrap().winner().unwrap().id, m.team1.id);
    }

    #[test]
    fn restore_without_document_is_none() {
        let restored = TournamentSession::restore(SqliteStore::in_memory().unwrap()).unwrap();
        assert!(restored.is_none());
    }

    #[test]
    fn submit_score_sanitises_raw_input() {
        let mut s = session();
        s.add_team("Lions").unwrap();
        s.add_team("Tigers").unwrap();
        start(&mut s);

        let m = s.tournament().matches[0].clone();
        let out = s
            .submit_score(
                &m.id,
                &ScoreEntry::new("15x0", "12", "20.7"),
                &ScoreEntry::new("-3", "-1", "-4"),
                &m.team2.id,
            )
            .unwrap();
        let result = out.updated.result.unwrap();
        assert_eq!(result.team1_score.runs, 150);
        assert_eq!(result.team1_score.wickets, 10);
        assert_eq!(result.team1_score.overs.to_string(), "20");
        assert_eq!(result.team2_score.runs, 3);
        assert_eq!(result.team2_score.wickets, 0);
        assert_eq!(result.team2_score.overs.balls(), 0);
    }

    #[test]
    fn league_completion_reports_stage_events() {
        let mut s = session();
        for name in ["Lions", "Tigers", "Bears"] {
            s.add_team(name).unwrap();
        }
        start(&mut s);

        let ids: Vec<_> = s.tournament().matches.iter().map(|m| m.id.clone()).collect();
        let mut last = None;
        for id in &ids {
            let m = s.tournament().find_match(id).unwrap().clone();
            last = Some(
                s.submit_score(id, &entry("160"), &entry("150"), &m.team1.id)
                    .unwrap(),
            );
        }
        let last = last.unwrap();
        assert!(last
            .events
            .iter()
            .any(|e| matches!(e, StageEvent::StageAdvanced { to: Stage::Qualifier, .. })));

        let restored = TournamentSession::restore(s.store().clone()).unwrap().unwrap();
        assert_eq!(restored.tournament().current_stage, Stage::Qualifier);
        assert!(restored
            .tournament()
            .playoff_match(&MatchKind::Qualifier)
            .is_some());
    }

    #[test]
    fn validation_errors_leave_state_untouched() {
        let mut s = session();
        s.add_team("Lions").unwrap();
        let before = s.tournament().clone();
        assert!(matches!(s.add_team("lions"), Err(TournamentError::DuplicateTeamName(_))));
        assert!(matches!(s.start(), Err(TournamentError::NotEnoughTeams { .. })));
        assert_eq!(s.tournament(), &before);
    }

    #[test]
    fn persistence_failure_keeps_memory_unchanged() {
        let mut s = flaky_session();
        s.add_team("Lions").unwrap();
        s.add_team("Tigers").unwrap();

        s.store().fail.set(true);
        let before = s.tournament().clone();
        let err = s.add_team("Bears").unwrap_err();
        assert!(matches!(err, TournamentError::Persistence(_)));
        assert_eq!(s.tournament(), &before);

        let err = s.start().unwrap_err();
        assert!(matches!(err, TournamentError::Persistence(_)));
        assert_eq!(s.tournament().status, TournamentStatus::Upcoming);
        assert!(s.tournament().matches.is_empty());

        s.store().fail.set(false);
        start(&mut s);
        s.store().fail.set(true);
        let m = s.tournament().matches[0].clone();
        assert!(s
            .submit_score(&m.id, &entry("100"), &entry("90"), &m.team1.id)
            .is_err());
        assert!(!s.tournament().find_match(&m.id).unwrap().is_decided());
    }

    #[test]
    fn failed_history_write_keeps_score_out_of_memory_and_storage() {
        let (store, path) = file_store("score");
        let mut s = TournamentSession::create(store, "File Cup", config()).unwrap();
        for name in ["Lions", "Tigers", "Bears"] {
            s.add_team(name).unwrap();
        }
        start(&mut s);
        let m = s.tournament().matches[0].clone();
        drop_history_table(&path);

        let err = s
            .submit_score(&m.id, &entry("150"), &entry("140"), &m.team1.id)
            .unwrap_err();
        assert!(matches!(err, TournamentError::Persistence(_)));
        assert!(!s.tournament().find_match(&m.id).unwrap().is_decided());

        let stored = TournamentSession::restore(s.store().clone()).unwrap().unwrap();
        assert!(!stored.tournament().find_match(&m.id).unwrap().is_decided());
        remove_db(&path);
    }

    #[test]
    fn failed_reset_keeps_stored_tournament() {
        let (store, path) = file_store("reset");
        let mut s = TournamentSession::create(store, "File Cup", config()).unwrap();
        s.add_team("Lions").unwrap();
        s.add_team("Tigers").unwrap();
        let old_id = s.tournament().id.clone();
        drop_history_table(&path);

        assert!(matches!(s.reset(), Err(TournamentError::Persistence(_))));
        assert_eq!(s.tournament().id, old_id);

        let stored = TournamentSession::restore(s.store().clone()).unwrap().unwrap();
        assert_eq!(stored.tournament().id, old_id);
        assert_eq!(stored.tournament().teams.len(), 2);
        remove_db(&path);
    }

    #[test]
    fn huge_scores_for_one_team_do_not_overflow_the_table() {
        let mut s = session();
        for name in ["Lions", "Tigers", "Bears"] {
            s.add_team(name).unwrap();
        }
        start(&mut s);
        let lions = s.tournament().team_by_name("Lions").unwrap().id.clone();
        let theirs: Vec<Match> = s
            .tournament()
            .matches
            .iter()
            .filter(|m| m.involves(&lions))
            .take(2)
            .cloned()
            .collect();

        let big = ScoreEntry::new("4000000000", "2", "20");
        let small = ScoreEntry::new("100", "9", "20");
        for m in &theirs {
            let (t1, t2) = if m.team1.id == lions { (&big, &small) } else { (&small, &big) };
            s.submit_score(&m.id, t1, t2, &lions).unwrap();
        }

        let row = s
            .tournament()
            .points_table
            .iter()
            .find(|r| r.team.id == lions)
            .unwrap();
        assert_eq!(row.runs_scored, 8_000_000_000);
        assert_eq!(row.wins, 2);
    }

    #[test]
    fn reset_starts_an_empty_tournament() {
        let mut s = session();
        s.add_team("Lions").unwrap();
        s.add_team("Tigers").unwrap();
        start(&mut s);
        let old_id = s.tournament().id.clone();

        s.reset().unwrap();
        assert_ne!(s.tournament().id, old_id);
        assert!(s.tournament().teams.is_empty());
        assert_eq!(s.tournament().status, TournamentStatus::Upcoming);

        let restored = TournamentSession::restore(s.store().clone()).unwrap().unwrap();
        assert_eq!(restored.tournament().id, s.tournament().id);
    }
}
