// Persistence collaborator for the tournament aggregate.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crease_core::db::{Database, HistoryEntry, NewHistoryEntry};

use crate::fixture::Match;
use crate::team::Team;
use crate::tournament::Tournament;

/// Document key under which the active tournament is stored.
pub const TOURNAMENT_KEY: &str = "current_tournament";

/// Where a tournament lives between invocations. Every call either fully
/// succeeds or leaves the stored document as it was.
pub trait TournamentStore {
    fn load_tournament(&self) -> Result<Option<Tournament>>;

    /// Overwrite the whole stored document.
    fn persist_tournament(&self, tournament: &Tournament) -> Result<()>;

    fn persist_team_added(&self, tournament_id: &str, team: &Team) -> Result<()>;

    fn persist_team_removed(&self, tournament_id: &str, team_id: &str) -> Result<()>;

    /// Insert or replace one match in the stored document and record it in
    /// the match history.
    fn persist_match_update(&self, tournament_id: &str, m: &Match) -> Result<()>;

    /// Forget the stored tournament and its history, keeping `fresh` in its
    /// place.
    fn reset_tournament(&self, fresh: &Tournament) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        SqliteStore { db }
    }

    /// In-memory store, for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open(":memory:")?)))
    }

    /// Snapshots written by `persist_match_update`, oldest first.
    pub fn match_history(&self, tournament_id: &str) -> Result<Vec<HistoryEntry>> {
        self.db.load_match_history(tournament_id)
    }

    /// Patch the stored tournament in one transaction. The points table is
    /// re-derived after the patch.
    fn patch<F>(&self, tournament_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Tournament) -> Result<()>,
    {
        self.db
            .update_document(TOURNAMENT_KEY, |value| rewrite(value, tournament_id, apply))
    }
}

/// Apply `apply` to a stored tournament document in place.
fn rewrite<F>(value: &mut serde_json::Value, tournament_id: &str, apply: F) -> Result<()>
where
    F: FnOnce(&mut Tournament) -> Result<()>,
{
    let mut tournament: Tournament = serde_json::from_value(value.take())
        .context("stored tournament document is malformed")?;
    if tournament.id != tournament_id {
        bail!(
            "stored tournament is {}, not {}",
            tournament.id,
            tournament_id
        );
    }
    apply(&mut tournament)?;
    tournament.refresh_points_table();
    *value = serde_json::to_value(&tournament).context("failed to serialize tournament")?;
    Ok(())
}

impl TournamentStore for SqliteStore {
    fn load_tournament(&self) -> Result<Option<Tournament>> {
        let Some(value) = self.db.load_document(TOURNAMENT_KEY)? else {
            return Ok(None);
        };
        let mut tournament: Tournament =
            serde_json::from_value(value).context("stored tournament document is malformed")?;
        tournament.refresh_points_table();
        Ok(Some(tournament))
    }

    fn persist_tournament(&self, tournament: &Tournament) -> Result<()> {
        let value = serde_json::to_value(tournament).context("failed to serialize tournament")?;
        self.db.save_document(TOURNAMENT_KEY, &value)?;
        debug!("Persisted tournament {}", tournament.id);
        Ok(())
    }

    fn persist_team_added(&self, tournament_id: &str, team: &Team) -> Result<()> {
        self.patch(tournament_id, |t| {
            if t.teams.iter().all(|existing| existing.id != team.id) {
                t.teams.push(team.clone());
            }
            Ok(())
        })
    }

    fn persist_team_removed(&self, tournament_id: &str, team_id: &str) -> Result<()> {
        self.patch(tournament_id, |t| {
            t.teams.retain(|existing| existing.id != team_id);
            Ok(())
        })
    }

    fn persist_match_update(&self, tournament_id: &str, m: &Match) -> Result<()> {
        let body = serde_json::to_value(m).context("failed to serialize match")?;
        let entry = NewHistoryEntry {
            tournament_id,
            match_id: &m.id,
            body: &body,
        };
        self.db
            .update_document_with_history(TOURNAMENT_KEY, &entry, |value| {
                rewrite(value, tournament_id, |t| {
                    match t.matches.iter_mut().find(|existing| existing.id == m.id) {
                        Some(existing) => *existing = m.clone(),
                        None => t.matches.push(m.clone()),
                    }
                    Ok(())
                })
            })?;
        debug!("Persisted match {} for {}", m.id, tournament_id);
        Ok(())
    }

    fn reset_tournament(&self, fresh: &Tournament) -> Result<()> {
        let value = serde_json::to_value(fresh).context("failed to serialize tournament")?;
        self.db.replace_all(TOURNAMENT_KEY, &value)?;
        debug!("Stored fresh tournament {}", fresh.id);
        Ok(())
    }
}
