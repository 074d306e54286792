// Tournament aggregate: roster, fixtures, lifecycle and derived standings.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crease_core::config::Config;

use crate::error::{Result, TournamentError};
use crate::fixture::{Match, MatchId, MatchKind};
use crate::knockout::StageEvent;
use crate::result::resolve_match;
use crate::schedule::{generate_league_schedule_with, ScheduleOptions};
use crate::score::Score;
use crate::standings::{generate_points_table, TeamStats};
use crate::team::{Team, TeamId};

pub const MIN_TEAMS: usize = 2;
pub const MAX_MATCHES_PER_TEAM_PAIR: u32 = 5;

// ---------------------------------------------------------------------------
// Lifecycle enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Upcoming,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    League,
    Qualifier,
    Final,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Stage::League => "league",
            Stage::Qualifier => "qualifier",
            Stage::Final => "final",
        };
        f.write_str(label)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Per-tournament settings
// ---------------------------------------------------------------------------

/// Rules frozen into a tournament when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub matches_per_team_pair: u32,
    pub overs_per_innings: u32,
    pub super_over_overs: u32,
    #[serde(default)]
    pub venues: Vec<String>,
    pub first_match_hour: u32,
    pub second_match_hour: u32,
    pub playoff_gap_days: u32,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            matches_per_team_pair: 2,
            overs_per_innings: 20,
            super_over_overs: 2,
            venues: Vec::new(),
            first_match_hour: 14,
            second_match_hour: 19,
            playoff_gap_days: 1,
        }
    }
}

impl From<&Config> for TournamentConfig {
    fn from(config: &Config) -> Self {
        TournamentConfig {
            matches_per_team_pair: config.tournament.matches_per_team_pair,
            overs_per_innings: config.tournament.overs_per_innings,
            super_over_overs: config.tournament.super_over_overs,
            venues: config.tournament.venues.clone(),
            first_match_hour: config.schedule.first_match_hour,
            second_match_hour: config.schedule.second_match_hour,
            playoff_gap_days: config.schedule.playoff_gap_days,
        }
    }
}

impl TournamentConfig {
    pub fn schedule_options(&self, start: DateTime<Utc>) -> ScheduleOptions {
        ScheduleOptions {
            start,
            first_match_hour: self.first_match_hour,
            second_match_hour: self.second_match_hour,
            venues: self.venues.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub status: TournamentStatus,
    pub current_stage: Stage,
    /// Derived from `teams` and `matches`; rebuilt on every change.
    #[serde(default)]
    pub points_table: Vec<TeamStats>,
    pub config: TournamentConfig,
    /// League ranking frozen when the league completes, best first.
    #[serde(default)]
    pub playoff_seeds: Option<Vec<TeamId>>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, config: TournamentConfig) -> Result<Self> {
        if !(1..=MAX_MATCHES_PER_TEAM_PAIR).contains(&config.matches_per_team_pair) {
            return Err(TournamentError::InvalidMatchesPerPair(
                config.matches_per_team_pair,
            ));
        }
        Ok(Tournament {
            id: format!("tournament_{}", Uuid::new_v4().simple()),
            name: name.into(),
            teams: Vec::new(),
            matches: Vec::new(),
            status: TournamentStatus::Upcoming,
            current_stage: Stage::League,
            points_table: Vec::new(),
            config,
            playoff_seeds: None,
            created_at: Utc::now(),
        })
    }

    // -- roster -------------------------------------------------------------

    /// Register a team. Names are trimmed and must be unique ignoring case.
    pub fn add_team(&mut self, name: &str) -> Result<Team> {
        if self.status != TournamentStatus::Upcoming {
            return Err(TournamentError::RosterFrozen);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(TournamentError::EmptyTeamName);
        }
        if self
            .teams
            .iter()
            .any(|t| t.name.to_lowercase() == name.to_lowercase())
        {
            return Err(TournamentError::DuplicateTeamName(name.to_string()));
        }

        let team = Team::new(name);
        self.teams.push(team.clone());
        self.refresh_points_table();
        debug!("Team '{}' registered as {}", team.name, team.id);
        Ok(team)
    }

    pub fn remove_team(&mut self, team_id: &str) -> Result<Team> {
        if self.status != TournamentStatus::Upcoming {
            return Err(TournamentError::RosterFrozen);
        }
        let index = self
            .teams
            .iter()
            .position(|t| t.id == team_id)
            .ok_or_else(|| TournamentError::UnknownTeam(team_id.to_string()))?;
        let team = self.teams.remove(index);
        self.refresh_points_table();
        Ok(team)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Generate the league schedule from now and open the tournament.
    pub fn start(&mut self) -> Result<()> {
        self.start_with(Utc::now(), &mut rand::thread_rng())
    }

    pub fn start_with<R: Rng + ?Sized>(&mut self, start: DateTime<Utc>, rng: &mut R) -> Result<()> {
        if self.status != TournamentStatus::Upcoming {
            return Err(TournamentError::AlreadyStarted);
        }
        if self.teams.len() < MIN_TEAMS {
            return Err(TournamentError::NotEnoughTeams {
                needed: MIN_TEAMS,
                have: self.teams.len(),
            });
        }

        let options = self.config.schedule_options(start);
        self.matches = generate_league_schedule_with(
            &self.teams,
            self.config.matches_per_team_pair,
            &options,
            rng,
        );
        self.status = TournamentStatus::Ongoing;
        self.current_stage = Stage::League;
        self.playoff_seeds = None;
        self.refresh_points_table();
        info!(
            "Tournament '{}' started: {} teams, {} league fixtures",
            self.name,
            self.teams.len(),
            self.matches.len()
        );
        Ok(())
    }

    /// Record (or replace) a match result, then re-derive standings and apply
    /// any stage transition it unlocks.
    pub fn record_score(
        &mut self,
        match_id: &str,
        team1_score: Score,
        team2_score: Score,
        batting_first: &str,
    ) -> Result<Vec<StageEvent>> {
        if self.status == TournamentStatus::Upcoming {
            return Err(TournamentError::NotStarted);
        }
        let m = self.require_match(match_id)?;
        if self.is_locked(m) {
            return Err(TournamentError::MatchLocked(m.id.clone()));
        }
        let side = m
            .side_of(batting_first)
            .ok_or_else(|| TournamentError::InvalidBattingSide {
                match_id: m.id.clone(),
                team: batting_first.to_string(),
            })?;

        let cap = self.overs_cap_for(m);
        let result = resolve_match(
            &m.team1,
            &m.team2,
            team1_score.capped(cap),
            team2_score.capped(cap),
            side,
        );

        let index = self.match_index(match_id)?;
        let m = &mut self.matches[index];
        debug!(
            "Result for {} ({} v {}): {}",
            m.id,
            m.team1.name,
            m.team2.name,
            result.summary(&m.team1, &m.team2)
        );
        m.result = Some(result);

        self.refresh_points_table();
        Ok(self.advance_stage())
    }

    /// A decided match is frozen once a later match depends on its result.
    pub fn is_locked(&self, m: &Match) -> bool {
        if m.kind == MatchKind::League {
            return self.current_stage != Stage::League;
        }
        if self.super_duper_over_of(&m.id).is_some() {
            return true;
        }
        self.playoff_match(&MatchKind::Final).is_some()
            && self.chain_root(m).kind == MatchKind::Qualifier
    }

    pub fn refresh_points_table(&mut self) {
        self.points_table = generate_points_table(&self.teams, &self.matches);
    }

    // -- lookups ------------------------------------------------------------

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// Case-insensitive lookup by team name.
    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        let wanted = name.trim().to_lowercase();
        self.teams.iter().find(|t| t.name.to_lowercase() == wanted)
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn require_match(&self, match_id: &str) -> Result<&Match> {
        self.find_match(match_id)
            .ok_or_else(|| TournamentError::UnknownMatch(match_id.to_string()))
    }

    fn match_index(&self, match_id: &str) -> Result<usize> {
        self.matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or_else(|| TournamentError::UnknownMatch(match_id.to_string()))
    }

    /// The qualifier or final, if created.
    pub fn playoff_match(&self, kind: &MatchKind) -> Option<&Match> {
        self.matches.iter().find(|m| &m.kind == kind)
    }

    pub fn league_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.kind == MatchKind::League)
    }

    pub fn league_complete(&self) -> bool {
        self.league_matches().all(Match::is_decided)
    }

    /// Over cap for score entry on `m`.
    pub fn overs_cap_for(&self, m: &Match) -> u32 {
        if m.kind.is_super_duper_over() {
            self.config.super_over_overs
        } else {
            self.config.overs_per_innings
        }
    }

    // -- tie-break chains ---------------------------------------------------

    /// The Super Duper Over created to settle `match_id`, if any.
    pub fn super_duper_over_of(&self, match_id: &str) -> Option<&Match> {
        self.matches
            .iter()
            .find(|m| m.kind.parent_match_id() == Some(match_id))
    }

    /// The qualifier or final a Super Duper Over ultimately settles.
    pub fn chain_root<'a>(&'a self, m: &'a Match) -> &'a Match {
        let mut current = m;
        while let Some(parent) = current
            .kind
            .parent_match_id()
            .and_then(|id| self.find_match(id))
        {
            current = parent;
        }
        current
    }

    /// Newest link of the tie-break chain starting at `match_id`.
    pub fn chain_tail(&self, match_id: &str) -> Result<&Match> {
        let mut current = self.require_match(match_id)?;
        while let Some(child) = self.super_duper_over_of(&current.id) {
            current = child;
        }
        Ok(current)
    }

    /// Winner of a match once its tie-break chain, if any, is decisive.
    pub fn effective_winner(&self, match_id: &str) -> Option<&Team> {
        let m = self.find_match(match_id)?;
        if m.is_tied() {
            let next = self.super_duper_over_of(&m.id)?;
            return self.effective_winner(&next.id);
        }
        m.winner()
    }

    pub fn champion(&self) -> Option<&Team> {
        let final_match = self.playoff_match(&MatchKind::Final)?;
        self.effective_winner(&final_match.id)
    }

    // -- views --------------------------------------------------------------

    pub fn upcoming_matches(&self) -> Vec<&Match> {
        let mut upcoming: Vec<&Match> = self.matches.iter().filter(|m| !m.is_decided()).collect();
        upcoming.sort_by(|a, b| a.date.cmp(&b.date));
        upcoming
    }

    /// Decided matches, newest first.
    pub fn completed_matches(&self) -> Vec<&Match> {
        let mut done: Vec<&Match> = self.matches.iter().filter(|m| m.is_decided()).collect();
        done.sort_by(|a, b| b.date.cmp(&a.date));
        done
    }

    /// Position of a match in fixture order, 1-based.
    pub fn fixture_number(&self, match_id: &MatchId) -> Option<usize> {
        self.matches.iter().position(|m| &m.id == match_id).map(|i| i + 1)
    }
}
