// Error taxonomy for tournament operations.

use thiserror::Error;

use crate::fixture::{MatchId, MatchKind};
use crate::team::TeamId;

/// Every rejected action surfaces as one of these; nothing is silently dropped.
#[derive(Debug, Error)]
pub enum TournamentError {
    // --- validation -------------------------------------------------------
    #[error("team name must not be empty")]
    EmptyTeamName,

    #[error("a team named '{0}' already exists")]
    DuplicateTeamName(String),

    #[error("need at least {needed} teams to start, have {have}")]
    NotEnoughTeams { needed: usize, have: usize },

    #[error("matches per team pair must be between 1 and 5, got {0}")]
    InvalidMatchesPerPair(u32),

    #[error("unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("unknown match: {0}")]
    UnknownMatch(MatchId),

    #[error("team {team} is not playing in match {match_id}")]
    InvalidBattingSide { match_id: MatchId, team: TeamId },

    // --- lifecycle state --------------------------------------------------
    #[error("the team roster is frozen once the tournament has started")]
    RosterFrozen,

    #[error("the tournament has not started yet")]
    NotStarted,

    #[error("the tournament has already started")]
    AlreadyStarted,

    #[error("match {0} can no longer be rescored: a later match depends on its result")]
    MatchLocked(MatchId),

    // --- knockout preconditions -------------------------------------------
    #[error("all league matches must be decided first")]
    LeagueIncomplete,

    #[error("the qualifier has no decisive winner yet")]
    QualifierUndecided,

    #[error("a {0} match already exists")]
    PlayoffExists(MatchKind),

    #[error("{0} is not a playoff match type")]
    NotAPlayoffKind(MatchKind),

    #[error("match {0} is not tied")]
    NotTied(MatchId),

    #[error("match {0} is a league match; league ties stand")]
    NotKnockout(MatchId),

    #[error("match {0} already has a Super Duper Over")]
    TieBreakExists(MatchId),

    // --- collaborator -----------------------------------------------------
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl TournamentError {
    /// True for rejections caused by the knockout state machine's
    /// preconditions rather than bad input or storage failures.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TournamentError::LeagueIncomplete
                | TournamentError::QualifierUndecided
                | TournamentError::PlayoffExists(_)
                | TournamentError::NotAPlayoffKind(_)
                | TournamentError::NotTied(_)
                | TournamentError::NotKnockout(_)
                | TournamentError::TieBreakExists(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TournamentError>;
