// Round-robin cricket tournament engine: league scheduling, result
// resolution, standings and knockout progression.

pub mod error;
pub mod fixture;
pub mod knockout;
pub mod result;
pub mod schedule;
pub mod score;
pub mod session;
pub mod standings;
pub mod store;
pub mod team;
pub mod tournament;

pub use error::{Result, TournamentError};
pub use fixture::{Match, MatchId, MatchKind, MatchStatus};
pub use knockout::{
    advance_stage, create_playoff_match, create_super_duper_over, rank_for_playoffs, StageEvent,
};
pub use result::{resolve_match, Margin, MatchResult, Outcome, Side};
pub use schedule::{generate_league_schedule, generate_league_schedule_with, ScheduleOptions};
pub use score::{Overs, Score, ScoreEntry};
pub use session::{ScoreOutcome, TournamentSession};
pub use standings::{generate_points_table, FormLetter, TeamStats};
pub use store::{SqliteStore, TournamentStore};
pub use team::{Team, TeamId};
pub use tournament::{Stage, Tournament, TournamentConfig, TournamentStatus};
