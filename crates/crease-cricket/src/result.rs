// Match result resolution: outcome, winner and margin of victory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::score::{Score, MAX_WICKETS};
use crate::team::{Team, TeamId};

/// Which slot of a fixture a team occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Tie,
}

/// Margin of victory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Margin {
    /// Winner batted first and defended by this many runs.
    Runs(u32),
    /// Winner chased with this many wickets in hand.
    Wickets(u8),
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Margin::Runs(1) => write!(f, "1 run"),
            Margin::Runs(n) => write!(f, "{n} runs"),
            Margin::Wickets(1) => write!(f, "1 wicket"),
            Margin::Wickets(n) => write!(f, "{n} wickets"),
        }
    }
}

/// The recorded result of a played match. Replaced wholesale on rescoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// `None` exactly when `outcome` is `Tie`.
    pub winner: Option<TeamId>,
    pub team1_score: Score,
    pub team2_score: Score,
    pub outcome: Outcome,
    pub batting_first: Side,
    pub margin: Option<Margin>,
}

impl MatchResult {
    pub fn is_tie(&self) -> bool {
        self.outcome == Outcome::Tie
    }

    pub fn score_for(&self, side: Side) -> &Score {
        match side {
            Side::Team1 => &self.team1_score,
            Side::Team2 => &self.team2_score,
        }
    }

    /// Slot of the winning team, if any.
    pub fn winning_side(&self) -> Option<Side> {
        if self.is_tie() {
            return None;
        }
        if self.team1_score.runs > self.team2_score.runs {
            Some(Side::Team1)
        } else {
            Some(Side::Team2)
        }
    }

    /// Human-readable summary, e.g. "Lions won by 10 runs".
    pub fn summary(&self, team1: &Team, team2: &Team) -> String {
        match (self.winning_side(), self.margin) {
            (None, _) => "Match tied".to_string(),
            (Some(side), margin) => {
                let name = match side {
                    Side::Team1 => &team1.name,
                    Side::Team2 => &team2.name,
                };
                match margin {
                    Some(m) => format!("{name} won by {m}"),
                    None => format!("{name} won"),
                }
            }
        }
    }
}

/// Resolve a match from both innings totals.
///
/// Equal runs is a tie with no winner. Otherwise the side with more runs
/// wins; the margin is a run difference when the winner batted first and
/// `10 - wickets lost` when the winner chased.
pub fn resolve_match(
    team1: &Team,
    team2: &Team,
    team1_score: Score,
    team2_score: Score,
    batting_first: Side,
) -> MatchResult {
    if team1_score.runs == team2_score.runs {
        return MatchResult {
            winner: None,
            team1_score,
            team2_score,
            outcome: Outcome::Tie,
            batting_first,
            margin: None,
        };
    }

    let (winner_side, winner, winner_score, loser_score) = if team1_score.runs > team2_score.runs {
        (Side::Team1, team1, &team1_score, &team2_score)
    } else {
        (Side::Team2, team2, &team2_score, &team1_score)
    };

    let margin = if winner_side == batting_first {
        Margin::Runs(winner_score.runs - loser_score.runs)
    } else {
        Margin::Wickets(MAX_WICKETS.saturating_sub(winner_score.wickets))
    };

    MatchResult {
        winner: Some(winner.id.clone()),
        team1_score,
        team2_score,
        outcome: Outcome::Win,
        batting_first,
        margin: Some(margin),
    }
}
