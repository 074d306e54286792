// A single fixture and its lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::{MatchResult, Side};
use crate::score::Score;
use crate::team::Team;

pub type MatchId = String;

/// What a fixture is for. Every kind shares the same `Match` fields; only a
/// Super Duper Over carries extra data, the id of the tied match it settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchKind {
    League,
    Qualifier,
    Final,
    SuperDuperOver { parent_match_id: MatchId },
}

impl MatchKind {
    /// Qualifier or final: the matches whose ties go to a Super Duper Over.
    pub fn is_playoff(&self) -> bool {
        matches!(self, MatchKind::Qualifier | MatchKind::Final)
    }

    pub fn is_super_duper_over(&self) -> bool {
        matches!(self, MatchKind::SuperDuperOver { .. })
    }

    pub fn parent_match_id(&self) -> Option<&str> {
        match self {
            MatchKind::SuperDuperOver { parent_match_id } => Some(parent_match_id.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchKind::League => "league",
            MatchKind::Qualifier => "qualifier",
            MatchKind::Final => "final",
            MatchKind::SuperDuperOver { .. } => "super duper over",
        };
        f.write_str(label)
    }
}

/// Derived from the presence and outcome of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Completed,
    Tied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team1: Team,
    pub team2: Team,
    pub kind: MatchKind,
    pub result: Option<MatchResult>,
    pub venue: String,
    pub date: DateTime<Utc>,
}

impl Match {
    pub fn new(
        team1: Team,
        team2: Team,
        kind: MatchKind,
        venue: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Match {
            id: format!("match_{}", Uuid::new_v4().simple()),
            team1,
            team2,
            kind,
            result: None,
            venue: venue.into(),
            date,
        }
    }

    /// `Completed` iff the result is a win, `Tied` iff it is a tie.
    pub fn status(&self) -> MatchStatus {
        match &self.result {
            None => MatchStatus::Scheduled,
            Some(r) if r.is_tie() => MatchStatus::Tied,
            Some(_) => MatchStatus::Completed,
        }
    }

    /// Completed or tied.
    pub fn is_decided(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_tied(&self) -> bool {
        self.status() == MatchStatus::Tied
    }

    pub fn winner(&self) -> Option<&Team> {
        let side = self.result.as_ref()?.winning_side()?;
        Some(self.team(side))
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Team1 => &self.team1,
            Side::Team2 => &self.team2,
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.team1.id == team_id || self.team2.id == team_id
    }

    pub fn side_of(&self, team_id: &str) -> Option<Side> {
        if self.team1.id == team_id {
            Some(Side::Team1)
        } else if self.team2.id == team_id {
            Some(Side::Team2)
        } else {
            None
        }
    }

    /// `(own score, opponent score)` for a participating team.
    pub fn scores_for(&self, team_id: &str) -> Option<(&Score, &Score)> {
        let side = self.side_of(team_id)?;
        let result = self.result.as_ref()?;
        Some((result.score_for(side), result.score_for(side.other())))
    }

    /// Same two teams, regardless of slot order.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.team1.id == a && self.team2.id == b) || (self.team1.id == b && self.team2.id == a)
    }

    pub fn summary(&self) -> Option<String> {
        self.result
            .as_ref()
            .map(|r| r.summary(&self.team1, &self.team2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::resolve_match;
    use crate::score::Overs;

    fn fixture() -> Match {
        Match::new(
            Team::with_id("t1", "Lions"),
            Team::with_id("t2", "Tigers"),
            MatchKind::League,
            "Riverside Oval",
            Utc::now(),
        )
    }

    fn score(runs: u32) -> Score {
        Score::new(runs, 5, Overs::whole(20))
    }

    #[test]
    fn new_match_is_scheduled() {
        let m = fixture();
        assert_eq!(m.status(), MatchStatus::Scheduled);
        assert!(!m.is_decided());
        assert!(m.winner().is_none());
        assert!(m.id.starts_with("match_"));
    }

    #[test]
    fn status_follows_result_outcome() {
        let mut m = fixture();
        m.result = Some(resolve_match(&m.team1, &m.team2, score(100), score(100), Side::Team1));
        assert_eq!(m.status(), MatchStatus::Tied);

        m.result = Some(resolve_match(&m.team1, &m.team2, score(90), score(100), Side::Team1));
        assert_eq!(m.status(), MatchStatus::Completed);
        assert_eq!(m.winner().map(|t| t.id.as_str()), Some("t2"));
    }

    #[test]
    fn scores_for_orients_to_team() {
        let mut m = fixture();
        m.result = Some(resolve_match(&m.team1, &m.team2, score(90), score(100), Side::Team1));
        let (own, opp) = m.scores_for("t2").unwrap();
        assert_eq!(own.runs, 100);
        assert_eq!(opp.runs, 90);
        assert!(m.scores_for("t3").is_none());
    }

    #[test]
    fn is_between_ignores_slot_order() {
        let m = fixture();
        assert!(m.is_between("t2", "t1"));
        assert!(!m.is_between("t1", "t3"));
    }

    #[test]
    fn kind_serializes_with_tag_and_parent() {
        let kind = MatchKind::SuperDuperOver {
            parent_match_id: "match_x".into(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "super_duper_over");
        assert_eq!(json["parent_match_id"], "match_x");
        assert_eq!(kind.parent_match_id(), Some("match_x"));
        assert!(!kind.is_playoff());
        assert!(MatchKind::Final.is_playoff());
    }
}
