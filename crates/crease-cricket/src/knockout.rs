// Knockout progression: playoff seeding, stage transitions and the
// Super Duper Over tie-break chain.

use std::cmp::Ordering;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TournamentError};
use crate::fixture::{Match, MatchId, MatchKind};
use crate::schedule::DEFAULT_VENUE;
use crate::standings::{generate_points_table, TeamStats};
use crate::team::{Team, TeamId};
use crate::tournament::{Stage, Tournament, TournamentStatus};

// ---------------------------------------------------------------------------
// Playoff seeding
// ---------------------------------------------------------------------------

/// Seeding criteria, applied in order until two teams differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankCriterion {
    Points,
    NetRunRate,
    Wins,
    /// League wins against the other teams still level on every earlier
    /// criterion.
    HeadToHead,
}

pub const SEEDING_CASCADE: [RankCriterion; 4] = [
    RankCriterion::Points,
    RankCriterion::NetRunRate,
    RankCriterion::Wins,
    RankCriterion::HeadToHead,
];

type CmpFunc = fn(&TeamStats, &TeamStats) -> Ordering;

fn compare_points(a: &TeamStats, b: &TeamStats) -> Ordering {
    b.points.cmp(&a.points)
}

fn compare_net_run_rate(a: &TeamStats, b: &TeamStats) -> Ordering {
    b.nrr.total_cmp(&a.nrr)
}

fn compare_wins(a: &TeamStats, b: &TeamStats) -> Ordering {
    b.wins.cmp(&a.wins)
}

impl RankCriterion {
    /// Row comparison for the criteria that only need a table row.
    fn compare_fn(self) -> Option<CmpFunc> {
        match self {
            RankCriterion::Points => Some(compare_points),
            RankCriterion::NetRunRate => Some(compare_net_run_rate),
            RankCriterion::Wins => Some(compare_wins),
            RankCriterion::HeadToHead => None,
        }
    }
}

fn compare_by_rows(a: &TeamStats, b: &TeamStats) -> Ordering {
    SEEDING_CASCADE
        .iter()
        .filter_map(|c| c.compare_fn())
        .map(|f| f(a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// League wins of `team_id` over any of `opponents`.
pub fn head_to_head_wins(team_id: &str, opponents: &[&str], matches: &[Match]) -> u32 {
    matches
        .iter()
        .filter(|m| m.kind == MatchKind::League)
        .filter(|m| {
            opponents
                .iter()
                .any(|o| *o != team_id && m.is_between(team_id, o))
        })
        .filter(|m| m.winner().is_some_and(|w| w.id == team_id))
        .count() as u32
}

/// Rank the table for playoff seeding, best first.
///
/// Rows level on points, NRR and wins form a group; the group is ordered by
/// each member's league wins against the rest of the group. Remaining ties
/// keep table order.
pub fn rank_for_playoffs(table: &[TeamStats], matches: &[Match]) -> Vec<TeamStats> {
    let mut ranked = table.to_vec();
    ranked.sort_by(compare_by_rows);

    let mut start = 0;
    while start < ranked.len() {
        let mut end = start + 1;
        while end < ranked.len() && compare_by_rows(&ranked[start], &ranked[end]).is_eq() {
            end += 1;
        }
        if end - start > 1 {
            let group: Vec<TeamId> = ranked[start..end].iter().map(|s| s.team.id.clone()).collect();
            let group_refs: Vec<&str> = group.iter().map(String::as_str).collect();
            ranked[start..end].sort_by_key(|s| {
                std::cmp::Reverse(head_to_head_wins(&s.team.id, &group_refs, matches))
            });
        }
        start = end;
    }
    ranked
}

// ---------------------------------------------------------------------------
// Stage transitions
// ---------------------------------------------------------------------------

/// Something `advance_stage` changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    SeedsFrozen { seeds: Vec<TeamId> },
    StageAdvanced { from: Stage, to: Stage },
    PlayoffCreated { kind: MatchKind, match_id: MatchId },
    /// A due playoff could not be created; the stage stays where it is.
    PlayoffRejected { kind: MatchKind, reason: String },
    TournamentCompleted,
}

impl Tournament {
    /// Apply every stage transition the current match state allows.
    ///
    /// - league -> qualifier once every league match is decided; seeds 2 and 3
    ///   meet in the qualifier. With two teams the qualifier is skipped and
    ///   the league goes straight to a final.
    /// - qualifier -> final once the qualifier is decided, tied or not.
    /// - the final is created once the qualifier has an effective winner.
    /// - the tournament completes once the final is decided.
    pub fn advance_stage(&mut self) -> Vec<StageEvent> {
        let mut events = Vec::new();
        if self.status != TournamentStatus::Ongoing {
            return events;
        }

        loop {
            let before = events.len();
            match self.current_stage {
                Stage::League => self.close_league(&mut events),
                Stage::Qualifier => {
                    if self
                        .playoff_match(&MatchKind::Qualifier)
                        .is_some_and(Match::is_decided)
                    {
                        self.move_to(Stage::Final, &mut events);
                    }
                }
                Stage::Final => {
                    if self.playoff_match(&MatchKind::Final).is_none() {
                        self.open_final(&mut events);
                    } else if self
                        .playoff_match(&MatchKind::Final)
                        .is_some_and(Match::is_decided)
                    {
                        self.status = TournamentStatus::Completed;
                        info!("Tournament '{}' completed", self.name);
                        events.push(StageEvent::TournamentCompleted);
                    }
                }
            }
            let rejected = events[before..]
                .iter()
                .any(|e| matches!(e, StageEvent::PlayoffRejected { .. }));
            if rejected || events.len() == before || self.status != TournamentStatus::Ongoing {
                break;
            }
        }
        events
    }

    fn close_league(&mut self, events: &mut Vec<StageEvent>) {
        if self.matches.is_empty() || !self.league_complete() {
            return;
        }
        let table = generate_points_table(&self.teams, &self.matches);
        let seeds: Vec<TeamId> = rank_for_playoffs(&table, &self.matches)
            .into_iter()
            .map(|s| s.team.id)
            .collect();
        let has_qualifier = seeds.len() >= 3;
        if has_qualifier && !self.push_playoff(&seeds[1], &seeds[2], MatchKind::Qualifier, events)
        {
            return;
        }

        info!("League complete, playoff seeds: {:?}", seeds);
        self.playoff_seeds = Some(seeds.clone());
        events.push(StageEvent::SeedsFrozen { seeds });
        let next = if has_qualifier { Stage::Qualifier } else { Stage::Final };
        self.move_to(next, events);
    }

    fn open_final(&mut self, events: &mut Vec<StageEvent>) {
        let Some(seeds) = self.playoff_seeds.clone() else {
            return;
        };
        let challenger = if seeds.len() >= 3 {
            let Some(qualifier) = self.playoff_match(&MatchKind::Qualifier) else {
                return;
            };
            match self.effective_winner(&qualifier.id) {
                Some(winner) => winner.id.clone(),
                None => return,
            }
        } else {
            match seeds.get(1) {
                Some(second) => second.clone(),
                None => return,
            }
        };
        self.push_playoff(&seeds[0], &challenger, MatchKind::Final, events);
    }

    /// Create and append a playoff, reporting the outcome as an event.
    /// Returns whether the match was created.
    fn push_playoff(
        &mut self,
        team1: &str,
        team2: &str,
        kind: MatchKind,
        events: &mut Vec<StageEvent>,
    ) -> bool {
        let created = match (self.team(team1).cloned(), self.team(team2).cloned()) {
            (Some(t1), Some(t2)) => create_playoff_match(self, &t1, &t2, kind.clone()),
            (None, _) => Err(TournamentError::UnknownTeam(team1.to_string())),
            (_, None) => Err(TournamentError::UnknownTeam(team2.to_string())),
        };
        match created {
            Ok(m) => {
                info!("{} created: {} v {}", kind, m.team1.name, m.team2.name);
                events.push(StageEvent::PlayoffCreated {
                    kind,
                    match_id: m.id.clone(),
                });
                self.matches.push(m);
                true
            }
            Err(e) => {
                warn!("Could not create {}: {}", kind, e);
                events.push(StageEvent::PlayoffRejected {
                    kind,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    fn move_to(&mut self, stage: Stage, events: &mut Vec<StageEvent>) {
        info!("Stage {} -> {}", self.current_stage, stage);
        events.push(StageEvent::StageAdvanced {
            from: self.current_stage,
            to: stage,
        });
        self.current_stage = stage;
    }

    /// Create and append the next Super Duper Over for a tied knockout match.
    pub fn add_super_duper_over(&mut self, parent_match_id: &str) -> Result<Match> {
        let parent = self.require_match(parent_match_id)?;
        if self.super_duper_over_of(&parent.id).is_some() {
            return Err(TournamentError::TieBreakExists(parent.id.clone()));
        }
        let sdo = create_super_duper_over(parent)?;
        info!(
            "Super Duper Over {} created for tied match {}",
            sdo.id, parent.id
        );
        self.matches.push(sdo.clone());
        Ok(sdo)
    }
}

/// Pure form of `Tournament::advance_stage`.
pub fn advance_stage(mut tournament: Tournament) -> Tournament {
    tournament.advance_stage();
    tournament
}

// ---------------------------------------------------------------------------
// Match construction
// ---------------------------------------------------------------------------

/// Build a qualifier or final between two registered teams.
///
/// A qualifier needs every league match decided. A final needs the league
/// decided and, when the tournament has a qualifier round, a qualifier with
/// an effective winner. Neither may already exist.
pub fn create_playoff_match(
    tournament: &Tournament,
    team1: &Team,
    team2: &Team,
    kind: MatchKind,
) -> Result<Match> {
    if !kind.is_playoff() {
        return Err(TournamentError::NotAPlayoffKind(kind));
    }
    if tournament.status == TournamentStatus::Upcoming {
        return Err(TournamentError::NotStarted);
    }
    for team in [team1, team2] {
        if tournament.team(&team.id).is_none() {
            return Err(TournamentError::UnknownTeam(team.id.clone()));
        }
    }
    if tournament.playoff_match(&kind).is_some() {
        return Err(TournamentError::PlayoffExists(kind));
    }
    if !tournament.league_complete() {
        return Err(TournamentError::LeagueIncomplete);
    }
    if kind == MatchKind::Final && tournament.teams.len() >= 3 {
        let decided = tournament
            .playoff_match(&MatchKind::Qualifier)
            .and_then(|q| tournament.effective_winner(&q.id))
            .is_some();
        if !decided {
            return Err(TournamentError::QualifierUndecided);
        }
    }

    let venue = tournament
        .config
        .venues
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_VENUE);
    Ok(Match::new(
        team1.clone(),
        team2.clone(),
        kind,
        venue,
        playoff_date(tournament),
    ))
}

/// The day after the last scheduled fixture (plus the configured gap), in
/// the evening slot.
fn playoff_date(tournament: &Tournament) -> DateTime<Utc> {
    let latest = tournament
        .matches
        .iter()
        .map(|m| m.date)
        .max()
        .unwrap_or_else(Utc::now);
    let day = latest.date_naive() + Days::new(u64::from(tournament.config.playoff_gap_days));
    let time = NaiveTime::from_hms_opt(tournament.config.second_match_hour, 0, 0)
        .unwrap_or(NaiveTime::MIN);
    day.and_time(time).and_utc()
}

/// Build the tie-break for a tied qualifier, final or Super Duper Over.
///
/// Same teams, venue and date as the parent; league ties stand and are
/// rejected.
pub fn create_super_duper_over(parent: &Match) -> Result<Match> {
    if parent.kind == MatchKind::League {
        return Err(TournamentError::NotKnockout(parent.id.clone()));
    }
    if !parent.is_tied() {
        return Err(TournamentError::NotTied(parent.id.clone()));
    }
    Ok(Match::new(
        parent.team1.clone(),
        parent.team2.clone(),
        MatchKind::SuperDuperOver {
            parent_match_id: parent.id.clone(),
        },
        parent.venue.clone(),
        parent.date,
    ))
}
