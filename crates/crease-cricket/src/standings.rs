// Points table derivation.
//
// The table is a pure function of the team list and the match list. It is
// rebuilt from scratch on every change and never patched in place.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixture::{Match, MatchStatus};
use crate::score::Overs;
use crate::team::Team;

pub const POINTS_FOR_WIN: u32 = 2;
pub const POINTS_FOR_TIE: u32 = 1;

/// How many recent results `last_five` keeps.
pub const FORM_LENGTH: usize = 5;

/// One letter of a team's recent form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormLetter {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "T")]
    Tie,
}

impl fmt::Display for FormLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            FormLetter::Win => "W",
            FormLetter::Loss => "L",
            FormLetter::Tie => "T",
        };
        f.write_str(c)
    }
}

/// A row of the points table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team: Team,
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points: u32,
    /// Net run rate at full precision; see `nrr_display`.
    pub nrr: f64,
    /// Oldest of the recent results first.
    pub last_five: Vec<FormLetter>,
    /// Run totals are wider than a single score so they cannot overflow.
    pub runs_scored: u64,
    pub runs_conceded: u64,
    pub overs_played: Overs,
    pub overs_bowled: Overs,
}

impl TeamStats {
    fn empty(team: &Team) -> Self {
        TeamStats {
            team: team.clone(),
            matches: 0,
            wins: 0,
            losses: 0,
            ties: 0,
            points: 0,
            nrr: 0.0,
            last_five: Vec::new(),
            runs_scored: 0,
            runs_conceded: 0,
            overs_played: Overs::default(),
            overs_bowled: Overs::default(),
        }
    }

    /// NRR rounded to three decimals with an explicit sign, e.g. `+0.500`.
    pub fn nrr_display(&self) -> String {
        let rounded = round3(self.nrr);
        // avoid "-0.000"
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        format!("{rounded:+.3}")
    }

    /// Recent form as a compact string such as `WWLTW`.
    pub fn form(&self) -> String {
        self.last_five.iter().map(ToString::to_string).collect()
    }
}

/// Whether a match feeds the points table: decided, and not a tie-break.
pub fn counts_toward_standings(m: &Match) -> bool {
    m.is_decided() && !m.kind.is_super_duper_over()
}

/// `runs_scored / overs_played - runs_conceded / overs_bowled`, or 0 unless
/// both over totals are positive.
pub fn net_run_rate(
    runs_scored: u64,
    overs_played: Overs,
    runs_conceded: u64,
    overs_bowled: Overs,
) -> f64 {
    if overs_played.balls() == 0 || overs_bowled.balls() == 0 {
        return 0.0;
    }
    runs_scored as f64 / overs_played.as_fraction()
        - runs_conceded as f64 / overs_bowled.as_fraction()
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Table order: points descending, then NRR descending. Equal rows keep
/// their input order.
pub fn compare_standings(a: &TeamStats, b: &TeamStats) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.nrr.total_cmp(&a.nrr))
}

/// Build the points table for `teams` from the full match history.
pub fn generate_points_table(teams: &[Team], matches: &[Match]) -> Vec<TeamStats> {
    let counted: Vec<&Match> = matches.iter().filter(|m| counts_toward_standings(m)).collect();

    let mut table: Vec<TeamStats> = teams
        .iter()
        .map(|team| {
            let mut stats = TeamStats::empty(team);
            let mut played: Vec<&Match> = Vec::new();

            for m in counted.iter().copied().filter(|m| m.involves(&team.id)) {
                let Some((own, opp)) = m.scores_for(&team.id) else {
                    continue;
                };
                stats.matches += 1;
                stats.runs_scored += u64::from(own.runs);
                stats.runs_conceded += u64::from(opp.runs);
                stats.overs_played += own.overs;
                stats.overs_bowled += opp.overs;

                match form_letter(m, team) {
                    FormLetter::Win => {
                        stats.wins += 1;
                        stats.points += POINTS_FOR_WIN;
                    }
                    FormLetter::Tie => {
                        stats.ties += 1;
                        stats.points += POINTS_FOR_TIE;
                    }
                    FormLetter::Loss => stats.losses += 1,
                }
                played.push(m);
            }

            stats.nrr = net_run_rate(
                stats.runs_scored,
                stats.overs_played,
                stats.runs_conceded,
                stats.overs_bowled,
            );
            stats.last_five = recent_form(&played, team);
            stats
        })
        .collect();

    table.sort_by(compare_standings);
    table
}

fn form_letter(m: &Match, team: &Team) -> FormLetter {
    match m.status() {
        MatchStatus::Tied => FormLetter::Tie,
        _ if m.winner().is_some_and(|w| w.id == team.id) => FormLetter::Win,
        _ => FormLetter::Loss,
    }
}

/// Newest `FORM_LENGTH` matches, reported oldest first.
fn recent_form(played: &[&Match], team: &Team) -> Vec<FormLetter> {
    let mut newest_first: Vec<&Match> = played.to_vec();
    newest_first.sort_by(|a, b| b.date.cmp(&a.date));
    newest_first.truncate(FORM_LENGTH);
    newest_first
        .iter()
        .rev()
        .map(|m| form_letter(m, team))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MatchKind;
    use crate::result::{resolve_match, Side};
    use crate::score::Score;
    use chrono::{Duration, TimeZone, Utc};

    fn teams() -> Vec<Team> {
        vec![
            Team::with_id("a", "Alpha"),
            Team::with_id("b", "Bravo"),
            Team::with_id("c", "Charlie"),
        ]
    }

    fn fixture(t1: &Team, t2: &Team, kind: MatchKind, day: i64) -> Match {
        let base = Utc.with_ymd_and_hms(2026, 4, 1, 14, 0, 0).unwrap();
        Match::new(t1.clone(), t2.clone(), kind, "Oval", base + Duration::days(day))
    }

    fn play(m: &mut Match, r1: u32, r2: u32) {
        let s1 = Score::new(r1, 5, Overs::whole(20));
        let s2 = Score::new(r2, 5, Overs::whole(20));
        m.result = Some(resolve_match(&m.team1, &m.team2, s1, s2, Side::Team1));
    }

    fn row<'a>(table: &'a [TeamStats], id: &str) -> &'a TeamStats {
        table.iter().find(|s| s.team.id == id).unwrap()
    }

    #[test]
    fn one_decisive_result_among_three_teams() {
        let t = teams();
        let mut ab = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut ab, 150, 140);
        let bc = fixture(&t[1], &t[2], MatchKind::League, 1);
        let ca = fixture(&t[2], &t[0], MatchKind::League, 2);

        let table = generate_points_table(&t, &[ab, bc, ca]);
        let a = row(&table, "a");
        assert_eq!((a.matches, a.wins, a.points), (1, 1, 2));
        assert!(a.nrr > 0.0);
        let b = row(&table, "b");
        assert_eq!((b.matches, b.losses, b.points), (1, 1, 0));
        assert!(b.nrr < 0.0);
        let c = row(&table, "c");
        assert_eq!((c.matches, c.points), (0, 0));
        assert_eq!(c.nrr, 0.0);

        assert_eq!(table[0].team.id, "a");
        assert_eq!(table[2].team.id, "b");
    }

    #[test]
    fn nrr_uses_balls_not_decimal_overs() {
        // 100 off 12.3 overs (12.5 true overs) and 60 conceded in 10 overs.
        let nrr = net_run_rate(100, Overs::from_balls(75), 60, Overs::whole(10));
        assert!((nrr - (8.0 - 6.0)).abs() < 1e-9);
        assert_eq!(net_run_rate(100, Overs::default(), 60, Overs::whole(10)), 0.0);
    }

    #[test]
    fn tied_league_match_gives_one_point_each() {
        let t = teams();
        let mut ab = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut ab, 120, 120);

        let table = generate_points_table(&t, &[ab]);
        for id in ["a", "b"] {
            let r = row(&table, id);
            assert_eq!((r.ties, r.points), (1, POINTS_FOR_TIE));
            assert_eq!(r.last_five, vec![FormLetter::Tie]);
        }
    }

    #[test]
    fn super_duper_overs_are_excluded() {
        let t = teams();
        let mut q = fixture(&t[0], &t[1], MatchKind::Qualifier, 0);
        play(&mut q, 100, 100);
        let mut sdo = fixture(
            &t[0],
            &t[1],
            MatchKind::SuperDuperOver {
                parent_match_id: q.id.clone(),
            },
            0,
        );
        play(&mut sdo, 20, 10);

        let table = generate_points_table(&t, &[q, sdo]);
        let a = row(&table, "a");
        assert_eq!((a.matches, a.wins, a.ties), (1, 0, 1));
        assert_eq!(a.runs_scored, 100);
    }

    #[test]
    fn scheduled_matches_do_not_count() {
        let t = teams();
        let table = generate_points_table(&t, &[fixture(&t[0], &t[1], MatchKind::League, 0)]);
        assert!(table.iter().all(|s| s.matches == 0));
    }

    #[test]
    fn last_five_keeps_newest_five_oldest_first() {
        let t = teams();
        let mut matches = Vec::new();
        // a loses on day 0, then wins on days 1..=5, ties on day 6
        let mut first = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut first, 10, 20);
        matches.push(first);
        for day in 1..=5 {
            let mut m = fixture(&t[0], &t[1], MatchKind::League, day);
            play(&mut m, 30, 20);
            matches.push(m);
        }
        let mut last = fixture(&t[0], &t[1], MatchKind::League, 6);
        play(&mut last, 25, 25);
        matches.push(last);
        matches.reverse(); // input order must not matter

        let table = generate_points_table(&t, &matches);
        let a = row(&table, "a");
        assert_eq!(a.matches, 7);
        assert_eq!(a.form(), "WWWWT");
        assert_eq!(row(&table, "b").form(), "LLLLT");
    }

    #[test]
    fn ordering_breaks_points_ties_by_nrr() {
        let t = teams();
        let mut ab = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut ab, 150, 149);
        let mut cb = fixture(&t[2], &t[1], MatchKind::League, 1);
        play(&mut cb, 200, 100);

        let table = generate_points_table(&t, &[ab, cb]);
        assert_eq!(table[0].team.id, "c");
        assert_eq!(table[1].team.id, "a");
        assert_eq!(table[2].team.id, "b");
    }

    #[test]
    fn generation_is_idempotent() {
        let t = teams();
        let mut ab = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut ab, 150, 140);
        let mut bc = fixture(&t[1], &t[2], MatchKind::League, 1);
        play(&mut bc, 99, 99);
        let matches = vec![ab, bc];

        assert_eq!(
            generate_points_table(&t, &matches),
            generate_points_table(&t, &matches)
        );
    }

    #[test]
    fn huge_run_totals_accumulate_without_overflow() {
        let t = teams();
        let mut first = fixture(&t[0], &t[1], MatchKind::League, 0);
        play(&mut first, u32::MAX, 10);
        let mut second = fixture(&t[0], &t[2], MatchKind::League, 1);
        play(&mut second, 4_000_000_000, 10);

        let table = generate_points_table(&t, &[first, second]);
        let a = row(&table, "a");
        assert_eq!(a.runs_scored, u64::from(u32::MAX) + 4_000_000_000);
        assert_eq!(a.points, 4);
        assert!(a.nrr.is_finite() && a.nrr > 0.0);
    }

    #[test]
    fn nrr_display_rounds_to_three_places() {
        let mut s = TeamStats::empty(&Team::with_id("a", "Alpha"));
        s.nrr = 0.5;
        assert_eq!(s.nrr_display(), "+0.500");
        s.nrr = -1.23456;
        assert_eq!(s.nrr_display(), "-1.235");
        s.nrr = -0.0001;
        assert_eq!(s.nrr_display(), "+0.000");
    }
}
