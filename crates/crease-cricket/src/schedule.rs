// League fixture generation.

use chrono::{DateTime, Days, NaiveTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::fixture::{Match, MatchKind};
use crate::team::Team;

/// Venue used when no grounds are configured.
pub const DEFAULT_VENUE: &str = "TBD";

/// Knobs for date and venue assignment.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// The first fixture is played on this calendar day.
    pub start: DateTime<Utc>,
    pub first_match_hour: u32,
    pub second_match_hour: u32,
    /// Assigned to fixtures in rotation.
    pub venues: Vec<String>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            start: Utc::now(),
            first_match_hour: 14,
            second_match_hour: 19,
            venues: Vec::new(),
        }
    }
}

impl ScheduleOptions {
    /// Kick-off time of the `index`-th fixture: two per day, starting on the
    /// start date.
    pub fn slot_time(&self, index: usize) -> DateTime<Utc> {
        let day = self.start.date_naive() + Days::new((index / 2) as u64);
        let hour = if index % 2 == 0 {
            self.first_match_hour
        } else {
            self.second_match_hour
        };
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        day.and_time(time).and_utc()
    }

    pub fn venue(&self, index: usize) -> &str {
        if self.venues.is_empty() {
            DEFAULT_VENUE
        } else {
            &self.venues[index % self.venues.len()]
        }
    }
}

/// Slot orders for the repeated fixtures of one pair `(a, b)`; `true`
/// means reversed, `(b, a)`.
///
/// Even repeats are `(a, b)`, odd repeats `(b, a)`. An odd count gets one
/// extra fixture reversing the last, so every pair ends with an even number
/// of meetings split evenly between the two slot orders.
pub fn pair_slot_orders(matches_per_team_pair: u32) -> Vec<bool> {
    let mut legs: Vec<bool> = (0..matches_per_team_pair).map(|i| i % 2 == 1).collect();
    if matches_per_team_pair % 2 == 1 {
        if let Some(&last) = legs.last() {
            legs.push(!last);
        }
    }
    legs
}

/// Number of fixtures `generate_league_schedule` produces.
pub fn fixture_count(team_count: usize, matches_per_team_pair: u32) -> usize {
    let pairs = team_count * team_count.saturating_sub(1) / 2;
    pairs * pair_slot_orders(matches_per_team_pair).len()
}

/// Round-robin league fixtures with a random order, two fixtures a day from
/// now.
pub fn generate_league_schedule(teams: &[Team], matches_per_team_pair: u32) -> Vec<Match> {
    generate_league_schedule_with(
        teams,
        matches_per_team_pair,
        &ScheduleOptions::default(),
        &mut rand::thread_rng(),
    )
}

/// Round-robin league fixtures.
///
/// Every unordered pair of teams meets `pair_slot_orders` times. The
/// meetings are shuffled with `rng`, then each pair's slot orders are dealt
/// out in calendar order so consecutive meetings always swap slots. Dates
/// are handed out in the shuffled order. Callers guarantee at least two teams.
pub fn generate_league_schedule_with<R: Rng + ?Sized>(
    teams: &[Team],
    matches_per_team_pair: u32,
    options: &ScheduleOptions,
    rng: &mut R,
) -> Vec<Match> {
    let legs = pair_slot_orders(matches_per_team_pair);

    let mut pairs: Vec<(&Team, &Team)> = Vec::new();
    for (i, a) in teams.iter().enumerate() {
        for b in &teams[i + 1..] {
            pairs.push((a, b));
        }
    }

    let mut meetings: Vec<usize> = (0..pairs.len())
        .flat_map(|pair| std::iter::repeat(pair).take(legs.len()))
        .collect();
    meetings.shuffle(rng);

    let mut played = vec![0usize; pairs.len()];
    meetings
        .into_iter()
        .enumerate()
        .map(|(index, pair)| {
            let (a, b) = pairs[pair];
            let reversed = legs[played[pair]];
            played[pair] += 1;
            let (home, away) = if reversed { (b, a) } else { (a, b) };
            Match::new(
                home.clone(),
                away.clone(),
                MatchKind::League,
                options.venue(index),
                options.slot_time(index),
            )
        })
        .collect()
}
