// Innings score value objects and input sanitisation.
//
// Overs are held as a ball count so `12.3` means 12 overs and 3 balls
// (75 balls), never 12.3 decimal overs.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const BALLS_PER_OVER: u32 = 6;
pub const MAX_WICKETS: u8 = 10;

// ---------------------------------------------------------------------------
// Overs
// ---------------------------------------------------------------------------

/// Overs bowled, in cricket notation. Serialised as a decimal (`12.3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Overs {
    balls: u32,
}

impl Overs {
    pub fn from_balls(balls: u32) -> Self {
        Overs { balls }
    }

    /// Whole overs with no extra balls.
    pub fn whole(overs: u32) -> Self {
        Overs {
            balls: overs.saturating_mul(BALLS_PER_OVER),
        }
    }

    pub fn balls(&self) -> u32 {
        self.balls
    }

    pub fn completed_overs(&self) -> u32 {
        self.balls / BALLS_PER_OVER
    }

    /// Balls bowled in the incomplete over (0-5).
    pub fn extra_balls(&self) -> u32 {
        self.balls % BALLS_PER_OVER
    }

    /// True overs for rate calculations: `12.3` is 12.5 overs.
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.balls) / f64::from(BALLS_PER_OVER)
    }

    /// Apply the overs input policy to a raw decimal value.
    ///
    /// Negative and non-finite input becomes 0. A ball digit of 6-9 is
    /// snapped to `.5` of the next whole over (`12.7` becomes `13.5`). The
    /// result is then capped at `cap_overs` whole overs.
    pub fn sanitize(raw: f64, cap_overs: u32) -> Self {
        let cap = Overs::whole(cap_overs);
        if !raw.is_finite() || raw <= 0.0 {
            return Overs::default();
        }

        let mut whole = raw.trunc() as u64;
        let mut ball = (raw.fract() * 10.0 + 1e-6).floor() as u64;
        if ball >= u64::from(BALLS_PER_OVER) {
            whole += 1;
            ball = 5;
        }

        let balls = whole
            .saturating_mul(u64::from(BALLS_PER_OVER))
            .saturating_add(ball);
        if balls > u64::from(cap.balls) {
            cap
        } else {
            Overs::from_balls(balls as u32)
        }
    }

    /// Parse free-form overs text such as `"19.4"`. Unparseable text is 0.
    pub fn parse_raw(raw: &str) -> f64 {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        cleaned.parse::<f64>().unwrap_or(0.0)
    }
}

impl fmt::Display for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extra_balls() == 0 {
            write!(f, "{}", self.completed_overs())
        } else {
            write!(f, "{}.{}", self.completed_overs(), self.extra_balls())
        }
    }
}

impl From<Overs> for f64 {
    fn from(o: Overs) -> f64 {
        f64::from(o.completed_overs()) + f64::from(o.extra_balls()) / 10.0
    }
}

impl TryFrom<f64> for Overs {
    type Error = String;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if !v.is_finite() || v < 0.0 {
            return Err(format!("invalid overs value {v}"));
        }
        let whole = v.trunc() as u32;
        let ball = (v.fract() * 10.0).round() as u32;
        if ball >= BALLS_PER_OVER {
            return Err(format!("invalid ball count in overs value {v}"));
        }
        Ok(Overs::from_balls(whole * BALLS_PER_OVER + ball))
    }
}

impl Add for Overs {
    type Output = Overs;

    fn add(self, rhs: Overs) -> Overs {
        Overs::from_balls(self.balls.saturating_add(rhs.balls))
    }
}

impl AddAssign for Overs {
    fn add_assign(&mut self, rhs: Overs) {
        *self = *self + rhs;
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// One side's innings total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub runs: u32,
    pub wickets: u8,
    pub overs: Overs,
}

impl Score {
    pub fn new(runs: u32, wickets: u8, overs: Overs) -> Self {
        Score {
            runs,
            wickets: wickets.min(MAX_WICKETS),
            overs,
        }
    }

    /// Re-apply the over cap to an already-built score.
    pub fn capped(self, cap_overs: u32) -> Self {
        Score {
            overs: self.overs.min(Overs::whole(cap_overs)),
            wickets: self.wickets.min(MAX_WICKETS),
            ..self
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} ov)", self.runs, self.wickets, self.overs)
    }
}

// ---------------------------------------------------------------------------
// Raw entry
// ---------------------------------------------------------------------------

/// Score fields exactly as typed by a user, before sanitisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreEntry {
    pub runs: String,
    pub wickets: String,
    pub overs: String,
}

impl ScoreEntry {
    pub fn new(runs: impl Into<String>, wickets: impl Into<String>, overs: impl Into<String>) -> Self {
        ScoreEntry {
            runs: runs.into(),
            wickets: wickets.into(),
            overs: overs.into(),
        }
    }

    /// Sanitise into a `Score`: runs keep digits only, wickets clamp to
    /// 0-10, overs follow `Overs::sanitize` with the given cap.
    pub fn to_score(&self, cap_overs: u32) -> Score {
        Score {
            runs: sanitize_runs(&self.runs),
            wickets: sanitize_wickets(&self.wickets),
            overs: Overs::sanitize(Overs::parse_raw(&self.overs), cap_overs),
        }
    }
}

/// Parses `runs/wickets/overs`, e.g. `150/8/20` or `98/10/17.4`.
impl FromStr for ScoreEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [runs, wickets, overs] => Ok(ScoreEntry::new(*runs, *wickets, *overs)),
            _ => Err(format!("expected runs/wickets/overs, got '{s}'")),
        }
    }
}

fn sanitize_runs(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits
        .parse::<u64>()
        .map(|v| v.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(u32::MAX)
}

fn sanitize_wickets(raw: &str) -> u8 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    cleaned
        .parse::<i64>()
        .map(|w| w.clamp(0, i64::from(MAX_WICKETS)) as u8)
        .unwrap_or(0)
}
