use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

pub const SET_SLOTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Hard, Surface::Clay, Surface::Grass];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Hard => "Hard",
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Surface::Hard => 0,
            Surface::Clay => 1,
            Surface::Grass => 2,
        }
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(Surface::Hard),
            "clay" => Ok(Surface::Clay),
            "grass" => Ok(Surface::Grass),
            other => Err(format!("unrecognized surface {other:?}")),
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    A,
    B,
}

impl Winner {
    /// Label used in exported tables: 1 = first listed player, 2 = second.
    pub fn label(&self) -> u8 {
        match self {
            Winner::A => 1,
            Winner::B => 2,
        }
    }
}

/// One completed match, already oriented: `player_a`/`player_b` carry no
/// information about who won beyond the `winner` field itself.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub surface: Surface,
    pub player_a: String,
    pub player_b: String,
    /// Ranking-points proxy used by the eligibility gate.
    pub pts_a: f64,
    pub pts_b: f64,
    /// Games won per set; a 0/0 slot means the set was not played.
    pub sets_a: [u16; SET_SLOTS],
    pub sets_b: [u16; SET_SLOTS],
    pub winner: Winner,
    pub odds_a: Option<f64>,
    pub odds_b: Option<f64>,
}

impl MatchRecord {
    /// Signed sum of (A's games - B's games) over all set slots. Unplayed
    /// slots are 0/0 and contribute nothing.
    pub fn points_diff_a(&self) -> i64 {
        self.sets_a
            .iter()
            .zip(&self.sets_b)
            .map(|(a, b)| i64::from(*a) - i64::from(*b))
            .sum()
    }

    /// Number of sets actually played in the match. A side with a zero score
    /// in a played set (6-0) is still covered by the other side's count.
    pub fn sets_played(&self) -> u32 {
        let a = self.sets_a.iter().filter(|s| **s > 0).count();
        let b = self.sets_b.iter().filter(|s| **s > 0).count();
        a.max(b) as u32
    }

    pub fn points_gap(&self) -> f64 {
        (self.pts_a - self.pts_b).abs()
    }
}

/// An input row that could not be turned into a `MatchRecord`. It keeps its
/// position in the sequence but never touches any aggregate.
#[derive(Debug, Clone)]
pub struct MalformedRow {
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.line, self.reason)
    }
}
