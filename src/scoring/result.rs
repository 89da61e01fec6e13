use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PoolError;

const BALL: &str = "\u{26bd}";

/// Who won the match, including a draw resolved by extra time or penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Neither,
    Team1,
    Team2,
}

impl Winner {
    /// Storage code: 0 = neither, 1 = first team, 2 = second team.
    pub fn code(self) -> u8 {
        match self {
            Winner::Neither => 0,
            Winner::Team1 => 1,
            Winner::Team2 => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Winner::Neither),
            1 => Some(Winner::Team1),
            2 => Some(Winner::Team2),
            _ => None,
        }
    }

    fn from_goals(goals1: u32, goals2: u32) -> Self {
        match goals1.cmp(&goals2) {
            std::cmp::Ordering::Greater => Winner::Team1,
            std::cmp::Ordering::Less => Winner::Team2,
            std::cmp::Ordering::Equal => Winner::Neither,
        }
    }
}

/// A final or predicted scoreline. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MatchResult {
    goals1: u32,
    goals2: u32,
    winner: Winner,
}

impl MatchResult {
    /// Scoreline with the winner derived from the goals.
    pub fn new(goals1: u32, goals2: u32) -> Self {
        MatchResult {
            goals1,
            goals2,
            winner: Winner::from_goals(goals1, goals2),
        }
    }

    /// Scoreline with an explicit winner. A side that has more goals must be
    /// the winner; a level scoreline accepts any winner (decider).
    pub fn with_winner(goals1: u32, goals2: u32, winner: Winner) -> Result<Self, PoolError> {
        let consistent = (goals1 <= goals2 || winner == Winner::Team1)
            && (goals1 >= goals2 || winner == Winner::Team2);
        if !consistent {
            return Err(PoolError::InvalidResult {
                goals1,
                goals2,
                winner: winner.code(),
            });
        }
        Ok(MatchResult {
            goals1,
            goals2,
            winner,
        })
    }

    pub fn goals1(&self) -> u32 {
        self.goals1
    }

    pub fn goals2(&self) -> u32 {
        self.goals2
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    fn difference(&self) -> i64 {
        self.goals1 as i64 - self.goals2 as i64
    }

    /// Level scoreline that still has a winner.
    pub fn is_decided_draw(&self) -> bool {
        self.goals1 == self.goals2 && self.winner != Winner::Neither
    }

    /// Level scoreline without a decider winner.
    pub fn needs_decider(&self) -> bool {
        self.goals1 == self.goals2 && self.winner == Winner::Neither
    }

    pub fn is_exact_score(&self, p: &MatchResult) -> bool {
        self.goals1 == p.goals1 && self.goals2 == p.goals2
    }

    pub fn is_winner_score(&self, p: &MatchResult) -> bool {
        self.winner == p.winner
    }

    pub fn is_difference_score(&self, p: &MatchResult) -> bool {
        self.difference() == p.difference()
    }

    /// The match went to a decider and the prediction called a level score,
    /// whoever it picked to win the decider.
    pub fn is_extra_score(&self, p: &MatchResult) -> bool {
        self.is_decided_draw() && p.goals1 == p.goals2
    }

    /// Human label, with a ball next to the side that won a decided draw.
    pub fn label(&self) -> String {
        let left = if self.is_decided_draw() && self.winner == Winner::Team1 {
            BALL
        } else {
            ""
        };
        let right = if self.is_decided_draw() && self.winner == Winner::Team2 {
            BALL
        } else {
            ""
        };
        format!("{}{} - {}{}", left, self.goals1, self.goals2, right)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.goals1, self.goals2, self.winner.code())
    }
}

impl FromStr for MatchResult {
    type Err = PoolError;

    /// Parses the `Display` form, `"2 - 1 (1)"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PoolError::UnparsableResult(s.to_string());
        let body = s.trim().strip_suffix(')').ok_or_else(bad)?;
        let (goals, winner) = body.rsplit_once(" (").ok_or_else(bad)?;
        let (g1, g2) = goals.split_once(" - ").ok_or_else(bad)?;
        let goals1: u32 = g1.trim().parse().map_err(|_| bad())?;
        let goals2: u32 = g2.trim().parse().map_err(|_| bad())?;
        let winner = winner
            .parse::<u8>()
            .ok()
            .and_then(Winner::from_code)
            .ok_or_else(bad)?;
        MatchResult::with_winner(goals1, goals2, winner)
    }
}
