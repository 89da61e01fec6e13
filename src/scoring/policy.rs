//! Turning a prediction into points.
//!
//! Two modes exist:
//! - **default**: one point each for the winner, the goal difference, the
//!   exact score and a correctly called decider draw (0–4).
//! - **fsnorm**: a correct winner pick and a correct exact score are each
//!   worth `submitted / correct` over all non-empty predictions for the match,
//!   so rare correct calls pay more. Rounded to two decimals.
//!
//! The policy is a plain value handed to every call; nothing here reads
//! configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::Add;

use super::result::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Default,
    Fsnorm,
}

/// Which goal pair is canonical for a playoff draw settled by a decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraScoreMode {
    /// Goals after extra time.
    #[default]
    Default,
    /// Goals after 90 minutes.
    Extratime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoringPolicy {
    pub score_mode: ScoreMode,
    pub extra_score_mode: ExtraScoreMode,
}

/// Points for one prediction or a sum of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Points {
    Fixed(u32),
    Relative(f64),
}

impl Points {
    pub fn zero(mode: ScoreMode) -> Self {
        match mode {
            ScoreMode::Default => Points::Fixed(0),
            ScoreMode::Fsnorm => Points::Relative(0.0),
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Points::Fixed(p) => p as f64,
            Points::Relative(p) => p,
        }
    }

    pub fn is_zero(self) -> bool {
        self.value() == 0.0
    }
}

impl Add for Points {
    type Output = Points;

    fn add(self, rhs: Points) -> Points {
        match (self, rhs) {
            (Points::Fixed(a), Points::Fixed(b)) => Points::Fixed(a + b),
            (a, b) => Points::Relative(round2(a.value() + b.value())),
        }
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl ScoringPolicy {
    /// Score `prediction` against the `actual` result.
    ///
    /// `peers` is every player's prediction for the same match, the scorer's
    /// own included; fsnorm mode needs it, default mode ignores it.
    pub fn score(
        &self,
        actual: &MatchResult,
        prediction: Option<&MatchResult>,
        peers: &[Option<MatchResult>],
    ) -> Points {
        match self.score_mode {
            ScoreMode::Default => Points::Fixed(points_score(actual, prediction)),
            ScoreMode::Fsnorm => Points::Relative(fsnorm_score(actual, prediction, peers)),
        }
    }
}

pub fn points_score(actual: &MatchResult, prediction: Option<&MatchResult>) -> u32 {
    let Some(p) = prediction else {
        return 0;
    };
    [
        actual.is_winner_score(p),
        actual.is_difference_score(p),
        actual.is_exact_score(p),
        actual.is_extra_score(p),
    ]
    .into_iter()
    .filter(|hit| *hit)
    .count() as u32
}

/// `submitted / correct` over non-empty peers, 0 when nobody was correct.
fn inverse_share(peers: &[Option<MatchResult>], correct: impl Fn(&MatchResult) -> bool) -> f64 {
    let submitted: Vec<&MatchResult> = peers.iter().flatten().collect();
    let hits = submitted.iter().filter(|p| correct(p)).count();
    if hits == 0 {
        return 0.0;
    }
    submitted.len() as f64 / hits as f64
}

/// Reward available for a correct winner pick on this match.
pub fn fsnorm_winner_score(actual: &MatchResult, peers: &[Option<MatchResult>]) -> f64 {
    inverse_share(peers, |p| actual.is_winner_score(p))
}

/// Reward available for a correct exact score on this match.
pub fn fsnorm_exact_score(actual: &MatchResult, peers: &[Option<MatchResult>]) -> f64 {
    inverse_share(peers, |p| actual.is_exact_score(p))
}

pub fn fsnorm_score(
    actual: &MatchResult,
    prediction: Option<&MatchResult>,
    peers: &[Option<MatchResult>],
) -> f64 {
    let Some(p) = prediction else {
        return 0.0;
    };
    let mut score = 0.0;
    if actual.is_winner_score(p) {
        score += fsnorm_winner_score(actual, peers);
    }
    if actual.is_exact_score(p) {
        score += fsnorm_exact_score(actual, peers);
    }
    round2(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::result::Winner;
    use approx::assert_relative_eq;

    fn r(g1: u32, g2: u32) -> MatchResult {
        MatchResult::new(g1, g2)
    }

    fn rw(g1: u32, g2: u32, winner: u8) -> MatchResult {
        MatchResult::with_winner(g1, g2, Winner::from_code(winner).unwrap()).unwrap()
    }

    fn fixed(actual: MatchResult, p: MatchResult) -> u32 {
        points_score(&actual, Some(&p))
    }

    /// Scores `player` with the peer set `others + [player]`.
    fn fsnorm(actual: MatchResult, player: MatchResult, others: &[Option<MatchResult>]) -> f64 {
        let mut peers = others.to_vec();
        peers.push(Some(player));
        fsnorm_score(&actual, Some(&player), &peers)
    }

    #[test]
    fn test_fixed_group_win() {
        let win = r(1, 0);
        assert_eq!(fixed(win, r(0, 0)), 0);
        assert_eq!(fixed(win, r(0, 1)), 0);
        assert_eq!(fixed(win, r(3, 0)), 1);
        assert_eq!(fixed(win, r(2, 0)), 1);
        assert_eq!(fixed(win, r(2, 1)), 2);
        assert_eq!(fixed(win, r(1, 0)), 3);
    }

    #[test]
    fn test_fixed_group_draw() {
        let draw = r(1, 1);
        assert_eq!(fixed(draw, r(3, 0)), 0);
        assert_eq!(fixed(draw, r(0, 1)), 0);
        // Winner and difference, no exact score and no decider.
        assert_eq!(fixed(draw, r(0, 0)), 2);
        assert_eq!(fixed(draw, r(1, 1)), 3);
        assert_eq!(fixed(draw, r(2, 2)), 2);
    }

    #[test]
    fn test_fixed_playoff_regulation_win() {
        let win = rw(1, 0, 1);
        assert_eq!(fixed(win, rw(0, 0, 1)), 1);
        assert_eq!(fixed(win, rw(1, 1, 1)), 1);
        assert_eq!(fixed(win, rw(0, 0, 2)), 0);
        assert_eq!(fixed(win, r(0, 1)), 0);
        assert_eq!(fixed(win, r(3, 0)), 1);
        assert_eq!(fixed(win, r(2, 1)), 2);
        assert_eq!(fixed(win, r(1, 0)), 3);
    }

    #[test]
    fn test_fixed_playoff_penalties() {
        let penalties = rw(1, 1, 1);
        assert_eq!(fixed(penalties, r(1, 0)), 1);
        assert_eq!(fixed(penalties, r(2, 0)), 1);
        assert_eq!(fixed(penalties, r(0, 1)), 0);
        assert_eq!(fixed(penalties, rw(0, 0, 1)), 3);
        assert_eq!(fixed(penalties, rw(0, 0, 2)), 2);
        assert_eq!(fixed(penalties, rw(1, 1, 1)), 4);
        assert_eq!(fixed(penalties, rw(1, 1, 2)), 3);
    }

    #[test]
    fn test_fixed_playoff_extra_time_counted_on_full_score() {
        // 1-1 after 90 minutes, 2-1 after extra time.
        let extra = rw(2, 1, 1);
        assert_eq!(fixed(extra, r(2, 1)), 3);
        assert_eq!(fixed(extra, r(1, 0)), 2);
        assert_eq!(fixed(extra, r(2, 0)), 1);
        assert_eq!(fixed(extra, r(0, 1)), 0);
        assert_eq!(fixed(extra, rw(0, 0, 1)), 1);
        assert_eq!(fixed(extra, rw(0, 0, 2)), 0);
        assert_eq!(fixed(extra, rw(1, 1, 1)), 1);
        assert_eq!(fixed(extra, rw(1, 1, 2)), 0);
    }

    #[test]
    fn test_fixed_playoff_extra_time_counted_on_regulation_score() {
        // Same match read as the 90-minute 1-1 won by the home side.
        let extra = rw(1, 1, 1);
        assert_eq!(fixed(extra, r(1, 0)), 1);
        assert_eq!(fixed(extra, r(2, 0)), 1);
        assert_eq!(fixed(extra, r(0, 1)), 0);
        assert_eq!(fixed(extra, rw(0, 0, 1)), 3);
        assert_eq!(fixed(extra, rw(0, 0, 2)), 2);
        assert_eq!(fixed(extra, rw(1, 1, 1)), 4);
        assert_eq!(fixed(extra, rw(1, 1, 2)), 3);
    }

    #[test]
    fn test_fixed_result_against_itself() {
        for actual in [r(1, 0), r(1, 1), r(0, 3), rw(2, 2, 2), rw(0, 0, 1)] {
            let expected = if actual.is_decided_draw() { 4 } else { 3 };
            assert_eq!(fixed(actual, actual), expected);
        }
    }

    #[test]
    fn test_missing_prediction_scores_zero() {
        let actual = r(1, 0);
        let policy = ScoringPolicy {
            score_mode: ScoreMode::Fsnorm,
            ..Default::default()
        };
        assert_eq!(points_score(&actual, None), 0);
        assert_eq!(
            policy.score(&actual, None, &[Some(r(1, 0))]),
            Points::Relative(0.0)
        );
        assert_eq!(
            ScoringPolicy::default().score(&actual, None, &[]),
            Points::Fixed(0)
        );
    }

    #[test]
    fn test_fsnorm_group_win() {
        let win = r(1, 0);
        assert_relative_eq!(fsnorm(win, r(0, 0), &[Some(r(0, 0))]), 0.0);
        assert_relative_eq!(fsnorm(win, r(0, 1), &[Some(r(0, 0))]), 0.0);
        assert_relative_eq!(fsnorm(win, r(3, 0), &[Some(r(0, 0))]), 2.0);
        assert_relative_eq!(fsnorm(win, r(3, 0), &[Some(r(0, 0)), None]), 2.0);
        assert_relative_eq!(fsnorm(win, r(2, 1), &[Some(r(0, 0))]), 2.0);
        assert_relative_eq!(fsnorm(win, r(1, 0), &[Some(r(0, 0))]), 4.0);
        assert_relative_eq!(fsnorm(win, r(1, 0), &[Some(r(0, 0)), None]), 4.0);
        assert_relative_eq!(fsnorm(win, r(1, 0), &[Some(r(1, 0))]), 2.0);
        assert_relative_eq!(
            fsnorm(win, r(1, 0), &[Some(r(1, 0)), Some(r(1, 0))]),
            2.0
        );
        assert_relative_eq!(
            fsnorm(win, r(1, 0), &[Some(r(1, 0)), Some(r(2, 0))]),
            2.5
        );
        assert_relative_eq!(
            fsnorm(win, r(1, 0), &[Some(r(1, 0)), Some(r(0, 2))]),
            3.0
        );
        assert_relative_eq!(
            fsnorm(win, r(1, 0), &[Some(r(0, 4)), Some(r(0, 2))]),
            6.0
        );
    }

    #[test]
    fn test_fsnorm_group_draw() {
        let draw = r(1, 1);
        assert_relative_eq!(fsnorm(draw, r(3, 0), &[Some(r(1, 0))]), 0.0);
        assert_relative_eq!(fsnorm(draw, r(0, 0), &[Some(r(1, 0))]), 2.0);
        assert_relative_eq!(fsnorm(draw, r(1, 1), &[Some(r(1, 0))]), 4.0);
        assert_relative_eq!(fsnorm(draw, r(2, 2), &[Some(r(1, 1))]), 1.0);
        assert_relative_eq!(fsnorm(draw, r(1, 1), &[Some(r(1, 1))]), 2.0);
    }

    #[test]
    fn test_fsnorm_playoff() {
        let win = rw(1, 0, 1);
        assert_relative_eq!(fsnorm(win, rw(0, 0, 1), &[Some(r(0, 1))]), 2.0);
        assert_relative_eq!(fsnorm(win, rw(0, 0, 1), &[Some(r(2, 1))]), 1.0);
        assert_relative_eq!(fsnorm(win, rw(0, 0, 2), &[Some(r(2, 1))]), 0.0);
        assert_relative_eq!(fsnorm(win, r(1, 0), &[Some(r(2, 1))]), 3.0);

        let extra = rw(2, 1, 1);
        assert_relative_eq!(fsnorm(extra, r(2, 1), &[Some(r(3, 0))]), 3.0);
        assert_relative_eq!(fsnorm(extra, r(1, 0), &[Some(r(3, 0))]), 1.0);
        assert_relative_eq!(fsnorm(extra, rw(1, 1, 1), &[Some(r(2, 3))]), 2.0);

        let penalties = rw(1, 1, 1);
        assert_relative_eq!(fsnorm(penalties, r(1, 0), &[Some(r(2, 3))]), 2.0);
        assert_relative_eq!(fsnorm(penalties, rw(1, 1, 1), &[Some(r(2, 3))]), 4.0);
        assert_relative_eq!(fsnorm(penalties, rw(1, 1, 2), &[Some(r(2, 3))]), 2.0);
    }

    #[test]
    fn test_fsnorm_shared_winner_pick() {
        // Two submissions, both with the right winner: 2 / 2 each.
        let actual = r(2, 0);
        let peers = [Some(r(1, 0)), Some(r(3, 1))];
        assert_relative_eq!(fsnorm_winner_score(&actual, &peers), 1.0);
        assert_relative_eq!(fsnorm_score(&actual, Some(&r(1, 0)), &peers), 1.0);
        assert_relative_eq!(fsnorm_exact_score(&actual, &peers), 0.0);
    }

    #[test]
    fn test_fsnorm_rounds_to_two_decimals() {
        let actual = r(1, 0);
        let peers = [Some(r(1, 0)), Some(r(1, 0)), Some(r(1, 0)), Some(r(0, 0)), None];
        // 4/3 + 4/3 = 2.666.. -> 2.67
        assert_relative_eq!(fsnorm_score(&actual, Some(&r(1, 0)), &peers), 2.67);
    }

    #[test]
    fn test_points_sum() {
        assert_eq!(Points::Fixed(2) + Points::Fixed(3), Points::Fixed(5));
        assert_eq!(
            Points::Relative(0.1) + Points::Relative(0.2),
            Points::Relative(0.3)
        );
        assert!(Points::zero(ScoreMode::Fsnorm).is_zero());
    }
}
