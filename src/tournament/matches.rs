use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::models::{MatchId, RawMatch, Side};
use super::teams::Team;
use crate::error::PoolError;
use crate::scoring::{ExtraScoreMode, MatchResult, Winner};

const CUP: &str = "\u{1F3C6}";
const BRONZE_MEDAL: &str = "\u{1F949}";

/// One fixture. Built once per data load and never patched.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    id: MatchId,
    round: String,
    teams: [Team; 2],
    start_time: DateTime<Utc>,
    is_playoff: bool,
    is_finished: bool,
    result: Option<MatchResult>,
}

/// Kick-off time: RFC 3339, or a naive timestamp read as UTC.
pub fn parse_start_time(date: &str, match_id: &MatchId) -> Result<DateTime<Utc>, PoolError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| PoolError::InvalidDate {
            date: date.to_string(),
            match_id: match_id.to_string(),
        })
}

/// Final result of a fixture, if its goals are known.
///
/// A match with a decider winner keeps that winner; under
/// `ExtraScoreMode::Extratime` its goals are the 90-minute ones.
pub fn parse_result(
    raw: &RawMatch,
    extra_score_mode: ExtraScoreMode,
) -> Result<Option<MatchResult>, PoolError> {
    let (Some(home), Some(away)) = (raw.home_result, raw.away_result) else {
        return Ok(None);
    };
    let Some(side) = raw.winner else {
        return Ok(Some(MatchResult::new(home, away)));
    };
    let (home, away) = match (extra_score_mode, raw.home_full, raw.away_full) {
        (ExtraScoreMode::Extratime, Some(h), Some(a)) => (h, a),
        _ => (home, away),
    };
    let winner = match side {
        Side::Home => Winner::Team1,
        Side::Away => Winner::Team2,
    };
    MatchResult::with_winner(home, away, winner).map(Some)
}

impl Match {
    pub fn from_raw(
        round: &str,
        raw: &RawMatch,
        teams: [Team; 2],
        extra_score_mode: ExtraScoreMode,
    ) -> Result<Self, PoolError> {
        let result = parse_result(raw, extra_score_mode)?;
        if raw.finished && result.is_none() {
            return Err(PoolError::MissingResult(raw.name.to_string()));
        }
        Ok(Match {
            id: raw.name.clone(),
            round: round.to_string(),
            teams,
            start_time: parse_start_time(&raw.date, &raw.name)?,
            is_playoff: raw.is_playoff,
            is_finished: raw.finished,
            result,
        })
    }

    pub fn id(&self) -> &MatchId {
        &self.id
    }

    pub fn round(&self) -> &str {
        &self.round
    }

    pub fn short_round(&self) -> &str {
        match self.round.as_str() {
            "Round of 16" => "⅛",
            "Quarter-finals" => "¼",
            "Semi-finals" => "½",
            "3rd Place Final" => BRONZE_MEDAL,
            "Final" => CUP,
            round => round.strip_prefix("Group ").unwrap_or(round),
        }
    }

    pub fn team(&self, index: usize) -> &Team {
        &self.teams[index]
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_playoff(&self) -> bool {
        self.is_playoff
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// `"<team0> <score or -> <team1>"`.
    pub fn label(&self, result: Option<&MatchResult>, short: bool) -> String {
        format!(
            "{} {} {}",
            self.teams[0].label(true, short),
            result.map_or_else(|| "-".to_string(), MatchResult::label),
            self.teams[1].label(false, short),
        )
    }

    /// `(winner, loser)` of a decided match.
    pub fn outcome(&self) -> Option<(Team, Team)> {
        if !self.is_finished {
            return None;
        }
        match self.result?.winner() {
            Winner::Team1 => Some((self.teams[0].clone(), self.teams[1].clone())),
            Winner::Team2 => Some((self.teams[1].clone(), self.teams[0].clone())),
            Winner::Neither => None,
        }
    }

    fn sort_key(&self) -> (DateTime<Utc>, bool, &MatchId) {
        (self.start_time, !self.is_finished, &self.id)
    }
}

/// All fixtures of one data load, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Matches {
    matches: HashMap<MatchId, Match>,
}

impl Matches {
    pub fn insert(&mut self, m: Match) {
        self.matches.insert(m.id.clone(), m);
    }

    pub fn get(&self, id: &MatchId) -> Result<&Match, PoolError> {
        self.matches
            .get(id)
            .ok_or_else(|| PoolError::UnknownMatch(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    fn sorted<'a>(&'a self, keep: impl Fn(&Match) -> bool) -> Vec<&'a Match> {
        let mut selected: Vec<&Match> = self.matches.values().filter(|m| keep(m)).collect();
        selected.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        selected
    }

    /// Matches starting strictly after `time`, optionally before
    /// `time + days_limit`.
    pub fn matches_after(&self, time: DateTime<Utc>, days_limit: Option<i64>) -> Vec<&Match> {
        let top = days_limit
            .filter(|days| *days > 0)
            .map(|days| time + Duration::days(days));
        self.sorted(|m| m.start_time > time && top.map_or(true, |top| m.start_time < top))
    }

    /// Matches starting at or before `time`.
    pub fn matches_before(&self, time: DateTime<Utc>) -> Vec<&Match> {
        self.sorted(|m| m.start_time <= time)
    }
}
