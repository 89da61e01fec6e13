use thiserror::Error;

/// Domain errors of the prediction pool.
///
/// Storage and I/O failures travel as `anyhow::Error`; these are the rule
/// violations callers are expected to match on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("inconsistent result {goals1} - {goals2} with winner {winner}")]
    InvalidResult {
        goals1: u32,
        goals2: u32,
        winner: u8,
    },

    #[error("cannot parse result from {0:?}")]
    UnparsableResult(String),

    #[error("unknown team {team} in match {match_id}")]
    UnknownTeam { team: String, match_id: String },

    #[error("match {match_id} references {reference}, which is not resolved yet")]
    UnresolvedReference { reference: String, match_id: String },

    #[error("match {0} is finished but has no result")]
    MissingResult(String),

    #[error("unknown match {0}")]
    UnknownMatch(String),

    #[error("invalid start time {date:?} for match {match_id}")]
    InvalidDate { date: String, match_id: String },

    #[error("player {0} is already registered")]
    AlreadyRegistered(i64),

    #[error("player {0} is not registered")]
    PlayerNotFound(i64),

    #[error("player {0} is not the admin")]
    NotAdmin(i64),

    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),

    #[error("match {0} is a playoff match, a drawn prediction needs a decider winner")]
    WinnerRequired(String),

    #[error("a decider winner is not allowed for this prediction on match {0}")]
    DeciderNotAllowed(String),

    #[error("match {0} has already started")]
    BettingClosed(String),
}
