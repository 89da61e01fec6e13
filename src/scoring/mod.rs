pub mod policy;
pub mod result;

pub use policy::{ExtraScoreMode, Points, ScoreMode, ScoringPolicy};
pub use result::{MatchResult, Winner};
