pub mod matches;
pub mod models;
pub mod source;
pub mod teams;
#[cfg(test)]
pub(crate) mod testing;

pub use matches::{Match, Matches};
pub use models::{FixtureId, MatchId, TournamentData};
pub use source::{ApiFootball, FileSource, FixtureSource};
pub use teams::{Relation, Team, Teams};

use tracing::{debug, warn};

use crate::error::PoolError;
use crate::scoring::ExtraScoreMode;
use models::MatchKind;

/// One consistent snapshot of teams and matches.
///
/// Rebuilt as a whole on every fixture reload; callers swap the snapshot
/// atomically and never patch it.
#[derive(Debug, Clone, Default)]
pub struct Tournament {
    pub teams: Teams,
    pub matches: Matches,
}

impl Tournament {
    /// Builds the snapshot in two phases: real teams and group placements
    /// first, then every match in name order, materializing the winner and
    /// loser slot of each knockout match as soon as it is built.
    pub fn build(data: &TournamentData, extra_score_mode: ExtraScoreMode) -> Result<Self, PoolError> {
        let mut teams = Teams::from_raw(&data.teams);
        for (group, stage) in &data.groups {
            let group = FixtureId::from(group.as_str());
            teams.register_placement(Relation::GroupWinner, &group, stage.winner.as_ref())?;
            teams.register_placement(Relation::GroupRunnerUp, &group, stage.runnerup.as_ref())?;
        }

        let mut matches = Matches::default();
        for (round, raw) in data.sorted_matches() {
            let home = teams.resolve(raw.kind, &raw.home_team, &raw.name)?;
            let away = teams.resolve(raw.kind, &raw.away_team, &raw.name)?;
            let m = Match::from_raw(round, raw, [home, away], extra_score_mode)?;

            if m.is_playoff() || raw.kind != MatchKind::Group {
                let outcome = m.outcome();
                if m.is_finished() && outcome.is_none() {
                    warn!(
                        "Knockout match {} finished without a winner, its bracket slots stay open",
                        m.id()
                    );
                }
                teams.register_outcome(m.id(), outcome);
            }
            matches.insert(m);
        }

        debug!(
            "Tournament built: {} teams, {} matches",
            teams.len(),
            matches.len()
        );
        Ok(Tournament { teams, matches })
    }
}
