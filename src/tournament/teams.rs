use serde::Serialize;
use std::collections::HashMap;

use super::models::{FixtureId, MatchId, MatchKind, RawTeam, TeamId};
use crate::error::PoolError;

pub const BLANK_FLAG: &str = "\u{1F3F3}\u{FE0F}";
/// Zero-width no-break space, keeps a flag glued to its name.
pub const ZWNBSP: &str = "\u{FEFF}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
    pub flag: Option<String>,
}

impl Team {
    pub fn real(raw: &RawTeam) -> Self {
        let short_name = raw
            .short_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&raw.name)
            .to_string();
        Team {
            id: raw.id.clone(),
            name: raw.name.clone(),
            short_name,
            flag: raw.flag.clone().filter(|f| !f.is_empty()),
        }
    }

    /// Stand-in for a bracket slot whose team is not known yet.
    pub fn placeholder(relation: Relation, source: &FixtureId) -> Self {
        let word = relation.word();
        let source = source.as_str().to_uppercase();
        Team {
            id: FixtureId::from(format!("{}_{}", relation.word().to_lowercase(), source).as_str()),
            name: format!("{} {}", word, source),
            short_name: format!("{}{}", &word[..1], source),
            flag: Some(BLANK_FLAG.to_string()),
        }
    }

    pub fn flag(&self) -> &str {
        self.flag.as_deref().unwrap_or("")
    }

    pub fn label(&self, left_flag: bool, short: bool) -> String {
        let name = if short { &self.short_name } else { &self.name };
        if left_flag {
            format!("{}{}{}", self.flag(), ZWNBSP, name)
        } else {
            format!("{}{}{}", name, ZWNBSP, self.flag())
        }
    }
}

/// How a bracket slot is derived from an earlier match or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Winner,
    Loser,
    GroupWinner,
    GroupRunnerUp,
}

impl Relation {
    fn word(self) -> &'static str {
        match self {
            Relation::Winner | Relation::GroupWinner => "WINNER",
            Relation::Loser => "LOSER",
            Relation::GroupRunnerUp => "RUNNER",
        }
    }

    /// Parses a group placement reference such as `winner_a` or `runner_b`.
    fn parse_placement(reference: &str) -> Option<(Relation, FixtureId)> {
        let (kind, group) = reference.split_once('_')?;
        let relation = match kind.to_lowercase().as_str() {
            "winner" => Relation::GroupWinner,
            "runner" | "runnerup" => Relation::GroupRunnerUp,
            _ => return None,
        };
        Some((relation, FixtureId::from(group)))
    }
}

/// Real teams plus the bracket slots materialized so far.
#[derive(Debug, Clone, Default)]
pub struct Teams {
    real: HashMap<TeamId, Team>,
    derived: HashMap<(Relation, FixtureId), Team>,
}

impl Teams {
    pub fn from_raw(raw: &[RawTeam]) -> Self {
        let real = raw.iter().map(|t| (t.id.clone(), Team::real(t))).collect();
        Teams {
            real,
            derived: HashMap::new(),
        }
    }

    pub fn get(&self, id: &TeamId) -> Option<&Team> {
        self.real.get(id)
    }

    pub fn derived(&self, relation: Relation, source: &FixtureId) -> Option<&Team> {
        self.derived.get(&(relation, source.clone()))
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    /// Records a group placement: the real team if known, otherwise a
    /// placeholder.
    pub fn register_placement(
        &mut self,
        relation: Relation,
        group: &FixtureId,
        team: Option<&TeamId>,
    ) -> Result<(), PoolError> {
        let resolved = match team {
            Some(id) => self
                .real
                .get(id)
                .cloned()
                .ok_or_else(|| PoolError::UnknownTeam {
                    team: id.to_string(),
                    match_id: format!("group {}", group),
                })?,
            None => Team::placeholder(relation, group),
        };
        self.derived.insert((relation, group.clone()), resolved);
        Ok(())
    }

    /// Records the winner and loser slots of a knockout match. `outcome` is
    /// `(winner, loser)` once the match is decided.
    pub fn register_outcome(&mut self, source: &MatchId, outcome: Option<(Team, Team)>) {
        let (winner, loser) = outcome.unwrap_or_else(|| {
            (
                Team::placeholder(Relation::Winner, source),
                Team::placeholder(Relation::Loser, source),
            )
        });
        self.derived.insert((Relation::Winner, source.clone()), winner);
        self.derived.insert((Relation::Loser, source.clone()), loser);
    }

    /// Resolves one participant reference of match `match_id`.
    ///
    /// Group rows name real teams. Every other kind names a bracket slot,
    /// which must already be registered; it never falls back to a real team
    /// that happens to share the id.
    pub fn resolve(
        &self,
        kind: MatchKind,
        reference: &TeamId,
        match_id: &MatchId,
    ) -> Result<Team, PoolError> {
        let slot = match kind {
            MatchKind::Group => {
                return self
                    .real
                    .get(reference)
                    .cloned()
                    .ok_or_else(|| PoolError::UnknownTeam {
                        team: reference.to_string(),
                        match_id: match_id.to_string(),
                    });
            }
            MatchKind::Winner => Some((Relation::Winner, reference.clone())),
            MatchKind::Loser => Some((Relation::Loser, reference.clone())),
            MatchKind::Qualified => Relation::parse_placement(reference.as_str()),
        };
        slot.and_then(|key| self.derived.get(&key))
            .cloned()
            .ok_or_else(|| PoolError::UnresolvedReference {
                reference: reference.to_string(),
                match_id: match_id.to_string(),
            })
    }
}
