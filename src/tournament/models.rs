use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Team or match identity from the fixture feed. Feeds use numbers or
/// strings; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct FixtureId(String);

pub type MatchId = FixtureId;
pub type TeamId = FixtureId;

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Text(String),
}

impl From<IdRepr> for FixtureId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Int(n) => FixtureId(n.to_string()),
            IdRepr::Text(s) => FixtureId(s),
        }
    }
}

impl From<FixtureId> for String {
    fn from(id: FixtureId) -> Self {
        id.0
    }
}

impl From<&str> for FixtureId {
    fn from(s: &str) -> Self {
        FixtureId(s.to_string())
    }
}

impl From<i64> for FixtureId {
    fn from(n: i64) -> Self {
        FixtureId(n.to_string())
    }
}

impl FixtureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Numeric ids order by value, ahead of textual ones.
impl Ord for FixtureId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<i64>(), other.0.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for FixtureId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The whole fixture feed: teams plus matches grouped by stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentData {
    #[serde(default)]
    pub teams: Vec<RawTeam>,
    #[serde(default)]
    pub league: BTreeMap<String, RawStage>,
    #[serde(default)]
    pub groups: BTreeMap<String, RawStage>,
    #[serde(default)]
    pub knockout: BTreeMap<String, RawStage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    pub id: TeamId,
    pub name: String,
    #[serde(rename = "fifaCode", default)]
    pub short_name: Option<String>,
    #[serde(rename = "emojiString", default)]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStage {
    pub name: String,
    #[serde(default)]
    pub matches: Vec<RawMatch>,
    /// Group winner once the group is complete.
    #[serde(default)]
    pub winner: Option<TeamId>,
    #[serde(default)]
    pub runnerup: Option<TeamId>,
}

/// How the participants of a match are referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Real team ids.
    #[default]
    Group,
    /// Group placements such as `winner_a` or `runner_b`.
    Qualified,
    /// Winners of earlier matches.
    Winner,
    /// Losers of earlier matches.
    Loser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatch {
    pub name: MatchId,
    /// ISO 8601 kick-off.
    pub date: String,
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// Goals after 90 minutes or extra time.
    #[serde(default)]
    pub home_result: Option<u32>,
    #[serde(default)]
    pub away_result: Option<u32>,
    #[serde(default, deserialize_with = "finished_flag")]
    pub finished: bool,
    #[serde(rename = "type", default)]
    pub kind: MatchKind,
    #[serde(default)]
    pub is_playoff: bool,
    #[serde(default)]
    pub winner: Option<Side>,
    /// Goals after 90 minutes.
    #[serde(default)]
    pub home_full: Option<u32>,
    #[serde(default)]
    pub away_full: Option<u32>,
    #[serde(default)]
    pub home_extra: Option<u32>,
    #[serde(default)]
    pub away_extra: Option<u32>,
    #[serde(default)]
    pub home_penalty: Option<u32>,
    #[serde(default)]
    pub away_penalty: Option<u32>,
    #[serde(default)]
    pub round: Option<String>,
}

/// Status codes of a match that is over.
pub(crate) const FINISHED_STATUSES: [&str; 3] = ["FT", "AET", "PEN"];

/// `finished` arrives as a boolean or as a status string such as `"FT"`.
/// Any other status (`"NS"`, `"1H"`, `"PST"`, ...) is still open.
fn finished_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Status(String),
    }
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Status(s)) => FINISHED_STATUSES
            .iter()
            .any(|status| s.trim().eq_ignore_ascii_case(status)),
        None => false,
    })
}

impl TournamentData {
    /// Every match with the name of the stage it belongs to.
    pub fn iter_matches(&self) -> impl Iterator<Item = (&str, &RawMatch)> {
        [&self.league, &self.groups, &self.knockout]
            .into_iter()
            .flat_map(|stages| stages.values())
            .flat_map(|stage| stage.matches.iter().map(move |m| (stage.name.as_str(), m)))
    }

    /// Matches in name order, the order bracket references are resolved in.
    pub fn sorted_matches(&self) -> Vec<(&str, &RawMatch)> {
        let mut matches: Vec<_> = self.iter_matches().collect();
        matches.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_id_from_number_or_string() {
        let ids: Vec<FixtureId> = serde_json::from_str(r#"[12, "Team1"]"#).unwrap();
        assert_eq!(ids[0].as_str(), "12");
        assert_eq!(ids[1].as_str(), "Team1");
        assert_eq!(serde_json::to_string(&ids[0]).unwrap(), r#""12""#);
    }

    #[test]
    fn test_fixture_id_order() {
        let mut ids: Vec<FixtureId> = vec!["10".into(), "b".into(), "9".into(), "a".into()];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(FixtureId::as_str).collect();
        assert_eq!(names, ["9", "10", "a", "b"]);
    }

    #[test]
    fn test_raw_match_defaults_and_status_flag() {
        let raw: RawMatch = serde_json::from_str(
            r#"{"name": 1, "date": "2022-06-01T00:00:00", "home_team": 1,
                "away_team": 2, "home_result": null, "away_result": null,
                "finished": "FT"}"#,
        )
        .unwrap();
        assert!(raw.finished);
        assert_eq!(raw.kind, MatchKind::Group);
        assert!(!raw.is_playoff);
        assert!(raw.winner.is_none());

        let raw: RawMatch = serde_json::from_str(
            r#"{"name": "x", "date": "d", "home_team": 1, "away_team": 2,
                "finished": false, "type": "winner", "winner": "away"}"#,
        )
        .unwrap();
        assert!(!raw.finished);
        assert_eq!(raw.kind, MatchKind::Winner);
        assert_eq!(raw.winner, Some(Side::Away));
    }

    #[test]
    fn test_only_full_time_statuses_are_finished() {
        let finished = |status: &str| -> bool {
            let raw: RawMatch = serde_json::from_value(serde_json::json!({
                "name": 50, "date": "2022-06-01T00:00:00", "home_team": 1,
                "away_team": 2, "home_result": null, "away_result": null,
                "finished": status,
            }))
            .unwrap();
            raw.finished
        };
        for status in ["FT", "AET", "PEN", "ft"] {
            assert!(finished(status), "{} should be finished", status);
        }
        for status in ["NS", "TBD", "PST", "1H", "HT", ""] {
            assert!(!finished(status), "{} should be open", status);
        }
    }
}
