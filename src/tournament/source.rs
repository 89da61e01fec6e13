use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use super::models::{
    MatchKind, RawMatch, RawStage, RawTeam, TeamId, TournamentData, FINISHED_STATUSES,
};

const RAPIDAPI_HOST: &str = "api-football-v1.p.rapidapi.com";

/// Anything that can produce a fresh copy of the tournament data.
#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    async fn load(&self) -> Result<TournamentData>;
}

/// Tournament data kept in a local JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

#[async_trait]
impl FixtureSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<TournamentData> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read fixtures file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixtures file {}", self.path.display()))
    }
}

/// League fixtures from api-football (v2, via RapidAPI).
pub struct ApiFootball {
    http: Client,
    base_url: String,
    api_token: String,
    league_id: u32,
}

impl ApiFootball {
    pub fn new(base_url: &str, api_token: &str, league_id: u32) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiFootball {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            league_id,
        })
    }
}

#[async_trait]
impl FixtureSource for ApiFootball {
    fn name(&self) -> &str {
        "api-football"
    }

    async fn load(&self) -> Result<TournamentData> {
        let url = format!("{}/fixtures/league/{}", self.base_url, self.league_id);
        debug!("Fetching fixtures from {}", url);

        let resp = self
            .http
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_token)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .send()
            .await
            .context("api-football request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("api-football error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse api-football response")?;

        convert_api_season(&raw)
    }
}

/// Converts an api-football season into tournament data: one `league` stage
/// per round number, every fixture a group match.
pub fn convert_api_season(raw: &serde_json::Value) -> Result<TournamentData> {
    let fixtures = raw["api"]["fixtures"]
        .as_array()
        .context("api-football response has no api.fixtures array")?;

    let mut teams: BTreeMap<TeamId, RawTeam> = BTreeMap::new();
    let mut rounds: BTreeMap<String, Vec<RawMatch>> = BTreeMap::new();

    for fix in fixtures {
        let fixture_id = fix["fixture_id"]
            .as_i64()
            .context("fixture without fixture_id")?;

        let mut side = |key: &str| -> Result<TeamId> {
            let team = &fix[key];
            let id: TeamId = team["team_id"]
                .as_i64()
                .with_context(|| format!("fixture {} has no {}.team_id", fixture_id, key))?
                .into();
            let name = team["team_name"].as_str().unwrap_or_default().to_string();
            teams.entry(id.clone()).or_insert_with(|| RawTeam {
                id: id.clone(),
                short_name: Some(name.clone()),
                name,
                flag: None,
            });
            Ok(id)
        };
        let home_team = side("homeTeam")?;
        let away_team = side("awayTeam")?;

        let round_label = fix["round"].as_str().unwrap_or_default();
        let round = first_number(round_label)
            .with_context(|| format!("fixture {} has no round number in {:?}", fixture_id, round_label))?;

        let goals = |key: &str| fix[key].as_u64().map(|g| g as u32);
        rounds.entry(round.clone()).or_default().push(RawMatch {
            name: fixture_id.into(),
            date: fix["event_date"].as_str().unwrap_or_default().to_string(),
            home_team,
            away_team,
            home_result: goals("goalsHomeTeam"),
            away_result: goals("goalsAwayTeam"),
            finished: fix["statusShort"]
                .as_str()
                .is_some_and(|status| FINISHED_STATUSES.contains(&status)),
            kind: MatchKind::Group,
            is_playoff: false,
            winner: None,
            home_full: None,
            away_full: None,
            home_extra: None,
            away_extra: None,
            home_penalty: None,
            away_penalty: None,
            round: Some(round),
        });
    }

    let league = rounds
        .into_iter()
        .map(|(round, matches)| {
            let stage = RawStage {
                name: round.clone(),
                matches,
                winner: None,
                runnerup: None,
            };
            (round, stage)
        })
        .collect();

    Ok(TournamentData {
        teams: teams.into_values().collect(),
        league,
        ..Default::default()
    })
}

fn first_number(s: &str) -> Option<String> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..].chars().take_while(char::is_ascii_digit).collect();
    Some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(id: i64, round: &str, home: i64, away: i64, goals: Option<(u32, u32)>) -> serde_json::Value {
        let status = if goals.is_some() { "FT" } else { "NS" };
        json!({
            "fixture_id": id,
            "event_date": "2019-07-12T19:00:00+03:00",
            "round": round,
            "statusShort": status,
            "goalsHomeTeam": goals.map(|g| g.0),
            "goalsAwayTeam": goals.map(|g| g.1),
            "homeTeam": {"team_id": home, "team_name": format!("Club {}", home), "logo": ""},
            "awayTeam": {"team_id": away, "team_name": format!("Club {}", away), "logo": ""},
        })
    }

    #[test]
    fn test_convert_api_season() {
        let raw = json!({"api": {"fixtures": [
            fixture(100, "Regular Season - 1", 1, 2, Some((2, 0))),
            fixture(101, "Regular Season - 1", 3, 4, None),
            fixture(102, "Regular Season - 12", 2, 3, None),
        ]}});
        let data = convert_api_season(&raw).unwrap();

        assert_eq!(data.teams.len(), 4);
        assert_eq!(data.teams[0].name, "Club 1");
        assert_eq!(data.league.len(), 2);
        let first = &data.league["1"];
        assert_eq!(first.name, "1");
        assert_eq!(first.matches.len(), 2);
        assert!(first.matches[0].finished);
        assert_eq!(first.matches[0].home_result, Some(2));
        assert!(!first.matches[1].finished);
        assert_eq!(first.matches[1].home_result, None);
        assert_eq!(data.league["12"].matches[0].name.as_str(), "102");
    }

    #[test]
    fn test_convert_rejects_missing_fixtures() {
        assert!(convert_api_season(&json!({"api": {}})).is_err());
        let raw = json!({"api": {"fixtures": [fixture(1, "Final", 1, 2, None)]}});
        assert!(convert_api_season(&raw).is_err());
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("Regular Season - 30").as_deref(), Some("30"));
        assert_eq!(first_number("Round 7 leg 2").as_deref(), Some("7"));
        assert_eq!(first_number("Final"), None);
    }

    #[tokio::test]
    async fn test_file_source_reads_tournament_data() {
        let path = std::env::temp_dir().join(format!("fixtures-{}.json", std::process::id()));
        tokio::fs::write(
            &path,
            r#"{"teams": [{"id": 1, "name": "Team1"}], "league": {}}"#,
        )
        .await
        .unwrap();
        let data = FileSource::new(&path).load().await.unwrap();
        assert_eq!(data.teams.len(), 1);
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(FileSource::new(&path).load().await.is_err());
    }
}
