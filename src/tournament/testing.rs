//! Shared fixture set for tests.

use super::{Tournament, TournamentData};
use crate::scoring::ExtraScoreMode;

/// Five finished fixtures (group 1-0, group 1-1, playoff 1-0, playoff 1-1
/// on penalties, playoff 1-1 then 2-1 in extra time) plus a final and a
/// bronze match fed by the bracket.
pub const FIXTURES: &str = r#"{
  "teams": [
    {"id": 1, "name": "Team1", "fifaCode": "T1", "emojiString": "1"},
    {"id": 2, "name": "Team2", "fifaCode": "T2", "emojiString": "2"},
    {"id": 3, "name": "Team3", "fifaCode": "T3", "emojiString": "3"},
    {"id": 4, "name": "Team4", "fifaCode": "T4", "emojiString": "4"},
    {"id": 5, "name": "Team5", "fifaCode": "T5", "emojiString": "5"},
    {"id": 6, "name": "Team6", "fifaCode": "T6", "emojiString": "6"},
    {"id": 7, "name": "Team7", "fifaCode": "T7", "emojiString": "7"},
    {"id": 8, "name": "Team8", "fifaCode": "T8", "emojiString": "8"},
    {"id": 9, "name": "Team9", "fifaCode": "T9", "emojiString": "9"}
  ],
  "groups": {
    "a": {
      "name": "Group A",
      "winner": 1,
      "runnerup": null,
      "matches": [
        {"name": 1, "type": "group", "home_team": 1, "away_team": 2,
         "home_result": 1, "away_result": 0,
         "date": "2018-06-14T15:00:00+00:00", "finished": true},
        {"name": 2, "type": "group", "home_team": 3, "away_team": 4,
         "home_result": 1, "away_result": 1,
         "date": "2018-06-15T15:00:00+00:00", "finished": true}
      ]
    }
  },
  "knockout": {
    "round_16": {
      "name": "Round of 16",
      "matches": [
        {"name": 3, "type": "qualified", "home_team": "winner_a", "away_team": "runner_a",
         "home_result": 1, "away_result": 0, "is_playoff": true, "winner": "home",
         "date": "2018-06-30T15:00:00+00:00", "finished": true},
        {"name": 4, "type": "group", "home_team": 5, "away_team": 6,
         "home_result": 1, "away_result": 1, "home_penalty": 6, "away_penalty": 5,
         "is_playoff": true, "winner": "home",
         "date": "2018-07-01T15:00:00+00:00", "finished": true},
        {"name": 5, "type": "group", "home_team": 7, "away_team": 8,
         "home_result": 2, "away_result": 1, "home_full": 1, "away_full": 1,
         "home_extra": 1, "away_extra": 0, "is_playoff": true, "winner": "home",
         "date": "2018-07-02T15:00:00+00:00", "finished": true}
      ]
    },
    "final": {
      "name": "Final",
      "matches": [
        {"name": 6, "type": "winner", "home_team": 4, "away_team": 5,
         "home_result": null, "away_result": null, "is_playoff": true,
         "date": "2018-07-15T15:00:00+00:00", "finished": false},
        {"name": 7, "type": "loser", "home_team": 6, "away_team": 4,
         "home_result": null, "away_result": null, "is_playoff": true,
         "date": "2018-07-14T15:00:00+00:00", "finished": false}
      ]
    }
  }
}"#;

pub fn data() -> TournamentData {
    serde_json::from_str(FIXTURES).unwrap()
}

pub fn tournament(extra_score_mode: ExtraScoreMode) -> Tournament {
    Tournament::build(&data(), extra_score_mode).unwrap()
}
