//! Leaderboard aggregation.
//!
//! One pass over matches × players builds a typed accumulator per player;
//! the table is sorted once at the end. Every match's peer set is taken from
//! the same prediction snapshot before anyone is scored against it.

use chrono_tz::Tz;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::db::models::Player;
use crate::db::PredictionSnapshot;
use crate::scoring::{MatchResult, Points, ScoringPolicy};
use crate::tournament::{Match, MatchId};

/// Placeholder for a match without a result yet.
pub const NO_RESULT: &str = "―";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    PlayoffOnly,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsOptions {
    pub scope: Scope,
    /// Adds the winner, difference and extra flags to finished entries.
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub id: MatchId,
    pub team0: String,
    pub team1: String,
    pub result: String,
    pub label: String,
    pub round: String,
    pub time: String,
    pub short_label: String,
}

impl MatchSummary {
    pub fn new(m: &Match, tz: Tz) -> Self {
        MatchSummary {
            id: m.id().clone(),
            team0: m.team(0).label(true, false),
            team1: m.team(1).label(true, false),
            result: m
                .result()
                .map_or_else(|| NO_RESULT.to_string(), MatchResult::label),
            label: m.label(m.result(), false),
            round: m.short_round().to_string(),
            time: m.start_time().with_timezone(&tz).format("%d.%m %H:%M").to_string(),
            short_label: m.label(None, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionEntry {
    pub match_id: MatchId,
    /// Label of the prediction, if one was made
    pub result: Option<String>,
    /// Only set once the match is finished
    pub score: Option<Points>,
    pub is_exact_score: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_winner_score: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_difference_score: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_extra_score: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStanding {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub score: Points,
    pub exact_score: u32,
    pub is_queen: bool,
    pub predictions: Vec<PredictionEntry>,
}

/// Match summaries plus the players in leaderboard order.
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    pub matches: Vec<MatchSummary>,
    pub players: Vec<PlayerStanding>,
}

impl ResultsTable {
    /// Player ids, leader first.
    pub fn order(&self) -> Vec<i64> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn player(&self, id: i64) -> Option<&PlayerStanding> {
        self.players.iter().find(|p| p.id == id)
    }
}

// `players` is written as an object keyed by player id, in leaderboard order.
impl Serialize for ResultsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Standings<'a>(&'a [PlayerStanding]);

        impl Serialize for Standings<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_map(self.0.iter().map(|p| (p.id, p)))
            }
        }

        let mut table = serializer.serialize_struct("ResultsTable", 2)?;
        table.serialize_field("matches", &self.matches)?;
        table.serialize_field("players", &Standings(&self.players))?;
        table.end()
    }
}

/// Peer set of one match: every player's prediction or `None`.
pub fn peer_predictions(
    match_id: &MatchId,
    players: &[Player],
    predictions: &PredictionSnapshot,
) -> Vec<Option<MatchResult>> {
    players
        .iter()
        .map(|p| predictions.get(&(p.id, match_id.clone())).copied())
        .collect()
}

fn score_entry(
    m: &Match,
    prediction: Option<&MatchResult>,
    peers: &[Option<MatchResult>],
    policy: &ScoringPolicy,
    verbose: bool,
) -> PredictionEntry {
    let mut entry = PredictionEntry {
        match_id: m.id().clone(),
        result: prediction.map(MatchResult::label),
        score: None,
        is_exact_score: None,
        is_winner_score: None,
        is_difference_score: None,
        is_extra_score: None,
    };
    let Some(actual) = m.result().filter(|_| m.is_finished()) else {
        return entry;
    };
    entry.score = Some(policy.score(actual, prediction, peers));
    entry.is_exact_score = prediction.map(|p| actual.is_exact_score(p));
    if verbose {
        let hit = |check: fn(&MatchResult, &MatchResult) -> bool| {
            Some(prediction.map_or(false, |p| check(actual, p)))
        };
        entry.is_winner_score = hit(MatchResult::is_winner_score);
        entry.is_difference_score = hit(MatchResult::is_difference_score);
        entry.is_extra_score = hit(MatchResult::is_extra_score);
    }
    entry
}

/// Builds the results table for `matches` (already cut off at "now").
///
/// `players` should come in a stable order (by id); it breaks ties left by
/// the (score, exact score) sort.
pub fn gen_results(
    matches: &[&Match],
    players: &[Player],
    predictions: &PredictionSnapshot,
    policy: &ScoringPolicy,
    options: ResultsOptions,
    tz: Tz,
) -> ResultsTable {
    let in_scope: Vec<&Match> = matches
        .iter()
        .copied()
        .filter(|m| options.scope == Scope::All || m.is_playoff())
        .collect();

    let mut standings: Vec<PlayerStanding> = players
        .iter()
        .map(|p| PlayerStanding {
            id: p.id,
            name: p.name(),
            score: Points::zero(policy.score_mode),
            exact_score: 0,
            is_queen: p.is_queen,
            predictions: Vec::with_capacity(in_scope.len()),
        })
        .collect();

    for m in &in_scope {
        let peers = peer_predictions(m.id(), players, predictions);
        for (standing, prediction) in standings.iter_mut().zip(&peers) {
            let entry = score_entry(m, prediction.as_ref(), &peers, policy, options.verbose);
            if let Some(score) = entry.score {
                standing.score = standing.score + score;
            }
            if entry.is_exact_score == Some(true) {
                standing.exact_score += 1;
            }
            standing.predictions.push(entry);
        }
    }

    standings.sort_by(|a, b| {
        b.score
            .value()
            .total_cmp(&a.score.value())
            .then(b.exact_score.cmp(&a.exact_score))
    });

    ResultsTable {
        matches: in_scope.iter().map(|m| MatchSummary::new(m, tz)).collect(),
        players: standings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ExtraScoreMode, ScoreMode, Winner};
    use crate::tournament::testing::tournament;
    use crate::tournament::Tournament;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn players() -> Vec<Player> {
        let mut queen = Player::new(3, Some("Cleo"), None);
        queen.is_queen = true;
        vec![
            Player::new(1, Some("Ann"), None),
            Player::new(2, Some("Bob"), Some("Lee")),
            queen,
        ]
    }

    fn predict(snapshot: &mut PredictionSnapshot, player: i64, m: i64, r: MatchResult) {
        snapshot.insert((player, m.into()), r);
    }

    fn predictions() -> PredictionSnapshot {
        let mut s = PredictionSnapshot::new();
        // Ann: exact on the 1-0 group match and on the penalty shoot-out.
        predict(&mut s, 1, 1, MatchResult::new(1, 0));
        predict(&mut s, 1, 4, MatchResult::with_winner(1, 1, Winner::Team1).unwrap());
        // Bob: right winner on the 1-0, level pick on the 1-1 draw.
        predict(&mut s, 2, 1, MatchResult::new(2, 0));
        predict(&mut s, 2, 2, MatchResult::new(0, 0));
        // Cleo: right winner on the playoff 1-0, pending match.
        predict(&mut s, 3, 3, MatchResult::new(3, 1));
        predict(&mut s, 3, 6, MatchResult::new(2, 0));
        s
    }

    fn all_before(t: &Tournament, day: u32) -> Vec<&Match> {
        t.matches
            .matches_before(Utc.with_ymd_and_hms(2018, 7, day, 23, 0, 0).unwrap())
    }

    fn run(policy: ScoringPolicy, options: ResultsOptions) -> ResultsTable {
        let t = tournament(policy.extra_score_mode);
        gen_results(
            &all_before(&t, 31),
            &players(),
            &predictions(),
            &policy,
            options,
            chrono_tz::Europe::Moscow,
        )
    }

    #[test]
    fn test_fixed_leaderboard() {
        let table = run(ScoringPolicy::default(), ResultsOptions::default());
        assert_eq!(table.matches.len(), 7);
        assert_eq!(table.order(), vec![1, 2, 3]);

        let ann = table.player(1).unwrap();
        // 3 for the 1-0, 4 for the decided draw.
        assert_eq!(ann.score, Points::Fixed(7));
        assert_eq!(ann.exact_score, 2);
        let bob = table.player(2).unwrap();
        // 1 (winner) + 2 (winner and difference on the draw).
        assert_eq!(bob.score, Points::Fixed(3));
        assert_eq!(bob.exact_score, 0);
        let cleo = table.player(3).unwrap();
        assert_eq!(cleo.score, Points::Fixed(1));
        assert!(cleo.is_queen);
    }

    #[test]
    fn test_pending_and_missing_entries() {
        let table = run(ScoringPolicy::default(), ResultsOptions::default());
        let cleo = table.player(3).unwrap();
        let pending = cleo
            .predictions
            .iter()
            .find(|e| e.match_id.as_str() == "6")
            .unwrap();
        assert_eq!(pending.result.as_deref(), Some("2 - 0"));
        assert_eq!(pending.score, None);
        assert_eq!(pending.is_exact_score, None);

        let missed = &cleo.predictions[0];
        assert_eq!(missed.match_id.as_str(), "1");
        assert_eq!(missed.result, None);
        assert_eq!(missed.score, Some(Points::Fixed(0)));

        let final_summary = table.matches.iter().find(|m| m.id.as_str() == "6").unwrap();
        assert_eq!(final_summary.result, NO_RESULT);
        assert_eq!(final_summary.time, "15.07 18:00");
    }

    #[test]
    fn test_fsnorm_leaderboard() {
        let policy = ScoringPolicy {
            score_mode: ScoreMode::Fsnorm,
            extra_score_mode: ExtraScoreMode::Default,
        };
        let table = run(policy, ResultsOptions::default());
        // Match 1: two submissions, both right winner (2/2), one exact (2/1).
        let ann = table.player(1).unwrap();
        assert_relative_eq!(ann.score.value(), 1.0 + 2.0 + 1.0 + 1.0);
        let bob = table.player(2).unwrap();
        assert_relative_eq!(bob.score.value(), 1.0 + 1.0);
        let cleo = table.player(3).unwrap();
        assert_relative_eq!(cleo.score.value(), 1.0);
        assert_eq!(table.order(), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_keep_player_order() {
        let table = gen_results(
            &[],
            &players(),
            &PredictionSnapshot::new(),
            &ScoringPolicy::default(),
            ResultsOptions::default(),
            chrono_tz::UTC,
        );
        assert!(table.matches.is_empty());
        assert_eq!(table.order(), vec![1, 2, 3]);
    }

    #[test]
    fn test_playoff_scope_and_verbose_flags() {
        let table = run(
            ScoringPolicy::default(),
            ResultsOptions {
                scope: Scope::PlayoffOnly,
                verbose: true,
            },
        );
        let ids: Vec<&str> = table.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["3", "4", "5", "7", "6"]);
        assert_eq!(table.order(), vec![1, 3, 2]);

        let ann_penalties = &table.player(1).unwrap().predictions[1];
        assert_eq!(ann_penalties.is_winner_score, Some(true));
        assert_eq!(ann_penalties.is_difference_score, Some(true));
        assert_eq!(ann_penalties.is_extra_score, Some(true));

        let bob_missing = &table.player(2).unwrap().predictions[0];
        assert_eq!(bob_missing.is_winner_score, Some(false));

        let pending = &table.player(1).unwrap().predictions[4];
        assert_eq!(pending.is_winner_score, None);
    }

    #[test]
    fn test_leaderboard_sorted_by_score_then_exact() {
        let table = run(ScoringPolicy::default(), ResultsOptions::default());
        for pair in table.players.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!((a.score.value(), a.exact_score) >= (b.score.value(), b.exact_score));
        }
    }

    #[test]
    fn test_serialized_players_keep_leaderboard_order() {
        let mut table = run(ScoringPolicy::default(), ResultsOptions::default());
        table.players.reverse();
        let json = serde_json::to_string(&table).unwrap();
        let pos = |key: &str| json.find(key).unwrap();
        assert!(pos(r#""3":{"name":"Cleo""#) < pos(r#""2":{"name":"Bob Lee""#));
        assert!(pos(r#""2":{"name":"Bob Lee""#) < pos(r#""1":{"name":"Ann""#));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["players"]["1"]["score"], 7);
        assert_eq!(value["players"]["1"]["exact_score"], 2);
        assert_eq!(value["matches"][0]["result"], "1 - 0");
        assert!(value["players"]["1"]["predictions"][0]
            .get("is_winner_score")
            .is_none());
    }
}
