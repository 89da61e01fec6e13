//! The prediction pool: player registry, bet intake, results and the
//! periodic update cycle on top of the current tournament snapshot.

pub mod update;

pub use update::{Reminder, ReminderKind, ReminderWindows, UpdateReport, UpdateTracker};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::db::models::{Player, Prediction, BOT_PLAYER_ID};
use crate::db::Database;
use crate::error::PoolError;
use crate::results::{gen_results, peer_predictions, MatchSummary, ResultsOptions, ResultsTable};
use crate::scoring::policy::{fsnorm_exact_score, fsnorm_winner_score};
use crate::scoring::{MatchResult, ScoreMode, ScoringPolicy};
use crate::tournament::{FixtureSource, Match, MatchId, Tournament};

pub const DEFAULT_BOT_NAME: &str = "OneZero";

/// Deployment settings the engine needs besides the scoring policy.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub admin_id: i64,
    pub default_tz: Tz,
    pub upcoming_days_limit: i64,
    pub matches_per_page: usize,
    /// Where the results object is dumped after every update, if anywhere.
    pub results_file: Option<PathBuf>,
    pub reminders: ReminderWindows,
}

/// One player's line in a per-match breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPrediction {
    pub player_id: i64,
    pub name: String,
    pub is_queen: bool,
    pub prediction: Option<MatchResult>,
    pub label: Option<String>,
    /// What a correct exact score on this pick pays (fsnorm only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_reward: Option<f64>,
    /// What a correct winner on this pick pays (fsnorm only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_reward: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchPredictions {
    pub match_id: MatchId,
    pub label: String,
    pub predictions: Vec<PlayerPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetSlot {
    pub match_id: MatchId,
    /// `"<round>: <match label> <local time>"`
    pub label: String,
    pub prediction: Option<MatchResult>,
}

/// One page of matches open for betting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchesPage {
    /// Zero-based, after clamping
    pub page: usize,
    pub pages: usize,
    pub slots: Vec<BetSlot>,
}

impl MatchesPage {
    pub fn prev(&self) -> usize {
        (self.page + self.pages - 1) % self.pages
    }

    pub fn next(&self) -> usize {
        (self.page + 1) % self.pages
    }
}

pub struct PoolEngine {
    settings: PoolSettings,
    policy: ScoringPolicy,
    db: Database,
    source: Arc<dyn FixtureSource>,
    tournament: RwLock<Arc<Tournament>>,
    tracker: Mutex<Option<UpdateTracker>>,
}

impl PoolEngine {
    /// Creates the engine and loads the first tournament snapshot.
    pub async fn start(
        settings: PoolSettings,
        policy: ScoringPolicy,
        db: Database,
        source: Arc<dyn FixtureSource>,
    ) -> Result<Self> {
        let engine = PoolEngine {
            settings,
            policy,
            db,
            source,
            tournament: RwLock::new(Arc::new(Tournament::default())),
            tracker: Mutex::new(None),
        };
        engine.reload_fixtures().await?;
        Ok(engine)
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// The current snapshot; cheap to clone and never mutated.
    pub fn tournament(&self) -> Arc<Tournament> {
        self.tournament
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Loads fresh fixtures and swaps the snapshot. On failure the previous
    /// snapshot stays in place.
    pub async fn reload_fixtures(&self) -> Result<()> {
        let data = self
            .source
            .load()
            .await
            .with_context(|| format!("Failed to load fixtures from {}", self.source.name()))?;
        let tournament = Tournament::build(&data, self.policy.extra_score_mode)
            .context("Fixture data is inconsistent")?;
        info!(
            "Fixtures reloaded from {}: {} matches",
            self.source.name(),
            tournament.matches.len()
        );
        *self
            .tournament
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(tournament);
        Ok(())
    }

    // ── Players ──────────────────────────────────────────────────────────────

    pub fn is_admin(&self, player_id: i64) -> bool {
        player_id == self.settings.admin_id
    }

    fn require_admin(&self, actor: i64) -> Result<()> {
        if !self.is_admin(actor) {
            return Err(PoolError::NotAdmin(actor).into());
        }
        Ok(())
    }

    pub fn player(&self, player_id: i64) -> Result<Player> {
        self.db
            .get_player(player_id)?
            .ok_or_else(|| PoolError::PlayerNotFound(player_id).into())
    }

    pub fn is_registered(&self, player_id: i64) -> Result<bool> {
        Ok(self.db.get_player(player_id)?.is_some())
    }

    pub fn register_player(
        &self,
        player_id: i64,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Player> {
        let player = Player::new(player_id, first_name, last_name);
        self.db.create_player(&player)?;
        info!("Registered player {} ({})", player.name(), player.id);
        Ok(player)
    }

    /// Only the configured admin may register through this path.
    pub fn register_admin(
        &self,
        player_id: i64,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Player> {
        self.require_admin(player_id)?;
        self.register_player(player_id, first_name, last_name)
    }

    pub fn set_queen(&self, actor: i64, target: i64, is_queen: bool) -> Result<()> {
        self.require_admin(actor)?;
        self.db.set_queen(target, is_queen)?;
        info!("Player {} queen flag set to {}", target, is_queen);
        Ok(())
    }

    pub fn set_timezone(&self, player_id: i64, timezone: &str) -> Result<Tz> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| PoolError::InvalidTimezone(timezone.to_string()))?;
        self.db.set_timezone(player_id, tz.name())?;
        info!("Player {} timezone set to {}", player_id, tz.name());
        Ok(tz)
    }

    pub fn register_bot_player(&self, actor: i64, name: Option<&str>) -> Result<Player> {
        self.require_admin(actor)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_BOT_NAME);
        let bot = Player::bot(name);
        self.db.create_player(&bot)?;
        info!("Registered bot player {} ({})", bot.name(), bot.id);
        Ok(bot)
    }

    /// Removes the bot player and its predictions. Returns whether it existed.
    pub fn remove_bot_player(&self, actor: i64) -> Result<bool> {
        self.require_admin(actor)?;
        let removed = self.db.delete_player(BOT_PLAYER_ID)?;
        if removed {
            info!("Removed bot player {}", BOT_PLAYER_ID);
        }
        Ok(removed)
    }

    pub fn bot_players(&self) -> Result<Vec<Player>> {
        Ok(self
            .db
            .list_players()?
            .into_iter()
            .filter(|p| p.is_bot)
            .collect())
    }

    /// Gives every bot player a 1-0 prediction on each match it has not
    /// predicted yet. Returns the number of bets placed.
    pub fn make_bot_bets(&self, now: DateTime<Utc>) -> Result<usize> {
        let bots = self.bot_players()?;
        if bots.is_empty() {
            return Ok(0);
        }
        let tournament = self.tournament();
        let bet = MatchResult::new(1, 0);
        let mut placed = 0;
        for bot in &bots {
            let existing: HashSet<MatchId> = self
                .db
                .predictions_for_player(bot.id)?
                .into_iter()
                .map(|p| p.match_id)
                .collect();
            for m in tournament.matches.all() {
                if existing.contains(m.id()) {
                    continue;
                }
                self.db.add_prediction(bot.id, m.id(), &bet, now)?;
                debug!("Bot {} bet {} on match {}", bot.name(), bet.label(), m.id());
                placed += 1;
            }
        }
        if placed > 0 {
            info!("Placed {} automatic 1-0 bets for {} bot player(s)", placed, bots.len());
        }
        Ok(placed)
    }

    // ── Predictions ──────────────────────────────────────────────────────────

    /// Stores a prediction, overwriting any earlier one for the same match.
    pub fn submit_prediction(
        &self,
        player_id: i64,
        match_id: &MatchId,
        result: MatchResult,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let player = self.player(player_id)?;
        let tournament = self.tournament();
        let m = tournament.matches.get(match_id)?;
        if m.start_time() <= now {
            return Err(PoolError::BettingClosed(match_id.to_string()).into());
        }
        if m.is_playoff() && result.needs_decider() {
            return Err(PoolError::WinnerRequired(match_id.to_string()).into());
        }
        if !m.is_playoff() && result.is_decided_draw() {
            return Err(PoolError::DeciderNotAllowed(match_id.to_string()).into());
        }
        self.db.add_prediction(player_id, match_id, &result, now)?;
        info!(
            "Player {} ({}) bet {} on {}",
            player.name(),
            player_id,
            result.label(),
            m.label(None, true)
        );
        Ok(())
    }

    pub fn prediction(&self, player_id: i64, match_id: &MatchId) -> Result<Option<MatchResult>> {
        Ok(self.db.get_prediction(player_id, match_id)?.map(|p| p.result))
    }

    /// A player's predictions with their matches, by kick-off. Predictions
    /// for matches no longer in the feed are skipped.
    pub fn player_predictions(&self, player_id: i64) -> Result<Vec<(Match, Prediction)>> {
        let tournament = self.tournament();
        let mut bets: Vec<(Match, Prediction)> = self
            .db
            .predictions_for_player(player_id)?
            .into_iter()
            .filter_map(|p| match tournament.matches.get(&p.match_id) {
                Ok(m) => Some((m.clone(), p)),
                Err(err) => {
                    debug!("Skipping prediction of player {}: {}", player_id, err);
                    None
                }
            })
            .collect();
        bets.sort_by_key(|(m, _)| m.start_time());
        Ok(bets)
    }

    pub fn missing_players(&self, match_id: &MatchId) -> Result<Vec<i64>> {
        self.db.missing_players(match_id)
    }

    // ── Results ──────────────────────────────────────────────────────────────

    /// Results of every match started by `now`.
    pub fn results(&self, now: DateTime<Utc>, options: ResultsOptions) -> Result<ResultsTable> {
        let tournament = self.tournament();
        let matches = tournament.matches.matches_before(now);
        let players = self.db.list_players()?;
        let predictions = self.db.prediction_snapshot(matches.iter().map(|m| m.id()))?;
        Ok(gen_results(
            &matches,
            &players,
            &predictions,
            &self.policy,
            options,
            self.settings.default_tz,
        ))
    }

    /// Every player's prediction for one match, in current leaderboard order.
    pub fn match_predictions(&self, match_id: &MatchId, now: DateTime<Utc>) -> Result<MatchPredictions> {
        let tournament = self.tournament();
        let m = tournament.matches.get(match_id)?;
        let players = self.db.list_players()?;
        let predictions = self.db.prediction_snapshot([match_id])?;
        let peers = peer_predictions(match_id, &players, &predictions);

        let rank: HashMap<i64, usize> = self
            .results(now, ResultsOptions::default())?
            .order()
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect();

        let fsnorm = self.policy.score_mode == ScoreMode::Fsnorm;
        let mut entries: Vec<PlayerPrediction> = players
            .iter()
            .zip(&peers)
            .map(|(player, prediction)| {
                let reward = |f: fn(&MatchResult, &[Option<MatchResult>]) -> f64| {
                    fsnorm.then(|| prediction.map_or(0.0, |p| f(&p, &peers)))
                };
                PlayerPrediction {
                    player_id: player.id,
                    name: player.name(),
                    is_queen: player.is_queen,
                    prediction: *prediction,
                    label: prediction.as_ref().map(MatchResult::label),
                    exact_reward: reward(fsnorm_exact_score),
                    winner_reward: reward(fsnorm_winner_score),
                }
            })
            .collect();
        entries.sort_by_key(|e| rank.get(&e.player_id).copied().unwrap_or(usize::MAX));

        Ok(MatchPredictions {
            match_id: match_id.clone(),
            label: m.label(m.result(), false),
            predictions: entries,
        })
    }

    /// Summaries of every match open for betting, in the default zone.
    pub fn upcoming_matches(&self, now: DateTime<Utc>) -> Vec<MatchSummary> {
        self.tournament()
            .matches
            .matches_after(now, Some(self.settings.upcoming_days_limit))
            .into_iter()
            .map(|m| MatchSummary::new(m, self.settings.default_tz))
            .collect()
    }

    /// Matches open for betting, one page at a time. `None` when nothing is
    /// open.
    pub fn matches_page(&self, player_id: i64, page: usize, now: DateTime<Utc>) -> Result<Option<MatchesPage>> {
        let player = self.player(player_id)?;
        let tz = player.tz(self.settings.default_tz);
        let tournament = self.tournament();
        let open = tournament
            .matches
            .matches_after(now, Some(self.settings.upcoming_days_limit));
        if open.is_empty() {
            return Ok(None);
        }

        let per_page = self.settings.matches_per_page.max(1);
        let pages = open.len().div_ceil(per_page);
        let page = page.min(pages - 1);
        let predictions: HashMap<MatchId, MatchResult> = self
            .db
            .predictions_for_player(player_id)?
            .into_iter()
            .map(|p| (p.match_id, p.result))
            .collect();

        let slots = open
            .iter()
            .skip(page * per_page)
            .take(per_page)
            .map(|m| {
                let prediction = predictions.get(m.id()).copied();
                BetSlot {
                    match_id: m.id().clone(),
                    label: format!(
                        "{}: {} {}",
                        m.short_round(),
                        m.label(prediction.as_ref(), true),
                        m.start_time().with_timezone(&tz).format("%d.%m %H:%M")
                    ),
                    prediction,
                }
            })
            .collect();
        debug!("Matches page {}/{} for player {}", page + 1, pages, player_id);
        Ok(Some(MatchesPage { page, pages, slots }))
    }

    // ── Update cycle ─────────────────────────────────────────────────────────

    /// One update cycle: reload fixtures, place bot bets, dump results and
    /// report match transitions and due reminders.
    pub async fn run_update(&self, now: DateTime<Utc>) -> Result<UpdateReport> {
        if let Err(err) = self.reload_fixtures().await {
            warn!("Keeping previous fixtures: {:#}", err);
        }
        self.make_bot_bets(now)?;

        let results = self.results(now, ResultsOptions::default())?;
        self.write_results_file(&results).await?;

        let tournament = self.tournament();
        let windows = self.settings.reminders;
        let transitions = {
            let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
            tracker
                .get_or_insert_with(|| UpdateTracker::new(&tournament.matches, now, windows))
                .advance(&tournament.matches, now, windows)
        };

        let mut reminders = Vec::new();
        let due = transitions
            .remind_day_before
            .into_iter()
            .map(|id| (ReminderKind::DayBefore, id))
            .chain(
                transitions
                    .remind_last_call
                    .into_iter()
                    .map(|id| (ReminderKind::LastCall, id)),
            );
        for (kind, match_id) in due {
            let players = self.db.missing_players(&match_id)?;
            if !players.is_empty() {
                reminders.push(Reminder {
                    kind,
                    match_id,
                    players,
                });
            }
        }

        let report = UpdateReport {
            started: transitions.started,
            finished: transitions.finished,
            finished_playoff: transitions.finished_playoff,
            reminders,
        };
        for id in &report.started {
            info!("Match {} started, predictions are closed", id);
        }
        for id in &report.finished {
            info!("Match {} finished", id);
        }
        for r in &report.reminders {
            info!(
                "Reminder ({:?}) for match {} to {} player(s)",
                r.kind,
                r.match_id,
                r.players.len()
            );
        }
        Ok(report)
    }

    /// Writes the results object to the configured file, if any.
    pub async fn write_results_file(&self, results: &ResultsTable) -> Result<()> {
        let Some(path) = &self.settings.results_file else {
            return Ok(());
        };
        let json = serde_json::to_vec(results).context("Failed to serialize results")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write results file {}", path.display()))?;
        info!("Results file dumped to {}", path.display());
        Ok(())
    }
}
