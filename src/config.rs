use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::pool::{PoolSettings, ReminderWindows};
use crate::scoring::{ExtraScoreMode, ScoreMode, ScoringPolicy};

/// Where tournament fixtures come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FixturesSource {
    /// Tournament-data JSON file
    File,
    /// api-football over RapidAPI
    ApiFootball,
}

/// Football prediction pool
#[derive(Parser, Debug, Clone)]
#[command(name = "betpool-bot", version, about)]
pub struct Config {
    /// Scoring mode: fixed points or relative (fsnorm)
    #[arg(long, env = "SCORE_MODE", value_enum, default_value = "default")]
    pub score_mode: ScoreMode,

    /// Which goals count for a playoff draw settled by a decider
    #[arg(long, env = "EXTRA_SCORE_MODE", value_enum, default_value = "default")]
    pub extra_score_mode: ExtraScoreMode,

    /// Player id of the pool admin
    #[arg(long, env = "ADMIN_ID")]
    pub admin_id: i64,

    /// IANA timezone for players without one and for match summaries
    #[arg(long, env = "DEFAULT_TIMEZONE", default_value = "Europe/Moscow")]
    pub default_timezone: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    #[arg(long, env = "FIXTURES_SOURCE", value_enum, default_value = "file")]
    pub fixtures_source: FixturesSource,

    /// Tournament-data JSON used by the file source
    #[arg(long, env = "FIXTURES_FILE", default_value = "fixtures.json")]
    pub fixtures_file: PathBuf,

    #[arg(
        long,
        env = "API_FOOTBALL_URL",
        default_value = "https://api-football-v1.p.rapidapi.com/v2"
    )]
    pub api_football_url: String,

    /// RapidAPI key (required for the api-football source)
    #[arg(long, env = "API_TOKEN")]
    pub api_token: Option<String>,

    #[arg(long, env = "LEAGUE_ID", default_value = "511")]
    pub league_id: u32,

    /// Results JSON dumped after every update
    #[arg(long, env = "RESULTS_FILE", default_value = "results.json")]
    pub results_file: PathBuf,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Update job period in seconds
    #[arg(long, env = "UPDATE_INTERVAL_SECS", default_value = "60")]
    pub update_interval_secs: u64,

    /// Last-call reminder, minutes before kick-off
    #[arg(long, env = "REMIND_BEFORE_MINS", default_value = "30")]
    pub remind_before_mins: i64,

    /// Day-before reminder, hours before kick-off
    #[arg(long, env = "REMIND_DAY_BEFORE_HOURS", default_value = "24")]
    pub remind_day_before_hours: i64,

    /// How many days ahead matches are open for betting
    #[arg(long, env = "UPCOMING_DAYS_LIMIT", default_value = "60")]
    pub upcoming_days_limit: i64,

    #[arg(long, env = "MATCHES_PER_PAGE", default_value = "8")]
    pub matches_per_page: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_timezone.parse::<Tz>().is_err() {
            anyhow::bail!("unknown default timezone {:?}", self.default_timezone);
        }
        if self.update_interval_secs == 0 {
            anyhow::bail!("update_interval_secs must be positive");
        }
        if self.matches_per_page == 0 {
            anyhow::bail!("matches_per_page must be positive");
        }
        if self.remind_before_mins < 0 || self.remind_day_before_hours < 0 {
            anyhow::bail!("reminder windows must not be negative");
        }
        if self.fixtures_source == FixturesSource::ApiFootball && self.api_token.is_none() {
            anyhow::bail!("API_TOKEN is required for the api-football fixtures source");
        }
        Ok(())
    }

    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            score_mode: self.score_mode,
            extra_score_mode: self.extra_score_mode,
        }
    }

    pub fn default_tz(&self) -> anyhow::Result<Tz> {
        self.default_timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown default timezone {:?}", self.default_timezone))
    }

    pub fn pool_settings(&self) -> anyhow::Result<PoolSettings> {
        Ok(PoolSettings {
            admin_id: self.admin_id,
            default_tz: self.default_tz()?,
            upcoming_days_limit: self.upcoming_days_limit,
            matches_per_page: self.matches_per_page,
            results_file: Some(self.results_file.clone()),
            reminders: ReminderWindows {
                last_call: chrono::Duration::minutes(self.remind_before_mins),
                day_before: chrono::Duration::hours(self.remind_day_before_hours),
            },
        })
    }
}
