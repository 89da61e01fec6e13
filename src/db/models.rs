use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::scoring::MatchResult;
use crate::tournament::{FixtureId, MatchId};

/// Player id of the automatic bettor.
pub const BOT_PLAYER_ID: i64 = -999_999_999;

/// A registered pool participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Overrides first/last name when set
    pub display_name: Option<String>,
    /// Cosmetic honor set by the admin
    pub is_queen: bool,
    /// Places automatic bets
    pub is_bot: bool,
    /// IANA zone name, e.g. "Europe/Moscow"
    pub timezone: Option<String>,
}

impl Player {
    pub fn new(id: i64, first_name: Option<&str>, last_name: Option<&str>) -> Self {
        Player {
            id,
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            display_name: None,
            is_queen: false,
            is_bot: false,
            timezone: None,
        }
    }

    /// The automatic 1-0 bettor, shown as "<name> Bot".
    pub fn bot(name: &str) -> Self {
        Player {
            is_bot: true,
            ..Player::new(BOT_PLAYER_ID, Some(name), Some("Bot"))
        }
    }

    /// Display name, else "first last", else whichever part exists.
    pub fn name(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            (Some(first), _) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.id_label(),
        }
    }

    pub fn short_name(&self) -> String {
        self.first_name
            .as_ref()
            .or(self.last_name.as_ref())
            .or(self.display_name.as_ref())
            .cloned()
            .unwrap_or_else(|| self.id_label())
    }

    fn id_label(&self) -> String {
        format!("<id: {}>", self.id)
    }

    /// The player's zone, or `default` when unset or unknown.
    pub fn tz(&self, default: Tz) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(default)
    }
}

/// One stored prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub player_id: i64,
    pub match_id: MatchId,
    pub result: MatchResult,
    pub submitted_at: DateTime<Utc>,
}

// Results are stored as their text form, "2 - 1 (1)".
impl ToSql for MatchResult {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for MatchResult {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for FixtureId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FixtureId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(FixtureId::from(n)),
            other => other.as_str().map(FixtureId::from),
        }
    }
}
