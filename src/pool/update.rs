use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::tournament::{Match, MatchId, Matches};

/// How long before kick-off reminders go out.
#[derive(Debug, Clone, Copy)]
pub struct ReminderWindows {
    pub last_call: Duration,
    pub day_before: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DayBefore,
    LastCall,
}

/// Players that still have no prediction for a match about to start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub kind: ReminderKind,
    pub match_id: MatchId,
    pub players: Vec<i64>,
}

/// What one update cycle found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    /// Kicked off since the last cycle, predictions can be revealed
    pub started: Vec<MatchId>,
    pub finished: Vec<MatchId>,
    pub finished_playoff: Vec<MatchId>,
    pub reminders: Vec<Reminder>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.finished.is_empty() && self.reminders.is_empty()
    }
}

/// Match transitions seen by [`UpdateTracker::advance`].
#[derive(Debug, Default, PartialEq)]
pub struct Transitions {
    pub started: Vec<MatchId>,
    pub finished: Vec<MatchId>,
    pub finished_playoff: Vec<MatchId>,
    pub remind_day_before: Vec<MatchId>,
    pub remind_last_call: Vec<MatchId>,
}

/// Remembers which matches were already announced, reminded or closed so
/// each transition is reported once.
#[derive(Debug, Default)]
pub struct UpdateTracker {
    to_notify: HashSet<MatchId>,
    in_progress: HashSet<MatchId>,
    to_remind: HashSet<MatchId>,
    to_remind_day: HashSet<MatchId>,
}

fn ids<'a>(matches: impl IntoIterator<Item = &'a Match>) -> HashSet<MatchId> {
    matches.into_iter().map(|m| m.id().clone()).collect()
}

impl UpdateTracker {
    pub fn new(matches: &Matches, now: DateTime<Utc>, windows: ReminderWindows) -> Self {
        let tracker = UpdateTracker {
            to_notify: ids(matches.matches_after(now, None)),
            in_progress: ids(
                matches
                    .matches_before(now)
                    .into_iter()
                    .filter(|m| !m.is_finished()),
            ),
            to_remind: ids(matches.matches_after(now + windows.last_call, None)),
            to_remind_day: ids(matches.matches_after(now + windows.day_before, None)),
        };
        info!(
            "Update tracker: {} to notify, {} in progress, {} to remind, {} to remind a day before",
            tracker.to_notify.len(),
            tracker.in_progress.len(),
            tracker.to_remind.len(),
            tracker.to_remind_day.len()
        );
        tracker
    }

    /// Moves matches along as time passes and results arrive.
    pub fn advance(
        &mut self,
        matches: &Matches,
        now: DateTime<Utc>,
        windows: ReminderWindows,
    ) -> Transitions {
        let mut t = Transitions::default();

        for m in matches.matches_before(now) {
            if self.to_notify.remove(m.id()) {
                self.in_progress.insert(m.id().clone());
                t.started.push(m.id().clone());
            }
        }
        for m in matches.matches_before(now + windows.last_call) {
            if self.to_remind.remove(m.id()) {
                t.remind_last_call.push(m.id().clone());
            }
        }
        for m in matches.matches_before(now + windows.day_before) {
            if self.to_remind_day.remove(m.id()) {
                t.remind_day_before.push(m.id().clone());
            }
        }

        let mut in_progress: Vec<&MatchId> = self.in_progress.iter().collect();
        in_progress.sort();
        for id in in_progress {
            // A match dropped from the feed stays pending.
            let Ok(m) = matches.get(id) else { continue };
            if m.is_finished() {
                t.finished.push(id.clone());
                if m.is_playoff() {
                    t.finished_playoff.push(id.clone());
                }
            }
        }
        for id in &t.finished {
            self.in_progress.remove(id);
        }
        t
    }
}
