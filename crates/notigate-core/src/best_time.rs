//! Best-time heuristic for deferred delivery.
//!
//! Picks the next whole hour aligned with the user's most active hours, or
//! with a per-category default when no engagement data is available.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::local_instant;

/// Hours used for categories without their own default.
pub const FALLBACK_HOURS: [u8; 3] = [10, 14, 18];

/// Known notification categories and their stable tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    ContactReminder,
    GoalReminder,
    HabitReminder,
    ActivitySuggestion,
    GoOutside,
    ContactCompleted,
    WeeklySummary,
    Motivation,
    AiGoalMotivation,
    AiHabitSuggestion,
    AiContactMessage,
    GeofenceHome,
    GeofenceActivity,
    StreakWarning,
    BadgeEarned,
    LevelUp,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 16] = [
        NotificationCategory::ContactReminder,
        NotificationCategory::GoalReminder,
        NotificationCategory::HabitReminder,
        NotificationCategory::ActivitySuggestion,
        NotificationCategory::GoOutside,
        NotificationCategory::ContactCompleted,
        NotificationCategory::WeeklySummary,
        NotificationCategory::Motivation,
        NotificationCategory::AiGoalMotivation,
        NotificationCategory::AiHabitSuggestion,
        NotificationCategory::AiContactMessage,
        NotificationCategory::GeofenceHome,
        NotificationCategory::GeofenceActivity,
        NotificationCategory::StreakWarning,
        NotificationCategory::BadgeEarned,
        NotificationCategory::LevelUp,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            NotificationCategory::ContactReminder => "CONTACT_REMINDER",
            NotificationCategory::GoalReminder => "GOAL_REMINDER",
            NotificationCategory::HabitReminder => "HABIT_REMINDER",
            NotificationCategory::ActivitySuggestion => "ACTIVITY_SUGGESTION",
            NotificationCategory::GoOutside => "GO_OUTSIDE",
            NotificationCategory::ContactCompleted => "CONTACT_COMPLETED",
            NotificationCategory::WeeklySummary => "WEEKLY_SUMMARY",
            NotificationCategory::Motivation => "MOTIVATION",
            NotificationCategory::AiGoalMotivation => "AI_GOAL_MOTIVATION",
            NotificationCategory::AiHabitSuggestion => "AI_HABIT_SUGGESTION",
            NotificationCategory::AiContactMessage => "AI_CONTACT_MESSAGE",
            NotificationCategory::GeofenceHome => "GEOFENCE_HOME",
            NotificationCategory::GeofenceActivity => "GEOFENCE_ACTIVITY",
            NotificationCategory::StreakWarning => "STREAK_WARNING",
            NotificationCategory::BadgeEarned => "BADGE_EARNED",
            NotificationCategory::LevelUp => "LEVEL_UP",
        }
    }

    /// Case-insensitive lookup by tag. `None` for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.tag().eq_ignore_ascii_case(tag))
    }

    /// Preferred delivery hours when no engagement data exists.
    pub fn default_hours(self) -> &'static [u8] {
        match self {
            NotificationCategory::ContactReminder | NotificationCategory::GoalReminder => {
                &[9, 10, 11]
            }
            NotificationCategory::HabitReminder => &[20, 21],
            NotificationCategory::ActivitySuggestion | NotificationCategory::GoOutside => {
                &[14, 15, 16]
            }
            NotificationCategory::Motivation => &[8, 9],
            NotificationCategory::WeeklySummary => &[20],
            _ => &FALLBACK_HOURS,
        }
    }

    /// Default hours for an arbitrary tag.
    pub fn default_hours_for(tag: &str) -> &'static [u8] {
        Self::from_tag(tag).map_or(&FALLBACK_HOURS[..], Self::default_hours)
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Computes the next delivery instant for a category.
#[derive(Debug, Clone, Copy)]
pub struct BestTimeScheduler {
    timezone: Tz,
}

impl BestTimeScheduler {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Next best instant strictly after `now`.
    ///
    /// Uses `active_hours` when it holds any valid hour (0..24), otherwise the
    /// category's default hours. Takes the smallest hour greater than the
    /// current local hour; wraps to the smallest hour on the next day. Falls
    /// back to one hour from now if the result is not in the future.
    pub fn best_time(&self, category: &str, active_hours: &[u8], now: DateTime<Utc>) -> DateTime<Utc> {
        let mut hours: Vec<u8> = active_hours.iter().copied().filter(|h| *h < 24).collect();
        if hours.is_empty() {
            hours = NotificationCategory::default_hours_for(category).to_vec();
        }
        hours.sort_unstable();
        hours.dedup();

        let fallback = now + Duration::hours(1);
        let local = now.with_timezone(&self.timezone);
        let current = local.hour();

        let (hour, date) = match hours.iter().find(|h| u32::from(**h) > current) {
            Some(h) => (*h, local.date_naive()),
            None => match (hours.first(), local.date_naive().succ_opt()) {
                (Some(h), Some(next_day)) => (*h, next_day),
                _ => return fallback,
            },
        };

        let target = NaiveTime::from_hms_opt(u32::from(hour), 0, 0)
            .and_then(|time| local_instant(&self.timezone, date, time));
        match target {
            Some(target) if target > now => target,
            _ => fallback,
        }
    }
}
