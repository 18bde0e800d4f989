//! Producer-side helpers that turn domain signals into a [`Priority`].
//!
//! Each factor contributes `value * weight` to the weighted score. Levels
//! follow fixed thresholds per notification kind.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Priority, PriorityLevel};

/// Signals that raise a notification's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFactor {
    VipContact,
    DaysOverdue,
    RelationshipImportance,
    ContactFrequency,
    TimeSensitive,
    Deadline,
    StreakAtRisk,
    UserEngagement,
    HistoricalResponse,
    UserPreference,
    OptimalTime,
    LocationRelevant,
    ContextAppropriate,
    MilestoneAchieved,
    GoalProgress,
    HabitStreak,
}

impl PriorityFactor {
    pub fn weight(self) -> f64 {
        match self {
            PriorityFactor::VipContact => 0.3,
            PriorityFactor::DaysOverdue => 0.25,
            PriorityFactor::RelationshipImportance => 0.2,
            PriorityFactor::ContactFrequency => 0.15,
            PriorityFactor::TimeSensitive => 0.35,
            PriorityFactor::Deadline => 0.3,
            PriorityFactor::StreakAtRisk => 0.35,
            PriorityFactor::UserEngagement => 0.25,
            PriorityFactor::HistoricalResponse => 0.2,
            PriorityFactor::UserPreference => 0.25,
            PriorityFactor::OptimalTime => 0.2,
            PriorityFactor::LocationRelevant => 0.15,
            PriorityFactor::ContextAppropriate => 0.15,
            PriorityFactor::MilestoneAchieved => 0.3,
            PriorityFactor::GoalProgress => 0.2,
            PriorityFactor::HabitStreak => 0.25,
        }
    }
}

/// One factor's measured value and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: PriorityFactor,
    /// Measured value in `[0, 1]`
    pub value: f64,
    pub weight: f64,
}

impl FactorScore {
    pub fn new(factor: PriorityFactor, value: f64) -> Self {
        Self {
            factor,
            value: value.clamp(0.0, 1.0),
            weight: factor.weight(),
        }
    }

    pub fn contribution(&self) -> f64 {
        self.value * self.weight
    }
}

/// How often a contact should be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactFrequency {
    Daily,
    TwoDays,
    ThreeDays,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl ContactFrequency {
    pub fn priority_score(self) -> f64 {
        match self {
            ContactFrequency::Daily => 1.0,
            ContactFrequency::TwoDays => 0.95,
            ContactFrequency::ThreeDays => 0.9,
            ContactFrequency::Weekly => 0.8,
            ContactFrequency::Biweekly => 0.6,
            ContactFrequency::Monthly => 0.4,
            ContactFrequency::Quarterly => 0.2,
            ContactFrequency::Yearly => 0.1,
        }
    }
}

/// Priority presets for the notification kinds producers emit.
pub struct PriorityCalculator;

impl PriorityCalculator {
    /// Contact reminder. Valid for 24 hours.
    pub fn contact_reminder(
        is_vip: bool,
        days_overdue: u32,
        frequency: ContactFrequency,
        last_engagement: f64,
        now: DateTime<Utc>,
    ) -> Priority {
        let mut factors = Vec::with_capacity(4);
        if is_vip {
            factors.push(FactorScore::new(PriorityFactor::VipContact, 1.0));
        }
        // Two weeks overdue saturates the factor.
        factors.push(FactorScore::new(
            PriorityFactor::DaysOverdue,
            (days_overdue as f64 / 14.0).min(1.0),
        ));
        factors.push(FactorScore::new(
            PriorityFactor::ContactFrequency,
            frequency.priority_score(),
        ));
        factors.push(FactorScore::new(PriorityFactor::UserEngagement, last_engagement));

        let level = if (is_vip && days_overdue > 7) || days_overdue > 10 {
            PriorityLevel::High
        } else if days_overdue > 5 {
            PriorityLevel::Normal
        } else {
            PriorityLevel::Low
        };

        Priority::from_factors(level, factors).with_expiry(now + Duration::hours(24))
    }

    /// Goal deadline reminder. Valid for 24 hours.
    pub fn goal_reminder(
        days_until_deadline: i64,
        progress: f64,
        now: DateTime<Utc>,
    ) -> Priority {
        let deadline_score = match days_until_deadline {
            d if d <= 3 => 1.0,
            d if d <= 7 => 0.7,
            d if d <= 14 => 0.5,
            _ => 0.3,
        };
        let factors = vec![
            FactorScore::new(PriorityFactor::Deadline, deadline_score),
            FactorScore::new(PriorityFactor::GoalProgress, progress),
        ];

        let level = match days_until_deadline {
            d if d <= 3 => PriorityLevel::High,
            d if d <= 7 => PriorityLevel::Normal,
            _ => PriorityLevel::Low,
        };

        Priority::from_factors(level, factors).with_expiry(now + Duration::hours(24))
    }

    /// Streak warning. Critical once the streak is longer than a week;
    /// expires when the streak window closes.
    pub fn streak_warning(current_streak: u32, hours_remaining: u32, now: DateTime<Utc>) -> Priority {
        let factors = vec![
            FactorScore::new(
                PriorityFactor::HabitStreak,
                (current_streak as f64 / 30.0).min(1.0),
            ),
            FactorScore::new(
                PriorityFactor::TimeSensitive,
                if hours_remaining <= 3 { 1.0 } else { 0.6 },
            ),
        ];

        let level = if current_streak > 7 {
            PriorityLevel::Critical
        } else {
            PriorityLevel::High
        };

        Priority::from_factors(level, factors)
            .with_expiry(now + Duration::hours(i64::from(hours_remaining)))
    }

    /// Activity/motivation suggestion. Always low; valid for 2 hours.
    pub fn suggestion(context_score: f64, last_shown_hours_ago: u32, now: DateTime<Utc>) -> Priority {
        let factors = vec![
            FactorScore::new(PriorityFactor::ContextAppropriate, context_score),
            FactorScore::new(
                PriorityFactor::OptimalTime,
                (last_shown_hours_ago as f64 / 24.0).min(1.0),
            ),
        ];

        Priority::from_factors(PriorityLevel::Low, factors).with_expiry(now + Duration::hours(2))
    }
}
