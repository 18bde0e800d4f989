use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Urgency level of a notification.
///
/// Variants are declared lowest first so the derived `Ord` ranks
/// `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    /// Background updates
    Minimal,
    /// Motivation messages, suggestions
    Low,
    /// Regular reminders
    Normal,
    /// VIP contacts, near deadlines
    High,
    /// Streak warnings, urgent reminders. The only level allowed to bypass
    /// quiet hours.
    Critical,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 5] = [
        PriorityLevel::Minimal,
        PriorityLevel::Low,
        PriorityLevel::Normal,
        PriorityLevel::High,
        PriorityLevel::Critical,
    ];

    /// Nominal score of the level on the 0..1 scale.
    pub fn base_score(self) -> f64 {
        match self {
            PriorityLevel::Critical => 1.0,
            PriorityLevel::High => 0.75,
            PriorityLevel::Normal => 0.5,
            PriorityLevel::Low => 0.25,
            PriorityLevel::Minimal => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityLevel::Minimal => "minimal",
            PriorityLevel::Low => "low",
            PriorityLevel::Normal => "normal",
            PriorityLevel::High => "high",
            PriorityLevel::Critical => "critical",
        }
    }

    pub fn is_critical(self) -> bool {
        self == PriorityLevel::Critical
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown priority level '{0}' (expected minimal, low, normal, high or critical)")]
pub struct ParseLevelError(String);

impl FromStr for PriorityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriorityLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}
