//! Weekly theme rotation.
//!
//! A rotation is a fixed, ordered list of theme labels. With the weekday
//! policy, index 0 is Monday; with round-robin, index 0 is the first day of
//! the requested horizon. One call never repeats a theme.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_THEMES: [&str; 7] = [
    "Brand & Product",
    "Treasury Education",
    "Community Questions",
    "Industry Insights",
    "Governance Engagement",
    "Treasury Management Polls",
    "DAO Wisdom & Motivation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Theme picked by the date's weekday (Monday = 0).
    #[default]
    Weekday,
    /// Theme picked by the day's position within the horizon.
    RoundRobin,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("theme rotation must contain at least one theme")]
    EmptyRotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSlot {
    pub date: NaiveDate,
    pub day_offset: u32,
    pub theme: String,
}

#[derive(Debug, Clone)]
pub struct ThemeRotation {
    themes: Vec<String>,
    policy: RotationPolicy,
}

impl ThemeRotation {
    pub fn new(themes: Vec<String>, policy: RotationPolicy) -> Result<Self, SchedulerError> {
        let themes: Vec<String> = themes
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if themes.is_empty() {
            return Err(SchedulerError::EmptyRotation);
        }
        Ok(Self { themes, policy })
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    fn weekday_index(&self, date: NaiveDate) -> usize {
        date.weekday().num_days_from_monday() as usize % self.themes.len()
    }

    /// Theme for a single day, by weekday regardless of policy.
    pub fn theme_for(&self, date: NaiveDate) -> &str {
        &self.themes[self.weekday_index(date)]
    }

    /// One slot per consecutive day starting at `start_day`, at most one per theme.
    pub fn themes_for_horizon(&self, start_day: NaiveDate, horizon: usize) -> Vec<ScheduledSlot> {
        let count = horizon.min(self.themes.len());
        (0..count)
            .map_while(|i| {
                let date = start_day.checked_add_days(Days::new(i as u64))?;
                let index = match self.policy {
                    RotationPolicy::Weekday => self.weekday_index(date),
                    RotationPolicy::RoundRobin => i % self.themes.len(),
                };
                Some(ScheduledSlot {
                    date,
                    day_offset: i as u32,
                    theme: self.themes[index].clone(),
                })
            })
            .collect()
    }
}

impl Default for ThemeRotation {
    fn default() -> Self {
        Self {
            themes: DEFAULT_THEMES.iter().map(|t| t.to_string()).collect(),
            policy: RotationPolicy::Weekday,
        }
    }
}
