use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share of the weekday volume posted on Saturday and Sunday.
pub const DEFAULT_WEEKEND_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    LinkedIn,
    Telegram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
            Platform::Telegram => "telegram",
        }
    }

    /// Advisory length limit handed to the generator; never enforced here.
    pub fn max_chars(&self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::LinkedIn => 3000,
            Platform::Telegram => 4096,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::LinkedIn),
            "telegram" => Ok(Platform::Telegram),
            other => Err(anyhow::anyhow!("Unknown platform '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostingSlot {
    pub platform: Platform,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: Priority,
    /// Rotates through the cadence's content mix so posts within a day differ.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlatformCadence {
    pub platform: Platform,
    pub posts_per_day: usize,
    pub optimal_times: Vec<NaiveTime>,
    pub weekend_factor: f64,
    pub content_mix: Vec<String>,
}

fn mix(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn times(raw: &[(u32, u32)]) -> Vec<NaiveTime> {
    raw.iter()
        .filter_map(|(h, m)| NaiveTime::from_hms_opt(*h, *m, 0))
        .collect()
}

impl PlatformCadence {
    pub fn default_for(platform: Platform) -> Self {
        let (posts_per_day, optimal_times, content_mix) = match platform {
            Platform::Twitter => (
                8,
                times(&[(6, 0), (9, 0), (12, 0), (15, 0), (18, 0), (20, 0), (22, 0), (0, 0)]),
                mix(&["breaking_news", "insights", "threads", "engagement", "retweets"]),
            ),
            Platform::LinkedIn => (
                3,
                times(&[(8, 0), (12, 0), (17, 0)]),
                mix(&[
                    "thought_leadership",
                    "case_studies",
                    "market_analysis",
                    "company_updates",
                    "educational",
                ]),
            ),
            Platform::Telegram => (
                6,
                times(&[(7, 0), (11, 0), (14, 0), (17, 0), (20, 0), (23, 0)]),
                mix(&[
                    "alpha_calls",
                    "community_updates",
                    "dao_alerts",
                    "market_signals",
                    "memes_gifs",
                ]),
            ),
        };
        Self {
            platform,
            posts_per_day,
            optimal_times,
            weekend_factor: DEFAULT_WEEKEND_FACTOR,
            content_mix,
        }
    }

    /// Number of posts due on `date`, reduced on weekends and capped by the time table.
    pub fn posts_on(&self, date: NaiveDate) -> usize {
        let base = match date.weekday() {
            Weekday::Sat | Weekday::Sun => {
                (self.posts_per_day as f64 * self.weekend_factor).floor() as usize
            }
            _ => self.posts_per_day,
        };
        base.min(self.optimal_times.len())
    }

    pub fn daily_slots(&self, date: NaiveDate) -> Vec<PostingSlot> {
        let count = self.posts_on(date);
        self.optimal_times
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, time)| PostingSlot {
                platform: self.platform,
                date,
                time: *time,
                priority: if i < count / 2 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                content_type: if self.content_mix.is_empty() {
                    None
                } else {
                    Some(self.content_mix[i % self.content_mix.len()].clone())
                },
            })
            .collect()
    }
}
