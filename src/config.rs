use crate::cadence::Platform;
use crate::guard::DEFAULT_THRESHOLD;
use crate::generator::DEFAULT_MAX_ATTEMPTS;
use crate::history::MAX_HISTORY;
use crate::prompt::DEFAULT_PROMPT_TEMPLATE;
use crate::scheduler::{RotationPolicy, ThemeRotation};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackendKind {
    Sqlite,
    Json,
}

impl FromStr for HistoryBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!("Unknown HISTORY_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Generate one week of posts and write the content calendar.
    Plan,
    /// Keep running and generate each day's posts as the day arrives.
    Daemon,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plan" => Ok(Self::Plan),
            "daemon" => Ok(Self::Daemon),
            other => Err(anyhow::anyhow!("Unknown RUN_MODE '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,

    pub history_backend: HistoryBackendKind,
    pub history_path: String,
    pub max_history: usize,
    pub similarity_threshold: f64,
    pub max_attempts: usize,

    pub rotation: ThemeRotation,
    pub platforms: Vec<Platform>,
    pub include_emojis: bool,

    pub company_name: String,
    pub product: String,
    pub vision: String,
    pub prompt_template: String,

    pub run_mode: RunMode,
    pub plan_horizon_days: usize,
    pub calendar_dir: String,
    pub daily_check_interval: Duration,
}

/// Parses `key` if set; a value that does not parse is an error, not a silent default.
fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value '{}' for {}: {}", raw, key, e)),
        Err(_) => Ok(default),
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_duration(key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = env_string(key, default);
    humantime::parse_duration(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} must be a duration like '30s' or '2m': {}", key, e))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let history_backend = match env::var("HISTORY_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => HistoryBackendKind::Sqlite,
        };
        let default_path = match history_backend {
            HistoryBackendKind::Sqlite => "data/post_history.db",
            HistoryBackendKind::Json => "post_history.json",
        };

        let similarity_threshold: f64 = match env::var("SIMILARITY_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SIMILARITY_THRESHOLD must be a number"))?,
            Err(_) => DEFAULT_THRESHOLD,
        };
        if !similarity_threshold.is_finite() || similarity_threshold < 0.0 {
            anyhow::bail!("SIMILARITY_THRESHOLD must be a non-negative finite number");
        }

        let max_history = env_or("MAX_HISTORY", MAX_HISTORY)?;
        if max_history == 0 {
            anyhow::bail!("MAX_HISTORY must be at least 1");
        }

        let run_mode = match env::var("RUN_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => RunMode::Plan,
        };

        Ok(Config {
            llm_url: env_string("LLM_URL", "http://localhost:8080/v1"),
            llm_model: env_string("LLM_MODEL", "local-model"),
            llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            llm_timeout: env_duration("LLM_TIMEOUT", "60s")?,

            history_backend,
            history_path: env_string("HISTORY_PATH", default_path),
            max_history,
            similarity_threshold,
            max_attempts: env_or("MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,

            rotation: Self::load_rotation(&env_string("THEMES_FILE", "themes.toml"))?,
            platforms: Self::parse_platforms(&env_string("PLATFORMS", "twitter"))?,
            include_emojis: env_or("INCLUDE_EMOJIS", true)?,

            company_name: env_string("COMPANY_NAME", "Treasure.Corp"),
            product: env_string("PRODUCT", "Data-driven treasury solutions for DAOs"),
            vision: env_string("VISION", "Treasury Clarity for the Decentralized World"),
            prompt_template: env_string("PROMPT_TEMPLATE", DEFAULT_PROMPT_TEMPLATE),

            run_mode,
            plan_horizon_days: env_or("PLAN_HORIZON_DAYS", 7)?,
            calendar_dir: env_string("CALENDAR_DIR", "."),
            daily_check_interval: env_duration("DAILY_CHECK_INTERVAL", "1h")?,
        })
    }

    fn parse_platforms(raw: &str) -> anyhow::Result<Vec<Platform>> {
        let mut platforms = Vec::new();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let platform: Platform = part.parse()?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        if platforms.is_empty() {
            anyhow::bail!("PLATFORMS must name at least one platform");
        }
        Ok(platforms)
    }

    /// Reads the theme rotation from a TOML file, falling back to the `THEMES`
    /// env var (comma separated) and then to the built-in weekly themes.
    pub fn load_rotation(path: &str) -> anyhow::Result<ThemeRotation> {
        #[derive(Deserialize)]
        struct ThemesFile {
            #[serde(default)]
            policy: RotationPolicy,
            themes: Vec<String>,
        }

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str::<ThemesFile>(&content) {
                Ok(file) => return Ok(ThemeRotation::new(file.themes, file.policy)?),
                Err(e) => warn!("Ignoring unreadable themes file {}: {}", path, e),
            }
        }

        if let Ok(env_themes) = env::var("THEMES") {
            let policy = env_or("THEME_POLICY", RotationPolicy::Weekday)?;
            let themes = env_themes.split(',').map(str::to_string).collect();
            return Ok(ThemeRotation::new(themes, policy)?);
        }

        Ok(ThemeRotation::default())
    }
}

impl FromStr for RotationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "weekday" => Ok(Self::Weekday),
            "round_robin" => Ok(Self::RoundRobin),
            other => Err(anyhow::anyhow!("Unknown theme policy '{}'", other)),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("llm_timeout", &self.llm_timeout)
            .field("history_backend", &self.history_backend)
            .field("history_path", &self.history_path)
            .field("max_history", &self.max_history)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("max_attempts", &self.max_attempts)
            .field("themes", &self.rotation.themes())
            .field("theme_policy", &self.rotation.policy())
            .field("platforms", &self.platforms)
            .field("include_emojis", &self.include_emojis)
            .field("company_name", &self.company_name)
            .field("product", &self.product)
            .field("vision", &self.vision)
            .field("run_mode", &self.run_mode)
            .field("plan_horizon_days", &self.plan_horizon_days)
            .field("calendar_dir", &self.calendar_dir)
            .field("daily_check_interval", &self.daily_check_interval)
            .finish()
    }
}
