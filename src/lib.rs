pub mod cadence;
pub mod calendar;
pub mod campaign;
pub mod config;
pub mod db;
pub mod generator;
pub mod guard;
pub mod history;
pub mod llm;
pub mod prompt;
pub mod scheduler;
pub mod similarity;

use crate::cadence::PlatformCadence;
use crate::campaign::Campaign;
use crate::config::{Config, HistoryBackendKind};
use crate::generator::{ContentGenerator, UniquePostGenerator};
use crate::guard::DuplicateGuard;
use crate::history::{json::JsonFileBackend, HistoryBackend, HistoryStore};
use anyhow::Context as AnyhowContext;
use std::path::Path;
use std::sync::Arc;

/// Opens the configured backend and loads the history from it.
pub fn open_history(config: &Config) -> anyhow::Result<HistoryStore> {
    let backend: Box<dyn HistoryBackend> = match config.history_backend {
        HistoryBackendKind::Sqlite => {
            if let Some(parent) = Path::new(&config.history_path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history dir {}", parent.display())
                })?;
            }
            let db = db::Database::open(&config.history_path)
                .with_context(|| format!("Failed to open {}", config.history_path))?;
            Box::new(db)
        }
        HistoryBackendKind::Json => Box::new(JsonFileBackend::new(&config.history_path)),
    };
    Ok(HistoryStore::load(backend, config.max_history))
}

pub fn build_campaign(
    config: &Config,
    store: Arc<HistoryStore>,
    content: Arc<dyn ContentGenerator>,
) -> Campaign {
    let generator = UniquePostGenerator::new(
        store,
        content,
        Arc::new(DuplicateGuard::new(config.similarity_threshold)),
        config.llm_timeout,
    );
    let cadences = config
        .platforms
        .iter()
        .map(|p| PlatformCadence::default_for(*p))
        .collect();

    Campaign::new(
        generator,
        config.rotation.clone(),
        cadences,
        config.max_attempts,
    )
    .with_emojis(config.include_emojis)
}
