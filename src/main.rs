use chrono::Local;
use herald::calendar::write_calendar;
use herald::config::{Config, RunMode};
use herald::llm::LlmContentGenerator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration: {:?}", config);

    let store = Arc::new(herald::open_history(&config)?);
    info!("Current post history contains {} posts", store.size());

    let content = Arc::new(LlmContentGenerator::from_config(&config));
    let campaign = herald::build_campaign(&config, store.clone(), content);

    match config.run_mode {
        RunMode::Plan => {
            let today = Local::now().date_naive();
            let planned = campaign.plan(today, config.plan_horizon_days).await;
            let accepted = planned.iter().filter(|p| p.outcome.is_ok()).count();

            let path = write_calendar(&config.calendar_dir, &planned, today)?;
            info!(
                "Wrote {}/{} posts to {}",
                accepted,
                planned.len(),
                path.display()
            );
            info!("Total posts in history: {}", store.size());
        }
        RunMode::Daemon => {
            info!(
                "Starting daily campaign loop (checking every {:?})",
                config.daily_check_interval
            );
            campaign.run(config.daily_check_interval).await;
        }
    }

    Ok(())
}
