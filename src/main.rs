use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_digest::config::{self, Config, Settings};
use feed_digest::fetcher::Fetcher;
use feed_digest::llm::ReportGenerator;
use feed_digest::report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_digest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("FEED_DIGEST_CONFIG")
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_FILE.to_string());
    let config = Config::load_or_default(&config_path)?;

    let env_vars = config::load_env_file(&config.env_file)?;
    let settings = Settings::from_process_env(&config, &env_vars);

    let feeds = config::load_feed_list(&config.feeds_file)?;
    let template = config::load_prompt_template(&config.prompt_template_file)?;
    info!("Loaded {} feeds from configuration", feeds.len());

    let today = report::today_utc();

    let fetcher = Fetcher::new().context("Failed to create HTTP client")?;
    let articles = fetcher.fetch_articles(&feeds, config.max_articles).await;

    let generator = ReportGenerator::new(settings).context("Failed to create HTTP client")?;
    let report_md = generator
        .generate_report_md(&articles, &template, &today)
        .await
        .context("Failed to generate report")?;

    report::save_report(&config.output_dir, &today, &report_md)
        .context("Failed to save report")?;

    Ok(())
}
