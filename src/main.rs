use clap::Parser;
use job_watcher::fetcher::Fetcher;
use job_watcher::notifier::{LogNotifier, TelegramNotifier};
use job_watcher::render::ChromiumRenderer;
use job_watcher::store::SqliteStorage;
use job_watcher::{run_watcher, RunOptions, Settings, WatcherConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Check the configured careers pages once and report new postings.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Job list in JSON
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Sqlite file with the seen postings, overrides DATABASE_PATH
    #[arg(short, long)]
    database: Option<String>,

    /// Log the message instead of sending it to Telegram
    #[arg(long)]
    dry_run: bool,

    /// Keep going when a single page cannot be fetched
    #[arg(long)]
    isolate_failures: bool,

    /// Seconds to wait for the browser fallback
    #[arg(long, default_value_t = 30)]
    render_timeout: u64,

    /// Launch the fallback browser without its sandbox, needed when running as root
    #[arg(long)]
    no_sandbox: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn,chromiumoxide=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();
    let config = WatcherConfig::load(&args.config).await?;
    info!("Loaded {} jobs from {}", config.jobs.len(), args.config.display());

    let database = args.database.as_deref().unwrap_or(&settings.database_path);
    let storage = SqliteStorage::new(database).await?;
    let mut renderer = ChromiumRenderer::with_timeout(Duration::from_secs(args.render_timeout));
    if args.no_sandbox {
        renderer = renderer.without_sandbox();
    }
    let fetcher = Fetcher::new(renderer)?;
    let options = RunOptions {
        isolate_failures: args.isolate_failures,
    };

    let report = if args.dry_run {
        run_watcher(&config.jobs, &fetcher, &storage, &LogNotifier, options).await?
    } else {
        let (token, chat_id) = settings.telegram()?;
        let notifier = TelegramNotifier::new(token, chat_id);
        run_watcher(&config.jobs, &fetcher, &storage, &notifier, options).await?
    };

    info!(
        "Checked {} jobs, {} matching links, {} new",
        report.jobs, report.candidates, report.new_postings
    );
    if !report.failed_jobs.is_empty() {
        info!("Skipped: {}", report.failed_jobs.join(", "));
    }

    Ok(())
}
