use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use quip::application::{DetectionDispatcher, ExpiringBoundedCache, IncrementalWatcher};
use quip::infrastructure::{
    AppConfig, CliArgs, Command, ConsoleAnnotator, HttpOracleClient, JsonFileStore,
    StaticDocument, StorageManager, fingerprinter_for,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let manager = StorageManager::new()?;
    let mut config = manager.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn open_cache(config: &AppConfig) -> Arc<ExpiringBoundedCache> {
    let store = config
        .cache
        .path
        .clone()
        .map_or_else(JsonFileStore::default_location, JsonFileStore::new);
    info!(path = %store.path().display(), "Using result store");
    let cache = ExpiringBoundedCache::new(Arc::new(store), config.cache.policy());
    info!(
        max_entries = cache.policy().max_entries,
        ttl_days = cache.policy().ttl.num_days(),
        "Result cache ready"
    );
    Arc::new(cache)
}

async fn scan(config: &AppConfig, cache: Arc<ExpiringBoundedCache>, urls: Vec<String>) -> Result<()> {
    let removed = cache.prune().await.wrap_err("failed to prune result cache")?;
    info!(removed, "Pruned result cache");

    let oracle = HttpOracleClient::with_base_url(&config.oracle.base_url, config.oracle.timeout_secs)?;
    let fingerprinter = fingerprinter_for(config.detection.fingerprint, config.oracle.timeout_secs)?;
    let dispatcher = DetectionDispatcher::new(
        cache.clone(),
        Arc::new(oracle),
        fingerprinter,
        Arc::new(ConsoleAnnotator::default()),
    );
    dispatcher.set_enabled(config.detection.enabled);

    let document = Arc::new(StaticDocument::from_urls(urls));
    let watcher = IncrementalWatcher::new(
        dispatcher.clone(),
        document,
        config.watcher.watcher_config(),
    );

    let (events, rx) = mpsc::unbounded_channel();
    let handle = watcher.start(rx)?;
    drop(events);
    handle.await?;
    dispatcher.wait_idle().await;

    println!("{}", dispatcher.stats());
    println!("cache: {}", cache.stats());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = quip::VERSION, "Starting {}", quip::NAME);

    let cache = open_cache(&config);

    match args.command {
        Command::Scan { urls } => scan(&config, cache, urls).await?,
        Command::Prune => {
            let removed = cache.prune().await?;
            println!("removed {removed} entries");
        }
        Command::Stats => {
            let entries = cache.len().await?;
            println!("{entries} cached verdicts");
        }
    }

    Ok(())
}
