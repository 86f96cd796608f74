//! Process wiring: builds the dispatcher and runs the bot

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::Bot;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::dispatcher::{DispatchSettings, Dispatcher, DownloadOutcome, WorkerPool};
use crate::engine::{DownloadEngine, YtDlpEngine};
use crate::observability::Metrics;
use crate::router::Router;
use crate::{server, telegram};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("TELEGRAM_BOT_TOKEN is not set")]
    MissingToken,

    #[error("failed to create download directory {path}: {source}")]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download failed: {0}")]
    Download(String),
}

/// Build a dispatcher with the given engine. Must run inside a Tokio runtime.
pub fn build_dispatcher(
    config: &Config,
    engine: Arc<dyn DownloadEngine>,
    metrics: Arc<Metrics>,
) -> Result<Dispatcher, AppError> {
    let dir = &config.download.dir;
    std::fs::create_dir_all(dir).map_err(|source| AppError::DownloadDir {
        path: dir.clone(),
        source,
    })?;

    let pool = WorkerPool::start(config.download.pool_size);
    Ok(Dispatcher::new(
        pool,
        engine,
        DispatchSettings::from_config(config),
        metrics,
    ))
}

/// Run the Telegram bot until interrupted
pub async fn run(config: Config) -> Result<(), AppError> {
    info!("Starting the bot");

    let token = config.telegram.token.clone().ok_or(AppError::MissingToken)?;
    let metrics = Arc::new(Metrics::new());

    let engine = Arc::new(YtDlpEngine::new(&config.engine));
    let dispatcher = Arc::new(build_dispatcher(&config, engine, Arc::clone(&metrics))?);

    if let Some(address) = config.health.bind_addr {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            if let Err(e) = server::serve_health(address, metrics).await {
                error!(error = %e, "Health endpoint stopped");
            }
        });
    }

    let bot = Bot::new(token);
    let chat = Arc::new(telegram::TelegramChat::new(bot.clone()));
    let router = Arc::new(Router::new(chat, Arc::clone(&dispatcher)));

    telegram::run(bot, router).await;

    dispatcher.shutdown().await;
    info!(metrics = ?metrics.snapshot(), "Bot stopped");
    Ok(())
}

/// Run a single download through the dispatcher and keep the file
pub async fn fetch(config: Config, url: &str) -> Result<PathBuf, AppError> {
    let metrics = Arc::new(Metrics::new());
    let engine = Arc::new(YtDlpEngine::new(&config.engine));
    let dispatcher = build_dispatcher(&config, engine, metrics)?;

    let outcome = dispatcher.submit(url).await;
    dispatcher.shutdown().await;

    match outcome {
        DownloadOutcome::Success(path) => Ok(path),
        DownloadOutcome::Failure(reason) => Err(AppError::Download(reason)),
    }
}
