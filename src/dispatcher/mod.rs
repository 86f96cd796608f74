//! Job dispatcher
//!
//! Accepts URLs, runs the download-with-retry loop on a bounded
//! [`WorkerPool`] and hands back a [`DownloadOutcome`]. The caller only waits
//! on its own job; everything else keeps flowing.

mod pool;
mod request;

pub use pool::{PoolError, WorkerPool};
pub use request::{DownloadOutcome, DownloadRequest, JobState};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::{AudioSpec, DownloadEngine, EngineJob, ProgressReporter, TracingProgress};
use crate::observability::Metrics;

/// Knobs for the retry loop and file layout
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub download_dir: PathBuf,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub isolate_jobs: bool,
    pub format: String,
    pub audio: AudioSpec,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            download_dir: config.download.dir.clone(),
            max_attempts: config.download.max_attempts,
            retry_delay: config.download.retry_delay(),
            isolate_jobs: config.download.isolate_jobs,
            format: config.engine.format.clone(),
            audio: AudioSpec::from(&config.engine),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Dispatcher {
    pool: WorkerPool,
    engine: Arc<dyn DownloadEngine>,
    progress: Arc<dyn ProgressReporter>,
    settings: DispatchSettings,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        pool: WorkerPool,
        engine: Arc<dyn DownloadEngine>,
        settings: DispatchSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            pool,
            engine,
            progress: Arc::new(TracingProgress),
            settings,
            metrics,
        }
    }

    /// Replace the default log-based progress reporter
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.settings.max_attempts
    }

    /// Download `url` as audio, retrying on failure.
    ///
    /// Always resolves to a terminal outcome; engine errors, pool shutdown and
    /// panics inside the job all become `DownloadOutcome::Failure`.
    pub async fn submit(&self, url: &str) -> DownloadOutcome {
        self.metrics.job_submitted();

        let request = DownloadRequest::new(
            url,
            self.settings.max_attempts,
            self.settings.retry_delay,
        );
        let output_dir = if self.settings.isolate_jobs {
            self.settings.download_dir.join(Uuid::new_v4().to_string())
        } else {
            self.settings.download_dir.clone()
        };
        let job = EngineJob {
            url: url.to_string(),
            output_dir,
            format: self.settings.format.clone(),
            audio: self.settings.audio.clone(),
        };

        let task = run_with_retry(
            Arc::clone(&self.engine),
            Arc::clone(&self.progress),
            Arc::clone(&self.metrics),
            request,
            job.clone(),
        );

        let outcome = match self.pool.execute(task).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(url, error = %e, "Download job did not complete");
                DownloadOutcome::Failure(e.to_string())
            }
        };

        match &outcome {
            DownloadOutcome::Success(_) => self.metrics.job_succeeded(),
            DownloadOutcome::Failure(_) => {
                self.metrics.job_failed();
                if self.settings.isolate_jobs {
                    remove_job_dir(&job.output_dir).await;
                }
            }
        }

        outcome
    }

    /// Delete a delivered file and, for isolated jobs, its job directory.
    pub async fn release(&self, path: &Path) -> io::Result<()> {
        let removed = tokio::fs::remove_file(path).await;

        if self.settings.isolate_jobs {
            if let Some(parent) = path.parent() {
                let root = self.settings.download_dir.as_path();
                if parent != root && parent.starts_with(root) {
                    remove_job_dir(parent).await;
                }
            }
        }

        removed
    }

    /// Drain queued jobs and stop the workers
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

async fn run_with_retry(
    engine: Arc<dyn DownloadEngine>,
    progress: Arc<dyn ProgressReporter>,
    metrics: Arc<Metrics>,
    mut request: DownloadRequest,
    job: EngineJob,
) -> DownloadOutcome {
    if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
        error!(url = %request.url, error = %e, "Failed to prepare output directory");
        request.fail();
        return DownloadOutcome::Failure(e.to_string());
    }

    let mut last_error = String::new();

    while let Some(attempt) = request.begin_attempt() {
        info!(
            url = %request.url,
            attempt,
            max_attempts = request.max_attempts(),
            "Starting download attempt {} for URL: {}",
            attempt,
            request.url
        );

        match engine.fetch_audio(&job, Arc::clone(&progress)).await {
            Ok(reported) => {
                let path = resolve_output(reported, &job.audio.codec).await;
                request.succeed();
                info!(url = %request.url, attempt, path = %path.display(), "Download completed successfully");
                return DownloadOutcome::Success(path);
            }
            Err(e) => {
                metrics.attempt_failed();
                last_error = e.to_string();
                error!(url = %request.url, attempt, error = %last_error, "Download attempt {} failed", attempt);

                if request.is_last_attempt() {
                    break;
                }

                info!(
                    url = %request.url,
                    "Waiting {} seconds before retry...",
                    request.retry_delay().as_secs_f64()
                );
                tokio::time::sleep(request.retry_delay()).await;
            }
        }
    }

    request.fail();
    warn!(
        url = %request.url,
        attempts = request.attempt(),
        error = %last_error,
        "Download failed after retries"
    );
    DownloadOutcome::Failure(last_error)
}

/// The engine reports the final file after post-processing. When it only
/// knows the pre-transcode name, the codec becomes the extension.
async fn resolve_output(reported: PathBuf, codec: &str) -> PathBuf {
    if tokio::fs::try_exists(&reported).await.unwrap_or(false) {
        return reported;
    }
    reported.with_extension(codec)
}

async fn remove_job_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "Removed job directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove job directory"),
    }
}
