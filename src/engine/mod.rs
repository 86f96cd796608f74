//! Download engine boundary
//!
//! The engine turns a URL into an audio file on disk. The production
//! implementation drives `yt-dlp` (with `ffmpeg` for transcoding) as a
//! subprocess; tests plug in their own [`DownloadEngine`].

mod progress;
mod ytdlp;

pub use progress::{ProgressReporter, ProgressUpdate, TracingProgress};
pub use ytdlp::YtDlpEngine;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::EngineConfig;

/// Output file name template, relative to the job's output directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download engine exited with {status}: {message}")]
    Failed { status: String, message: String },

    #[error("download engine did not report an output file")]
    MissingOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Target audio encoding applied after download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpec {
    pub codec: String,
    /// Bitrate in kbps
    pub quality: String,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            quality: "192".to_string(),
        }
    }
}

/// Everything the engine needs for one attempt
#[derive(Debug, Clone)]
pub struct EngineJob {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: String,
    pub audio: AudioSpec,
}

impl EngineJob {
    /// Full output template, e.g. `downloads/<job>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_TEMPLATE)
    }
}

impl From<&EngineConfig> for AudioSpec {
    fn from(config: &EngineConfig) -> Self {
        Self {
            codec: config.audio_codec.clone(),
            quality: config.audio_quality.clone(),
        }
    }
}

/// Downloads a URL and transcodes it to audio.
///
/// Returns the path of the produced file. Any error is reported as a value;
/// retrying is the caller's business.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    async fn fetch_audio(
        &self,
        job: &EngineJob,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<PathBuf>;
}
