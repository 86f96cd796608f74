use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Telegram bot settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot token (loaded from environment, never from the config file)
    #[serde(skip)]
    pub token: Option<String>,
}

/// Download job settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
    /// Number of downloads allowed to run at the same time
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Give every job its own subdirectory so equal titles cannot collide
    #[serde(default = "default_isolate_jobs")]
    pub isolate_jobs: bool,
}

impl DownloadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
            pool_size: default_pool_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            isolate_jobs: default_isolate_jobs(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_pool_size() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_isolate_jobs() -> bool {
    true
}

/// External download engine (yt-dlp) settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// yt-dlp format selector
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Audio bitrate in kbps
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
    /// Extra arguments appended verbatim (cookies, proxy, ffmpeg location...)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            format: default_format(),
            audio_codec: default_audio_codec(),
            audio_quality: default_audio_quality(),
            extra_args: Vec::new(),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_format() -> String {
    "bestaudio/best".to_string()
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Persistent log file; `None` logs to stdout only
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: default_log_file(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("bot.log"))
}

/// Health/metrics HTTP endpoint, disabled unless `bind_addr` is set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HealthConfig {
    pub bind_addr: Option<SocketAddr>,
}
