use crate::humanize::ByteSize;
use tracing::{debug, info};

/// One progress sample reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl ProgressUpdate {
    /// Completion percentage, when the total size is known
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded as f64 / total as f64 * 100.0).min(100.0)),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if total > 0 && self.downloaded >= total)
    }
}

/// Receives progress from a running download
pub trait ProgressReporter: Send + Sync {
    fn report(&self, url: &str, update: ProgressUpdate);
}

/// Writes progress to the log: every sample at debug, completion at info
#[derive(Debug, Default, Clone)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, url: &str, update: ProgressUpdate) {
        let percent = update
            .percent()
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "?%".to_string());
        let total = update
            .total
            .map(|t| ByteSize(t).to_human_readable())
            .unwrap_or_else(|| "unknown size".to_string());

        if update.is_complete() {
            info!(url, "Download progress: {} of {}", percent, total);
        } else {
            debug!(url, "Download progress: {} of {}", percent, total);
        }
    }
}
