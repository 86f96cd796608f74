use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of a single download request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Attempting(u32),
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Terminal result of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Failure(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }
}

/// One URL being downloaded, with its retry budget
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    attempt: u32,
    max_attempts: u32,
    retry_delay: Duration,
    state: JobState,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            url: url.into(),
            attempt: 0,
            max_attempts: max_attempts.max(1),
            retry_delay,
            state: JobState::Pending,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Start the next attempt. Returns `None` once the budget is spent or
    /// the request already reached a terminal state.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.state.is_terminal() || self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        self.state = JobState::Attempting(self.attempt);
        Some(self.attempt)
    }

    /// Whether the current attempt is the last one allowed
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn succeed(&mut self) {
        self.state = JobState::Succeeded;
    }

    pub fn fail(&mut self) {
        self.state = JobState::Failed;
    }
}
