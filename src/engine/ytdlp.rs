//! `yt-dlp` subprocess engine

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{DownloadEngine, EngineError, EngineJob, ProgressReporter, ProgressUpdate, Result};
use crate::config::EngineConfig;

const PROGRESS_PREFIX: &str = "progress:";
const OUTPUT_PREFIX: &str = "output:";
const PROGRESS_TEMPLATE: &str = "download:progress:%(progress.downloaded_bytes)s/%(progress.total_bytes,progress.total_bytes_estimate)s";
const OUTPUT_PRINT: &str = "after_move:output:%(filepath)s";
const STDERR_TAIL: usize = 20;

/// Drives the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl YtDlpEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    fn build_args(&self, job: &EngineJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--format".into(),
            job.format.clone().into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            job.audio.codec.clone().into(),
            "--audio-quality".into(),
            format!("{}K", job.audio.quality).into(),
            "--output".into(),
            job.output_template().into_os_string(),
            "--newline".into(),
            "--progress".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--no-simulate".into(),
            "--print".into(),
            OUTPUT_PRINT.into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("--".into());
        args.push(job.url.clone().into());
        args
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    async fn fetch_audio(
        &self,
        job: &EngineJob,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        let mut command = Command::new(&self.binary);
        command
            .args(self.build_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(url = %job.url, binary = %self.binary.display(), "Spawning download engine");

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;

        // stderr carries errors and, in quiet mode, may also carry progress
        let stderr_task = child.stderr.take().map(|stderr| {
            let progress = Arc::clone(&progress);
            let url = job.url.clone();
            tokio::spawn(async move {
                let mut tail: Vec<String> = Vec::new();
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                // Lossy decoding keeps the pipe drained past non-UTF-8 output
                while matches!(reader.read_until(b'\n', &mut buf).await, Ok(n) if n > 0) {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    buf.clear();
                    match parse_line(&line) {
                        OutputLine::Progress(update) => progress.report(&url, update),
                        _ => {
                            if line.starts_with("ERROR") {
                                warn!(url = %url, "stderr: {}", line);
                            } else {
                                debug!(url = %url, "stderr: {}", line);
                            }
                            if tail.len() == STDERR_TAIL {
                                tail.remove(0);
                            }
                            tail.push(line);
                        }
                    }
                }
                tail
            })
        });

        let mut output = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_line(&line) {
                    OutputLine::Progress(update) => progress.report(&job.url, update),
                    OutputLine::Output(path) => output = Some(path),
                    OutputLine::Other => debug!(url = %job.url, "stdout: {}", line),
                }
            }
        }

        let status = child.wait().await?;

        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            return Err(EngineError::Failed {
                status: status.to_string(),
                message: summarize_errors(&stderr_tail),
            });
        }

        output.ok_or(EngineError::MissingOutput)
    }
}

#[derive(Debug, PartialEq)]
enum OutputLine {
    Progress(ProgressUpdate),
    Output(PathBuf),
    Other,
}

fn parse_line(line: &str) -> OutputLine {
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let (downloaded, total) = rest.split_once('/').unwrap_or((rest, "NA"));
        return match parse_bytes(downloaded) {
            Some(downloaded) => OutputLine::Progress(ProgressUpdate {
                downloaded,
                total: parse_bytes(total),
            }),
            None => OutputLine::Other,
        };
    }

    match line.strip_prefix(OUTPUT_PREFIX) {
        Some(path) if !path.is_empty() => OutputLine::Output(PathBuf::from(path)),
        _ => OutputLine::Other,
    }
}

/// yt-dlp prints integers, floats for estimates, or `NA`
fn parse_bytes(value: &str) -> Option<u64> {
    let value = value.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

fn summarize_errors(stderr: &[String]) -> String {
    stderr
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR"))
        .or_else(|| stderr.iter().rev().find(|line| !line.trim().is_empty()))
        .cloned()
        .unwrap_or_else(|| "no error output".to_string())
}
