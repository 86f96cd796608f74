//! End-to-end routing tests with an in-memory chat and scripted engines

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

use audiograb::dispatcher::{DispatchSettings, Dispatcher, WorkerPool};
use audiograb::engine::{AudioSpec, DownloadEngine, EngineError, EngineJob, ProgressReporter};
use audiograb::observability::Metrics;
use audiograb::router::{
    COMPLETED_TEXT, ChatApi, ChatError, HELP_TEXT, INVALID_URL_TEXT, Requester, Router,
    STARTING_TEXT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Text(String),
    Html(String),
    /// Path plus whether the file existed when it was sent
    Document(PathBuf, bool),
}

#[derive(Default)]
struct MockChat {
    sent: Mutex<Vec<Sent>>,
    fail_documents: bool,
}

impl MockChat {
    fn failing_documents() -> Self {
        Self {
            fail_documents: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send_text(&self, _chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_html(&self, _chat_id: i64, html: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Html(html.to_string()));
        Ok(())
    }

    async fn send_document(&self, _chat_id: i64, path: &Path) -> Result<(), ChatError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Document(path.to_path_buf(), path.exists()));
        if self.fail_documents {
            return Err(ChatError::Request("Bad Request: file too big".to_string()));
        }
        Ok(())
    }
}

/// Engine that fails a fixed number of times, then writes an audio file
struct ScriptedEngine {
    failures: usize,
    calls: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    work: Duration,
}

impl ScriptedEngine {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            work: Duration::ZERO,
        }
    }

    fn slow(work: Duration) -> Self {
        Self {
            work,
            ..Self::new(0)
        }
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadEngine for ScriptedEngine {
    async fn fetch_audio(
        &self,
        job: &EngineJob,
        _progress: Arc<dyn ProgressReporter>,
    ) -> audiograb::engine::Result<PathBuf> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if call <= self.failures {
            return Err(EngineError::Failed {
                status: "exit status: 1".to_string(),
                message: "ERROR: HTTP Error 429: Too Many Requests".to_string(),
            });
        }

        let path = job.output_dir.join("Some Title.mp3");
        tokio::fs::write(&path, b"ID3").await?;
        // Report the pre-transcode name, as yt-dlp's filename template would
        Ok(job.output_dir.join("Some Title.webm"))
    }
}

struct Harness {
    router: Router,
    chat: Arc<MockChat>,
    engine: Arc<ScriptedEngine>,
    dispatcher: Arc<Dispatcher>,
    _dir: TempDir,
}

fn harness(engine: ScriptedEngine, chat: MockChat, pool_size: usize) -> Harness {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(engine);
    let chat = Arc::new(chat);

    let settings = DispatchSettings {
        download_dir: dir.path().to_path_buf(),
        max_attempts: 3,
        retry_delay: Duration::from_secs(5),
        isolate_jobs: true,
        format: "bestaudio/best".to_string(),
        audio: AudioSpec::default(),
    };
    let dispatcher = Arc::new(Dispatcher::new(
        WorkerPool::start(pool_size),
        engine.clone(),
        settings,
        Arc::new(Metrics::new()),
    ));
    let router = Router::new(chat.clone(), Arc::clone(&dispatcher));

    Harness {
        router,
        chat,
        engine,
        dispatcher,
        _dir: dir,
    }
}

fn requester() -> Requester {
    Requester {
        chat_id: 1001,
        user_id: 77,
        username: Some("listener".to_string()),
        display_name: "Sam".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_plain_text_is_rejected_without_a_job() {
    let h = harness(ScriptedEngine::new(0), MockChat::default(), 5);

    h.router.handle(&requester(), "hello world").await.unwrap();

    assert_eq!(h.chat.sent(), vec![Sent::Text(INVALID_URL_TEXT.to_string())]);
    assert!(h.engine.call_times().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_url_inputs_never_submit() {
    let h = harness(ScriptedEngine::new(0), MockChat::default(), 5);

    for text in ["", "ftp://example.com", "www.example.com", " https://x.y", "HTTPS://x.y"] {
        h.router.handle(&requester(), text).await.unwrap();
    }

    assert!(h.engine.call_times().is_empty());
    assert!(h.chat.texts().iter().all(|t| t == INVALID_URL_TEXT));
}

#[tokio::test(start_paused = true)]
async fn test_successful_download_is_sent_then_deleted() {
    let h = harness(ScriptedEngine::new(0), MockChat::default(), 5);

    h.router
        .handle(&requester(), "https://example.com/video")
        .await
        .unwrap();

    let sent = h.chat.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], Sent::Text(STARTING_TEXT.to_string()));
    let Sent::Document(path, existed) = &sent[1] else {
        panic!("expected a document, got {:?}", sent[1]);
    };
    assert!(*existed, "file must exist while it is being sent");
    assert_eq!(path.file_name().unwrap(), "Some Title.mp3");
    assert_eq!(sent[2], Sent::Text(COMPLETED_TEXT.to_string()));

    // Gone by the time the completion message went out
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
    assert_eq!(h.engine.call_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_report_failure() {
    let h = harness(ScriptedEngine::new(usize::MAX), MockChat::default(), 5);

    h.router
        .handle(&requester(), "https://example.com/video")
        .await
        .unwrap();

    assert_eq!(
        h.chat.texts(),
        vec![
            STARTING_TEXT.to_string(),
            "Failed to download after 3 attempts. Please try again later.".to_string(),
        ]
    );

    let calls = h.engine.call_times();
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= Duration::from_secs(5));
    assert!(calls[2] - calls[1] >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let h = harness(ScriptedEngine::new(2), MockChat::default(), 5);

    h.router
        .handle(&requester(), "https://example.com/video")
        .await
        .unwrap();

    assert_eq!(h.engine.call_times().len(), 3);
    assert_eq!(
        h.chat.texts().last().map(String::as_str),
        Some(COMPLETED_TEXT)
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_still_cleans_up() {
    let h = harness(ScriptedEngine::new(0), MockChat::failing_documents(), 5);

    let result = h
        .router
        .handle(&requester(), "https://example.com/video")
        .await;

    assert!(matches!(result, Err(ChatError::Request(_))));
    let sent = h.chat.sent();
    let Some(Sent::Document(path, true)) = sent.get(1) else {
        panic!("expected a document send, got {:?}", sent);
    };
    assert!(!path.exists());
    assert_eq!(
        h.chat.texts(),
        vec![
            STARTING_TEXT.to_string(),
            "Failed to download after 3 attempts. Please try again later.".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_commands() {
    let h = harness(ScriptedEngine::new(0), MockChat::default(), 5);

    h.router.handle(&requester(), "/start").await.unwrap();
    h.router.handle(&requester(), "/help").await.unwrap();
    h.router.handle(&requester(), "/unknown").await.unwrap();

    assert_eq!(
        h.chat.sent(),
        vec![
            Sent::Html(
                "Hi <a href=\"tg://user?id=77\">Sam</a>! Send me a video URL to download."
                    .to_string()
            ),
            Sent::Text(HELP_TEXT.to_string()),
        ]
    );
    assert!(h.engine.call_times().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pool_bounds_concurrent_downloads() {
    let h = harness(
        ScriptedEngine::slow(Duration::from_secs(30)),
        MockChat::default(),
        5,
    );
    let router = Arc::new(h.router);

    let mut handles = Vec::new();
    for i in 0..12 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            router
                .handle(&requester(), &format!("https://example.com/video/{}", i))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.engine.call_times().len(), 12);
    let peak = h.engine.peak.load(Ordering::SeqCst);
    assert_eq!(peak, 5, "queued jobs should keep every worker busy");
    assert_eq!(
        h.chat
            .texts()
            .iter()
            .filter(|t| t.as_str() == COMPLETED_TEXT)
            .count(),
        12
    );

    h.dispatcher.shutdown().await;
}
