use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    Closed,

    #[error("job aborted before producing a result")]
    Aborted,
}

/// Fixed-size pool of workers draining one FIFO queue
///
/// Architecture:
/// 1. Callers hand a future to `execute`
/// 2. The job is appended to a shared unbounded queue
/// 3. `size` workers take turns pulling from the queue, so at most `size`
///    jobs run at once and waiting jobs start in submission order
/// 4. Each job runs in its own task; a panic is logged and reported to the
///    caller as `PoolError::Aborted` without taking the worker down
pub struct WorkerPool {
    size: usize,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `size` workers on the current runtime
    pub fn start(size: usize) -> Self {
        let size = size.max(1);
        info!(size, "Starting worker pool");

        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(worker_loop(worker_id, receiver))
            })
            .collect();

        Self {
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job` and wait for its output
    pub async fn execute<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            // Receiver gone means the caller stopped waiting
            let _ = tx.send(job.await);
        });

        {
            let sender = self.sender.lock().await;
            let sender = sender.as_ref().ok_or(PoolError::Closed)?;
            sender.send(wrapped).map_err(|_| PoolError::Closed)?;
        }

        rx.await.map_err(|_| PoolError::Aborted)
    }

    /// Stop accepting jobs, let queued jobs finish and join the workers
    pub async fn shutdown(&self) {
        if self.sender.lock().await.take().is_none() {
            return;
        }
        info!("Shutting down worker pool");

        let workers: Vec<_> = self.workers.lock().await.drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn worker_loop(worker_id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>) {
    debug!(worker_id, "Worker started");

    loop {
        // Lock is released before the job runs so other workers can pull
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else { break };

        if let Err(e) = tokio::spawn(job).await {
            error!(worker_id, error = %e, "Job panicked");
        }
    }

    debug!(worker_id, "Worker stopped");
}
