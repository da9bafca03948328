//! Bounded worker pool.
//!
//! A fixed number of tasks drain a shared queue. Each worker checks the
//! cancellation token before taking its next item, so a cancelled pool stops
//! dispatching new work while in-flight jobs finish or bail out on their own.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::ScanError;

/// Runs `job` over every item with at most `workers` jobs in flight.
///
/// Returns the first job error or worker panic, aborting the remaining
/// workers. Cancellation is not an error.
pub async fn run<T, F, Fut>(
    items: Vec<T>,
    workers: usize,
    token: &CancellationToken,
    job: F,
) -> Result<(), ScanError>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ScanError>> + Send + 'static,
{
    if items.is_empty() {
        return Ok(());
    }

    let workers = workers.clamp(1, items.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(items)));
    let job = Arc::new(job);
    let mut set: JoinSet<Result<(), ScanError>> = JoinSet::new();

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let job = Arc::clone(&job);
        let token = token.clone();

        set.spawn(async move {
            while !token.is_cancelled() {
                let next = queue.lock().await.pop_front();
                let Some(item) = next else {
                    break;
                };
                job(item).await?;
            }
            Ok(())
        });
    }

    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(err) if err.is_cancelled() => continue,
            Err(err) => ScanError::from(err),
        };
        error!("Worker pool aborted: {failure}");
        set.abort_all();
        return Err(failure);
    }

    if token.is_cancelled() {
        debug!("Worker pool drained after cancellation");
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn processes_every_item() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        run((0..100).collect(), 8, &CancellationToken::new(), move |_: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn never_exceeds_worker_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

        run((0..40).collect(), 4, &CancellationToken::new(), move |_: u32| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn cancelled_token_stops_dispatch() {
        let token = CancellationToken::new();
        token.cancel();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let result = run((0..10).collect(), 2, &token, move |_: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_error_is_returned() {
        let result = run((0..10).collect(), 3, &CancellationToken::new(), |n: u32| async move {
            if n == 5 {
                Err(ScanError::Task("five".into()))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(ScanError::Task(ref msg)) if msg == "five"));
    }

    #[tokio::test]
    async fn worker_panic_becomes_an_error() {
        let result = run(vec![1_u32], 1, &CancellationToken::new(), |n| async move {
            assert_ne!(n, 1, "worker exploded");
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ScanError::WorkerPanic(_))));
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let result = run(Vec::<u32>::new(), 4, &CancellationToken::new(), |_| async { Ok(()) }).await;
        assert!(result.is_ok());
    }
}
