//! Bounded-concurrency chunk dispatch.
//!
//! Chunks are dispatched in ascending index order with at most
//! `max_in_flight` transfers outstanding, never more than 3. Each chunk retries on its own;
//! the first chunk to exhaust its retries aborts everything still running.

use std::collections::HashMap;
use std::sync::Arc;

use promethium_protocol::MAX_IN_FLIGHT_CHUNKS;
use promethium_transfer::{ByteSource, ChunkDescriptor, ChunkPlan, ChunkTracker};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use crate::api::UploadApi;
use crate::error::{ChunkFailure, TransportError, UploadError};
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::types::{UploadEvent, UploadSession};

type ChunkResult = Result<(), RetryExhausted<ChunkFailure>>;

/// Sends every chunk of `plan`, emitting a progress event per acknowledgement.
pub(crate) struct ChunkScheduler {
    pub api: Arc<dyn UploadApi>,
    pub source: Arc<dyn ByteSource>,
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

impl ChunkScheduler {
    pub async fn run(
        &self,
        session: &UploadSession,
        plan: &ChunkPlan,
        events: &mpsc::Sender<UploadEvent>,
    ) -> Result<(), UploadError> {
        let total = plan.total_chunks();
        let permits = self.max_in_flight.clamp(1, MAX_IN_FLIGHT_CHUNKS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tracker = ChunkTracker::new(total);
        let mut tasks: JoinSet<ChunkResult> = JoinSet::new();
        let mut task_chunks = HashMap::new();
        let mut next = 0;

        loop {
            if self.cancel.is_cancelled() {
                tasks.abort_all();
                return Err(UploadError::Cancelled);
            }

            // Fill free slots in ascending order.
            while next < total {
                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    break;
                };
                let Some(chunk) = plan.get(next) else {
                    break;
                };
                tracker.mark_in_flight(next);
                let fut = self.send_chunk(session.upload_id.clone(), chunk);
                let span = info_span!("chunk", upload_id = %session.upload_id, chunk = next);
                let handle = tasks.spawn(
                    async move {
                        let _permit = permit;
                        fut.await
                    }
                    .instrument(span),
                );
                task_chunks.insert(handle.id(), next);
                next += 1;
            }

            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(UploadError::Cancelled);
                }
                joined = tasks.join_next_with_id() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let (index, result) = match joined {
                Ok((id, result)) => (task_chunks.remove(&id).unwrap_or_default(), result),
                Err(e) => {
                    let index = task_chunks.remove(&e.id()).unwrap_or_default();
                    let failure = ChunkFailure::Transport(TransportError::Task(e.to_string()));
                    (
                        index,
                        Err(RetryExhausted {
                            attempts: 1,
                            error: failure,
                        }),
                    )
                }
            };

            match result {
                Ok(()) => {
                    if tracker.acknowledge(index) {
                        let percentage = tracker.percentage();
                        debug!(
                            upload_id = %session.upload_id,
                            chunk = index,
                            acknowledged = tracker.acknowledged(),
                            total_chunks = total,
                            percentage,
                            "chunk acknowledged"
                        );
                        let event = UploadEvent::Progress {
                            percentage,
                            acknowledged: tracker.acknowledged(),
                            total_chunks: total,
                        };
                        // A stalled consumer must not block cancellation.
                        tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => {
                                tasks.abort_all();
                                return Err(UploadError::Cancelled);
                            }
                            _ = events.send(event) => {}
                        }
                    }
                }
                Err(RetryExhausted { attempts, error: e }) => {
                    tracker.mark_failed(index);
                    error!(
                        upload_id = %session.upload_id,
                        chunk = index,
                        attempts,
                        error = %e,
                        "chunk failed, aborting upload"
                    );
                    tasks.abort_all();
                    return Err(UploadError::ChunkTransfer {
                        index,
                        attempts,
                        source: e,
                    });
                }
            }
        }

        debug_assert!(tracker.is_complete());
        Ok(())
    }

    fn send_chunk(
        &self,
        upload_id: String,
        chunk: ChunkDescriptor,
    ) -> impl Future<Output = ChunkResult> + Send + 'static {
        let api = Arc::clone(&self.api);
        let source = Arc::clone(&self.source);
        let retry = self.retry.clone();

        async move {
            retry
                .run(|_attempt| {
                    let api = Arc::clone(&api);
                    let source = Arc::clone(&source);
                    let upload_id = upload_id.clone();
                    let chunk = chunk.clone();
                    async move {
                        let data = source.read_range(chunk.range.clone()).await?;
                        api.upload_chunk(&upload_id, chunk.index, data).await?;
                        Ok::<(), ChunkFailure>(())
                    }
                })
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use promethium_transfer::MemorySource;
    use std::time::Duration;

    fn scheduler(api: Arc<MockApi>, len: usize) -> ChunkScheduler {
        ChunkScheduler {
            api,
            source: Arc::new(MemorySource::new("a.sac", vec![1u8; len])),
            max_in_flight: 3,
            retry: RetryPolicy::immediate(),
            cancel: CancellationToken::new(),
        }
    }

    fn session(total_chunks: usize) -> UploadSession {
        UploadSession {
            upload_id: "up-1".into(),
            chunk_size: 10,
            total_chunks,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn sends_all_chunks_in_order_with_bounded_concurrency() {
        let api = Arc::new(MockApi::new(10));
        let sched = scheduler(api.clone(), 95);
        let plan = ChunkPlan::new(95, 10).unwrap();
        let (tx, mut rx) = mpsc::channel(256);

        sched.run(&session(10), &plan, &tx).await.unwrap();

        let attempts = api.attempts.lock().unwrap().clone();
        assert_eq!(attempts, (0..10).collect::<Vec<_>>());
        assert_eq!(api.max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 3);

        let sizes: usize = api.acknowledged.lock().unwrap().iter().map(|(_, n)| n).sum();
        assert_eq!(sizes, 95);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 10);
        let last = events.last().unwrap();
        assert_eq!(last.percentage(), 99);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_concurrency_is_clamped_to_three() {
        let api = Arc::new(MockApi::new(10));
        let mut sched = scheduler(api.clone(), 200);
        sched.max_in_flight = 8;
        let plan = ChunkPlan::new(200, 10).unwrap();
        let (tx, _rx) = mpsc::channel(256);

        sched.run(&session(20), &plan, &tx).await.unwrap();
        assert_eq!(api.total_attempts(), 20);
        assert_eq!(api.max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_with_full_event_channel() {
        let api = Arc::new(MockApi::new(1));
        let sched = scheduler(api.clone(), 50);
        let cancel = sched.cancel.clone();
        let plan = ChunkPlan::new(50, 1).unwrap();
        // Receiver held but never read.
        let (tx, _rx) = mpsc::channel(4);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            sched.run(&session(50), &plan, &tx),
        )
        .await
        .expect("scheduler stayed blocked after cancellation");
        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert!(api.acknowledged.lock().unwrap().len() < 50);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_chunk_aborts_remaining() {
        let api = Arc::new(MockApi::new(10).fail_chunk(1, 10));
        let sched = scheduler(api.clone(), 100);
        let plan = ChunkPlan::new(100, 10).unwrap();
        let (tx, _rx) = mpsc::channel(256);

        let err = sched.run(&session(10), &plan, &tx).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::ChunkTransfer {
                index: 1,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(api.attempts_for(1), 4);
        assert!(!api.acknowledged.lock().unwrap().iter().any(|(i, _)| *i == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_dispatch() {
        let api = Arc::new(MockApi::new(10).delay_chunk(0, Duration::from_secs(60)));
        let sched = scheduler(api.clone(), 100);
        let cancel = sched.cancel.clone();
        let plan = ChunkPlan::new(100, 10).unwrap();
        let (tx, _rx) = mpsc::channel(256);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let err = sched.run(&session(10), &plan, &tx).await.unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
        assert!(!api.acknowledged.lock().unwrap().iter().any(|(i, _)| *i == 0));
    }
}
