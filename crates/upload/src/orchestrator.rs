//! Upload orchestrator: session, chunk transfer, finalize, progress events.
//!
//! One orchestrator drives exactly one upload attempt. The attempt's event
//! channel yields zero or more `Progress` events followed by exactly one
//! terminal `Complete` or `Error`, then closes.

use std::path::Path;
use std::sync::Arc;

use promethium_protocol::{DEFAULT_CHUNK_SIZE, DatasetRecord, FinalizeUploadRequest};
use promethium_transfer::ChunkPlan;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::UploadApi;
use crate::error::{SessionError, UploadError};
use crate::scheduler::ChunkScheduler;
use crate::session::open_session;
use crate::types::{UploadConfig, UploadEvent, UploadOutcome, UploadRequest};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Orchestrates a single chunked upload attempt.
pub struct UploadOrchestrator {
    api: Arc<dyn UploadApi>,
    config: UploadConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl UploadOrchestrator {
    /// Creates an orchestrator with the default configuration.
    pub fn new(api: Arc<dyn UploadApi>) -> Self {
        Self::with_config(api, UploadConfig::default())
    }

    pub fn with_config(api: Arc<dyn UploadApi>, config: UploadConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this attempt.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Runs the attempt to completion.
    ///
    /// Consumes the orchestrator so the event channel closes once the
    /// terminal event is sent.
    pub async fn run(mut self, request: UploadRequest) -> UploadOutcome {
        // Nobody took the receiver: drop it so sends never block.
        drop(self.events_rx.take());
        let terminal = self.reserve_terminal().await;

        info!(
            file = %request.file_name(),
            total_size = request.total_size(),
            name = %request.name(),
            format = %request.format(),
            "upload started"
        );

        let outcome = self.execute(&request).await.map_err(Arc::new);
        self.finish(terminal, &outcome);
        outcome
    }

    /// Opens `path`, validates the inputs, then runs the attempt.
    ///
    /// Validation failures are reported through the event channel like any
    /// other terminal error.
    pub async fn run_path(
        mut self,
        path: impl AsRef<Path>,
        name: &str,
        format: &str,
    ) -> UploadOutcome {
        match UploadRequest::from_path(path, name, format).await {
            Ok(request) => self.run(request).await,
            Err(e) => {
                drop(self.events_rx.take());
                let terminal = self.reserve_terminal().await;
                let outcome = Err(Arc::new(UploadError::from(e)));
                self.finish(terminal, &outcome);
                outcome
            }
        }
    }

    /// Runs the attempt on a background task.
    pub fn spawn(mut self, request: UploadRequest) -> UploadHandle {
        let events = self.events_rx.take();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run(request));
        UploadHandle {
            events,
            cancel,
            task,
        }
    }

    async fn execute(&self, request: &UploadRequest) -> Result<DatasetRecord, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let session = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            session = open_session(self.api.as_ref(), request, self.config.chunk_size) => session?,
        };

        let plan = ChunkPlan::new(request.total_size(), session.chunk_size).map_err(|_| {
            SessionError::InvalidChunkSize {
                requested: self.config.chunk_size.min(DEFAULT_CHUNK_SIZE),
                confirmed: session.chunk_size,
            }
        })?;

        let scheduler = ChunkScheduler {
            api: Arc::clone(&self.api),
            source: Arc::clone(request.source()),
            max_in_flight: self.config.max_in_flight,
            retry: self.config.retry.clone(),
            cancel: self.cancel.clone(),
        };
        scheduler.run(&session, &plan, &self.events_tx).await?;

        let finalize = FinalizeUploadRequest {
            upload_id: session.upload_id.clone(),
            name: request.name().to_string(),
            format: request.format(),
        };
        let dataset = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            result = self.api.finalize_upload(&finalize) => {
                result.map_err(|source| UploadError::Finalize {
                    upload_id: session.upload_id.clone(),
                    source,
                })?
            }
        };

        Ok(dataset)
    }

    /// Holds one channel slot for the terminal event.
    ///
    /// The channel is still empty here, so this never waits. `None` means
    /// the receiver is gone.
    async fn reserve_terminal(&self) -> Option<mpsc::OwnedPermit<UploadEvent>> {
        self.events_tx.clone().reserve_owned().await.ok()
    }

    /// Emits the single terminal event for `outcome` through the reserved slot.
    fn finish(
        &self,
        terminal: Option<mpsc::OwnedPermit<UploadEvent>>,
        outcome: &UploadOutcome,
    ) {
        let event = match outcome {
            Ok(dataset) => {
                info!(dataset_id = dataset.id, name = %dataset.name, "upload completed");
                UploadEvent::Complete {
                    dataset: dataset.clone(),
                }
            }
            Err(e) => {
                error!(kind = ?e.kind(), error = %e, "upload failed");
                UploadEvent::Error {
                    error: Arc::clone(e),
                }
            }
        };
        if let Some(permit) = terminal {
            permit.send(event);
        }
    }
}

/// A running upload attempt.
pub struct UploadHandle {
    events: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
    task: JoinHandle<UploadOutcome>,
}

impl UploadHandle {
    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events.take()
    }

    /// Requests cancellation of the attempt.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the attempt's outcome.
    pub async fn join(self) -> Result<UploadOutcome, JoinError> {
        self.task.await
    }
}
