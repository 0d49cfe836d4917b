//! Concurrent enrich-and-save pipeline
//!
//! This module implements a fan-out/fan-in pipeline over bounded
//! `tokio::mpsc` channels.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  intake   ┌─────────────┐  output   ┌─────────────┐
//! │   Feeder    │──────────▶│   Detail    │──────────▶│   Writer    │
//! │ (summaries) │  (500)    │ Workers (N) │   (10)    │ (JSON file) │
//! └─────────────┘           └─────────────┘           └─────────────┘
//!        │                         │                         │
//!        └──────────── abort signal (watch channel) ─────────┘
//! ```
//!
//! Shutdown is a two-phase drain: the feeder drops the intake sender once
//! every summary is queued, workers exit when the intake is closed and
//! drained, the output channel closes when the last worker drops its
//! sender, and the writer exits when the output is closed and drained.
//! Only then is the array finalized.
//!
//! Records reach the writer in completion order, not listing order.

use std::sync::Arc;
use tokio::io::{AsyncSeek, AsyncWrite};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinError, JoinHandle};

use crate::config::{FailureMode, PipelineConfig};
use crate::crawler::DetailSource;
use crate::models::{FullPhoto, ItemFailure, Photo, PhotoInfo, PhotoSummary, RunSummary, SavedPhoto};
use crate::storage::JsonArrayWriter;
use crate::utils::error::PipelineError;
use crate::utils::truncate_text;

// ============================================================================
// Worker Types
// ============================================================================

type Intake = Arc<Mutex<mpsc::Receiver<PhotoSummary>>>;

/// What one worker did before it exited
#[derive(Debug, Default)]
pub struct WorkerReport {
    /// Worker index
    pub worker_id: usize,

    /// Summaries successfully enriched and handed to the writer
    pub fetched: usize,

    /// Detail failures recorded in collect mode
    pub failures: Vec<ItemFailure>,
}

// ============================================================================
// Pipeline Implementation
// ============================================================================

/// Worker pool plus single writer
pub struct PhotoPipeline<D> {
    config: PipelineConfig,
    details: Arc<D>,
    abort: watch::Sender<bool>,
}

impl<D: DetailSource + 'static> PhotoPipeline<D> {
    /// Create a new pipeline
    ///
    /// `abort` is shared with whoever may cancel the run; the pipeline
    /// also raises it itself on a fatal error.
    /// `config` must already be validated; zero workers or zero capacities
    /// are rejected by [`crate::config::Config::validate`].
    pub(crate) fn new(
        config: PipelineConfig,
        details: Arc<D>,
        abort: watch::Sender<bool>,
    ) -> Self {
        Self {
            config,
            details,
            abort,
        }
    }

    /// Enrich every summary and append it to `writer`
    ///
    /// On success the array is finalized and the flushed sink is handed
    /// back so the caller can sync it. On failure the writer is flushed
    /// but left open, so the sink holds an unterminated array.
    ///
    /// # Errors
    ///
    /// The first fatal error wins: a detail failure in abort mode, a
    /// writer I/O or encoding failure, or a panicked task. If nothing
    /// failed but the run was aborted from outside, `Cancelled`.
    pub async fn run<W>(
        &self,
        photos: Vec<PhotoSummary>,
        writer: JsonArrayWriter<W>,
    ) -> Result<(RunSummary, W), PipelineError>
    where
        W: AsyncWrite + AsyncSeek + Unpin + Send + 'static,
    {
        let listed = photos.len();

        tracing::info!(
            total = listed,
            workers = self.config.workers,
            intake_capacity = self.config.intake_capacity,
            output_capacity = self.config.output_capacity,
            failure_mode = %self.config.failure_mode,
            "Starting photo pipeline"
        );

        let (intake_tx, intake_rx) = mpsc::channel::<PhotoSummary>(self.config.intake_capacity);
        let (output_tx, output_rx) = mpsc::channel::<PhotoInfo>(self.config.output_capacity);

        let writer_handle = self.spawn_writer(output_rx, writer);
        let worker_handles = self.spawn_workers(intake_rx, output_tx);

        self.feed(photos, intake_tx).await;

        let mut errors = Vec::new();
        let mut failures = Vec::new();
        for result in futures::future::join_all(worker_handles).await {
            match flatten(result) {
                Ok(report) => {
                    tracing::debug!(
                        worker_id = report.worker_id,
                        fetched = report.fetched,
                        failed = report.failures.len(),
                        "Worker finished"
                    );
                    failures.extend(report.failures);
                }
                Err(e) => errors.push(e),
            }
        }

        // Every worker has exited, so every output sender is gone and the
        // writer sees the channel close once it has drained it.
        let writer = match flatten(writer_handle.await) {
            Ok(writer) => Some(writer),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        if !errors.is_empty() || *self.abort.borrow() {
            if let Some(writer) = writer {
                if let Err(e) = writer.abandon().await {
                    tracing::warn!(error = %e, "Failed to flush abandoned output");
                }
            }
            return Err(primary_error(errors));
        }

        let Some(writer) = writer else {
            return Err(PipelineError::TaskFailed("writer exited without output".to_string()));
        };

        let saved = writer.records();
        let sink = writer.finalize().await?;

        tracing::info!(
            listed,
            saved,
            failed = failures.len(),
            "Pipeline completed"
        );

        Ok((
            RunSummary {
                listed,
                saved,
                failed: failures,
                output: None,
            },
            sink,
        ))
    }

    /// Push every summary onto the intake queue, then close it
    async fn feed(&self, photos: Vec<PhotoSummary>, intake_tx: mpsc::Sender<PhotoSummary>) {
        let mut abort_rx = self.abort.subscribe();

        for summary in photos {
            tokio::select! {
                biased;
                _ = abort_requested(&mut abort_rx) => {
                    tracing::debug!("Abort raised, stopping intake");
                    break;
                }
                sent = intake_tx.send(summary) => {
                    if sent.is_err() {
                        tracing::warn!("Intake channel closed - no workers left");
                        break;
                    }
                }
            }
        }

        // Dropping the only sender closes the intake
        drop(intake_tx);
    }

    /// Spawn the detail workers
    ///
    /// Each worker owns a clone of the output sender; the original is
    /// dropped here so the output closes exactly when the last worker exits.
    fn spawn_workers(
        &self,
        intake_rx: mpsc::Receiver<PhotoSummary>,
        output_tx: mpsc::Sender<PhotoInfo>,
    ) -> Vec<JoinHandle<Result<WorkerReport, PipelineError>>> {
        let intake: Intake = Arc::new(Mutex::new(intake_rx));
        let mut handles = Vec::with_capacity(self.config.workers);

        for worker_id in 0..self.config.workers {
            let worker = Worker {
                worker_id,
                intake: Arc::clone(&intake),
                output: output_tx.clone(),
                details: Arc::clone(&self.details),
                failure_mode: self.config.failure_mode,
                abort: self.abort.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        drop(output_tx);
        handles
    }

    /// Spawn the single writer task
    fn spawn_writer<W>(
        &self,
        mut output_rx: mpsc::Receiver<PhotoInfo>,
        mut writer: JsonArrayWriter<W>,
    ) -> JoinHandle<Result<JsonArrayWriter<W>, PipelineError>>
    where
        W: AsyncWrite + AsyncSeek + Unpin + Send + 'static,
    {
        let abort = self.abort.clone();

        tokio::spawn(async move {
            while let Some(photo) = output_rx.recv().await {
                let record = SavedPhoto::from_photo(&photo);
                if let Err(e) = writer.append(&record).await {
                    tracing::error!(photo_id = %photo.id(), error = %e, "Failed to save photo");
                    abort.send_replace(true);
                    return Err(e);
                }
                tracing::info!(
                    photo_id = %photo.id(),
                    saved = writer.records(),
                    "Saved details for photo"
                );
            }

            tracing::debug!("Writer shutting down");
            Ok(writer)
        })
    }
}

/// One detail worker
struct Worker<D> {
    worker_id: usize,
    intake: Intake,
    output: mpsc::Sender<PhotoInfo>,
    details: Arc<D>,
    failure_mode: FailureMode,
    abort: watch::Sender<bool>,
}

impl<D: DetailSource> Worker<D> {
    async fn run(self) -> Result<WorkerReport, PipelineError> {
        let worker_id = self.worker_id;
        let mut abort_rx = self.abort.subscribe();
        let mut report = WorkerReport {
            worker_id,
            ..Default::default()
        };

        loop {
            let summary = tokio::select! {
                biased;
                _ = abort_requested(&mut abort_rx) => return Err(PipelineError::Cancelled),
                next = next_summary(&self.intake) => next,
            };

            // Closed and drained
            let Some(summary) = summary else {
                break;
            };

            tracing::debug!(worker_id, photo_id = %summary.id(), "Fetching details");

            let fetched = tokio::select! {
                biased;
                _ = abort_requested(&mut abort_rx) => return Err(PipelineError::Cancelled),
                fetched = self.details.fetch_detail(&summary) => fetched,
            };

            let photo = match fetched {
                Ok(photo) => photo,
                Err(source) => match self.failure_mode {
                    FailureMode::Abort => {
                        tracing::error!(
                            worker_id,
                            photo_id = %summary.id(),
                            error = %source,
                            "Failed to get details, aborting run"
                        );
                        self.abort.send_replace(true);
                        return Err(PipelineError::Detail {
                            photo_id: summary.common.id,
                            source,
                        });
                    }
                    FailureMode::Collect => {
                        tracing::warn!(
                            worker_id,
                            photo_id = %summary.id(),
                            error = %source,
                            "Failed to get details, skipping photo"
                        );
                        report.failures.push(ItemFailure {
                            photo_id: summary.common.id,
                            error: source.to_string(),
                        });
                        continue;
                    }
                },
            };

            tracing::debug!(
                worker_id,
                photo_id = %photo.id(),
                title = %truncate_text(photo.title(), 40),
                has_description = !photo.description().is_empty(),
                "Got details for photo"
            );

            tokio::select! {
                biased;
                _ = abort_requested(&mut abort_rx) => return Err(PipelineError::Cancelled),
                sent = self.output.send(photo) => {
                    if sent.is_err() {
                        // Writer is gone; it has already raised the abort
                        return Err(PipelineError::Cancelled);
                    }
                }
            }

            report.fetched += 1;
        }

        tracing::debug!(worker_id, "Detail worker shutting down");
        Ok(report)
    }
}

/// Resolves once the abort signal is raised
pub(crate) async fn abort_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|aborted| *aborted).await;
}

/// Take the next summary, holding the intake lock only while waiting
async fn next_summary(intake: &Mutex<mpsc::Receiver<PhotoSummary>>) -> Option<PhotoSummary> {
    let mut rx = intake.lock().await;
    rx.recv().await
}

// ============================================================================
// Helper Functions
// ============================================================================

fn flatten<T>(result: Result<Result<T, PipelineError>, JoinError>) -> Result<T, PipelineError> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(PipelineError::TaskFailed(e.to_string())),
    }
}

/// Pick the error to report: the first one that is not a knock-on
/// cancellation, otherwise `Cancelled`
fn primary_error(errors: Vec<PipelineError>) -> PipelineError {
    errors
        .into_iter()
        .find(|e| !matches!(e, PipelineError::Cancelled))
        .unwrap_or(PipelineError::Cancelled)
}

// ============================================================================
// Tests
// ============================================================================
