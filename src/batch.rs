//! Sequential batch enrichment with cooperative cancellation.
//!
//! Tracks are enriched one at a time on purpose; the pacing delay between
//! calls keeps the endpoint's rate limiter happy. A failed track records a
//! failure and the run moves on, only cancellation stops it early.

use crate::cancel::{sleep_unless_cancelled, CancellationState};
use crate::enrich::Enricher;
use crate::merge::apply_wholesale;
use crate::track::Track;
use crate::{QuizlistError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Pause between consecutive enrichment calls.
pub const INTER_CALL_DELAY: Duration = Duration::from_millis(500);

/// Lifecycle of a batch run. A new run may start from `Idle` or from
/// either terminal state, never while one is `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Observable position of a run. `current` is the 1-based index of the
/// track being processed; it is published before the call starts, so a
/// cancelled run keeps pointing at the track it stopped on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub title: String,
    pub reason: String,
}

/// Outcome of a finished (or cancelled) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success_titles: Vec<String>,
    pub failures: Vec<BatchFailure>,
}

/// Drives an [`Enricher`] over a whole track list.
pub struct BatchProcessor<P: Enricher> {
    enricher: P,
    state: Arc<RwLock<BatchState>>,
    cancel: CancellationState,
    progress_tx: watch::Sender<BatchProgress>,
    pacing: Duration,
}

impl<P: Enricher> BatchProcessor<P> {
    pub fn new(enricher: P) -> Self {
        let (progress_tx, _rx) = watch::channel(BatchProgress::default());
        Self {
            enricher,
            state: Arc::new(RwLock::new(BatchState::Idle)),
            cancel: CancellationState::new(),
            progress_tx,
            pacing: INTER_CALL_DELAY,
        }
    }

    /// Override the pacing delay, used by tests to run at full speed.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn state(&self) -> BatchState {
        *self.state.read().await
    }

    /// Watch progress updates for the current and future runs.
    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress_tx.subscribe()
    }

    /// Handle for requesting cancellation from another task.
    pub fn cancel_handle(&self) -> CancellationState {
        self.cancel.clone()
    }

    /// Request cancellation of the running batch.
    ///
    /// A no-op outside `Running`; returns whether the request was taken.
    /// The in-flight enrichment call is never aborted, the run stops at
    /// the next iteration boundary.
    pub async fn cancel(&self) -> bool {
        if *self.state.read().await == BatchState::Running {
            self.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Enrich every track in order, replacing each successful track's
    /// field map wholesale.
    pub async fn run(&self, tracks: &mut [Track]) -> Result<BatchSummary> {
        {
            let mut state = self.state.write().await;
            if *state == BatchState::Running {
                return Err(QuizlistError::AlreadyRunning);
            }
            if tracks.is_empty() {
                return Err(QuizlistError::NothingToDo);
            }
            *state = BatchState::Running;
        }
        self.cancel.reset();

        let total = tracks.len();
        let mut summary = BatchSummary::default();
        log::info!("starting batch enrichment of {total} tracks");

        for (i, track) in tracks.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("batch cancelled at track {}/{total}", i + 1);
                break;
            }

            let _ = self.progress_tx.send(BatchProgress {
                current: i + 1,
                total,
            });

            let title = track.display_title();
            match self.enricher.enrich(track).await {
                Ok(enrichment) if !enrichment.fields.is_empty() => {
                    apply_wholesale(track, enrichment.fields);
                    summary.success_titles.push(title);
                }
                Ok(_) => {
                    summary.failures.push(BatchFailure {
                        title,
                        reason: "No new information provided".to_string(),
                    });
                }
                Err(e) => {
                    log::warn!("enrichment failed for {title}: {e}");
                    summary.failures.push(BatchFailure {
                        title,
                        reason: e.to_string(),
                    });
                }
            }

            sleep_unless_cancelled(self.cancel.subscribe(), self.pacing).await;
        }

        let final_state = if self.cancel.is_cancelled() {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        *self.state.write().await = final_state;
        log::info!(
            "batch finished: {} succeeded, {} failed",
            summary.success_titles.len(),
            summary.failures.len()
        );
        Ok(summary)
    }
}
