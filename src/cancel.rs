use std::time::Duration;
use tokio::sync::watch;

/// Cooperative cancellation for batch enrichment runs.
///
/// This is intentionally simple:
/// - `cancel()` flips a boolean and wakes sleepers.
/// - `reset()` clears the flag so a later run can start clean.
/// - Pacing sleeps select on either the timer or cancellation.
///
/// Cancellation is only observed at run boundaries; an in-flight request
/// is never aborted, its result is discarded instead.
#[derive(Clone, Debug)]
pub struct CancellationState {
    tx: watch::Sender<bool>,
}

impl Default for CancellationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn reset(&self) {
        let _ = self.tx.send(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Sleep for `duration` unless cancellation fires first.
///
/// Returns `true` when the full duration elapsed, `false` when the sleep
/// was cut short by cancellation (or was already cancelled on entry).
pub async fn sleep_unless_cancelled(
    mut cancel_rx: watch::Receiver<bool>,
    duration: Duration,
) -> bool {
    if *cancel_rx.borrow() {
        return false;
    }

    let sleeper = tokio::time::sleep(duration);
    tokio::pin!(sleeper);
    tokio::select! {
        _ = &mut sleeper => true,
        _ = async {
            loop {
                if cancel_rx.changed().await.is_err() {
                    // Sender dropped; treat as non-cancelable.
                    break;
                }
                if *cancel_rx.borrow() {
                    break;
                }
            }
        } => false,
    }
}
