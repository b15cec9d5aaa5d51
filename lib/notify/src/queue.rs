//! Bounded queue between the executor and the dispatcher.
//!
//! Emitting never waits: when the queue is full the event is dropped,
//! counted and logged. A single worker task drains the queue in order.

use crate::dispatcher::{DispatchStats, NotificationDispatcher};
use crate::error::EmitError;
use crate::event::TransitionEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Entry point for starting a notification worker.
#[derive(Debug)]
pub struct NotificationQueue;

impl NotificationQueue {
    /// Spawns a worker running `dispatcher` behind a queue of `capacity`
    /// events. Must be called inside a Tokio runtime.
    pub fn spawn(
        dispatcher: Arc<NotificationDispatcher>,
        capacity: usize,
    ) -> (NotificationSender, NotificationWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = dispatcher.stats();

        let handle = tokio::spawn(run(dispatcher, rx, shutdown_rx));

        (
            NotificationSender { tx, stats },
            NotificationWorker {
                shutdown: shutdown_tx,
                handle,
            },
        )
    }
}

async fn run(
    dispatcher: Arc<NotificationDispatcher>,
    mut rx: mpsc::Receiver<TransitionEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut detached = false;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    dispatcher.dispatch(&event).await;
                }
                None => break,
            },
            signal = &mut shutdown, if !detached => {
                if signal.is_err() {
                    // Worker handle dropped without shutdown; keep serving senders.
                    detached = true;
                    continue;
                }
                rx.close();
                while let Some(event) = rx.recv().await {
                    dispatcher.dispatch(&event).await;
                }
                break;
            }
        }
    }
    debug!("notification worker stopped");
}

/// Cloneable handle for emitting events.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<TransitionEvent>,
    stats: Arc<DispatchStats>,
}

impl NotificationSender {
    /// Queues an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns `EmitError::Full` or `EmitError::Closed` when the event was
    /// dropped. Either case is already counted in `DispatchStats::dropped`.
    pub fn emit(&self, event: TransitionEvent) -> Result<(), EmitError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.stats.record_dropped();
                warn!(
                    content = %event.content,
                    to_state = %event.to_state,
                    outcome = "degraded",
                    side_effect = "notification",
                    "notification queue full, dropping event"
                );
                Err(EmitError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.stats.record_dropped();
                warn!(
                    content = %event.content,
                    to_state = %event.to_state,
                    outcome = "degraded",
                    side_effect = "notification",
                    "notification queue closed, dropping event"
                );
                Err(EmitError::Closed)
            }
        }
    }

    /// Returns the counters shared with the dispatcher.
    #[must_use]
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }
}

/// Handle to the worker task.
#[derive(Debug)]
pub struct NotificationWorker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl NotificationWorker {
    /// Stops accepting events, dispatches what is already queued, and waits
    /// for the worker to finish.
    pub async fn shutdown(self) {
        // The worker may already have exited because every sender dropped.
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "notification worker panicked");
        }
    }

    /// Waits for the worker to exit on its own, after every sender drops.
    pub async fn join(self) {
        let Self { shutdown, handle } = self;
        // Keep the signal alive so the worker serves until senders drop.
        let _shutdown = shutdown;
        if let Err(e) = handle.await {
            warn!(error = %e, "notification worker panicked");
        }
    }
}
