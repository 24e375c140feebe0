//! Feeds document insertions and debounced rescans to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace};

use super::detection_dispatcher::DetectionDispatcher;
use crate::domain::entities::DocumentEvent;
use crate::domain::ports::DocumentPort;

/// Default trailing-edge delay between the last scroll and the rescan.
pub const DEFAULT_RESCAN_DEBOUNCE_MS: u64 = 300;

/// Lifecycle of a watcher; there is no transition back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum WatcherState {
    Idle,
    Observing,
}

/// Watcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Quiet period after the last scroll before the rescan fires.
    pub rescan_debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            rescan_debounce: Duration::from_millis(DEFAULT_RESCAN_DEBOUNCE_MS),
        }
    }
}

/// Watcher lifecycle errors.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum WatcherError {
    #[error("watcher is already observing")]
    AlreadyObserving,
}

/// Observes a document and hands every image to the dispatcher.
pub struct IncrementalWatcher {
    dispatcher: DetectionDispatcher,
    document: Arc<dyn DocumentPort>,
    config: WatcherConfig,
    state: Mutex<WatcherState>,
}

impl IncrementalWatcher {
    /// Creates an idle watcher.
    #[must_use]
    pub fn new(
        dispatcher: DetectionDispatcher,
        document: Arc<dyn DocumentPort>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            dispatcher,
            document,
            config,
            state: Mutex::new(WatcherState::Idle),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }

    /// Scans the current images, then follows `events` until the sender
    /// side is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::AlreadyObserving`] if called twice.
    pub fn start(
        &self,
        mut events: mpsc::UnboundedReceiver<DocumentEvent>,
    ) -> Result<JoinHandle<()>, WatcherError> {
        {
            let mut state = self.state.lock();
            if *state == WatcherState::Observing {
                return Err(WatcherError::AlreadyObserving);
            }
            *state = WatcherState::Observing;
        }

        let initial = rescan(&self.dispatcher, self.document.as_ref());
        info!(images = initial, "Watcher observing document");

        let dispatcher = self.dispatcher.clone();
        let document = self.document.clone();
        let debounce = self.config.rescan_debounce;

        Ok(tokio::spawn(async move {
            let mut rescan_at: Option<Instant> = None;

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(DocumentEvent::Inserted(nodes)) => {
                            for node in &nodes {
                                for image in node.images() {
                                    dispatcher.process(image.clone());
                                }
                            }
                        }
                        Some(DocumentEvent::Scrolled) => {
                            rescan_at = Some(Instant::now() + debounce);
                        }
                        None => {
                            if rescan_at.take().is_some() {
                                rescan(&dispatcher, document.as_ref());
                            }
                            break;
                        }
                    },
                    () = async {
                        match rescan_at {
                            Some(deadline) => sleep_until(deadline).await,
                            None => std::future::pending().await,
                        }
                    } => {
                        rescan_at = None;
                        let count = rescan(&dispatcher, document.as_ref());
                        trace!(images = count, "Debounced rescan");
                    }
                }
            }

            debug!("Document event stream closed");
        }))
    }
}

fn rescan(dispatcher: &DetectionDispatcher, document: &dyn DocumentPort) -> usize {
    let images = document.visible_images();
    let count = images.len();
    for image in images {
        dispatcher.process(image);
    }
    count
}
