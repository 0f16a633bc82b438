//! Polling retrieval of inbound messages
//!
//! For deployments that cannot expose a push receiver, pending inbound
//! messages can be pulled from the remote service on a fixed interval
//! instead. The polling task runs only while at least one listener is
//! registered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::NotificationDomain;
use crate::error::{PushError, Result, RetrievalError};
use crate::model::InboundMessageNotification;
use crate::registry::{ListenerHandle, ListenerSet};

/// Outcome of one retrieval as seen by listeners.
pub type Retrieval = std::result::Result<InboundMessageNotification, RetrievalError>;

/// Where pending inbound messages are pulled from.
///
/// Implemented by the outbound request layer; each call should return the
/// next batch of pending messages, possibly empty.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InboundMessageSource: Send + Sync + 'static {
    async fn retrieve(&self) -> std::result::Result<InboundMessageNotification, RetrievalError>;
}

/// Background polling loop with its shutdown signal.
struct PollingTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PollingTask {
    fn start(
        source: Arc<dyn InboundMessageSource>,
        interval: Duration,
        listeners: Arc<ListenerSet<Retrieval>>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(Self::polling_loop(source, interval, listeners, shutdown_rx));

        Self { shutdown_tx, handle }
    }

    async fn polling_loop(
        source: Arc<dyn InboundMessageSource>,
        interval: Duration,
        listeners: Arc<ListenerSet<Retrieval>>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        tracing::debug!(?interval, "Inbound message polling started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {}
            }

            // A slow source must not hold up shutdown
            let retrieval = tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                result = source.retrieve() => result,
            };

            match &retrieval {
                Ok(batch) if batch.is_empty() => {
                    tracing::trace!("No inbound messages pending");
                    continue;
                }
                Ok(batch) => {
                    tracing::debug!(count = batch.messages.len(), "Inbound messages retrieved")
                }
                Err(e) => tracing::warn!("{}", e),
            }

            let listeners = Arc::clone(&listeners);
            let delivered = tokio::task::spawn_blocking(move || {
                listeners.snapshot().deliver(&retrieval, "inbound-retriever")
            })
            .await;

            if let Err(e) = delivered {
                tracing::error!("Inbound message delivery task failed: {}", e);
            }
        }

        tracing::debug!("Inbound message polling stopped");
    }

    async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.handle.await {
            tracing::warn!("Inbound message polling task ended abnormally: {}", e);
        }
    }
}

/// Polls an [`InboundMessageSource`] and delivers batches to listeners.
///
/// Listeners receive every non-empty batch and every retrieval error.
pub struct InboundMessageRetriever {
    source: Arc<dyn InboundMessageSource>,
    interval: Duration,
    listeners: Arc<ListenerSet<Retrieval>>,
    task: Mutex<Option<PollingTask>>,
}

impl InboundMessageRetriever {
    /// Create a retriever. Polling begins with the first listener; the first
    /// retrieval happens immediately, then once per `interval`.
    pub fn new(source: Arc<dyn InboundMessageSource>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(PushError::Configuration(
                "retrieval interval must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source,
            interval,
            listeners: Arc::new(ListenerSet::new()),
            task: Mutex::new(None),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a listener, starting the polling task if it is not running.
    pub async fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&Retrieval) + Send + Sync + 'static,
    {
        let mut task = self.task.lock().await;

        let id = self.listeners.add(Arc::new(listener));

        if task.is_none() {
            *task = Some(PollingTask::start(
                Arc::clone(&self.source),
                self.interval,
                Arc::clone(&self.listeners),
            ));
        }

        ListenerHandle::new(NotificationDomain::InboundMessage, id)
    }

    /// Remove a listener, stopping the polling task if it was the last.
    pub async fn remove_listener(&self, handle: ListenerHandle) -> bool {
        if handle.domain() != NotificationDomain::InboundMessage {
            return false;
        }

        let mut task = self.task.lock().await;
        let removed = self.listeners.remove(handle.id());

        if self.listeners.is_empty() {
            if let Some(running) = task.take() {
                running.shutdown().await;
            }
        }

        removed
    }

    /// Drop every listener and stop polling.
    pub async fn release_listeners(&self) -> usize {
        let mut task = self.task.lock().await;
        let removed = self.listeners.clear();

        if let Some(running) = task.take() {
            running.shutdown().await;
        }

        removed
    }

    /// Whether the polling task is currently running.
    pub async fn is_polling(&self) -> bool {
        self.task.lock().await.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
