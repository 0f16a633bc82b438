//! Push dispatcher - receiver lifecycle and listener fan-out
//!
//! The dispatcher owns one [`CallbackServer`] per notification domain. A
//! domain's receiver is bound when its first listener registers and released
//! when its last listener is removed, so an application that never listens
//! never opens a socket.
//!
//! Each domain moves through an explicit [`ReceiverState`]:
//!
//! ```text
//! Idle --add_listener--> Starting --bind ok--> Running
//!                            |
//!                            +--bind failed--> Idle
//! Running --last listener removed / shutdown--> Stopping --drained--> Idle
//! ```
//!
//! Transitions for one domain are serialized by that domain's lifecycle
//! lock; different domains never wait on each other.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use callback_server::{CallbackHandler, CallbackPayload, CallbackServer};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use url::Url;

use crate::config::PushConfig;
use crate::decoder::{self, DecodeError};
use crate::domain::NotificationDomain;
use crate::error::{PushError, Result};
use crate::model::{
    CorrelationMetadata, DeliveryInfoNotification, InboundMessageNotification, PushTarget,
    RoamingNotification,
};
use crate::registry::{
    Delivery, FanOutReport, Listener, ListenerHandle, ListenerRegistry, ListenerSet,
};

/// Lifecycle state of one domain's receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiverState {
    /// No receiver bound and no listeners registered
    #[default]
    Idle,
    /// First listener is registering and the port is being bound
    Starting,
    /// Receiver bound and at least one listener registered
    Running,
    /// Receiver draining in-flight pushes before releasing its port
    Stopping,
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReceiverState::Idle => "idle",
            ReceiverState::Starting => "starting",
            ReceiverState::Running => "running",
            ReceiverState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// One accepted push, tagged with the domain whose receiver took it.
#[derive(Debug, Clone)]
pub struct RawCallback {
    pub domain: NotificationDomain,
    pub body: Bytes,
    pub received_at: DateTime<Utc>,
}

impl RawCallback {
    /// A callback received now, for feeding bodies obtained some other way.
    pub fn new(domain: NotificationDomain, body: impl Into<Bytes>) -> Self {
        Self {
            domain,
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotStatus {
    state: ReceiverState,
    local_addr: Option<SocketAddr>,
}

/// Per-domain lifecycle.
#[derive(Default)]
struct DomainSlot {
    /// Serializes start/stop and holds the receiver while it is bound
    receiver: tokio::sync::Mutex<Option<CallbackServer>>,
    /// Readable without waiting on a transition in progress
    status: parking_lot::Mutex<SlotStatus>,
}

impl DomainSlot {
    fn set_status(&self, state: ReceiverState, local_addr: Option<SocketAddr>) {
        *self.status.lock() = SlotStatus { state, local_addr };
    }

    fn status(&self) -> SlotStatus {
        *self.status.lock()
    }
}

struct Inner {
    config: PushConfig,
    registry: ListenerRegistry,
    slots: DashMap<NotificationDomain, Arc<DomainSlot>>,
}

/// Accepts push callbacks for every domain and fans them out to listeners.
///
/// Cloning is cheap; all clones share the same receivers and listeners.
/// Dropping the last clone signals every running receiver to stop.
///
/// # Example
///
/// ```no_run
/// use oneapi_push::{PushConfig, PushDispatcher, NotificationDomain};
///
/// #[tokio::main]
/// async fn main() -> oneapi_push::Result<()> {
///     let dispatcher = PushDispatcher::new(PushConfig::default())?;
///
///     // Binds port 3002 on first registration
///     let handle = dispatcher
///         .on_roaming_status(|result| match result {
///             Ok(notification) => println!("address: {}", notification.roaming.address),
///             Err(e) => eprintln!("malformed push: {e}"),
///         })
///         .await?;
///
///     // Advertise this URL when querying roaming status asynchronously
///     println!("notify URL: {}", dispatcher.notify_url(NotificationDomain::RoamingStatus)?);
///
///     // Releases the port once no roaming listeners remain
///     dispatcher.remove_listener(handle).await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PushDispatcher {
    inner: Arc<Inner>,
}

impl PushDispatcher {
    /// Create a dispatcher. No receiver is started until a listener registers.
    pub fn new(config: PushConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                registry: ListenerRegistry::new(),
                slots: DashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &PushConfig {
        &self.inner.config
    }

    /// Register a listener for `domain`, starting its receiver if needed.
    ///
    /// The listener is called with every push that arrives for the domain:
    /// the decoded notification, or the [`DecodeError`] if the body was
    /// malformed. Fails only when the receiver has to be started and its
    /// port cannot be bound, in which case the listener is not kept.
    pub async fn add_listener<F>(
        &self,
        domain: NotificationDomain,
        listener: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn(&Delivery) + Send + Sync + 'static,
    {
        self.add_shared_listener(domain, Arc::new(listener)).await
    }

    /// Like [`add_listener`](Self::add_listener) for an already shared callback.
    pub async fn add_shared_listener(
        &self,
        domain: NotificationDomain,
        listener: Listener<Delivery>,
    ) -> Result<ListenerHandle> {
        let slot = self.slot(domain);
        let mut receiver = slot.receiver.lock().await;

        if receiver.is_none() {
            *receiver = Some(self.start_receiver(domain, &slot).await?);
        }

        Ok(self.inner.registry.add_listener(domain, listener))
    }

    /// Remove a listener, stopping the domain's receiver if it was the last.
    ///
    /// Never fails; removing an already removed listener, or passing a handle
    /// issued by another dispatcher or retriever, does nothing.
    ///
    /// When other listeners remain, a push already being fanned out on
    /// another thread may still call this listener once after removal
    /// returns. When the receiver is stopped this waits for in-flight pushes
    /// to finish, so do not await it from inside a listener of the same
    /// domain.
    pub async fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let domain = handle.domain();
        let slot = self.slot(domain);
        let mut receiver = slot.receiver.lock().await;

        let removed = self.inner.registry.remove_listener(handle);

        if self.inner.registry.is_empty(domain) {
            Self::stop_receiver(domain, &slot, &mut receiver).await;
        }

        removed
    }

    /// Remove every listener on `domain` and stop its receiver.
    pub async fn remove_all(&self, domain: NotificationDomain) -> usize {
        let slot = self.slot(domain);
        let mut receiver = slot.receiver.lock().await;

        let removed = self.inner.registry.remove_all(domain);
        Self::stop_receiver(domain, &slot, &mut receiver).await;

        if removed > 0 {
            tracing::info!(%domain, removed, "Push listeners removed");
        }
        removed
    }

    /// Stop every receiver and drop every listener.
    pub async fn shutdown(&self) {
        for domain in NotificationDomain::ALL {
            self.remove_all(domain).await;
        }
        tracing::info!("Push dispatcher shut down");
    }

    /// Decode `callback` and deliver it to the domain's current listeners.
    ///
    /// This is what every receiver does per push; it is exposed for bodies
    /// that arrive through some other channel. Listeners run on the calling
    /// thread.
    pub fn dispatch(&self, callback: &RawCallback) -> FanOutReport {
        fan_out(callback, &self.inner.registry.set(callback.domain))
    }

    /// Current lifecycle state of `domain`'s receiver.
    pub fn state(&self, domain: NotificationDomain) -> ReceiverState {
        self.slot(domain).status().state
    }

    /// Address `domain`'s receiver is bound to, if running.
    pub fn local_addr(&self, domain: NotificationDomain) -> Option<SocketAddr> {
        self.slot(domain).status().local_addr
    }

    /// Port `domain`'s receiver is bound to, if running.
    pub fn endpoint_port(&self, domain: NotificationDomain) -> Option<u16> {
        self.local_addr(domain).map(|addr| addr.port())
    }

    pub fn listener_count(&self, domain: NotificationDomain) -> usize {
        self.inner.registry.len(domain)
    }

    /// URL to advertise to the remote service for `domain`.
    ///
    /// The host is the configured public host, else the bind address when
    /// it is specific, else the detected local IP, else 127.0.0.1.
    pub fn notify_url(&self, domain: NotificationDomain) -> Result<Url> {
        let addr = self.local_addr(domain).ok_or(PushError::NotRunning(domain))?;
        let config = &self.inner.config;

        let authority = match &config.public_host {
            Some(host) => format!("{}:{}", host, addr.port()),
            None => {
                let ip = if config.bind_address.is_unspecified() {
                    callback_server::detect_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
                } else {
                    config.bind_address
                };
                SocketAddr::new(ip, addr.port()).to_string()
            }
        };

        Ok(Url::parse(&format!("http://{authority}/"))?)
    }

    /// Notify URL plus the correlation data to send with the subscription.
    pub fn push_target(
        &self,
        domain: NotificationDomain,
        correlation: CorrelationMetadata,
    ) -> Result<PushTarget> {
        Ok(PushTarget {
            notify_url: self.notify_url(domain)?,
            correlation,
        })
    }

    /// Register a listener for roaming status pushes.
    pub async fn on_roaming_status<F>(&self, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(std::result::Result<&RoamingNotification, &DecodeError>) + Send + Sync + 'static,
    {
        self.add_listener(NotificationDomain::RoamingStatus, move |delivery: &Delivery| {
            match delivery {
                Ok(notification) => {
                    if let Some(roaming) = notification.as_roaming_status() {
                        listener(Ok(roaming));
                    }
                }
                Err(e) => listener(Err(e)),
            }
        })
        .await
    }

    /// Register a listener for inbound message pushes.
    pub async fn on_inbound_messages<F>(&self, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(std::result::Result<&InboundMessageNotification, &DecodeError>)
            + Send
            + Sync
            + 'static,
    {
        self.add_listener(NotificationDomain::InboundMessage, move |delivery: &Delivery| {
            match delivery {
                Ok(notification) => {
                    if let Some(inbound) = notification.as_inbound_messages() {
                        listener(Ok(inbound));
                    }
                }
                Err(e) => listener(Err(e)),
            }
        })
        .await
    }

    /// Register a listener for delivery receipt pushes.
    pub async fn on_delivery_info<F>(&self, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(std::result::Result<&DeliveryInfoNotification, &DecodeError>) + Send + Sync + 'static,
    {
        self.add_listener(NotificationDomain::DeliveryInfo, move |delivery: &Delivery| {
            match delivery {
                Ok(notification) => {
                    if let Some(info) = notification.as_delivery_info() {
                        listener(Ok(info));
                    }
                }
                Err(e) => listener(Err(e)),
            }
        })
        .await
    }

    fn slot(&self, domain: NotificationDomain) -> Arc<DomainSlot> {
        self.inner.slots.entry(domain).or_default().clone()
    }

    async fn start_receiver(
        &self,
        domain: NotificationDomain,
        slot: &DomainSlot,
    ) -> Result<CallbackServer> {
        let config = &self.inner.config;
        let port = config.port(domain);

        slot.set_status(ReceiverState::Starting, None);
        tracing::debug!(%domain, port, "Starting push receiver");

        let handler = DomainHandler {
            domain,
            listeners: self.inner.registry.set(domain),
        };
        let mut server =
            CallbackServer::new(config.bind_address, config.max_body_bytes, Arc::new(handler));

        match server.start(port).await {
            Ok(addr) => {
                slot.set_status(ReceiverState::Running, Some(addr));
                tracing::info!(%domain, %addr, "Push receiver running");
                Ok(server)
            }
            Err(source) => {
                slot.set_status(ReceiverState::Idle, None);
                tracing::warn!(%domain, port, "Push receiver failed to start: {}", source);
                Err(PushError::Bind { domain, port, source })
            }
        }
    }

    async fn stop_receiver(
        domain: NotificationDomain,
        slot: &DomainSlot,
        receiver: &mut Option<CallbackServer>,
    ) {
        let Some(mut server) = receiver.take() else {
            return;
        };

        slot.set_status(ReceiverState::Stopping, server.local_addr());
        tracing::debug!(%domain, "Draining push receiver");

        server.stop().await;

        slot.set_status(ReceiverState::Idle, None);
        tracing::info!(%domain, "Push receiver idle");
    }
}

/// Bridges one domain's receiver to its listener set.
struct DomainHandler {
    domain: NotificationDomain,
    listeners: Arc<ListenerSet<Delivery>>,
}

#[async_trait]
impl CallbackHandler for DomainHandler {
    async fn handle(&self, payload: CallbackPayload) {
        let callback = RawCallback {
            domain: self.domain,
            body: payload.body,
            received_at: payload.received_at,
        };
        let listeners = self.listeners.clone();

        // Listener bodies may block; keep them off the async workers
        match tokio::task::spawn_blocking(move || fan_out(&callback, &listeners)).await {
            Ok(report) => tracing::debug!(
                domain = %self.domain,
                invoked = report.invoked,
                failed = report.failed,
                "Push dispatched"
            ),
            Err(e) => tracing::error!(domain = %self.domain, "Push dispatch task failed: {}", e),
        }
    }
}

fn fan_out(callback: &RawCallback, listeners: &ListenerSet<Delivery>) -> FanOutReport {
    let delivery = decoder::decode(callback.domain, &callback.body);

    if let Err(e) = &delivery {
        tracing::warn!(
            domain = %callback.domain,
            received_at = %callback.received_at,
            "Delivering undecodable push: {}",
            e.reason
        );
    }

    listeners.snapshot().deliver(&delivery, callback.domain.as_str())
}
