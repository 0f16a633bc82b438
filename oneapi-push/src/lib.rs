//! # oneapi-push
//!
//! Push-notification receivers for the OneAPI messaging client.
//!
//! When the remote service is asked for delivery receipts, inbound messages
//! or a roaming status query with a notify URL, it answers later by pushing
//! JSON to that URL. This crate hosts the receiving side:
//!
//! - [`PushDispatcher`] runs one HTTP receiver per [`NotificationDomain`],
//!   bound while that domain has listeners and released when it has none.
//! - [`decode`] turns a pushed body into a typed [`Notification`] or a
//!   [`DecodeError`]; listeners receive either.
//! - [`InboundMessageRetriever`] pulls pending inbound messages on an
//!   interval for deployments that cannot accept pushes.
//!
//! Delivery is at-least-once: if the remote service repeats a push, every
//! listener sees it again.
//!
//! ```no_run
//! use oneapi_push::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> oneapi_push::Result<()> {
//!     let dispatcher = PushDispatcher::new(PushConfig::default())?;
//!
//!     dispatcher
//!         .on_delivery_info(|result| {
//!             if let Ok(notification) = result {
//!                 for info in &notification.delivery_info {
//!                     println!("{} -> {}", info.address, info.delivery_status);
//!                 }
//!             }
//!         })
//!         .await?;
//!
//!     let target = dispatcher.push_target(
//!         NotificationDomain::DeliveryInfo,
//!         CorrelationMetadata::generate(),
//!     )?;
//!     println!("send SMS with notifyURL {}", target.notify_url);
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     dispatcher.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod retriever;

pub use config::PushConfig;
pub use decoder::{decode, encode, DecodeError};
pub use dispatcher::{PushDispatcher, RawCallback, ReceiverState};
pub use domain::NotificationDomain;
pub use error::{PushError, Result, RetrievalError};
pub use model::{
    CorrelationMetadata, DeliveryInfo, DeliveryInfoNotification, DeliveryStatus, ExtendedData,
    InboundMessage, InboundMessageNotification, Notification, PushTarget, Roaming,
    RoamingNotification, ServingMccMnc,
};
pub use registry::{Delivery, FanOutReport, Listener, ListenerHandle, ListenerId};
pub use retriever::{InboundMessageRetriever, InboundMessageSource, Retrieval};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        CorrelationMetadata, DecodeError, Delivery, InboundMessageRetriever, InboundMessageSource,
        ListenerHandle, Notification, NotificationDomain, PushConfig, PushDispatcher, PushError,
        ReceiverState,
    };
}
