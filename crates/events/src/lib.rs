//! Event side of the notification hub.
//!
//! Provides:
//! - [`transport`]: message bus abstraction with NATS and in-process
//!   implementations.
//! - [`publisher`]: JSON publish and request/reply on top of a transport.
//! - [`subscriptions`]: cancellable per-subject workers.
//! - [`dispatcher`]: event to notification translation.
//! - [`store`]: bounded, concurrent notification record.
//! - [`delivery`]: email, SMS and push fanout.

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod messages;
pub mod publisher;
pub mod store;
pub mod subscriptions;
pub mod transport;

pub use config::{ChannelConfig, ConfigError, EnvSource, StoreConfig, TransportConfig};
pub use delivery::{ChannelError, ChannelFanout, DeliveryChannel};
pub use dispatcher::{DispatchError, DomainEvent, EventDispatcher, EventHandler};
pub use publisher::{PublishError, Publisher};
pub use store::{NotificationStats, NotificationStore};
pub use subscriptions::SubscriptionManager;
pub use transport::{ConnectionState, MemoryTransport, Transport, TransportError};
