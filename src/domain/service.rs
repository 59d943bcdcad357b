// src/domain/service.rs

//! Service domain abstractions.
//!
//! This module defines the boundary between the radio config client and the
//! IPC substrate it runs over. It intentionally avoids any reference to a
//! concrete service manager, binder or socket implementation.
//!
//! The substrate is responsible for three things only:
//!
//! - resolving a versioned service name to a live connection
//!   ([`ServiceProvider`]);
//! - carrying encoded requests to the service and encoded responses back
//!   ([`Connection`], [`ResponseSink`]);
//! - reporting the death of a connection exactly once per registration
//!   ([`DeathRecipient`]).
//!
//! Serial correlation, version fallback and failure flushing are handled by
//! the layers above. Concrete implementations live under `src/transport/`.
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Indication, RequestKind, ResponseInfo, Result, RpcError, Serial};

/// Interface version of the radio configuration service.
///
/// Ordered by major, then minor, so `V1_3 > V1_1 > V1_0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HalVersion {
    pub major: u16,
    pub minor: u16,
}

impl HalVersion {
    // ---
    pub const V1_0: HalVersion = HalVersion::new(1, 0);
    pub const V1_1: HalVersion = HalVersion::new(1, 1);
    pub const V1_3: HalVersion = HalVersion::new(1, 3);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for HalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for HalVersion {
    type Err = RpcError;

    /// Parse `"major.minor"`, e.g. `"1.3"`.
    fn from_str(s: &str) -> Result<Self> {
        // ---
        let bad = || RpcError::Config(format!("invalid service version: {s:?}"));

        let (major, minor) = s.trim().split_once('.').ok_or_else(bad)?;
        let major = major.parse().map_err(|_| bad())?;
        let minor = minor.parse().map_err(|_| bad())?;
        Ok(Self { major, minor })
    }
}

/// Receives responses and indications from a connection.
///
/// Called on whatever thread the substrate delivers on. Implementations must
/// not block.
pub trait ResponseSink: Send + Sync {
    /// A response to a previously sent request.
    fn on_response(&self, info: ResponseInfo, payload: Bytes);

    /// An unsolicited notification.
    fn on_indication(&self, indication: Indication);
}

/// Receives death notifications for connections.
pub trait DeathObserver: Send + Sync {
    /// The connection linked with `cookie` died.
    fn service_died(&self, cookie: u64);
}

/// One death registration: the cookie to report and who to report it to.
///
/// The observer is held weakly so a connection never keeps its owner alive.
#[derive(Clone)]
pub struct DeathRecipient {
    cookie: u64,
    observer: Weak<dyn DeathObserver>,
}

impl DeathRecipient {
    // ---
    pub fn new(cookie: u64, observer: Weak<dyn DeathObserver>) -> Self {
        Self { cookie, observer }
    }

    pub fn cookie(&self) -> u64 {
        self.cookie
    }

    /// Deliver the notification; a dropped observer makes this a no-op.
    pub fn notify(&self) {
        // ---
        if let Some(observer) = self.observer.upgrade() {
            observer.service_died(self.cookie);
        }
    }
}

impl fmt::Debug for DeathRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeathRecipient")
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}

/// A live connection to one version of the service.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show explicit
/// lifetimes and a boxed `Future`. Consumers should treat `send` as a normal
/// `async fn`.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    // ---
    /// Interface version this connection speaks.
    fn version(&self) -> HalVersion;

    /// Register `recipient` to be notified once when the connection dies.
    ///
    /// Fails if the connection is already dead.
    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()>;

    /// Route responses and indications for this connection to `sink`.
    fn set_response_sink(&self, sink: Weak<dyn ResponseSink>) -> Result<()>;

    /// Send an encoded request. Returns once the request is handed to the
    /// substrate; the response arrives later through the sink.
    async fn send(&self, serial: Serial, kind: RequestKind, payload: Bytes) -> Result<()>;
}

/// Shared connection pointer.
pub type ConnectionPtr = Arc<dyn Connection>;

/// Resolves versioned service instances.
#[async_trait::async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Obtain a connection to `version` of the service.
    ///
    /// Returns [`RpcError::NotFound`] when the version is not registered and
    /// [`RpcError::TransportRetryable`] for transient lookup failures.
    async fn discover(&self, version: HalVersion) -> Result<ConnectionPtr>;
}

/// Shared service provider pointer.
pub type ServiceProviderPtr = Arc<dyn ServiceProvider>;
