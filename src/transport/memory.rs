//! In-memory service substrate.
//!
//! A pure in-process implementation of [`ServiceProvider`] and [`Connection`],
//! used for testing, local execution, and as a reference for substrate
//! semantics.
//!
//! ## Reference Semantics
//!
//! - Discovery of a version resolves only while a live service is registered
//!   under it; everything else is [`RpcError::NotFound`].
//! - Killing a service notifies every death recipient exactly once, on the
//!   caller's thread, before `kill()` returns.
//! - Responses injected with [`MemoryService::respond`] are delivered
//!   synchronously. Responses produced by a handler are delivered from a
//!   spawned task, after `send()` has returned.
//!
//! ## Non-Goals
//!
//! No IPC, threading model or scheduling of a real service manager is
//! emulated. Failures happen only when a test asks for them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;

use crate::lock::lock_ignore_poison;
use crate::{log_debug, log_info};
use crate::{
    // ---
    Connection,
    ConnectionPtr,
    DeathRecipient,
    HalVersion,
    Indication,
    RequestKind,
    Response,
    ResponseInfo,
    ResponseSink,
    Result,
    RpcError,
    Serial,
    ServiceProvider,
};

/// A request as received by a [`MemoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub serial: Serial,
    pub kind: RequestKind,
    /// Method identifier the request was addressed with.
    pub method_id: u8,
    pub payload: Bytes,
}

/// Produces the status and response for a received request, or `None` to
/// leave it unanswered.
type Handler = Arc<dyn Fn(&ServiceRequest) -> Option<(i32, Response)> + Send + Sync>;

/// Shared service registry for the in-memory substrate.
///
/// Plays the role of the platform's service manager: services are registered
/// per version and looked up by [`ServiceProvider::discover`].
///
/// # Usage
///
/// ```
/// # use radio_config_rpc::{HalVersion, MemoryHub, RadioConfigBuilder};
/// # fn example() -> radio_config_rpc::Result<()> {
/// let hub = MemoryHub::new();
/// let service = hub.register(HalVersion::V1_1);
///
/// let client = RadioConfigBuilder::new(hub.clone()).build()?;
/// # let _ = (service, client);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryHub {
    // ---
    services: Mutex<HashMap<HalVersion, Arc<MemoryService>>>,
    failures: Mutex<HashMap<HalVersion, u32>>,
    probes: Mutex<Vec<HalVersion>>,
}

impl MemoryHub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a fresh live service for `version`, replacing any previous
    /// one.
    pub fn register(&self, version: HalVersion) -> Arc<MemoryService> {
        // ---
        log_debug!("memory hub: register {version}");

        let service = Arc::new(MemoryService::new(version));
        lock_ignore_poison(&self.services).insert(version, service.clone());
        service
    }

    /// Remove the service for `version` without killing it.
    pub fn unregister(&self, version: HalVersion) -> Option<Arc<MemoryService>> {
        lock_ignore_poison(&self.services).remove(&version)
    }

    /// Make the next `times` lookups of `version` fail transiently.
    pub fn fail_discovery(&self, version: HalVersion, times: u32) {
        lock_ignore_poison(&self.failures).insert(version, times);
    }

    /// Every version looked up so far, in order.
    pub fn probes(&self) -> Vec<HalVersion> {
        lock_ignore_poison(&self.probes).clone()
    }
}

#[async_trait::async_trait]
impl ServiceProvider for MemoryHub {
    async fn discover(&self, version: HalVersion) -> Result<ConnectionPtr> {
        // ---
        lock_ignore_poison(&self.probes).push(version);

        if let Some(remaining) = lock_ignore_poison(&self.failures).get_mut(&version) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RpcError::TransportRetryable(format!(
                    "lookup of {version} interrupted"
                )));
            }
        }

        match lock_ignore_poison(&self.services).get(&version) {
            Some(service) if service.is_alive() => Ok(service.clone() as ConnectionPtr),
            _ => Err(RpcError::NotFound(version)),
        }
    }
}

/// One in-memory service instance.
///
/// Records every request it receives. Responses are either injected by the
/// test through [`respond`](Self::respond) or produced by a handler installed
/// with [`set_handler`](Self::set_handler).
pub struct MemoryService {
    version: HalVersion,
    alive: AtomicBool,
    fail_sends: AtomicBool,
    recipients: Mutex<Vec<DeathRecipient>>,
    sink: Mutex<Option<Weak<dyn ResponseSink>>>,
    received: Mutex<Vec<ServiceRequest>>,
    handler: Mutex<Option<Handler>>,
}

impl MemoryService {
    // ---
    fn new(version: HalVersion) -> Self {
        Self {
            version,
            alive: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            recipients: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
        }
    }

    /// Answer requests automatically.
    ///
    /// ```
    /// # use radio_config_rpc::{HalVersion, MemoryHub, Response};
    /// let hub = MemoryHub::new();
    /// let service = hub.register(HalVersion::V1_3);
    /// service.set_handler(|_request| Some((0, Response::Ack)));
    /// ```
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&ServiceRequest) -> Option<(i32, Response)> + Send + Sync + 'static,
    {
        *lock_ignore_poison(&self.handler) = Some(Arc::new(handler));
    }

    /// Requests received so far, in arrival order.
    pub fn received(&self) -> Vec<ServiceRequest> {
        lock_ignore_poison(&self.received).clone()
    }

    /// Deliver a response to the registered sink.
    pub fn respond(&self, info: ResponseInfo, payload: Bytes) {
        // ---
        match self.sink() {
            Some(sink) => sink.on_response(info, payload),
            None => {
                log_debug!("memory service {}: no sink for {}", self.version, info.serial);
            }
        }
    }

    /// Deliver an unsolicited indication to the registered sink.
    pub fn indicate(&self, indication: Indication) {
        if let Some(sink) = self.sink() {
            sink.on_indication(indication);
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Kill the service, notifying every death recipient.
    pub fn kill(&self) {
        // ---
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        log_info!("memory service {}: killed", self.version);

        let recipients = std::mem::take(&mut *lock_ignore_poison(&self.recipients));
        for recipient in recipients {
            log_debug!("memory service {}: death cookie {}", self.version, recipient.cookie());
            recipient.notify();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn sink(&self) -> Option<Arc<dyn ResponseSink>> {
        lock_ignore_poison(&self.sink)
            .as_ref()
            .and_then(|sink| sink.upgrade())
    }
}

#[async_trait::async_trait]
impl Connection for MemoryService {
    // ---
    fn version(&self) -> HalVersion {
        self.version
    }

    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()> {
        // ---
        let mut recipients = lock_ignore_poison(&self.recipients);

        // checked under the lock so kill() cannot miss this recipient
        if !self.is_alive() {
            return Err(RpcError::Transport(format!(
                "service {} is dead",
                self.version
            )));
        }
        if recipients.iter().any(|r| r.cookie() == recipient.cookie()) {
            return Err(RpcError::Transport(format!(
                "cookie {} already linked to service {}",
                recipient.cookie(),
                self.version
            )));
        }
        recipients.push(recipient);
        Ok(())
    }

    fn set_response_sink(&self, sink: Weak<dyn ResponseSink>) -> Result<()> {
        *lock_ignore_poison(&self.sink) = Some(sink);
        Ok(())
    }

    async fn send(&self, serial: Serial, kind: RequestKind, payload: Bytes) -> Result<()> {
        // ---
        if !self.is_alive() {
            return Err(RpcError::Transport(format!(
                "service {} is dead",
                self.version
            )));
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RpcError::Transport(format!(
                "send of {serial} to {} failed",
                self.version
            )));
        }

        let request = ServiceRequest {
            serial,
            kind,
            method_id: kind.method_id(),
            payload,
        };
        lock_ignore_poison(&self.received).push(request.clone());

        let handler = lock_ignore_poison(&self.handler).clone();
        let reply = handler.and_then(|handler| handler(&request));

        if let Some((status, response)) = reply {
            let sink = lock_ignore_poison(&self.sink).clone();
            let info = if status == 0 {
                ResponseInfo::ok(serial)
            } else {
                ResponseInfo::error(serial, status)
            };
            let payload = response.encode();

            tokio::spawn(async move {
                if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
                    sink.on_response(info, payload);
                }
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::DeathObserver;

    struct Deaths(Mutex<Vec<u64>>);

    impl DeathObserver for Deaths {
        fn service_died(&self, cookie: u64) {
            self.0.lock().unwrap().push(cookie);
        }
    }

    #[tokio::test]
    async fn test_discover_registered_only() {
        // ---
        let hub = MemoryHub::new();
        hub.register(HalVersion::V1_1);

        assert!(hub.discover(HalVersion::V1_1).await.is_ok());
        assert_eq!(
            hub.discover(HalVersion::V1_3).await.err(),
            Some(RpcError::NotFound(HalVersion::V1_3))
        );
        assert_eq!(hub.probes(), vec![HalVersion::V1_1, HalVersion::V1_3]);

        hub.unregister(HalVersion::V1_1);
        assert!(hub.discover(HalVersion::V1_1).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_discovery_failures() {
        // ---
        let hub = MemoryHub::new();
        hub.register(HalVersion::V1_0);
        hub.fail_discovery(HalVersion::V1_0, 2);

        for _ in 0..2 {
            assert!(matches!(
                hub.discover(HalVersion::V1_0).await,
                Err(RpcError::TransportRetryable(_))
            ));
        }
        assert!(hub.discover(HalVersion::V1_0).await.is_ok());
    }

    #[tokio::test]
    async fn test_kill_notifies_once_and_rejects_sends() {
        // ---
        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);

        let deaths = Arc::new(Deaths(Mutex::new(Vec::new())));
        let observer: Weak<dyn DeathObserver> = Arc::downgrade(&deaths) as Weak<dyn DeathObserver>;
        service
            .link_to_death(DeathRecipient::new(9, observer.clone()))
            .unwrap();
        // one registration per cookie
        assert!(service
            .link_to_death(DeathRecipient::new(9, observer.clone()))
            .is_err());

        service.kill();
        service.kill();
        assert_eq!(*deaths.0.lock().unwrap(), vec![9]);

        assert!(service
            .link_to_death(DeathRecipient::new(10, observer))
            .is_err());
        assert!(service
            .send(Serial::new(1), RequestKind::GetSimSlotsStatus, Bytes::new())
            .await
            .is_err());
        assert!(hub.discover(HalVersion::V1_3).await.is_err());
    }

    #[tokio::test]
    async fn test_send_records_requests() {
        // ---
        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);

        service
            .send(Serial::new(3), RequestKind::SetModemsConfig, Bytes::from_static(b"x"))
            .await
            .unwrap();

        service.fail_sends(true);
        assert!(service
            .send(Serial::new(4), RequestKind::SetModemsConfig, Bytes::new())
            .await
            .is_err());

        let received = service.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].serial, Serial::new(3));
        assert_eq!(received[0].kind, RequestKind::SetModemsConfig);
        assert_eq!(received[0].method_id, RequestKind::SetModemsConfig.method_id());
    }
}
