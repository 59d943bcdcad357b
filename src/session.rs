//! Service session management.
//!
//! A [`SessionManager`] owns the one cached connection to the radio config
//! service. It probes candidate versions newest first, arms exactly one death
//! registration per connection, and on death or send failure tears the
//! session down and flushes every pending request with
//! [`RpcError::Unavailable`].
//!
//! ```text
//!                probe succeeds at V
//! Disconnected ──────────────────────▶ Connected(V, generation g)
//!      ▲                                      │
//!      └──────────────────────────────────────┘
//!          death or send failure for generation g
//! ```
//!
//! Notifications carrying any generation other than the current one are
//! ignored. Lock order is session state, then the request table; completions
//! run after both are released.

use std::sync::{Arc, Mutex, Weak};

use crate::client::RequestTracker;
use crate::lock::lock_ignore_poison;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::{log_debug, log_error, log_info, log_warn};
use crate::{
    // ---
    ConnectionPtr,
    DeathObserver,
    DeathRecipient,
    HalVersion,
    RequestKind,
    ResponseSink,
    Result,
    RpcError,
    ServiceProviderPtr,
    SessionConfig,
};

/// An established connection to one version of the service.
///
/// Cheap to clone. A handle is never mutated; when its connection is lost the
/// manager drops it and the next [`SessionManager::acquire`] builds a new one
/// with a higher generation.
#[derive(Clone)]
pub struct SessionHandle {
    version: HalVersion,
    connection: ConnectionPtr,
    generation: u64,
}

impl SessionHandle {
    // ---
    pub fn version(&self) -> HalVersion {
        self.version
    }

    pub fn connection(&self) -> &ConnectionPtr {
        &self.connection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this session's version implements `kind`.
    pub fn supports(&self, kind: RequestKind) -> bool {
        self.version >= kind.min_version()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("version", &self.version)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

struct SessionState {
    handle: Option<SessionHandle>,
    generation: u64,
}

struct SessionInner {
    provider: ServiceProviderPtr,
    candidates: Vec<HalVersion>,
    supported: bool,
    retry_config: Option<RetryConfig>,
    tracker: Arc<RequestTracker>,
    sink: Weak<dyn ResponseSink>,
    state: Mutex<SessionState>,

    // serializes probing; never held by death notifications
    probe_lock: tokio::sync::Mutex<()>,
}

/// Obtains, caches and re-establishes the connection to the service.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    // ---

    /// Create a session manager.
    ///
    /// Candidate versions are probed newest first regardless of their order
    /// in `config`. When `config.mobile_network_supported` is false the
    /// session is permanently unavailable and never probes.
    ///
    /// Responses and indications of every connection are routed to `sink`;
    /// pending requests live in `tracker` and are flushed on session loss.
    pub fn new(
        provider: ServiceProviderPtr,
        config: &SessionConfig,
        tracker: Arc<RequestTracker>,
        sink: Weak<dyn ResponseSink>,
    ) -> Self {
        // ---
        let mut candidates = config.candidate_versions.clone();
        candidates.sort_by(|a, b| b.cmp(a));
        candidates.dedup();

        if !config.mobile_network_supported {
            log_info!("mobile network not supported; radio config service disabled");
        }

        Self {
            inner: Arc::new(SessionInner {
                provider,
                candidates,
                supported: config.mobile_network_supported,
                retry_config: config.discovery_retry.clone(),
                tracker,
                sink,
                state: Mutex::new(SessionState {
                    handle: None,
                    generation: 0,
                }),
                probe_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Return the cached session, probing for one if disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Unavailable`] when the feature is unsupported on
    /// this deployment or no candidate version could be connected. Callers
    /// should treat the feature area as temporarily absent.
    pub async fn acquire(&self) -> Result<SessionHandle> {
        // ---
        if !self.inner.supported {
            return Err(RpcError::Unavailable);
        }

        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        let _probing = self.inner.probe_lock.lock().await;

        // another caller may have connected while we waited
        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        let inner = &*self.inner;
        let (version, connection) =
            match retry_with_backoff(inner.retry_config.as_ref(), move || inner.probe()).await {
                Ok(found) => found,
                Err(err) => {
                    log_error!("no radio config service found: {err}");
                    return Err(RpcError::Unavailable);
                }
            };

        let handle = {
            let mut state = lock_ignore_poison(&self.inner.state);
            state.generation += 1;
            let handle = SessionHandle {
                version,
                connection,
                generation: state.generation,
            };
            state.handle = Some(handle.clone());
            handle
        };

        // Installed before linking so a death delivered during linking
        // already finds this generation current.
        let observer: Weak<dyn DeathObserver> = Arc::downgrade(&self.inner) as Weak<dyn DeathObserver>;
        let linked = handle
            .connection
            .link_to_death(DeathRecipient::new(handle.generation, observer))
            .and_then(|_| handle.connection.set_response_sink(self.inner.sink.clone()));

        if let Err(err) = linked {
            log_error!("failed to link radio config service {version}: {err}");
            self.inner.teardown(handle.generation, "link failed");
            return Err(RpcError::Unavailable);
        }

        match self.current() {
            Some(current) if current.generation == handle.generation => {
                log_info!(
                    "connected to radio config service {version} (generation {})",
                    handle.generation
                );
                Ok(handle)
            }
            _ => {
                log_warn!("radio config service {version} died while connecting");
                Err(RpcError::Unavailable)
            }
        }
    }

    /// Whether the service, once connected, implements `kind`.
    ///
    /// Connects if necessary; an unavailable service supports nothing.
    pub async fn supports(&self, kind: RequestKind) -> bool {
        // ---
        match self.acquire().await {
            Ok(handle) => handle.supports(kind),
            Err(_) => false,
        }
    }

    /// The cached session, without probing.
    pub fn current(&self) -> Option<SessionHandle> {
        lock_ignore_poison(&self.inner.state).handle.clone()
    }

    /// Handle a death notification for connection generation `cookie`.
    ///
    /// Normally invoked through the [`DeathRecipient`] armed on each new
    /// connection. Stale cookies are ignored.
    pub fn service_died(&self, cookie: u64) {
        self.inner.service_died(cookie);
    }

    /// Tear down session `generation` after a failed send.
    ///
    /// Returns false if that generation is no longer current, in which case
    /// nothing is flushed.
    pub fn invalidate(&self, generation: u64, caller: &str) -> bool {
        self.inner.teardown(generation, caller)
    }

    /// Whether the feature served by this session exists on this deployment.
    pub fn is_supported(&self) -> bool {
        self.inner.supported
    }
}

impl SessionInner {
    // ---

    /// One pass over the candidate versions, newest first.
    ///
    /// `NotFound`, or a connection reporting a different version, moves on to
    /// the next older version. A transient failure
    /// ends the pass so a retry starts again from the newest version rather
    /// than settling for an older one.
    async fn probe(&self) -> Result<(HalVersion, ConnectionPtr)> {
        // ---
        for &version in &self.candidates {
            match self.provider.discover(version).await {
                Ok(connection) if connection.version() == version => {
                    return Ok((version, connection));
                }
                Ok(connection) => {
                    log_warn!(
                        "radio config service {version} resolved to version {}, skipping",
                        connection.version()
                    );
                }
                Err(RpcError::NotFound(_)) => {
                    log_debug!("radio config service {version} not found");
                }
                Err(err @ RpcError::TransportRetryable(_)) => {
                    log_warn!("radio config service {version} lookup failed: {err}");
                    return Err(err);
                }
                Err(_err) => {
                    log_warn!("radio config service {version} lookup failed: {_err}");
                }
            }
        }
        Err(RpcError::Unavailable)
    }

    fn teardown(&self, generation: u64, _caller: &str) -> bool {
        // ---
        let drained = {
            let mut state = lock_ignore_poison(&self.state);

            match &state.handle {
                Some(handle) if handle.generation == generation => {}
                _ => {
                    log_debug!(
                        "{_caller}: ignoring generation {generation} (current {})",
                        state.generation
                    );
                    return false;
                }
            }

            state.handle = None;
            self.tracker.drain()
        };

        log_warn!(
            "{_caller}: radio config session {generation} lost, failing {} requests",
            drained.len()
        );
        RequestTracker::fail_all(drained, RpcError::Unavailable);
        true
    }
}

impl DeathObserver for SessionInner {
    fn service_died(&self, cookie: u64) {
        // ---
        log_info!("radio config service died (cookie {cookie})");
        self.teardown(cookie, "service died");
    }
}
