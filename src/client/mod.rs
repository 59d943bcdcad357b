/// Radio config client: one entry point per remote operation
mod completion;
mod pending;

pub use completion::Completion;
pub use pending::{PendingRequest, RequestTracker, WorkSource};

use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::lock::lock_ignore_poison;
use crate::protocol::codec;
use crate::{log_debug, log_error, log_warn};
use crate::{
    // ---
    HalVersion,
    Indication,
    ModemsConfig,
    NoArgs,
    NrCapability,
    PreferredDataModem,
    RequestKind,
    Response,
    ResponseInfo,
    ResponseSink,
    ResponseType,
    Result,
    RpcError,
    Serial,
    ServiceProviderPtr,
    SessionConfig,
    SessionManager,
    SlotMapping,
};

/// Handle returned from a slot-status registration.
///
/// Registering again replaces the previous registration, closing its inbox.
pub struct IndicationHandle {
    // ---
    /// Receiver channel for delivered indications.
    pub inbox: mpsc::Receiver<Indication>,
}

/// Client for the radio configuration service.
///
/// Each operation takes its parameters and a [`Completion`], and returns as
/// soon as the request has been registered and handed to the service. The
/// completion later receives the decoded response, the service's error
/// status, or [`RpcError::Unavailable`] if the session is lost first.
///
/// Operations fail immediately, resolving the completion with the same error,
/// when no session can be established ([`RpcError::Unavailable`]) or the
/// connected version lacks the operation ([`RpcError::NotSupported`]).
///
/// No timeouts are applied; wrap the completion's receiver in
/// `tokio::time::timeout` where one is needed.
///
/// # Example
///
/// ```no_run
/// use radio_config_rpc::{Completion, HalVersion, MemoryHub, RadioConfigBuilder, Response};
///
/// # async fn example() -> radio_config_rpc::Result<()> {
/// let hub = MemoryHub::new();
/// hub.register(HalVersion::V1_3);
///
/// let client = RadioConfigBuilder::new(hub.clone()).build()?;
///
/// let (completion, rx) = Completion::channel();
/// client.get_sim_slots_status(completion).await?;
///
/// if let Ok(Ok(Response::SlotStatus(slots))) = rx.await {
///     println!("{} slots", slots.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RadioConfigClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    tracker: Arc<RequestTracker>,
    session: SessionManager,
    work_source: WorkSource,
    nr_capabilities: Vec<NrCapability>,
    indication_buffer: usize,
    slot_status_registrant: Mutex<Option<mpsc::Sender<Indication>>>,
}

impl RadioConfigClient {
    // ---

    /// Create a client (internal use by RadioConfigBuilder).
    pub(crate) fn new(provider: ServiceProviderPtr, config: &SessionConfig) -> Self {
        // ---
        let tracker = Arc::new(RequestTracker::new());

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let sink: Weak<dyn ResponseSink> = weak.clone();
            ClientInner {
                session: SessionManager::new(provider, config, tracker.clone(), sink),
                tracker,
                work_source: config.work_source.clone(),
                nr_capabilities: config.device_nr_capabilities(),
                indication_buffer: config.indication_buffer,
                slot_status_registrant: Mutex::new(None),
            }
        });

        Self { inner }
    }

    /// Request the status of every physical SIM slot.
    ///
    /// Completes with [`Response::SlotStatus`].
    pub async fn get_sim_slots_status(&self, completion: Completion) -> Result<Serial> {
        // ---
        self.dispatch(RequestKind::GetSimSlotsStatus, codec::encode(&NoArgs), completion)
            .await
    }

    /// Map logical slots to physical slots; index `i` of `physical_slots` is
    /// the physical slot for logical slot `i`.
    ///
    /// Completes with [`Response::Ack`].
    pub async fn set_sim_slots_mapping(
        &self,
        physical_slots: &[u32],
        completion: Completion,
    ) -> Result<Serial> {
        // ---
        log_debug!("set_sim_slots_mapping: {physical_slots:?}");

        let args = SlotMapping {
            physical_slots: physical_slots.to_vec(),
        };
        self.dispatch(RequestKind::SetSimSlotsMapping, codec::encode(&args), completion)
            .await
    }

    /// Select the modem used for data. Requires service version 1.1.
    ///
    /// Completes with [`Response::Ack`].
    pub async fn set_preferred_data_modem(
        &self,
        modem_id: u8,
        completion: Completion,
    ) -> Result<Serial> {
        // ---
        let args = PreferredDataModem { modem_id };
        self.dispatch(RequestKind::SetPreferredDataModem, codec::encode(&args), completion)
            .await
    }

    /// Request modem concurrency limits. Requires service version 1.1.
    ///
    /// Completes with [`Response::PhoneCapability`].
    pub async fn get_phone_capability(&self, completion: Completion) -> Result<Serial> {
        // ---
        self.dispatch(RequestKind::GetPhoneCapability, codec::encode(&NoArgs), completion)
            .await
    }

    /// Switch between single- and multi-SIM by setting the number of live
    /// modems. Requires service version 1.1.
    ///
    /// Completes with [`Response::Ack`].
    pub async fn set_modems_config(
        &self,
        num_live_modems: u8,
        completion: Completion,
    ) -> Result<Serial> {
        // ---
        log_debug!("set_modems_config: num_live_modems = {num_live_modems}");

        let args = ModemsConfig { num_live_modems };
        self.dispatch(RequestKind::SetModemsConfig, codec::encode(&args), completion)
            .await
    }

    /// Request the HAL's device capabilities. Requires service version 1.3.
    ///
    /// Completes with [`Response::HalDeviceCapabilities`].
    pub async fn get_hal_device_capabilities(&self, completion: Completion) -> Result<Serial> {
        // ---
        self.dispatch(
            RequestKind::GetHalDeviceCapabilities,
            codec::encode(&NoArgs),
            completion,
        )
        .await
    }

    /// Whether the service supports `SET_PREFERRED_DATA_MODEM`.
    ///
    /// When it does not, callers fall back to per-modem data allow/disallow.
    pub async fn is_set_preferred_data_command_supported(&self) -> bool {
        self.inner
            .session
            .supports(RequestKind::SetPreferredDataModem)
            .await
    }

    /// Register for slot-status-changed indications.
    pub fn register_for_sim_slot_status_changed(&self) -> IndicationHandle {
        // ---
        let (tx, rx) = mpsc::channel(self.inner.indication_buffer);
        *lock_ignore_poison(&self.inner.slot_status_registrant) = Some(tx);
        IndicationHandle { inbox: rx }
    }

    /// Drop the slot-status registration, if any.
    pub fn unregister_for_sim_slot_status_changed(&self) {
        lock_ignore_poison(&self.inner.slot_status_registrant).take();
    }

    /// Version of the connected service, if a session is established.
    pub fn hal_version(&self) -> Option<HalVersion> {
        self.inner.session.current().map(|handle| handle.version())
    }

    /// 5G capabilities the device is configured for.
    pub fn device_nr_capabilities(&self) -> &[NrCapability] {
        &self.inner.nr_capabilities
    }

    /// Number of requests waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.tracker.len()
    }

    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    async fn dispatch(
        &self,
        kind: RequestKind,
        payload: Bytes,
        completion: Completion,
    ) -> Result<Serial> {
        // ---
        let inner = &self.inner;

        let handle = match inner.session.acquire().await {
            Ok(handle) => handle,
            Err(err) => {
                log_debug!("{kind} > {err}");
                completion.complete(Err(err.clone()));
                return Err(err);
            }
        };

        if !handle.supports(kind) {
            let err = RpcError::NotSupported {
                operation: kind.as_str(),
                version: handle.version(),
            };
            log_debug!("{kind} > {err}");
            completion.complete(Err(err.clone()));
            return Err(err);
        }

        let serial = inner
            .tracker
            .submit(kind, completion, inner.work_source.clone());

        log_debug!("{serial}> {kind}");

        if let Err(_err) = handle.connection().send(serial, kind, payload).await {
            log_error!("{serial}> {kind}: send failed: {_err}");

            // A teardown that already happened drained the table before
            // this request was registered.
            if !inner.session.invalidate(handle.generation(), kind.as_str()) {
                if let Some(pending) = inner.tracker.take(serial) {
                    pending.fail(RpcError::Unavailable);
                }
            }
        }

        Ok(serial)
    }
}

impl ResponseSink for ClientInner {
    fn on_response(&self, info: ResponseInfo, payload: Bytes) {
        // ---
        if info.response_type != ResponseType::Solicited {
            log_error!("unexpected response type {:?}", info.response_type);
        }

        // unmatched serials are logged by the tracker
        let Some(pending) = self.tracker.complete(info.serial) else {
            return;
        };

        let kind = pending.kind();
        let result = if info.status != 0 {
            Err(RpcError::Remote(info.status))
        } else {
            Response::decode(kind, &payload)
        };

        match &result {
            Ok(_) => {
                log_debug!("{}< {kind}", info.serial);
            }
            Err(RpcError::MalformedRecord(_why)) => {
                log_error!("{}< {kind}: dropping malformed response: {_why}", info.serial);
            }
            Err(_err) => {
                log_debug!("{}< {kind} {_err}", info.serial);
            }
        }

        pending.complete(result);
    }

    fn on_indication(&self, indication: Indication) {
        // ---
        let registrant = lock_ignore_poison(&self.slot_status_registrant).clone();

        let Some(tx) = registrant else {
            log_debug!("no registrant for {indication:?}");
            return;
        };

        match tx.try_send(indication) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log_warn!("slot status inbox full, dropping indication");
            }
            Err(TrySendError::Closed(_)) => {
                log_debug!("slot status registrant dropped its inbox");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::transport::MemoryHub;
    use crate::{CardState, SimSlotStatus, SlotState};

    fn client(hub: &Arc<MemoryHub>) -> RadioConfigClient {
        RadioConfigClient::new(hub.clone(), &SessionConfig::default())
    }

    #[tokio::test]
    async fn test_stale_response_is_ignored() {
        // ---
        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);
        let client = client(&hub);

        let (completion, rx) = Completion::channel();
        let serial = client.get_phone_capability(completion).await.unwrap();

        service.respond(ResponseInfo::ok(Serial::new(serial.get() + 7)), Response::Ack.encode());
        assert_eq!(client.pending_requests(), 1);

        service.respond(ResponseInfo::error(serial, 6), Bytes::new());
        assert_eq!(rx.await.unwrap(), Err(RpcError::Remote(6)));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_completes_once() {
        // ---
        use std::sync::atomic::{AtomicU32, Ordering};

        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);
        let client = client(&hub);

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let first = client
            .set_modems_config(
                2,
                Completion::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();
        let (completion, rx) = Completion::channel();
        let second = client.set_preferred_data_modem(1, completion).await.unwrap();

        service.respond(ResponseInfo::ok(first), Response::Ack.encode());
        service.respond(ResponseInfo::ok(first), Response::Ack.encode());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.pending_requests(), 1);
        assert!(client.inner.tracker.contains(second));

        service.respond(ResponseInfo::ok(second), Response::Ack.encode());
        assert_eq!(rx.await.unwrap(), Ok(Response::Ack));
    }

    #[tokio::test]
    async fn test_malformed_response_never_reaches_caller_as_data() {
        // ---
        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);
        let client = client(&hub);

        let (completion, rx) = Completion::channel();
        let serial = client.get_sim_slots_status(completion).await.unwrap();

        let mut truncated = Response::SlotStatus(vec![]).encode().to_vec();
        truncated.pop();
        service.respond(ResponseInfo::ok(serial), Bytes::from(truncated));

        assert!(matches!(rx.await.unwrap(), Err(RpcError::MalformedRecord(_))));
    }

    #[tokio::test]
    async fn test_indications_reach_latest_registrant() {
        // ---
        let hub = MemoryHub::new();
        let service = hub.register(HalVersion::V1_3);
        let client = client(&hub);

        // connect so the service knows where to send indications
        client.session().acquire().await.unwrap();

        let mut old = client.register_for_sim_slot_status_changed();
        let mut new = client.register_for_sim_slot_status_changed();

        let slots = vec![SimSlotStatus {
            card_state: CardState::Absent,
            slot_state: SlotState::Inactive,
            logical_slot_id: 1,
            atr: String::new(),
            iccid: String::new(),
            eid: None,
        }];
        service.indicate(Indication::SimSlotsStatusChanged(slots.clone()));

        assert_eq!(
            new.inbox.recv().await,
            Some(Indication::SimSlotsStatusChanged(slots))
        );
        assert_eq!(old.inbox.recv().await, None);

        client.unregister_for_sim_slot_status_changed();
        assert_eq!(new.inbox.recv().await, None);
    }

    #[tokio::test]
    async fn test_device_nr_capabilities_from_config() {
        // ---
        let hub = MemoryHub::new();
        let config = SessionConfig {
            five_g_standalone: true,
            ..SessionConfig::default()
        };
        let client = RadioConfigClient::new(hub.clone(), &config);
        assert_eq!(client.device_nr_capabilities(), &[NrCapability::Sa]);
        assert!(client.hal_version().is_none());
    }
}
