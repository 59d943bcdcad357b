//! Serial-correlated async RPC client for a versioned radio configuration
//! service.
//!
//! The client issues requests (SIM slot status and mapping, preferred data
//! modem, phone capability, modem count, device capabilities) to a remote
//! service that answers asynchronously. Each request gets a serial number;
//! responses are matched back to the waiting caller by serial. The library
//! handles:
//!
//! - discovery of the newest available service version, with fallback to
//!   older ones and an explicit "feature unavailable" outcome;
//! - rejection of operations the connected version does not implement;
//! - teardown of the session when the service dies or a send fails, failing
//!   every outstanding request exactly once;
//! - delivery of unsolicited slot-status indications.
//!
//! The IPC substrate is abstracted behind [`ServiceProvider`] and
//! [`Connection`]; [`MemoryHub`] provides an in-process implementation.
//!
//! ```no_run
//! use radio_config_rpc::{Completion, HalVersion, MemoryHub, RadioConfigBuilder};
//!
//! # async fn example() -> radio_config_rpc::Result<()> {
//! let hub = MemoryHub::new();
//! hub.register(HalVersion::V1_1);
//!
//! let client = RadioConfigBuilder::new(hub.clone()).build()?;
//! let (completion, response) = Completion::channel();
//! client.get_phone_capability(completion).await?;
//! let _ = response.await;
//! # Ok(())
//! # }
//! ```

// Import all sub modules once...
mod macros;

mod client;
mod client_builder;
mod config;
mod domain;
mod error;
mod lock;
mod protocol;
mod retry;
mod session;
mod transport;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use client::{
    // ---
    Completion,
    IndicationHandle,
    PendingRequest,
    RadioConfigClient,
    RequestTracker,
    WorkSource,
};
pub use client_builder::RadioConfigBuilder;
pub use config::SessionConfig;
pub use error::{Result, RpcError};
pub use retry::RetryConfig;
pub use session::{SessionHandle, SessionManager};

pub use transport::{MemoryHub, MemoryService, ServiceRequest};

// --- public re-exports
pub use domain::{
    //
    Connection,
    ConnectionPtr,
    DeathObserver,
    DeathRecipient,
    HalVersion,
    ResponseSink,
    ServiceProvider,
    ServiceProviderPtr,
};

pub use protocol::codec;
pub use protocol::{
    // ---
    CardState,
    HalDeviceCapabilities,
    Indication,
    ModemsConfig,
    NoArgs,
    NrCapability,
    PhoneCapability,
    PreferredDataModem,
    RequestKind,
    Response,
    ResponseInfo,
    ResponseType,
    Serial,
    SimSlotStatus,
    SlotMapping,
    SlotState,
    SlotStatusList,
};
