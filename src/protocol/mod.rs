/// Protocol types for request correlation and serialization
///
/// This module defines the wire format of requests and responses, the
/// request/response metadata, and serial number management.
pub mod codec;
mod message;
mod records;
mod serial;

pub use message::{Indication, RequestKind, ResponseInfo, ResponseType};
pub use records::{
    CardState, HalDeviceCapabilities, ModemsConfig, NoArgs, NrCapability, PhoneCapability,
    PreferredDataModem, Response, SimSlotStatus, SlotMapping, SlotState, SlotStatusList,
};
pub use serial::Serial;
