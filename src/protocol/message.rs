use crate::protocol::{Serial, SimSlotStatus};
use crate::HalVersion;
use std::fmt;

/// Remote operations exposed by the radio configuration service.
///
/// Each kind carries the oldest service version that implements it; dispatch
/// is gated on [`SessionHandle::supports`](crate::SessionHandle::supports).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    GetSimSlotsStatus,
    SetSimSlotsMapping,
    SetPreferredDataModem,
    GetPhoneCapability,
    SetModemsConfig,
    GetHalDeviceCapabilities,
}

impl RequestKind {
    // ---

    /// Oldest service version implementing this operation.
    pub fn min_version(self) -> HalVersion {
        // ---
        match self {
            RequestKind::GetSimSlotsStatus | RequestKind::SetSimSlotsMapping => HalVersion::V1_0,
            RequestKind::SetPreferredDataModem
            | RequestKind::GetPhoneCapability
            | RequestKind::SetModemsConfig => HalVersion::V1_1,
            RequestKind::GetHalDeviceCapabilities => HalVersion::V1_3,
        }
    }

    /// Method identifier a substrate uses to address this operation.
    pub fn method_id(self) -> u8 {
        // ---
        match self {
            RequestKind::GetSimSlotsStatus => 1,
            RequestKind::SetSimSlotsMapping => 2,
            RequestKind::SetPreferredDataModem => 3,
            RequestKind::GetPhoneCapability => 4,
            RequestKind::SetModemsConfig => 5,
            RequestKind::GetHalDeviceCapabilities => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            RequestKind::GetSimSlotsStatus => "GET_SLOT_STATUS",
            RequestKind::SetSimSlotsMapping => "SET_LOGICAL_TO_PHYSICAL_SLOT_MAPPING",
            RequestKind::SetPreferredDataModem => "SET_PREFERRED_DATA_MODEM",
            RequestKind::GetPhoneCapability => "GET_PHONE_CAPABILITY",
            RequestKind::SetModemsConfig => "SWITCH_DUAL_SIM_CONFIG",
            RequestKind::GetHalDeviceCapabilities => "GET_HAL_DEVICE_CAPABILITIES",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the service classified a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Solicited,
    SolicitedAck,
    SolicitedAckExp,
}

/// Header delivered with every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseInfo {
    pub serial: Serial,
    pub response_type: ResponseType,
    /// Zero on success, otherwise a service-defined error code.
    pub status: i32,
}

impl ResponseInfo {
    /// Successful solicited response for `serial`.
    pub fn ok(serial: Serial) -> Self {
        // ---
        Self {
            serial,
            response_type: ResponseType::Solicited,
            status: 0,
        }
    }

    /// Failed solicited response for `serial`.
    pub fn error(serial: Serial, status: i32) -> Self {
        // ---
        Self {
            serial,
            response_type: ResponseType::Solicited,
            status,
        }
    }
}

/// Unsolicited notification pushed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indication {
    SimSlotsStatusChanged(Vec<SimSlotStatus>),
}
