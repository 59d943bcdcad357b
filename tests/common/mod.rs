#![allow(dead_code)]

use radio_config_rpc::{
    //
    CardState,
    HalDeviceCapabilities,
    NrCapability,
    PhoneCapability,
    Response,
    SimSlotStatus,
    SlotState,
};

pub fn slots() -> Vec<SimSlotStatus> {
    // ---
    vec![
        SimSlotStatus {
            card_state: CardState::Present,
            slot_state: SlotState::Active,
            logical_slot_id: 0,
            atr: "3B9F96801FC78031E073FE211B63".into(),
            iccid: "89014103211118510720".into(),
            eid: Some("89049032000001000000000000000001".into()),
        },
        SimSlotStatus {
            card_state: CardState::Absent,
            slot_state: SlotState::Inactive,
            logical_slot_id: 1,
            atr: String::new(),
            iccid: String::new(),
            eid: None,
        },
    ]
}

pub fn phone_capability() -> PhoneCapability {
    // ---
    PhoneCapability {
        max_active_data: 1,
        max_active_internet_data: 1,
        internet_linger: false,
        logical_modem_ids: vec![0, 1],
        device_nr_capabilities: Some(vec![NrCapability::Nsa, NrCapability::Sa]),
    }
}

/// Canned success response for each request kind.
pub fn canned(kind: radio_config_rpc::RequestKind) -> Response {
    // ---
    use radio_config_rpc::RequestKind::*;

    match kind {
        GetSimSlotsStatus => Response::SlotStatus(slots()),
        GetPhoneCapability => Response::PhoneCapability(phone_capability()),
        GetHalDeviceCapabilities => Response::HalDeviceCapabilities(HalDeviceCapabilities {
            modem_reduced_feature_set: true,
        }),
        SetSimSlotsMapping | SetPreferredDataModem | SetModemsConfig => Response::Ack,
    }
}

#[cfg(feature = "logging")]
mod imp {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init() {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
    }
}

#[cfg(not(feature = "logging"))]
mod imp {
    #[inline]
    pub fn init() {}
}

pub fn init_logging() {
    imp::init();
}
