//! Request and response records of the radio configuration service.

use crate::protocol::codec::{self, Record, WireReader, WireWriter};
use crate::{RequestKind, Result, RpcError};

/// Arguments of operations that take none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoArgs;

impl Record for NoArgs {
    fn encode_fields(&self, _w: &mut WireWriter) {}

    fn decode_fields(_r: &mut WireReader<'_>) -> Result<Self> {
        Ok(NoArgs)
    }
}

/// Logical-to-physical slot mapping; index is the logical slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMapping {
    pub physical_slots: Vec<u32>,
}

impl Record for SlotMapping {
    fn encode_fields(&self, w: &mut WireWriter) {
        w.put_u32_list(&self.physical_slots);
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            physical_slots: r.get_u32_list()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferredDataModem {
    pub modem_id: u8,
}

impl Record for PreferredDataModem {
    fn encode_fields(&self, w: &mut WireWriter) {
        w.put_u8(self.modem_id);
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            modem_id: r.get_u8()?,
        })
    }
}

/// Number of modems to keep live; 1 switches to single-SIM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemsConfig {
    pub num_live_modems: u8,
}

impl Record for ModemsConfig {
    fn encode_fields(&self, w: &mut WireWriter) {
        w.put_u8(self.num_live_modems);
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            num_live_modems: r.get_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Absent,
    Present,
    Error,
    Restricted,
}

impl CardState {
    fn to_wire(self) -> u8 {
        self as u8
    }

    fn from_wire(v: u8) -> Result<Self> {
        // ---
        match v {
            0 => Ok(CardState::Absent),
            1 => Ok(CardState::Present),
            2 => Ok(CardState::Error),
            3 => Ok(CardState::Restricted),
            other => Err(RpcError::MalformedRecord(format!("card state {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Inactive,
    Active,
}

/// Status of one physical SIM slot.
///
/// Layout: card state, slot state, logical slot id, ATR, ICCID, then a
/// presence bitmask byte whose bit 0 announces the trailing EID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSlotStatus {
    pub card_state: CardState,
    pub slot_state: SlotState,
    pub logical_slot_id: u32,
    pub atr: String,
    pub iccid: String,
    pub eid: Option<String>,
}

const SLOT_HAS_EID: u8 = 0b0000_0001;

impl Record for SimSlotStatus {
    fn encode_fields(&self, w: &mut WireWriter) {
        // ---
        w.put_u8(self.card_state.to_wire());
        w.put_bool(self.slot_state == SlotState::Active);
        w.put_u32(self.logical_slot_id);
        w.put_str(&self.atr);
        w.put_str(&self.iccid);

        match &self.eid {
            Some(eid) => {
                w.put_u8(SLOT_HAS_EID);
                w.put_str(eid);
            }
            None => w.put_u8(0),
        }
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        // ---
        let card_state = CardState::from_wire(r.get_u8()?)?;
        let slot_state = if r.get_bool()? {
            SlotState::Active
        } else {
            SlotState::Inactive
        };
        let logical_slot_id = r.get_u32()?;
        let atr = r.get_string()?;
        let iccid = r.get_string()?;

        let presence = r.get_u8()?;
        if presence & !SLOT_HAS_EID != 0 {
            return Err(RpcError::MalformedRecord(format!(
                "unknown slot presence bits {presence:#04x}"
            )));
        }
        let eid = if presence & SLOT_HAS_EID != 0 {
            Some(r.get_string()?)
        } else {
            None
        };

        Ok(Self {
            card_state,
            slot_state,
            logical_slot_id,
            atr,
            iccid,
            eid,
        })
    }
}

/// Status of every physical slot, as returned by `GET_SLOT_STATUS` and the
/// slot-status-changed indication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatusList(pub Vec<SimSlotStatus>);

impl Record for SlotStatusList {
    fn encode_fields(&self, w: &mut WireWriter) {
        w.put_list(&self.0);
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self(r.get_list()?))
    }
}

/// 5G deployment modes the device is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NrCapability {
    /// Non-standalone.
    Nsa,
    /// Standalone.
    Sa,
}

impl NrCapability {
    fn to_wire(self) -> u32 {
        match self {
            NrCapability::Nsa => 1,
            NrCapability::Sa => 2,
        }
    }

    fn from_wire(v: u32) -> Result<Self> {
        match v {
            1 => Ok(NrCapability::Nsa),
            2 => Ok(NrCapability::Sa),
            other => Err(RpcError::MalformedRecord(format!("nr capability {other}"))),
        }
    }
}

/// Modem concurrency limits.
///
/// `device_nr_capabilities` was appended in a later schema revision and is
/// optional by early truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneCapability {
    pub max_active_data: u8,
    pub max_active_internet_data: u8,
    pub internet_linger: bool,
    pub logical_modem_ids: Vec<u32>,
    pub device_nr_capabilities: Option<Vec<NrCapability>>,
}

impl Record for PhoneCapability {
    fn encode_fields(&self, w: &mut WireWriter) {
        // ---
        w.put_u8(self.max_active_data);
        w.put_u8(self.max_active_internet_data);
        w.put_bool(self.internet_linger);
        w.put_u32_list(&self.logical_modem_ids);

        if let Some(caps) = &self.device_nr_capabilities {
            let raw: Vec<u32> = caps.iter().map(|c| c.to_wire()).collect();
            w.put_u32_list(&raw);
        }
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        // ---
        let max_active_data = r.get_u8()?;
        let max_active_internet_data = r.get_u8()?;
        let internet_linger = r.get_bool()?;
        let logical_modem_ids = r.get_u32_list()?;

        let device_nr_capabilities = if r.has_remaining() {
            let raw = r.get_u32_list()?;
            Some(
                raw.into_iter()
                    .map(NrCapability::from_wire)
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        Ok(Self {
            max_active_data,
            max_active_internet_data,
            internet_linger,
            logical_modem_ids,
            device_nr_capabilities,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalDeviceCapabilities {
    pub modem_reduced_feature_set: bool,
}

impl Record for HalDeviceCapabilities {
    fn encode_fields(&self, w: &mut WireWriter) {
        w.put_bool(self.modem_reduced_feature_set);
    }

    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            modem_reduced_feature_set: r.get_bool()?,
        })
    }
}

/// Decoded response payload, delivered to a request's completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Operation accepted; no payload.
    Ack,
    SlotStatus(Vec<SimSlotStatus>),
    PhoneCapability(PhoneCapability),
    HalDeviceCapabilities(HalDeviceCapabilities),
}

impl Response {
    /// Decode the payload of a successful response to a `kind` request.
    pub fn decode(kind: RequestKind, payload: &[u8]) -> Result<Self> {
        // ---
        match kind {
            RequestKind::GetSimSlotsStatus => {
                let SlotStatusList(slots) = codec::decode::<SlotStatusList>(payload)?;
                Ok(Response::SlotStatus(slots))
            }
            RequestKind::GetPhoneCapability => {
                Ok(Response::PhoneCapability(codec::decode(payload)?))
            }
            RequestKind::GetHalDeviceCapabilities => {
                Ok(Response::HalDeviceCapabilities(codec::decode(payload)?))
            }
            RequestKind::SetSimSlotsMapping
            | RequestKind::SetPreferredDataModem
            | RequestKind::SetModemsConfig => {
                codec::decode::<NoArgs>(payload)?;
                Ok(Response::Ack)
            }
        }
    }

    /// Encode this response the way the service sends it.
    pub fn encode(&self) -> bytes::Bytes {
        // ---
        match self {
            Response::Ack => codec::encode(&NoArgs),
            Response::SlotStatus(slots) => codec::encode(&SlotStatusList(slots.clone())),
            Response::PhoneCapability(cap) => codec::encode(cap),
            Response::HalDeviceCapabilities(caps) => codec::encode(caps),
        }
    }
}
