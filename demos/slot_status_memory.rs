//! Query slot status and phone capability from an in-memory 1.1 service,
//! then kill the service and watch the pending request fail.
//!
//! Run with `cargo run --example slot_status_memory --features logging`.

use radio_config_rpc::{
    //
    CardState,
    Completion,
    HalVersion,
    MemoryHub,
    PhoneCapability,
    RadioConfigBuilder,
    RequestKind,
    Response,
    Result,
    SimSlotStatus,
    SlotState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    #[cfg(feature = "logging")]
    let _ = env_logger::builder().try_init();

    let hub = MemoryHub::new();
    let service = hub.register(HalVersion::V1_1);

    service.set_handler(|request| {
        let response = match request.kind {
            RequestKind::GetSimSlotsStatus => Response::SlotStatus(vec![SimSlotStatus {
                card_state: CardState::Present,
                slot_state: SlotState::Active,
                logical_slot_id: 0,
                atr: "3B9F96801FC78031E073FE211B63".into(),
                iccid: "89014103211118510720".into(),
                eid: None,
            }]),
            RequestKind::GetPhoneCapability => Response::PhoneCapability(PhoneCapability {
                max_active_data: 1,
                max_active_internet_data: 1,
                internet_linger: false,
                logical_modem_ids: vec![0],
                device_nr_capabilities: None,
            }),
            // leave everything else unanswered
            _ => return None,
        };
        Some((0, response))
    });

    let client = RadioConfigBuilder::new(hub.clone()).build()?;

    let (completion, rx) = Completion::channel();
    client.get_sim_slots_status(completion).await?;
    println!("slot status: {:?}", rx.await);
    println!("connected to service {:?}", client.hal_version());

    let (completion, rx) = Completion::channel();
    client.get_phone_capability(completion).await?;
    println!("phone capability: {:?}", rx.await);

    if let Err(err) = client.get_hal_device_capabilities(Completion::ignore()).await {
        println!("device capabilities: {err}");
    }

    let (completion, rx) = Completion::channel();
    client.set_modems_config(2, completion).await?;
    println!("pending before kill: {}", client.pending_requests());

    service.kill();
    println!("modems config after kill: {:?}", rx.await);

    Ok(())
}
