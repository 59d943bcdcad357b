mod common;

use std::collections::HashSet;
use std::sync::Arc;

use radio_config_rpc::{
    //
    codec,
    Completion,
    HalVersion,
    MemoryHub,
    MemoryService,
    RadioConfigBuilder,
    RadioConfigClient,
    RequestKind,
    Response,
    Result,
    RpcError,
    SlotMapping,
};

use common::{canned, init_logging, phone_capability, slots};

fn serve(hub: &Arc<MemoryHub>, version: HalVersion) -> Arc<MemoryService> {
    // ---
    let service = hub.register(version);
    service.set_handler(|request| Some((0, canned(request.kind))));
    service
}

fn client(hub: &Arc<MemoryHub>) -> RadioConfigClient {
    RadioConfigBuilder::new(hub.clone())
        .build()
        .expect("default config is valid")
}

#[tokio::test]
async fn test_slot_status_request() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let service = serve(&hub, HalVersion::V1_3);
    let client = client(&hub);

    let (completion, rx) = Completion::channel();
    let serial = client.get_sim_slots_status(completion).await?;

    let response = rx.await.expect("completion dropped")?;
    assert_eq!(response, Response::SlotStatus(slots()));

    let received = service.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].serial, serial);
    assert_eq!(received[0].kind, RequestKind::GetSimSlotsStatus);

    assert_eq!(client.hal_version(), Some(HalVersion::V1_3));
    assert_eq!(client.pending_requests(), 0);

    Ok(())
}

#[tokio::test]
async fn test_slot_mapping_is_encoded() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let service = serve(&hub, HalVersion::V1_0);
    let client = client(&hub);

    let (completion, rx) = Completion::channel();
    client.set_sim_slots_mapping(&[1, 0], completion).await?;
    assert_eq!(rx.await.expect("completion dropped")?, Response::Ack);

    let sent: SlotMapping = codec::decode(&service.received()[0].payload)?;
    assert_eq!(sent.physical_slots, vec![1, 0]);

    Ok(())
}

#[tokio::test]
async fn test_operation_newer_than_service_is_rejected() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let service = serve(&hub, HalVersion::V1_0);
    let client = client(&hub);

    let (completion, rx) = Completion::channel();
    let err = client.get_phone_capability(completion).await.unwrap_err();

    let expected = RpcError::NotSupported {
        operation: "GET_PHONE_CAPABILITY",
        version: HalVersion::V1_0,
    };
    assert_eq!(err, expected);
    assert_eq!(rx.await.expect("completion dropped"), Err(expected));

    // nothing reached the service and nothing is left pending
    assert!(service.received().is_empty());
    assert_eq!(client.pending_requests(), 0);
    assert!(!client.is_set_preferred_data_command_supported().await);

    Ok(())
}

#[tokio::test]
async fn test_version_gates_follow_fallback() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    serve(&hub, HalVersion::V1_1);
    let client = client(&hub);

    assert!(client.is_set_preferred_data_command_supported().await);

    let (completion, rx) = Completion::channel();
    client.get_phone_capability(completion).await?;
    assert_eq!(
        rx.await.expect("completion dropped")?,
        Response::PhoneCapability(phone_capability())
    );

    let err = client
        .get_hal_device_capabilities(Completion::ignore())
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::NotSupported { .. }));

    Ok(())
}

#[tokio::test]
async fn test_every_operation_on_newest_service() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    serve(&hub, HalVersion::V1_3);
    let client = client(&hub);

    let mut receivers = Vec::new();

    let (c, rx) = Completion::channel();
    client.get_sim_slots_status(c).await?;
    receivers.push((RequestKind::GetSimSlotsStatus, rx));

    let (c, rx) = Completion::channel();
    client.set_sim_slots_mapping(&[0, 1], c).await?;
    receivers.push((RequestKind::SetSimSlotsMapping, rx));

    let (c, rx) = Completion::channel();
    client.set_preferred_data_modem(1, c).await?;
    receivers.push((RequestKind::SetPreferredDataModem, rx));

    let (c, rx) = Completion::channel();
    client.get_phone_capability(c).await?;
    receivers.push((RequestKind::GetPhoneCapability, rx));

    let (c, rx) = Completion::channel();
    client.set_modems_config(2, c).await?;
    receivers.push((RequestKind::SetModemsConfig, rx));

    let (c, rx) = Completion::channel();
    client.get_hal_device_capabilities(c).await?;
    receivers.push((RequestKind::GetHalDeviceCapabilities, rx));

    for (kind, rx) in receivers {
        assert_eq!(rx.await.expect("completion dropped")?, canned(kind), "{kind}");
    }

    Ok(())
}

#[tokio::test]
async fn test_remote_error_status() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let service = hub.register(HalVersion::V1_3);
    service.set_handler(|_| Some((2, Response::Ack)));
    let client = client(&hub);

    let (completion, rx) = Completion::channel();
    client.set_modems_config(1, completion).await?;

    assert_eq!(rx.await.expect("completion dropped"), Err(RpcError::Remote(2)));

    Ok(())
}

#[tokio::test]
async fn test_unsupported_deployment_fails_fast() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    serve(&hub, HalVersion::V1_3);

    let client = RadioConfigBuilder::new(hub.clone())
        .mobile_network_supported(false)
        .build()?;

    let (completion, rx) = Completion::channel();
    let err = client.get_sim_slots_status(completion).await.unwrap_err();

    assert_eq!(err, RpcError::Unavailable);
    assert_eq!(rx.await.expect("completion dropped"), Err(RpcError::Unavailable));
    assert!(hub.probes().is_empty());
    assert!(client.hal_version().is_none());

    Ok(())
}

#[tokio::test]
async fn test_no_service_is_unavailable() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let client = client(&hub);

    let err = client
        .set_preferred_data_modem(0, Completion::ignore())
        .await
        .unwrap_err();

    assert_eq!(err, RpcError::Unavailable);
    assert_eq!(
        hub.probes(),
        vec![HalVersion::V1_3, HalVersion::V1_1, HalVersion::V1_0]
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() -> Result<()> {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let service = serve(&hub, HalVersion::V1_3);
    let client = client(&hub);

    let mut handles = Vec::new();

    for _ in 0..32 {
        // ---
        let c = client.clone();

        handles.push(tokio::spawn(async move {
            let (completion, rx) = Completion::channel();
            let serial = c.get_phone_capability(completion).await?;
            let response = rx.await.expect("completion dropped")?;
            Ok::<_, RpcError>((serial, response))
        }));
    }

    log::info!("test_concurrent_requests: waiting for {} requests", handles.len());

    let mut serials = HashSet::new();
    for handle in handles {
        let (serial, response) = handle.await.expect("task panicked")?;
        assert_eq!(response, Response::PhoneCapability(phone_capability()));
        assert!(serials.insert(serial), "duplicate serial {serial}");
    }

    assert_eq!(service.received().len(), 32);
    assert_eq!(client.pending_requests(), 0);
    // one probe for all 32 callers
    assert_eq!(hub.probes(), vec![HalVersion::V1_3]);

    Ok(())
}
