//! The real client and the mock must look the same through `CastApi`.

use std::time::Duration;

use castlink_app::{CastApi, CastContext, MockCastClient, MockConfig};
use castlink_client::{CastClient, ClientConfig, LocalChannel, StartOptions, SystemEnv};
use castlink_core::{CastDevice, CastState, Selector};
use castlink_proto::{
    Envelope, Message,
    payloads::{AckPayload, DevicesUpdatedPayload, ReadyPayload, ReadyResponsePayload, SessionUpdatedPayload},
};

fn devices() -> Vec<CastDevice> {
    vec![CastDevice::new("tv-1", "Living Room", "chromecast"), CastDevice::new("tv-2", "Den", "chromecast")]
}

/// A host that answers every request immediately and confirms sessions.
fn cooperative_host(channel: &LocalChannel) {
    let host = channel.clone();
    channel.attach_host(move |text| {
        let request = Envelope::decode(text).expect("valid request");
        let Some(id) = request.request_id.clone() else {
            return;
        };
        let send = |message: Message, id: Option<_>| {
            let envelope = Envelope { message, request_id: id };
            host.deliver(&envelope.encode().expect("encode"));
        };
        match request.message {
            Message::Ready(_) => {
                send(Message::ReadyResponse(ReadyResponsePayload::new(true, devices())), Some(id));
            },
            Message::ScanDevices => {
                send(Message::DevicesUpdated(DevicesUpdatedPayload { devices: devices() }), None);
                send(Message::ScanDevicesResponse(AckPayload::ok()), Some(id));
            },
            Message::StartSession(payload) => {
                let name = devices()
                    .into_iter()
                    .find(|d| d.id == payload.device_id)
                    .map(|d| d.name)
                    .unwrap_or_default();
                send(
                    Message::SessionUpdated(SessionUpdatedPayload::connected(
                        payload.device_id,
                        name,
                        "host-session",
                    )),
                    None,
                );
                send(Message::StartSessionResponse(AckPayload::ok()), Some(id));
            },
            Message::EndSession => send(Message::EndSessionResponse(AckPayload::ok()), Some(id)),
            Message::StateUpdate(_) => send(Message::StateUpdateResponse(AckPayload::ok()), Some(id)),
            other => panic!("host received {other:?}"),
        }
    });
}

/// Drive a full session and return the state after each step.
async fn full_session<A: CastApi>(api: &A) -> Vec<CastState> {
    let mut states = Vec::new();
    api.signal_ready(ReadyPayload::new("g1")).await.expect("ready");
    states.push(api.state());
    api.scan_for_devices().await.expect("scan");
    states.push(api.state());
    api.start_casting("tv-2".into(), StartOptions::default()).await.expect("start");
    states.push(api.state());
    api.send_state_update(serde_json::json!({ "score": 1 })).await.expect("update");
    states.push(api.state());
    api.stop_casting().await.expect("stop");
    states.push(api.state());
    states
}

/// Fields that both implementations must agree on (session ids differ).
fn shape(state: &CastState) -> (bool, bool, bool, bool, Option<String>, Vec<bool>, bool) {
    (
        state.is_available,
        state.is_casting,
        state.is_connecting,
        state.is_scanning,
        state.device_id.clone(),
        state.devices.iter().map(|d| d.is_connected).collect(),
        state.session_id.is_some(),
    )
}

#[tokio::test(start_paused = true)]
async fn real_and_mock_clients_agree() {
    let channel = LocalChannel::new();
    cooperative_host(&channel);
    let real = CastClient::new(channel, SystemEnv::new(), ClientConfig::default());

    let mock = MockCastClient::new(
        SystemEnv::new(),
        MockConfig::default().with_devices(devices()).with_latency(Duration::from_millis(20)),
    );

    let real_states: Vec<_> = full_session(&real).await.iter().map(shape).collect();
    let mock_states: Vec<_> = full_session(&mock).await.iter().map(shape).collect();

    assert_eq!(real_states, mock_states);
    assert!(real_states[2].1, "casting after start");
    assert!(!real_states[4].1, "idle after stop");
}

#[tokio::test(start_paused = true)]
async fn context_handles_follow_state() {
    let mock = MockCastClient::new(SystemEnv::new(), MockConfig::default().with_latency(Duration::from_millis(5)));
    let context = CastContext::provide(mock);

    let state = context.use_cast_state();
    let casting = context.use_selector(&Selector::new(|s: &CastState| s.is_casting));
    assert!(!casting.get());
    assert_eq!(state.changes(), 0);

    context.api().scan_for_devices().await.expect("scan");
    assert_eq!(casting.changes(), 0, "scanning does not touch casting");
    assert_eq!(state.get().devices.len(), 2);

    context.api().start_casting("mock-tv-1".into(), StartOptions::default()).await.expect("start");
    assert!(casting.get());
    assert_eq!(casting.changes(), 1);
    assert!(state.changes() >= 4);
}

#[tokio::test(start_paused = true)]
async fn dropped_handles_release_subscriptions() {
    let channel = LocalChannel::new();
    let client = CastClient::new(channel.clone(), SystemEnv::new(), ClientConfig::default());
    let context = CastContext::provide(client);
    let selector = Selector::new(|s: &CastState| s.devices.len());

    let handle = context.use_selector(&selector);
    let other = context.use_selector(&selector);
    let whole = context.use_cast_state();
    assert_eq!(context.api().store().selector_cache_len(), 1);
    assert_eq!(context.api().store().listener_count(), 1);

    drop(handle);
    assert_eq!(context.api().store().selector_cache_len(), 1);
    drop(other);
    drop(whole);
    assert_eq!(context.api().store().selector_cache_len(), 0);
    assert_eq!(context.api().store().listener_count(), 0);

    // The channel listener belongs to the client, not the handles
    assert_eq!(channel.listener_count(), 1);
}
