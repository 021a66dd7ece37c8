#![allow(non_snake_case)]

use super::*;
use async_trait::async_trait;
use msgbridge_core::{Rejection, dispatch_fn};
use msgbridge_transport::CodecError;
use serde_json::json;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Adapter that records what the engine sends
#[derive(Default)]
struct RecordingAdapter {
    sent: Mutex<Vec<String>>,
    failures_before_connect: AtomicU32,
    connect_calls: AtomicU32,
    connected_calls: AtomicU32,
    connect_delay: Option<Duration>,
    fail_disconnect: bool,
}

impl RecordingAdapter {
    fn failing(times: u32) -> Self {
        Self {
            failures_before_connect: AtomicU32::new(times),
            ..Default::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            connect_delay: Some(delay),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }
}

#[async_trait]
impl TransportAdapter for RecordingAdapter {
    async fn connect(&self, _await_connect: bool) -> BridgeResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failures_before_connect.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_connect
                .store(remaining - 1, Ordering::SeqCst);
            return Err(BridgeError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        if self.fail_disconnect {
            Err(BridgeError::Transport("close failed".to_string()))
        } else {
            Ok(())
        }
    }

    fn send(&self, raw: String) -> BridgeResult<()> {
        self.sent.lock().push(raw);
        Ok(())
    }

    fn connected(&self) {
        self.connected_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn handled() -> DispatchFn {
    dispatch_fn(|_| Ok(Dispatch::Handled))
}

fn create_bridge(adapter: RecordingAdapter) -> (Bridge, Arc<RecordingAdapter>) {
    let adapter = Arc::new(adapter);
    let bridge = Bridge::new(adapter.clone(), BridgeOptions::default()).unwrap();
    (bridge, adapter)
}

async fn connected_bridge(dispatch: DispatchFn) -> (Bridge, Arc<RecordingAdapter>) {
    let (bridge, adapter) = create_bridge(RecordingAdapter::default());
    bridge.connect(dispatch, false, 1).await.unwrap();
    (bridge, adapter)
}

// Construction

#[test]
fn Bridge___new___rejects_zero_timeout() {
    let adapter = Arc::new(RecordingAdapter::default());

    let result = Bridge::new(adapter, BridgeOptions::default().with_timeout_ms(0));

    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
}

#[test]
fn Bridge___new___starts_disconnected() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    assert_eq!(bridge.state(), BridgeState::Disconnected);
    assert!(!bridge.is_connected());
    assert!(!bridge.is_connecting());
    assert_eq!(bridge.pending_requests(), 0);
}

// Connect

#[tokio::test]
async fn Bridge___connect___transitions_to_connected_and_notifies_adapter() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::default());

    let connecting = bridge.connect(handled(), false, 1);
    assert_eq!(bridge.state(), BridgeState::Connecting);
    connecting.await.unwrap();

    assert_eq!(bridge.state(), BridgeState::Connected);
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn Bridge___connect___awaiting_enters_awaiting_connect() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    let connecting = bridge.connect(handled(), true, 1);
    assert_eq!(bridge.state(), BridgeState::AwaitingConnect);
    assert!(bridge.is_connecting());
    connecting.await.unwrap();

    assert!(bridge.is_connected());
}

#[tokio::test]
async fn Bridge___connect___twice_is_invalid_state() {
    let (bridge, _) = connected_bridge(handled()).await;

    let result = bridge.connect(handled(), false, 1).await;

    assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    assert!(bridge.is_connected());
}

#[tokio::test]
async fn Bridge___connect___while_connecting_is_invalid_state() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    let first = bridge.connect(handled(), false, 1);
    let second = bridge.connect(handled(), false, 1).await;

    assert!(matches!(second, Err(BridgeError::InvalidState { .. })));
    first.await.unwrap();
}

#[tokio::test]
async fn Bridge___connect___zero_attempts_is_invalid_argument() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    let result = bridge.connect(handled(), false, 0).await;

    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
    assert_eq!(bridge.state(), BridgeState::Disconnected);
}

#[tokio::test]
async fn Bridge___connect___retries_until_success() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::failing(2));

    bridge.connect(handled(), false, 3).await.unwrap();

    assert!(bridge.is_connected());
    assert_eq!(adapter.connect_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn Bridge___connect___exhausted_attempts_returns_error_and_resets() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::failing(5));

    let result = bridge.connect(handled(), false, 2).await;

    assert_eq!(
        result,
        Err(BridgeError::Transport("connection refused".to_string()))
    );
    assert_eq!(bridge.state(), BridgeState::Disconnected);
    assert_eq!(adapter.connect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn Bridge___connect___superseded_by_disconnect_never_connects() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::slow(Duration::from_millis(50)));

    let connecting = tokio::spawn(bridge.connect(handled(), false, 1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.disconnect().await.unwrap();

    assert_eq!(connecting.await.unwrap(), Ok(()));
    assert_eq!(bridge.state(), BridgeState::Disconnected);
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn Bridge___connect___stale_failure_does_not_reset_newer_connect() {
    let (bridge, adapter) = create_bridge(RecordingAdapter {
        failures_before_connect: AtomicU32::new(1),
        connect_delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let first = tokio::spawn(bridge.connect(handled(), false, 1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.disconnect().await.unwrap();
    let second = tokio::spawn(bridge.connect(handled(), false, 1));

    assert_eq!(
        first.await.unwrap(),
        Err(BridgeError::Transport("connection refused".to_string()))
    );
    assert_eq!(bridge.state(), BridgeState::Connecting);
    assert_eq!(second.await.unwrap(), Ok(()));
    assert!(bridge.is_connected());
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn Bridge___connect___stale_success_does_not_install_its_dispatch() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::slow(Duration::from_millis(50)));
    let stale_calls = Arc::new(AtomicU32::new(0));
    let current_calls = Arc::new(AtomicU32::new(0));
    let counting = |calls: &Arc<AtomicU32>| {
        let calls = calls.clone();
        dispatch_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Dispatch::Handled)
        })
    };

    let first = tokio::spawn(bridge.connect(counting(&stale_calls), false, 1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.disconnect().await.unwrap();
    let second = tokio::spawn(bridge.connect(counting(&current_calls), false, 1));

    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(bridge.state(), BridgeState::Connecting);
    assert_eq!(second.await.unwrap(), Ok(()));
    bridge.receive(r#"{"data": "event"}"#).unwrap();

    assert_eq!(stale_calls.load(Ordering::SeqCst), 0);
    assert_eq!(current_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn Bridge___handle_remote_disconnect___supersedes_running_connect() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::slow(Duration::from_millis(30)));

    let connecting = tokio::spawn(bridge.connect(handled(), false, 1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.handle_remote_disconnect();

    assert_eq!(connecting.await.unwrap(), Ok(()));
    assert_eq!(bridge.state(), BridgeState::Disconnected);
    assert_eq!(adapter.connected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn Bridge___connect___after_disconnect_reconnects() {
    let (bridge, _) = connected_bridge(handled()).await;
    bridge.disconnect().await.unwrap();

    bridge.connect(handled(), false, 1).await.unwrap();

    assert!(bridge.is_connected());
}

// Disconnect

#[tokio::test]
async fn Bridge___disconnect___while_disconnected_is_invalid_state() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    let result = bridge.disconnect().await;

    assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
}

#[tokio::test]
async fn Bridge___disconnect___rejects_every_pending_request() {
    let (bridge, _) = connected_bridge(handled()).await;
    let requests: Vec<_> = (0..3)
        .map(|n| bridge.request(json!(n), RequestOverrides::no_timeout()))
        .collect();
    assert_eq!(bridge.pending_requests(), 3);

    bridge.disconnect().await.unwrap();

    for request in requests {
        assert!(matches!(request.await, Err(BridgeError::Disconnected(_))));
    }
    assert_eq!(bridge.pending_requests(), 0);
    assert_eq!(bridge.state(), BridgeState::Disconnected);
}

#[tokio::test]
async fn Bridge___disconnect___adapter_failure_still_tears_down() {
    let (bridge, _) = create_bridge(RecordingAdapter {
        fail_disconnect: true,
        ..Default::default()
    });
    bridge.connect(handled(), false, 1).await.unwrap();

    let result = bridge.disconnect().await;

    assert!(matches!(result, Err(BridgeError::Transport(_))));
    assert_eq!(bridge.state(), BridgeState::Disconnected);
}

#[tokio::test]
async fn Bridge___handle_remote_disconnect___rejects_pending_and_resets() {
    let (bridge, _) = connected_bridge(handled()).await;
    let request = bridge.request(json!("ping"), RequestOverrides::no_timeout());

    bridge.handle_remote_disconnect();

    assert!(matches!(request.await, Err(BridgeError::Disconnected(_))));
    assert_eq!(bridge.state(), BridgeState::Disconnected);
}

// Send and request

#[test]
fn Bridge___send___not_connected_fails() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::default());

    let result = bridge.emit(json!("hello"));

    assert!(matches!(result, Err(BridgeError::Disconnected(_))));
    assert!(adapter.sent().is_empty());
}

#[tokio::test]
async fn Bridge___emit___sends_envelope_without_ids() {
    let (bridge, adapter) = connected_bridge(handled()).await;

    bridge.emit(json!({"type": "emit"})).unwrap();

    assert_eq!(adapter.sent(), vec![json!({"data": {"type": "emit"}})]);
}

#[tokio::test]
async fn Bridge___request___ids_strictly_increase() {
    let (bridge, adapter) = connected_bridge(handled()).await;

    let _requests: Vec<_> = (0..3)
        .map(|_| bridge.request(json!(null), RequestOverrides::no_timeout()))
        .collect();

    let ids: Vec<_> = adapter
        .sent()
        .iter()
        .map(|envelope| envelope["requestId"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn Bridge___request___resolves_with_response_data() {
    let (bridge, _) = connected_bridge(handled()).await;
    let request = bridge.request(json!("ping"), RequestOverrides::none());

    let outcome = bridge
        .receive(&json!({"data": "requestSuccess", "referenceId": 0}).to_string())
        .unwrap();

    assert!(outcome.is_none());
    assert_eq!(request.await, Ok(json!("requestSuccess")));
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn Bridge___request___error_response_rejects_with_remote() {
    let (bridge, _) = connected_bridge(handled()).await;
    let request = bridge.request(json!("ping"), RequestOverrides::none());

    bridge
        .receive(&json!({"data": "requestFail", "referenceId": 0, "isError": true}).to_string())
        .unwrap();

    assert_eq!(
        request.await,
        Err(BridgeError::Remote(json!("requestFail")))
    );
}

#[tokio::test]
async fn Bridge___request___times_out_and_late_response_is_noop() {
    let (bridge, _) = connected_bridge(handled()).await;

    let result = bridge
        .request(json!("slow"), RequestOverrides::timeout_ms(5))
        .await;

    assert_eq!(
        result,
        Err(BridgeError::Timeout {
            request_id: 0,
            timeout_ms: 5
        })
    );
    assert_eq!(bridge.pending_requests(), 0);
    let late = bridge.receive(&json!({"data": "late", "referenceId": 0}).to_string());
    assert!(matches!(late, Ok(None)));
}

#[tokio::test]
async fn Bridge___request___dropped_future_stays_pending_until_timeout() {
    let (bridge, adapter) = connected_bridge(handled()).await;

    drop(bridge.request(json!("abandoned"), RequestOverrides::timeout_ms(10)));

    assert_eq!(adapter.sent().len(), 1);
    assert_eq!(bridge.pending_requests(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn Bridge___request___not_connected_is_disconnected_error() {
    let (bridge, adapter) = create_bridge(RecordingAdapter::default());

    let result = bridge.request(json!(1), RequestOverrides::none()).await;

    assert!(matches!(result, Err(BridgeError::Disconnected(_))));
    assert!(adapter.sent().is_empty());
}

#[tokio::test]
async fn Bridge___request___invalid_override_is_invalid_argument() {
    let (bridge, adapter) = connected_bridge(handled()).await;

    let result = bridge.request(json!(1), RequestOverrides::timeout_ms(-7)).await;

    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
    assert!(adapter.sent().is_empty());
}

// Receive

#[tokio::test]
async fn Bridge___receive___malformed_payload_is_protocol_error() {
    let (bridge, _) = connected_bridge(handled()).await;

    for raw in [
        "not json",
        "[1, 2]",
        r#"{"requestId": 1}"#,
        r#"{"data": 1, "extra": true}"#,
        r#"{"data": 1, "isError": "yes"}"#,
    ] {
        let result = bridge.receive(raw);
        assert!(
            matches!(result, Err(BridgeError::Protocol(_))),
            "{} should be rejected",
            raw
        );
    }
}

#[test]
fn Bridge___receive___not_connected_is_disconnected_error() {
    let (bridge, _) = create_bridge(RecordingAdapter::default());

    let result = bridge.receive(r#"{"data": 1}"#);

    assert!(matches!(result, Err(BridgeError::Disconnected(_))));
}

#[tokio::test]
async fn Bridge___receive___event_reaches_handler_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let (bridge, adapter) = connected_bridge(dispatch_fn(move |data| {
        assert_eq!(data, json!({"type": "emit"}));
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Dispatch::Handled)
    }))
    .await;

    let result = bridge.receive(r#"{"data": {"type": "emit"}}"#).unwrap();

    assert!(result.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(adapter.sent().is_empty());
}

#[tokio::test]
async fn Bridge___receive___request_reply_sends_response() {
    let (bridge, adapter) =
        connected_bridge(dispatch_fn(|_| Ok(Dispatch::resolved(json!("pong"))))).await;

    let responding = bridge
        .receive(r#"{"data": "ping", "requestId": 7}"#)
        .unwrap()
        .unwrap();
    responding.await.unwrap();

    assert_eq!(adapter.sent(), vec![json!({"data": "pong", "referenceId": 7})]);
}

#[tokio::test]
async fn Bridge___receive___rejected_reply_sends_error_response() {
    let (bridge, adapter) = connected_bridge(dispatch_fn(|_| {
        Ok(Dispatch::rejected(Rejection::from("requestFail")))
    }))
    .await;

    let responding = bridge
        .receive(r#"{"data": "ping", "requestId": 2}"#)
        .unwrap()
        .unwrap();
    responding.await.unwrap();

    assert_eq!(
        adapter.sent(),
        vec![json!({"data": "requestFail", "referenceId": 2, "isError": true})]
    );
}

#[tokio::test]
async fn Bridge___receive___request_without_reply_sends_error_and_fails() {
    let (bridge, adapter) = connected_bridge(handled()).await;

    let result = bridge.receive(r#"{"data": "ping", "requestId": 3}"#);

    assert!(matches!(result, Err(BridgeError::Handler(_))));
    assert_eq!(
        adapter.sent(),
        vec![json!({"data": MISSING_REPLY_MESSAGE, "referenceId": 3, "isError": true})]
    );
}

#[tokio::test]
async fn Bridge___receive___request_handler_error_sends_error_response() {
    let (bridge, adapter) = connected_bridge(dispatch_fn(|_| {
        Err(BridgeError::Handler("boom".to_string()))
    }))
    .await;

    let result = bridge.receive(r#"{"data": "ping", "requestId": 4}"#);

    assert!(matches!(result, Err(BridgeError::Handler(_))));
    let sent = adapter.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["referenceId"], json!(4));
    assert_eq!(sent[0]["isError"], json!(true));
}

#[tokio::test]
async fn Bridge___receive___event_handler_error_is_not_propagated() {
    let (bridge, adapter) = connected_bridge(dispatch_fn(|_| {
        Err(BridgeError::Handler("boom".to_string()))
    }))
    .await;

    let result = bridge.receive(r#"{"data": "event"}"#);

    assert!(matches!(result, Ok(None)));
    assert!(adapter.sent().is_empty());
}

#[tokio::test]
async fn Bridge___receive___response_to_unissued_id_is_dropped() {
    let (bridge, _) = connected_bridge(handled()).await;

    let result = bridge.receive(r#"{"data": "stray", "referenceId": 99}"#);

    assert!(matches!(result, Ok(None)));
}

// Codec

/// Codec that frames JSON with a leading marker
struct MarkedCodec;

impl Codec for MarkedCodec {
    fn encode(&self, envelope: &Envelope) -> Result<String, CodecError> {
        Ok(format!("#{}", serde_json::to_string(envelope)?))
    }

    fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        let json = raw
            .strip_prefix('#')
            .ok_or_else(|| CodecError::InvalidFormat("missing marker".to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    fn content_type(&self) -> &'static str {
        "application/x-marked-json"
    }
}

#[tokio::test]
async fn Bridge___with_codec___encodes_and_decodes_through_codec() {
    let adapter = Arc::new(RecordingAdapter::default());
    let bridge = Bridge::with_codec(adapter.clone(), BridgeOptions::default(), MarkedCodec).unwrap();
    bridge.connect(handled(), false, 1).await.unwrap();

    let request = bridge.request(json!("ping"), RequestOverrides::none());
    let unmarked = bridge.receive(r#"{"data": "pong", "referenceId": 0}"#);
    bridge.receive(r##"#{"data": "pong", "referenceId": 0}"##).unwrap();

    assert!(matches!(unmarked, Err(BridgeError::Protocol(_))));
    assert_eq!(adapter.sent.lock()[0], r##"#{"data":"ping","requestId":0}"##);
    assert_eq!(request.await, Ok(json!("pong")));
}
