#![allow(non_snake_case)]

use super::*;

#[test]
fn BridgeState___default___returns_disconnected() {
    let state = BridgeState::default();

    assert_eq!(state, BridgeState::Disconnected);
}

#[test]
fn BridgeState___connected___is_connected() {
    assert!(BridgeState::Connected.is_connected());
    assert!(!BridgeState::Connected.is_connecting());
}

#[test]
fn BridgeState___awaiting_connect___counts_as_connecting() {
    let state = BridgeState::AwaitingConnect;

    assert!(state.is_connecting());
    assert!(!state.is_connected());
}

#[test]
fn BridgeState___disconnected_to_connected___skip_not_allowed() {
    let state = BridgeState::Disconnected;

    let can_transition = state.can_transition_to(BridgeState::Connected);

    assert!(!can_transition);
}

#[test]
fn BridgeState___disconnected_to_disconnecting___not_allowed() {
    let state = BridgeState::Disconnected;

    assert!(!state.can_transition_to(BridgeState::Disconnecting));
}

#[test]
fn BridgeState___serialize___uses_screaming_snake_case() {
    let json = serde_json::to_string(&BridgeState::AwaitingConnect).unwrap();

    assert_eq!(json, "\"AWAITING_CONNECT\"");
}

#[test]
fn BridgeState___description___is_not_empty() {
    let states = [
        BridgeState::Disconnected,
        BridgeState::Connecting,
        BridgeState::AwaitingConnect,
        BridgeState::Connected,
        BridgeState::Disconnecting,
    ];

    for state in states {
        assert!(!state.description().is_empty(), "{:?}", state);
    }
}
