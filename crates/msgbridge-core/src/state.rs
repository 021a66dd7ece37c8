//! Bridge connection state machine

use serde::{Deserialize, Serialize};

/// Connection states of a bridge
///
/// State transitions:
/// ```text
/// Disconnected → Connecting | AwaitingConnect → Connected → Disconnecting → Disconnected
///
/// Connecting | AwaitingConnect → Disconnecting   (disconnect while connecting)
/// Connecting | AwaitingConnect → Disconnected    (final connect attempt failed)
/// Connected → Disconnected                       (teardown by the remote side)
/// ```
///
/// `AwaitingConnect` is the variant of `Connecting` used when the local side
/// waits for the remote side to initiate the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeState {
    /// No channel is established
    #[default]
    Disconnected,
    /// The local side is initiating a connection
    Connecting,
    /// The local side waits for the remote side to initiate
    AwaitingConnect,
    /// The channel is established and a dispatch function is installed
    Connected,
    /// Teardown is in progress
    Disconnecting,
}

impl BridgeState {
    /// Check if this state can transition to the target state
    pub fn can_transition_to(&self, target: BridgeState) -> bool {
        use BridgeState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Disconnected, AwaitingConnect)
                | (Connecting, Connected)
                | (AwaitingConnect, Connected)
                | (Connected, Disconnecting)
                | (Disconnecting, Disconnected)
                // Disconnect requested while a connect is still in flight
                | (Connecting, Disconnecting)
                | (AwaitingConnect, Disconnecting)
                // Failed connect, or teardown initiated by the remote side
                | (Connecting, Disconnected)
                | (AwaitingConnect, Disconnected)
                | (Connected, Disconnected)
        )
    }

    /// Check if messages may be sent or received in this state
    pub fn is_connected(&self) -> bool {
        matches!(self, BridgeState::Connected)
    }

    /// Check if a connect attempt is in flight
    pub fn is_connecting(&self) -> bool {
        matches!(self, BridgeState::Connecting | BridgeState::AwaitingConnect)
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            BridgeState::Disconnected => "No channel is established",
            BridgeState::Connecting => "Initiating a connection",
            BridgeState::AwaitingConnect => "Waiting for the remote side to connect",
            BridgeState::Connected => "Connected and dispatching",
            BridgeState::Disconnecting => "Tearing down the channel",
        }
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Disconnected => write!(f, "Disconnected"),
            BridgeState::Connecting => write!(f, "Connecting"),
            BridgeState::AwaitingConnect => write!(f, "AwaitingConnect"),
            BridgeState::Connected => write!(f, "Connected"),
            BridgeState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

#[cfg(test)]
#[path = "state/state_tests.rs"]
mod state_tests;
