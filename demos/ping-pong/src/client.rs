//! Client side of the demo

use msgbridge::prelude::*;

/// Send `rounds` pings, then show that undeclared types are refused
pub async fn run(client: &MessageApp, rounds: u32) -> BridgeResult<()> {
    for round in 1..=rounds {
        let ping = Message::new("ping").with_payload(round);
        let reply = client.request(&ping, RequestOverrides::none()).await?;
        tracing::info!(round, %reply, "Received pong");
    }

    match client
        .request(&Message::new("shutdown"), RequestOverrides::timeout_ms(100))
        .await
    {
        Err(BridgeError::Protocol(reason)) => {
            tracing::warn!(%reason, "Request refused before sending");
            Ok(())
        }
        Err(err) => Err(err),
        Ok(reply) => {
            tracing::error!(%reply, "Undeclared message type was sent");
            Ok(())
        }
    }
}
