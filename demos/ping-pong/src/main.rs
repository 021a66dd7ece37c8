//! Ping-pong demo
//!
//! Wires a client and a server over an in-process transport pair. The client
//! sends a few `ping` requests and its log records are forwarded to the
//! server as `log` messages.
//!
//! Options can be given as JSON in `MSGBRIDGE_OPTIONS`, e.g.
//! `MSGBRIDGE_OPTIONS='{"timeout_ms": 250, "log_level": "debug"}' cargo run -p ping-pong`.

use msgbridge::prelude::*;
use msgbridge::{LogForwarder, init_logging, log_handler, log_message, log_sink};
use std::sync::Arc;

mod client;

/// Only records from the client are shipped to the server
const FORWARDED_TARGET: &str = "ping_pong::client";

#[tokio::main]
async fn main() -> BridgeResult<()> {
    let options = std::env::var("MSGBRIDGE_OPTIONS").unwrap_or_default();
    let options = BridgeOptions::from_json(options.as_bytes())?;
    init_logging(options.parsed_log_level());
    let (left, right) = bridge_pair(options)?;

    let server = MessageAppBuilder::new()
        .incoming_types(["ping", "log"])
        .handler(
            "ping",
            request_handler(|payload| async move { Ok(json!({ "pong": payload })) }),
        )
        .handler(
            "log",
            log_handler(|log| {
                tracing::info!(
                    target: "ping_pong::server",
                    level = ?log.level,
                    message = log.message.as_deref().unwrap_or_default(),
                    "Forwarded log"
                );
            }),
        )
        .build(right)?;

    let client = Arc::new(
        MessageAppBuilder::new()
            .outgoing_types(["ping", "log"])
            .build(left)?,
    );

    let (served, connected) = tokio::join!(server.connect(true, 1), client.connect(false, 3));
    served?;
    connected?;

    let forwarding = client.clone();
    LogForwarder::global().set_sink(Some(log_sink(move |level, target, message| {
        if !target.starts_with(FORWARDED_TARGET) {
            return;
        }
        match log_message(level, message) {
            Ok(log) => {
                if let Err(err) = forwarding.emit(&log) {
                    eprintln!("failed to forward log: {}", err);
                }
            }
            Err(err) => eprintln!("failed to build log message: {}", err),
        }
    })));

    let result = client::run(&client, 3).await;

    LogForwarder::global().set_sink(None);
    client.disconnect().await?;
    tracing::info!(server_connected = server.is_connected(), "Demo finished");
    result
}
