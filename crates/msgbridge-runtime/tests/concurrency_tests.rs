//! Concurrency tests for request correlation
//!
//! These tests verify that many requests in flight at once, from several
//! tasks and in both directions, each settle with their own response.

#![allow(non_snake_case)]

use msgbridge_core::{BridgeOptions, Dispatch, DispatchFn, RequestOverrides, dispatch_fn};
use msgbridge_runtime::{Bridge, bridge_pair};
use serde_json::json;
use std::time::Duration;

fn doubling() -> DispatchFn {
    dispatch_fn(|data| {
        let n = data.as_i64().unwrap_or_default();
        Ok(Dispatch::reply(async move {
            // Resolve out of order
            tokio::time::sleep(Duration::from_millis((n % 5) as u64)).await;
            Ok(json!(n * 2))
        }))
    })
}

async fn connected_pair() -> (Bridge, Bridge) {
    let (left, right) = bridge_pair(BridgeOptions::default()).unwrap();
    let awaiting = right.connect(doubling(), true, 1);
    let initiating = left.connect(doubling(), false, 1);
    let (awaited, initiated) = tokio::join!(awaiting, initiating);
    awaited.unwrap();
    initiated.unwrap();
    (left, right)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn Bridge___concurrent_requests___each_settles_with_own_response() {
    let (left, _right) = connected_pair().await;

    let tasks: Vec<_> = (0..200i64)
        .map(|n| {
            let bridge = left.clone();
            tokio::spawn(async move {
                let response = bridge
                    .request(json!(n), RequestOverrides::none())
                    .await
                    .unwrap();
                (n, response)
            })
        })
        .collect();

    for task in tasks {
        let (n, response) = task.await.unwrap();
        assert_eq!(response, json!(n * 2));
    }
    assert_eq!(left.pending_requests(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn Bridge___requests_in_both_directions___do_not_cross() {
    let (left, right) = connected_pair().await;

    let from_left = {
        let left = left.clone();
        tokio::spawn(async move {
            for n in 0..50i64 {
                let response = left.request(json!(n), RequestOverrides::none()).await;
                assert_eq!(response, Ok(json!(n * 2)));
            }
        })
    };
    let from_right = {
        let right = right.clone();
        tokio::spawn(async move {
            for n in 100..150i64 {
                let response = right.request(json!(n), RequestOverrides::none()).await;
                assert_eq!(response, Ok(json!(n * 2)));
            }
        })
    };

    from_left.await.unwrap();
    from_right.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn Bridge___disconnect_under_load___settles_every_request() {
    let (left, _right) = connected_pair().await;
    let requests: Vec<_> = (0..100i64)
        .map(|n| {
            tokio::spawn(
                left.request(json!(n), RequestOverrides::no_timeout()),
            )
        })
        .collect();

    left.disconnect().await.unwrap();

    for request in requests {
        // Either answered before the disconnect or rejected by it, never left hanging
        let result = tokio::time::timeout(Duration::from_secs(5), request)
            .await
            .unwrap()
            .unwrap();
        match result {
            Ok(_) => {}
            Err(err) => assert_eq!(err.error_code(), 3, "unexpected error {}", err),
        }
    }
    assert_eq!(left.pending_requests(), 0);
}
