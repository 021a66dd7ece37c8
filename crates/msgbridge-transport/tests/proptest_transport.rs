//! Property-based tests for envelope serialization
//!
//! Tests that every legal envelope survives the default codec unchanged and
//! still passes the structural validator afterwards.

use msgbridge_transport::{Codec, Envelope, JsonCodec, is_envelope};
use proptest::prelude::*;

// Strategy: Generate JSON values (simple types plus one level of nesting)
fn arb_json_value() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i64>().prop_map(|i| serde_json::Value::Number(i.into())),
        ".*".prop_map(serde_json::Value::String),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        arb_json_value(),
        any::<Option<u64>>(),
        any::<Option<u64>>(),
        any::<Option<bool>>(),
    )
        .prop_map(|(data, request_id, reference_id, is_error)| Envelope {
            data,
            request_id,
            reference_id,
            is_error,
        })
}

proptest! {
    /// Property: decode(encode(e)) == e under the default codec
    #[test]
    fn proptest_envelope_roundtrip(envelope in arb_envelope()) {
        let codec = JsonCodec::new();

        let encoded = codec.encode(&envelope).expect("Encoding should succeed");
        let decoded = codec.decode(&encoded).expect("Decoding should succeed");

        prop_assert!(is_envelope(&decoded));
        let recovered = Envelope::from_value(decoded).expect("Decoded value should be legal");
        prop_assert_eq!(recovered, envelope);
    }

    /// Property: arbitrary objects with an unknown key are never legal
    #[test]
    fn proptest_unknown_key_rejected(key in "[a-z]{1,12}", data in arb_json_value()) {
        prop_assume!(!["data", "requestId", "referenceId", "isError"].contains(&key.as_str()));

        let value = serde_json::json!({ "data": data, key: 1 });

        prop_assert!(!is_envelope(&value));
    }
}

#[test]
fn test_response_to_request_zero_roundtrips() {
    let codec = JsonCodec::new();
    let envelope = Envelope::response(serde_json::json!("ok"), 0);

    let decoded = codec
        .decode(&codec.encode(&envelope).expect("Should encode"))
        .expect("Should decode");

    assert_eq!(Envelope::from_value(decoded).expect("Should be legal"), envelope);
}
