//! Property tests for wire determinism.

mod common;

use common::*;
use didcomm_core::envelopes::compute_apv;
use quickcheck_macros::quickcheck;

#[quickcheck]
fn apv_does_not_depend_on_kid_order(kids: Vec<String>) -> bool {
    let mut reversed = kids.clone();
    reversed.reverse();
    compute_apv(&kids) == compute_apv(&reversed)
}

#[quickcheck]
fn distinct_kid_sets_yield_distinct_apv(kid: String) -> bool {
    let base = vec!["did:example:bob#key-1".to_string()];
    let mut extended = base.clone();
    extended.push(format!("did:example:bob#key-1{}", kid));
    compute_apv(&base) != compute_apv(&extended)
}

#[quickcheck]
fn message_wire_round_trip_preserves_body(value: String) -> bool {
    let msg = Message::new("qc-1", "https://example.com/protocols/qc/1.0/check", json!({ "v": value }));
    let wire = msg.to_wire().unwrap();
    Message::from_wire(&wire).unwrap() == msg
}

#[quickcheck]
fn unknown_headers_survive_the_wire(value: String) -> bool {
    let msg = Message::new("qc-2", "https://example.com/protocols/qc/1.0/check", json!({}))
        .add_header_field("custom_header".to_string(), json!(value));
    let wire = msg.to_wire().unwrap();
    Message::from_wire(&wire).unwrap() == msg
}
