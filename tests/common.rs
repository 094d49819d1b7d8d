#![allow(dead_code)]

pub use didcomm_core::{
    crypto::RawCrypto,
    unpack, Error, Malformed, Message, UnpackOptions,
};
pub use serde_json::json;
pub use utilities::*;

/// Makes `log` output visible under `RUST_LOG` when a test fails.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The message most tests send around.
pub fn sample_message() -> Message {
    Message::new(
        "1234567890",
        "http://example.com/protocols/lets_do_lunch/1.0/proposal",
        json!({"messagespecificattribute": "and its value"}),
    )
    .from(ALICE_DID)
    .to(vec![BOB_DID.to_string()])
    .created_time(1516269022)
    .expires_time(1516385931)
}
