//! Wire codec for relayed frames.
//!
//! Every frame is a standalone JSON value. Payloads are opaque to the relay:
//! anything that parses is forwarded, anything that does not is dropped.

use actix_web::web::Bytes;
use serde_json::Value;

/// A raw frame as it arrived from a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// Parses a frame into a JSON value.
///
/// Binary frames are read as UTF-8 first, with invalid sequences replaced.
/// Returns `None` on any syntax error.
pub fn decode(frame: &Frame) -> Option<Value> {
    match frame {
        Frame::Text(text) => serde_json::from_str(text).ok(),
        Frame::Binary(bytes) => serde_json::from_str(&String::from_utf8_lossy(bytes)).ok(),
    }
}

/// Serializes a decoded value back to compact JSON text.
///
/// Key order and whitespace of the original frame are not preserved.
pub fn encode(value: &Value) -> String {
    value.to_string()
}
