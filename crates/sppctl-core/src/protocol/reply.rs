//! Reply decoding and secondary identification.

use crate::error::{BrokerError, Result};
use crate::types::ProcessType;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Secondary types tried against a `_get_client_id` reply, first match wins.
pub const IDENTIFY_ORDER: [ProcessType; 4] = [
    ProcessType::Vf,
    ProcessType::Nfv,
    ProcessType::Mirror,
    ProcessType::Pcap,
];

/// Decode a raw worker reply.
///
/// NUL bytes are stripped before parsing. Replies that are not JSON come back
/// as a JSON string holding the raw text. A reply flagged with
/// `"result": "error"` becomes [`BrokerError::Protocol`].
pub fn decode_reply(raw: &[u8]) -> Result<Value> {
    let text: String = String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| *c != '\0')
        .collect();

    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!("reply is not JSON ({}): {:?}", e, text);
            return Ok(Value::String(text));
        }
    };

    match error_message(&value) {
        Some(message) => Err(BrokerError::Protocol {
            message,
            payload: value,
        }),
        None => Ok(value),
    }
}

/// Extract the error message if the reply reports an error.
fn error_message(value: &Value) -> Option<String> {
    let result = value
        .pointer("/results/0")
        .filter(|first| first.get("result").is_some())
        .unwrap_or(value);

    if result.get("result").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let message = result
        .pointer("/error_details/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(message.to_string())
}

#[derive(Debug, Deserialize)]
struct ClientIdReply {
    process_type: String,
    client_id: u32,
}

/// Decode a `_get_client_id` reply as a process of type `kind`.
///
/// Returns the client id when the reply's `process_type` names `kind`.
pub fn decode_client_id(reply: &Value, kind: ProcessType) -> Option<u32> {
    let reply = ClientIdReply::deserialize(reply).ok()?;
    (reply.process_type == kind.as_str()).then_some(reply.client_id)
}

/// Identify a secondary from its `_get_client_id` reply.
pub fn identify(reply: &Value) -> Option<(ProcessType, u32)> {
    IDENTIFY_ORDER
        .iter()
        .find_map(|kind| decode_client_id(reply, *kind).map(|id| (*kind, id)))
}
