use crate::errors::BridgeError;
use crate::message::{Message, MessageHeader, MessageStatus};
use serde_json::Value;

/// Store bookkeeping that never leaves the bridge.
pub const TRANSPORT_FIELDS: [&str; 3] = ["ops", "connection", "message"];

pub fn build_success(header: &MessageHeader, mut result: Value) -> Message {
    if let Value::Object(fields) = &mut result {
        for field in TRANSPORT_FIELDS {
            fields.remove(field);
        }
    }
    envelope(header, MessageStatus::Response, result)
}

pub fn build_failure(header: &MessageHeader, error: &BridgeError) -> Message {
    envelope(header, MessageStatus::Fail, Value::String(error.to_string()))
}

fn envelope(header: &MessageHeader, status: MessageStatus, payload: Value) -> Message {
    Message {
        id: header.id.clone(),
        status,
        message_type: header.message_type.clone(),
        payload,
        owner: header.owner.clone(),
    }
}
