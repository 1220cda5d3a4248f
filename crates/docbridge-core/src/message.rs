use crate::errors::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Request,
    Response,
    Fail,
}

/// Wire envelope shared by inbound requests and outbound responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Value,
    pub status: MessageStatus,
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Value>,
}

impl Message {
    pub fn request(id: impl Into<Value>, message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            status: MessageStatus::Request,
            message_type: message_type.into(),
            payload,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<Value>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn is_fail(&self) -> bool {
        self.status == MessageStatus::Fail
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Correlation fields copied from an inbound message onto its response.
/// Extracted leniently so malformed messages still get an addressed reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageHeader {
    pub id: Value,
    pub message_type: String,
    pub owner: Option<Value>,
}

impl MessageHeader {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            id: raw.get("id").cloned().unwrap_or(Value::Null),
            message_type: raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            owner: present_owner(raw.get("owner")),
        }
    }
}

/// An inbound message that passed envelope checks.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub message_type: String,
    pub payload: Value,
    pub owner: Option<Value>,
}

impl Request {
    pub fn parse(raw: Value) -> BridgeResult<Self> {
        let Value::Object(mut fields) = raw else {
            return Err(BridgeError::EmptyMessage);
        };

        let message_type = match fields.remove("type") {
            Some(Value::String(message_type)) if !message_type.is_empty() => message_type,
            _ => return Err(BridgeError::MissingType),
        };
        let payload = match fields.remove("payload") {
            Some(payload) if !payload.is_null() => payload,
            _ => return Err(BridgeError::MissingPayload),
        };

        Ok(Self {
            message_type,
            payload,
            owner: present_owner(fields.get("owner")),
        })
    }
}

fn present_owner(owner: Option<&Value>) -> Option<Value> {
    owner.filter(|owner| !owner.is_null()).cloned()
}
