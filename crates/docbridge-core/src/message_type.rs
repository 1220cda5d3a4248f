use crate::errors::{BridgeError, BridgeResult};
use serde_json::{Map, Value};

/// `<collection>/<action>[/<field>]` split into its parts. Segments past the
/// third are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedType {
    pub collection: String,
    pub action: String,
    pub field: Option<String>,
}

impl ParsedType {
    /// Narrows a field-targeted payload to `{field: payload}`.
    pub fn target_payload(&self, payload: Value) -> Value {
        match &self.field {
            Some(field) => {
                let mut wrapped = Map::new();
                wrapped.insert(field.clone(), payload);
                Value::Object(wrapped)
            }
            None => payload,
        }
    }
}

pub fn parse_type(message_type: &str) -> BridgeResult<ParsedType> {
    let mut segments = message_type.split('/');
    let collection = segments.next().unwrap_or_default();
    let Some(action) = segments.next() else {
        return Err(BridgeError::BadTypeFormat(message_type.to_string()));
    };
    let field = segments
        .next()
        .filter(|field| !field.is_empty())
        .map(str::to_string);

    Ok(ParsedType {
        collection: collection.to_string(),
        action: action.to_string(),
        field,
    })
}

/// A payload array is the argument list; anything else is its only argument.
pub fn into_arguments(payload: Value) -> Value {
    match payload {
        Value::Array(_) => payload,
        other => Value::Array(vec![other]),
    }
}
