use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub type Document = Map<String, Value>;
pub type DocumentId = String;

pub const ID_FIELD: &str = "_id";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    pub skip: usize,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    pub multi: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveOptions {
    pub single: bool,
}

/// Reads a verb's trailing options argument. `null` and absent both mean defaults.
pub fn parse_options<T>(options: Option<Value>) -> StoreResult<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match options {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| StoreError::InvalidInput(format!("options rejected: {err}"))),
    }
}

pub fn insert_ack(inserted: &[Document]) -> Value {
    let ids: Vec<Value> = inserted
        .iter()
        .map(|doc| doc.get(ID_FIELD).cloned().unwrap_or(Value::Null))
        .collect();
    json!({
        "result": {"ok": 1, "n": inserted.len()},
        "ops": inserted,
        "insertedCount": inserted.len(),
        "insertedIds": ids,
    })
}

pub fn update_ack(matched: usize, modified: usize) -> Value {
    json!({
        "result": {"ok": 1, "n": matched, "nModified": modified},
        "matchedCount": matched,
        "modifiedCount": modified,
    })
}

pub fn remove_ack(deleted: usize) -> Value {
    json!({
        "result": {"ok": 1, "n": deleted},
        "deletedCount": deleted,
    })
}
