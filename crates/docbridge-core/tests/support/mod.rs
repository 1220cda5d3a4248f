#![allow(dead_code)]

use async_trait::async_trait;
use docbridge_core::{BridgeConfig, EventBridge, Message, ResponseCallback};
use docbridge_store::{
    DocumentStore, MemoryDocumentStore, StoreError, StoreOutcome, StoreResult, StoreVerb,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

pub fn user_schema_bundle() -> Value {
    json!([
        {
            "$id": "user",
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"},
                "friends": {"$ref": "langs"},
                "status": {"type": "string", "pattern": "(online|offline)"}
            }
        },
        {
            "$id": "langs",
            "type": "array",
            "items": [{"$ref": "lang"}]
        },
        {
            "$id": "lang",
            "type": "object",
            "properties": {
                "code": {"type": "string", "pattern": "[A-Z]{2}"},
                "native": {"type": "boolean"},
                "level": {"type": "integer"}
            }
        }
    ])
}

pub fn models_definition() -> Value {
    json!({
        "user": {"schema": user_schema_bundle(), "private": true},
        "note": {
            "schema": {"type": "object", "properties": {"text": {"type": "string"}}},
            "allowedActions": ["find", "insert"]
        }
    })
}

/// One call as seen by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub verb: StoreVerb,
    pub collection: String,
    pub arguments: Vec<Value>,
}

/// Records every call and forwards it to an in-memory store.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryDocumentStore,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    fn record(&self, verb: StoreVerb, collection: &str, arguments: Vec<Value>) {
        self.calls.lock().expect("calls mutex").push(RecordedCall {
            verb,
            collection: collection.to_string(),
            arguments,
        });
    }
}

fn present(arguments: Vec<Option<Value>>) -> Vec<Value> {
    arguments.into_iter().flatten().collect()
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn find(
        &self,
        collection: &str,
        criteria: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        self.record(
            StoreVerb::Find,
            collection,
            present(vec![Some(criteria.clone()), options.clone()]),
        );
        self.inner.find(collection, criteria, options).await
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        self.record(
            StoreVerb::Insert,
            collection,
            present(vec![Some(documents.clone()), options.clone()]),
        );
        self.inner.insert(collection, documents, options).await
    }

    async fn update(
        &self,
        collection: &str,
        selector: Value,
        update: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        self.record(
            StoreVerb::Update,
            collection,
            present(vec![Some(selector.clone()), Some(update.clone()), options.clone()]),
        );
        self.inner.update(collection, selector, update, options).await
    }

    async fn remove(
        &self,
        collection: &str,
        selector: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        self.record(
            StoreVerb::Remove,
            collection,
            present(vec![Some(selector.clone()), options.clone()]),
        );
        self.inner.remove(collection, selector, options).await
    }
}

/// Rejects every call with a backend error.
#[derive(Clone, Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(&self, _: &str, _: Value, _: Option<Value>) -> StoreResult<StoreOutcome> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    async fn insert(&self, _: &str, _: Value, _: Option<Value>) -> StoreResult<StoreOutcome> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    async fn update(
        &self,
        _: &str,
        _: Value,
        _: Value,
        _: Option<Value>,
    ) -> StoreResult<StoreOutcome> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    async fn remove(&self, _: &str, _: Value, _: Option<Value>) -> StoreResult<StoreOutcome> {
        Err(StoreError::Backend("connection reset".to_string()))
    }
}

pub fn bridge_with_store(store: Arc<dyn DocumentStore>) -> EventBridge {
    let config = BridgeConfig::new()
        .with_store(store)
        .with_model_definitions(&models_definition())
        .expect("models should load");
    EventBridge::new(config)
}

/// Callback that collects every response it receives.
pub fn collecting_callback() -> (ResponseCallback, Arc<Mutex<Vec<Message>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let callback: ResponseCallback = Arc::new(move |message: Message| {
        sink.lock().expect("responses mutex").push(message);
    });
    (callback, received)
}
