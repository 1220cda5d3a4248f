mod support;

use docbridge_core::{BridgeConfig, EventBridge, MessageStatus};
use docbridge_schema::SchemaRegistry;
use docbridge_store::{MemoryDocumentStore, StoreVerb};
use serde_json::json;
use std::sync::Arc;
use support::{
    FailingStore, RecordingStore, bridge_with_store, models_definition, user_schema_bundle,
};

#[tokio::test(flavor = "current_thread")]
async fn insert_private_model_with_owner_expected_response_without_ops() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "1",
            "status": "request",
            "type": "user/insert",
            "payload": {"name": "john doe", "age": 25, "status": "online"},
            "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Response, "{:?}", response.payload);
    assert_eq!(response.id, json!("1"));
    assert_eq!(response.message_type, "user/insert");
    assert_eq!(response.owner, Some(json!("u1")));
    assert_eq!(response.payload["insertedCount"], json!(1));
    assert!(response.payload.get("ops").is_none());
    assert!(response.payload["insertedIds"][0].is_string());

    let stored = store.inner.documents("user").expect("documents should list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["owner"], json!("u1"));
}

#[tokio::test(flavor = "current_thread")]
async fn find_field_targeted_expected_single_criteria_argument_dispatched() {
    let store = RecordingStore::default();
    let schemas = Arc::new(SchemaRegistry::new());
    let config = BridgeConfig::new()
        .with_store(Arc::new(store.clone()))
        .with_schemas(schemas)
        .with_model_definitions(&json!({"user": {"schema": user_schema_bundle()}}))
        .expect("models should load");
    let bridge = EventBridge::new(config);

    let response = bridge
        .handle(json!({"id": "2", "type": "user/find/status", "payload": "online"}))
        .await;

    assert_eq!(response.status, MessageStatus::Response);
    assert_eq!(response.payload, json!([]));
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, StoreVerb::Find);
    assert_eq!(calls[0].collection, "user");
    assert_eq!(calls[0].arguments, vec![json!({"status": "online"})]);
}

#[tokio::test(flavor = "current_thread")]
async fn find_expected_cursor_drained_in_insertion_order() {
    let bridge = bridge_with_store(Arc::new(MemoryDocumentStore::new()));
    for name in ["ann", "bob"] {
        let response = bridge
            .handle(json!({
                "id": name, "type": "user/insert", "payload": {"name": name}, "owner": "u1"
            }))
            .await;
        assert_eq!(response.status, MessageStatus::Response);
    }
    bridge
        .handle(json!({
            "id": "other", "type": "user/insert", "payload": {"name": "eve"}, "owner": "u2"
        }))
        .await;

    let response = bridge
        .handle(json!({"id": "q", "type": "user/find", "payload": {}, "owner": "u1"}))
        .await;
    let names: Vec<_> = response
        .payload
        .as_array()
        .expect("find should answer with an array")
        .iter()
        .map(|document| document["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("ann"), json!("bob")]);
}

#[tokio::test(flavor = "current_thread")]
async fn insert_bad_status_expected_schema_fail_and_no_store_call() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "3", "type": "user/insert", "payload": {"status": "wrong"}, "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Fail);
    let text = response.payload.as_str().expect("fail payload is text");
    assert!(text.ends_with("should match pattern \"(online|offline)\""), "{text}");
    assert!(store.calls().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn private_model_without_owner_expected_ownership_fail() {
    let bridge = bridge_with_store(Arc::new(MemoryDocumentStore::new()));
    let response = bridge
        .handle(json!({"id": "4", "type": "user/find", "payload": {}}))
        .await;
    assert_eq!(response.status, MessageStatus::Fail);
    assert_eq!(
        response.payload,
        json!("an owner must be defined in order to secure the query on private models")
    );
    assert_eq!(response.owner, None);
}

#[tokio::test(flavor = "current_thread")]
async fn action_outside_allowed_list_expected_fail() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({"id": "5", "type": "note/remove", "payload": {}}))
        .await;
    assert_eq!(response.status, MessageStatus::Fail);
    assert_eq!(response.payload, json!("action remove is not allowed on model note"));

    let response = bridge
        .handle(json!({"id": "6", "type": "note/insert", "payload": {"text": "hi"}}))
        .await;
    assert_eq!(response.status, MessageStatus::Response);
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn push_single_element_into_array_field_expected_update() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));
    bridge
        .handle(json!({
            "id": "7", "type": "user/insert", "payload": {"name": "ann"}, "owner": "u1"
        }))
        .await;

    let response = bridge
        .handle(json!({
            "id": "8",
            "type": "user/push",
            "payload": [{"name": "ann"}, {"friends": {"code": "ES"}}],
            "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Response, "{:?}", response.payload);
    assert_eq!(response.payload["modifiedCount"], json!(1));
    let update = store.calls().pop().expect("update should be recorded");
    assert_eq!(update.verb, StoreVerb::Update);
    assert_eq!(
        update.arguments,
        vec![
            json!({"name": "ann", "owner": "u1"}),
            json!({"$push": {"friends": {"code": "ES"}}})
        ]
    );
    let stored = store.inner.documents("user").expect("documents should list");
    assert_eq!(stored[0]["friends"], json!([{"code": "ES"}]));
}

#[tokio::test(flavor = "current_thread")]
async fn set_with_selector_and_data_expected_operator_wrapped_update() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "9",
            "type": "user/set",
            "payload": [{"name": "ann"}, {"status": "offline"}],
            "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Response, "{:?}", response.payload);
    assert_eq!(response.payload["matchedCount"], json!(0));
    assert_eq!(
        store.calls()[0].arguments[1],
        json!({"$set": {"status": "offline"}})
    );
}

#[tokio::test(flavor = "current_thread")]
async fn set_field_targeted_expected_null_operator_body_relayed_as_store_fail() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "9b", "type": "user/set/status", "payload": "offline", "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Fail);
    let text = response.payload.as_str().expect("fail payload is text");
    assert!(text.starts_with("invalid input: "), "{text}");
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, StoreVerb::Update);
    assert_eq!(
        calls[0].arguments,
        vec![json!({"status": "offline", "owner": "u1"}), json!({"$set": null})]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn unset_expected_no_schema_validation() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "9c",
            "type": "user/unset",
            "payload": [{"name": "ann"}, {"status": ""}],
            "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Response, "{:?}", response.payload);
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].arguments[1], json!({"$unset": {"status": ""}}));
}

#[tokio::test(flavor = "current_thread")]
async fn insert_null_document_into_private_model_expected_schema_fail() {
    let store = RecordingStore::default();
    let bridge = bridge_with_store(Arc::new(store.clone()));

    let response = bridge
        .handle(json!({
            "id": "9d", "type": "user/insert", "payload": [null], "owner": "u1"
        }))
        .await;

    assert_eq!(response.status, MessageStatus::Fail);
    assert_eq!(response.payload, json!(" should be object"));
    assert!(store.calls().is_empty());
    assert!(store.inner.documents("user").expect("documents should list").is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn store_failure_expected_fail_with_store_message() {
    let bridge = bridge_with_store(Arc::new(FailingStore));
    let response = bridge
        .handle(json!({"id": "10", "type": "note/find", "payload": {}}))
        .await;
    assert_eq!(response.status, MessageStatus::Fail);
    assert_eq!(response.payload, json!("backend failure: connection reset"));
}

#[tokio::test(flavor = "current_thread")]
async fn malformed_messages_expected_fail_envelopes() {
    let bridge = bridge_with_store(Arc::new(MemoryDocumentStore::new()));

    let response = bridge.handle(json!({"id": "11", "payload": {}})).await;
    assert_eq!(response.status, MessageStatus::Fail);
    assert_eq!(response.payload, json!("message has no type"));

    let response = bridge.handle(json!({"id": "12", "type": "note/find"})).await;
    assert_eq!(response.payload, json!("message has no payload"));
    assert_eq!(response.message_type, "note/find");

    let response = bridge
        .handle(json!({"id": "13", "type": "note", "payload": {}}))
        .await;
    assert_eq!(response.status, MessageStatus::Fail);

    let response = bridge
        .handle(json!({"id": "14", "type": "ghost/find", "payload": {}}))
        .await;
    assert_eq!(response.payload, json!("required model does not exist: ghost"));
}

#[tokio::test(flavor = "current_thread")]
async fn models_registered_twice_expected_same_outcomes() {
    let schemas = Arc::new(SchemaRegistry::new());
    let build = || {
        let config = BridgeConfig::new()
            .with_store(Arc::new(MemoryDocumentStore::new()))
            .with_schemas(Arc::clone(&schemas))
            .with_model_definitions(&models_definition())
            .expect("models should load");
        EventBridge::new(config)
    };
    let first = build();
    let second = build();

    let message = json!({
        "id": "15", "type": "user/insert", "payload": {"status": "wrong"}, "owner": "u1"
    });
    let before = first.handle(message.clone()).await;
    let after = second.handle(message).await;
    assert_eq!(before, after);
}
