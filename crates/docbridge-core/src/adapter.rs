use crate::errors::BridgeResult;
use crate::pipeline::ShapedCall;
use docbridge_store::{DocumentStore, StoreOutcome, StoreVerb};
use serde_json::Value;

/// Dispatches a shaped call to the store and resolves its single outcome.
pub async fn execute(store: &dyn DocumentStore, call: ShapedCall) -> BridgeResult<Value> {
    let ShapedCall {
        collection,
        action,
        verb,
        arguments,
    } = call;
    tracing::debug!(%collection, %action, %verb, "dispatching store call");

    let mut arguments = arguments.into_vec().into_iter();
    let first = arguments.next().unwrap_or(Value::Null);
    let second = arguments.next();
    let third = arguments.next();

    let outcome = match verb {
        StoreVerb::Find => store.find(&collection, first, second).await?,
        StoreVerb::Insert => store.insert(&collection, first, second).await?,
        StoreVerb::Remove => store.remove(&collection, first, second).await?,
        StoreVerb::Update => {
            store
                .update(&collection, first, second.unwrap_or(Value::Null), third)
                .await?
        }
    };
    resolve_outcome(outcome).await
}

/// Cursors are drained into an ordered array; acknowledgements pass through.
pub async fn resolve_outcome(outcome: StoreOutcome) -> BridgeResult<Value> {
    match outcome {
        StoreOutcome::Ack(value) => Ok(value),
        StoreOutcome::Cursor(mut cursor) => {
            let documents = cursor.drain().await?;
            Ok(Value::Array(documents.into_iter().map(Value::Object).collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BridgeError;
    use crate::pipeline::validate_input;
    use docbridge_store::{MemoryDocumentStore, StoreError};
    use serde_json::json;

    fn shaped(action: &str, arguments: Value) -> ShapedCall {
        let (action, arguments) =
            validate_input(true, "user", Some(arguments), action).expect("input should be valid");
        ShapedCall {
            collection: "user".to_string(),
            action,
            verb: action.verb(),
            arguments,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn execute_insert_then_find_expected_drained_cursor() {
        let store = MemoryDocumentStore::new();
        let ack = execute(&store, shaped("insert", json!([{"_id": "a", "name": "ann"}])))
            .await
            .expect("insert should succeed");
        assert_eq!(ack["insertedCount"], json!(1));

        let found = execute(&store, shaped("find", json!([{"name": "ann"}])))
            .await
            .expect("find should succeed");
        assert_eq!(found, json!([{"_id": "a", "name": "ann"}]));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn execute_update_expected_second_argument_as_update_document() {
        let store = MemoryDocumentStore::new();
        execute(&store, shaped("insert", json!([{"_id": "a"}])))
            .await
            .expect("insert should succeed");

        let call = shaped("set", json!([{"_id": "a"}, {"$set": {"status": "online"}}]));
        let ack = execute(&store, call).await.expect("update should succeed");
        assert_eq!(ack["modifiedCount"], json!(1));
        assert_eq!(
            store.documents("user").expect("documents should list")[0]["status"],
            json!("online")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn execute_update_without_operator_expected_store_error() {
        let store = MemoryDocumentStore::new();
        let call = shaped("set", json!([{"_id": "a"}, {"status": "online"}]));
        let error = execute(&store, call).await.expect_err("plain update should fail");
        assert!(matches!(error, BridgeError::Store(StoreError::InvalidInput(_))));
    }
}
