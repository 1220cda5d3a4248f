use crate::adapter;
use crate::errors::{BridgeError, BridgeResult};
use crate::message::{Message, MessageHeader, Request};
use crate::message_type::{into_arguments, parse_type};
use crate::models::ModelRegistry;
use crate::pipeline::{CallRequest, Pipeline, ShapedCall};
use crate::response::{build_failure, build_success};
use docbridge_schema::SchemaRegistry;
use docbridge_store::DocumentStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

pub type ResponseCallback = Arc<dyn Fn(Message) + Send + Sync>;

/// Handles shared by every message the bridge processes.
#[derive(Clone, Default)]
pub struct BridgeConfig {
    pub store: Option<Arc<dyn DocumentStore>>,
    pub models: Option<Arc<ModelRegistry>>,
    pub schemas: Arc<SchemaRegistry>,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = Some(Arc::new(models));
        self
    }

    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Builds the model registry from JSON, registering its schemas in this
    /// config's schema registry.
    pub fn with_model_definitions(self, models: &Value) -> BridgeResult<Self> {
        let registry = ModelRegistry::from_value(models, &self.schemas)?;
        Ok(self.with_models(registry))
    }
}

#[derive(Clone)]
pub struct EventBridge {
    config: Arc<BridgeConfig>,
}

impl EventBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn bind(&self, send_response: Option<ResponseCallback>) -> BridgeResult<BoundBridge> {
        let send_response = send_response
            .ok_or_else(|| BridgeError::Callback("response callback must be defined".to_string()))?;
        Ok(BoundBridge {
            bridge: self.clone(),
            send_response,
        })
    }

    /// Runs one inbound message through the bridge. Failures are reported as a
    /// `fail` message rather than an error.
    pub async fn handle(&self, raw: Value) -> Message {
        let header = MessageHeader::from_raw(&raw);
        let span = tracing::debug_span!(
            "bridge_message",
            id = %header.id,
            message_type = %header.message_type
        );
        match self.run(raw).instrument(span).await {
            Ok(result) => build_success(&header, result),
            Err(error) => {
                tracing::warn!(
                    id = %header.id,
                    message_type = %header.message_type,
                    %error,
                    "message failed"
                );
                build_failure(&header, &error)
            }
        }
    }

    /// Parses and shapes a message without touching the store.
    pub fn shape(&self, raw: Value) -> BridgeResult<ShapedCall> {
        let request = Request::parse(raw)?;
        let parsed = parse_type(&request.message_type)?;
        let arguments = into_arguments(parsed.target_payload(request.payload));
        Pipeline::new(
            self.config.store.is_some(),
            self.config.models.as_deref(),
            &self.config.schemas,
        )
        .shape(CallRequest {
            collection: parsed.collection,
            action: parsed.action,
            arguments: Some(arguments),
            owner: request.owner,
        })
    }

    async fn run(&self, raw: Value) -> BridgeResult<Value> {
        let call = self.shape(raw)?;
        let Some(store) = self.config.store.as_deref() else {
            return Err(BridgeError::input("a document store handle must be defined"));
        };
        adapter::execute(store, call).await
    }
}

/// A bridge with its response callback attached.
#[derive(Clone)]
pub struct BoundBridge {
    bridge: EventBridge,
    send_response: ResponseCallback,
}

impl BoundBridge {
    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }

    /// Handles `raw` and delivers exactly one response through the callback.
    pub async fn process(&self, raw: Value) {
        let response = self.bridge.handle(raw).await;
        (self.send_response)(response);
    }
}
