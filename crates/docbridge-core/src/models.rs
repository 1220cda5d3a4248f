use crate::actions::Action;
use crate::errors::{BridgeError, BridgeResult};
use docbridge_schema::SchemaRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One entry of the models configuration as written on disk.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default, alias = "actions")]
    pub allowed_actions: Option<Vec<Action>>,
    #[serde(default)]
    pub private: bool,
}

/// A model whose schemas have been registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    pub schema_id: Option<String>,
    pub allowed_actions: Option<Vec<Action>>,
    pub private: bool,
}

impl Model {
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&action))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelRegistry {
    models: BTreeMap<String, Model>,
}

impl ModelRegistry {
    /// Builds the registry from a `{collection: config}` JSON object and
    /// registers every model schema in `schemas`.
    pub fn from_value(models: &Value, schemas: &SchemaRegistry) -> BridgeResult<Self> {
        let Value::Object(entries) = models else {
            return Err(BridgeError::ModelNotFound(
                "the models definition must be an object keyed by collection".to_string(),
            ));
        };

        let mut configs = BTreeMap::new();
        for (collection, entry) in entries {
            let config = ModelConfig::deserialize(entry).map_err(|error| {
                BridgeError::InvalidModel {
                    collection: collection.clone(),
                    reason: error.to_string(),
                }
            })?;
            configs.insert(collection.clone(), config);
        }
        Self::from_configs(configs, schemas)
    }

    pub fn from_configs(
        configs: BTreeMap<String, ModelConfig>,
        schemas: &SchemaRegistry,
    ) -> BridgeResult<Self> {
        let mut models = BTreeMap::new();
        for (collection, config) in configs {
            let schema_id = match &config.schema {
                Some(schema) => Some(schemas.register_bundle(&collection, schema).map_err(
                    |error| BridgeError::InvalidModel {
                        collection: collection.clone(),
                        reason: error.to_string(),
                    },
                )?),
                None => None,
            };
            let model = Model {
                name: collection.clone(),
                schema_id,
                allowed_actions: config.allowed_actions,
                private: config.private,
            };
            models.insert(collection, model);
        }
        tracing::info!(models = models.len(), "model registry built");
        Ok(Self { models })
    }

    pub fn get(&self, collection: &str) -> Option<&Model> {
        self.models.get(collection)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
