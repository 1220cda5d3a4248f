use crate::validator::{CompiledSchema, Evaluation, SchemaNode};
use crate::violation::Violation;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema does not exist: {0}")]
    UnknownSchema(String),

    #[error("schema has no $id")]
    MissingId,

    #[error("schema {id} is already registered with different content")]
    Conflict { id: String },

    #[error("invalid schema {id}: {reason}")]
    InvalidSchema { id: String, reason: String },

    #[error("schema registry lock poisoned")]
    Poisoned,
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Process-wide set of compiled schemas keyed by identifier.
///
/// Populate it before messages start flowing; afterwards it is only read.
/// Registering a document whose identifier is already present is a no-op when
/// the content is identical, so concurrent start-up paths may race safely.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<BTreeMap<String, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema under its own `$id`.
    pub fn register(&self, schema: &Value) -> SchemaResult<String> {
        let id = declared_id(schema).ok_or(SchemaError::MissingId)?;
        self.insert(id.to_string(), schema)
    }

    /// Registers a schema under its `$id`, or under `fallback_id` when it has none.
    pub fn register_as(&self, fallback_id: &str, schema: &Value) -> SchemaResult<String> {
        let id = declared_id(schema).unwrap_or(fallback_id);
        self.insert(id.to_string(), schema)
    }

    /// Registers a single document or an ordered list of documents. The first
    /// document is the primary one and its identifier is returned; the others
    /// must carry their own `$id` so they can be referenced.
    pub fn register_bundle(&self, fallback_id: &str, bundle: &Value) -> SchemaResult<String> {
        let Value::Array(documents) = bundle else {
            return self.register_as(fallback_id, bundle);
        };
        let Some((primary, referenced)) = documents.split_first() else {
            return Err(SchemaError::InvalidSchema {
                id: fallback_id.to_string(),
                reason: "schema list is empty".to_string(),
            });
        };
        let primary_id = self.register_as(fallback_id, primary)?;
        for document in referenced {
            self.register(document)?;
        }
        Ok(primary_id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read()
            .map(|schemas| schemas.contains_key(id))
            .unwrap_or(false)
    }

    pub fn ids(&self) -> SchemaResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Every violation of schema `id` by `data`, in evaluation order. An empty
    /// list means the data is valid.
    pub fn validate(&self, id: &str, data: &Value) -> SchemaResult<Vec<Violation>> {
        let schemas = self.read()?;
        Evaluation::new(&schemas).run(id, data)
    }

    pub fn first_violation(&self, id: &str, data: &Value) -> SchemaResult<Option<Violation>> {
        Ok(self.validate(id, data)?.into_iter().next())
    }

    fn insert(&self, id: String, schema: &Value) -> SchemaResult<String> {
        if let Some(existing) = self.read()?.get(&id) {
            return if existing.source == *schema {
                tracing::debug!(schema_id = %id, "schema already registered");
                Ok(id)
            } else {
                Err(SchemaError::Conflict { id })
            };
        }

        let root = SchemaNode::compile(&id, schema)?;
        let mut schemas = self.write()?;
        match schemas.get(&id) {
            Some(existing) if existing.source != *schema => Err(SchemaError::Conflict { id }),
            Some(_) => Ok(id),
            None => {
                schemas.insert(
                    id.clone(),
                    Arc::new(CompiledSchema {
                        source: schema.clone(),
                        root,
                    }),
                );
                tracing::debug!(schema_id = %id, "schema registered");
                Ok(id)
            }
        }
    }

    fn read(&self) -> SchemaResult<RwLockReadGuard<'_, BTreeMap<String, Arc<CompiledSchema>>>> {
        self.schemas.read().map_err(|_| SchemaError::Poisoned)
    }

    fn write(&self) -> SchemaResult<RwLockWriteGuard<'_, BTreeMap<String, Arc<CompiledSchema>>>> {
        self.schemas.write().map_err(|_| SchemaError::Poisoned)
    }
}

fn declared_id(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .and_then(Value::as_str)
        .map(|id| id.trim_end_matches('#'))
        .filter(|id| !id.is_empty())
}
