use crate::types::Document;
use serde_json::Value;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Native verbs a document store exposes per collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreVerb {
    Find,
    Remove,
    Insert,
    Update,
}

impl StoreVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Remove => "remove",
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for StoreVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lazily-materialized sequence of documents produced by a read.
#[async_trait::async_trait]
pub trait DocumentCursor: Send {
    async fn next_document(&mut self) -> StoreResult<Option<Document>>;

    /// Pulls every remaining document, preserving order.
    async fn drain(&mut self) -> StoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(document) = self.next_document().await? {
            documents.push(document);
        }
        Ok(documents)
    }
}

/// What a store verb hands back: either a plain acknowledgement object or a
/// cursor over matching documents.
pub enum StoreOutcome {
    Ack(Value),
    Cursor(Box<dyn DocumentCursor>),
}

impl StoreOutcome {
    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::Cursor(_))
    }
}

impl fmt::Debug for StoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack(value) => f.debug_tuple("Ack").field(value).finish(),
            Self::Cursor(_) => f.write_str("Cursor(..)"),
        }
    }
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        criteria: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome>;

    async fn insert(
        &self,
        collection: &str,
        documents: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome>;

    async fn update(
        &self,
        collection: &str,
        selector: Value,
        update: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome>;

    async fn remove(
        &self,
        collection: &str,
        selector: Value,
        options: Option<Value>,
    ) -> StoreResult<StoreOutcome>;
}
